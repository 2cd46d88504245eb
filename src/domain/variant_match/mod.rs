//! Variant attribute matching
//!
//! A product declares the axes it varies on (`variantTypes`, e.g. `COLOR`), the
//! offered values per axis (`variantOptions`, keyed loosely: `colors`, `size`, ...)
//! and concrete variants with an attribute map (`{ "color": "Black" }`). Given a
//! partial selection these functions tell which options remain reachable and
//! which variant the selection resolves to. Everything is a linear scan.

use serde::Serialize;
use std::collections::BTreeMap;

pub type OptionMap = BTreeMap<String, Vec<String>>;
pub type Attributes = BTreeMap<String, String>;

/// Finds the options key for a variant type: exact match, then a key
/// containing the type, then a plural form (`s`, `es`, `y` → `ies`).
pub fn find_option_key<'a>(options: &'a OptionMap, variant_type: &str) -> Option<&'a str> {
    let wanted = variant_type.to_lowercase();
    let keys = || options.keys().map(String::as_str);

    if let Some(k) = keys().find(|k| k.to_lowercase() == wanted) {
        return Some(k);
    }
    if let Some(k) = keys().find(|k| k.to_lowercase().contains(&wanted)) {
        return Some(k);
    }
    let plurals = [
        format!("{wanted}s"),
        format!("{wanted}es"),
        match wanted.strip_suffix('y') {
            Some(stem) => format!("{stem}ies"),
            None => wanted.clone(),
        },
    ];
    keys().find(|k| {
        let k = k.to_lowercase();
        plurals.iter().any(|p| *p == k)
    })
}

/// Lower-cases selection keys and drops empty values.
pub fn normalize_selection<I, K, V>(pairs: I) -> Attributes
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_lowercase(), v.into()))
        .filter(|(_, v)| !v.is_empty())
        .collect()
}

fn attribute<'a>(attrs: &'a Attributes, key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}

fn satisfies(attrs: &Attributes, selection: &Attributes, skip: Option<&str>) -> bool {
    selection
        .iter()
        .filter(|(k, _)| Some(k.as_str()) != skip)
        .all(|(k, v)| attribute(attrs, k) == Some(v.as_str()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionState {
    pub value: String,
    pub available: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeState {
    pub variant_type: String,
    pub attribute: String,
    pub options: Vec<OptionState>,
}

/// For every variant type with a matching options key, reports each option as
/// available when some variant carries it and agrees with the rest of the selection.
pub fn selection_state(
    variant_types: &[String],
    options: &OptionMap,
    variants: &[&Attributes],
    selection: &Attributes,
) -> Vec<AttributeState> {
    variant_types
        .iter()
        .filter_map(|ty| {
            let key = find_option_key(options, ty)?;
            let attr = ty.to_lowercase();
            let states = options[key]
                .iter()
                .map(|option| OptionState {
                    value: option.clone(),
                    available: variants.iter().any(|v| {
                        attribute(v, &attr) == Some(option.as_str())
                            && satisfies(v, selection, Some(&attr))
                    }),
                    selected: selection.get(&attr) == Some(option),
                })
                .collect();
            Some(AttributeState { variant_type: ty.clone(), attribute: attr, options: states })
        })
        .collect()
}

/// Index of the first variant carrying every selected pair.
pub fn matching_variant(variants: &[&Attributes], selection: &Attributes) -> Option<usize> {
    if selection.is_empty() {
        return None;
    }
    variants.iter().position(|v| satisfies(v, selection, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn phone_options() -> OptionMap {
        let mut m = OptionMap::new();
        m.insert("colors".into(), vec!["Black".into(), "Silver".into(), "Gold".into()]);
        m.insert("sizes".into(), vec!["128GB".into(), "256GB".into()]);
        m
    }

    #[test]
    fn test_find_option_key_exact_and_contains() {
        let mut m = OptionMap::new();
        m.insert("Color".into(), vec![]);
        m.insert("shoe_size".into(), vec![]);
        assert_eq!(find_option_key(&m, "COLOR"), Some("Color"));
        assert_eq!(find_option_key(&m, "SIZE"), Some("shoe_size"));
        assert_eq!(find_option_key(&m, "MATERIAL"), None);
    }

    #[test]
    fn test_find_option_key_plural_forms() {
        let mut m = OptionMap::new();
        m.insert("batteries".into(), vec![]);
        m.insert("boxes".into(), vec![]);
        assert_eq!(find_option_key(&m, "battery"), Some("batteries"));
        assert_eq!(find_option_key(&m, "box"), Some("boxes"));
        assert_eq!(find_option_key(&phone_options(), "COLOR"), Some("colors"));
    }

    #[test]
    fn test_selection_state_marks_unreachable_options() {
        let v1 = attrs(&[("color", "Black"), ("size", "128GB")]);
        let v2 = attrs(&[("color", "Silver"), ("size", "256GB")]);
        let variants = vec![&v1, &v2];
        let types = vec!["COLOR".to_string(), "SIZE".to_string()];
        let selection = normalize_selection([("Color", "Black")]);

        let state = selection_state(&types, &phone_options(), &variants, &selection);
        assert_eq!(state.len(), 2);

        let colors = &state[0];
        assert_eq!(colors.attribute, "color");
        // Other colours stay selectable while a colour is chosen.
        assert!(colors.options.iter().find(|o| o.value == "Silver").unwrap().available);
        assert!(!colors.options.iter().find(|o| o.value == "Gold").unwrap().available);
        assert!(colors.options.iter().find(|o| o.value == "Black").unwrap().selected);

        let sizes = &state[1];
        assert!(sizes.options.iter().find(|o| o.value == "128GB").unwrap().available);
        assert!(!sizes.options.iter().find(|o| o.value == "256GB").unwrap().available);
    }

    #[test]
    fn test_matching_variant() {
        let v1 = attrs(&[("color", "Black"), ("size", "128GB")]);
        let v2 = attrs(&[("color", "Silver"), ("size", "256GB")]);
        let variants = vec![&v1, &v2];
        assert_eq!(matching_variant(&variants, &attrs(&[("size", "256GB")])), Some(1));
        assert_eq!(matching_variant(&variants, &attrs(&[("color", "Black"), ("size", "256GB")])), None);
        assert_eq!(matching_variant(&variants, &Attributes::new()), None);
    }

    #[test]
    fn test_types_without_options_are_skipped() {
        let types = vec!["MATERIAL".to_string()];
        assert!(selection_state(&types, &phone_options(), &[], &Attributes::new()).is_empty());
    }
}
