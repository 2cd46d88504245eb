//! Value objects shared by rows, requests and guards

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role carried in access tokens
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
pub enum Role {
    Customer,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Customer => "CUSTOMER",
            Self::Seller => "SELLER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "promotion_status", rename_all = "UPPERCASE")]
pub enum PromotionStatus {
    #[default]
    Active,
    Inactive,
    Expired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "clearance_level", rename_all = "UPPERCASE")]
pub enum ClearanceLevel {
    High,
    Medium,
    Low,
}

/// Attribute axis a product can vary on. Stored as text so attribute maps
/// and option keys can be compared case-insensitively against it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VariantType {
    Color,
    Size,
    Material,
    Style,
}

impl VariantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Color => "COLOR",
            Self::Size => "SIZE",
            Self::Material => "MATERIAL",
            Self::Style => "STYLE",
        }
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariantType(pub String);
impl std::error::Error for UnknownVariantType {}
impl fmt::Display for UnknownVariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Unknown variant type {}", self.0) }
}

impl FromStr for VariantType {
    type Err = UnknownVariantType;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COLOR" => Ok(Self::Color),
            "SIZE" => Ok(Self::Size),
            "MATERIAL" => Ok(Self::Material),
            "STYLE" => Ok(Self::Style),
            _ => Err(UnknownVariantType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Seller).unwrap(), "\"SELLER\"");
        let r: Role = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(r, Role::Admin);
        assert!(serde_json::from_str::<Role>("\"admin\"").is_err());
    }

    #[test]
    fn test_variant_type_parse() {
        assert_eq!("color".parse::<VariantType>().unwrap(), VariantType::Color);
        assert_eq!(VariantType::Size.to_string(), "SIZE");
        assert!("weight".parse::<VariantType>().is_err());
    }

    #[test]
    fn test_promotion_status_default() {
        assert_eq!(PromotionStatus::default(), PromotionStatus::Active);
    }
}
