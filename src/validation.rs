//! Extractors that parse and validate request input, plus shared field rules

use std::{borrow::Cow, collections::BTreeMap};

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::error::ApiError;

/// JSON body that has passed `Validate`.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Query string that has passed `Validate`.
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Path parameters rejected with the envelope instead of plain text.
#[derive(FromRequestParts, Debug)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// 6–20 characters of letters, digits, `_` or `-`, and not only digits.
pub fn username(value: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if !(6..=20).contains(&len) {
        return Err(invalid("username", "Username must be between 6 and 20 characters"));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(invalid(
            "username",
            "Username can only contain letters, numbers, underscores and hyphens",
        ));
    }
    if value.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("username", "Username cannot contain only numbers"));
    }
    Ok(())
}

const PASSWORD_SPECIALS: &str = "@$!%*?&";

/// At least 8 characters with an upper-case letter, a lower-case letter, a digit
/// and one of `@$!%*?&`.
pub fn strong_password(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() < 8 {
        return Err(invalid("password", "Password must be at least 8 characters"));
    }
    let upper = value.chars().any(|c| c.is_ascii_uppercase());
    let lower = value.chars().any(|c| c.is_ascii_lowercase());
    let digit = value.chars().any(|c| c.is_ascii_digit());
    let special = value.chars().any(|c| PASSWORD_SPECIALS.contains(c));
    if !(upper && lower && digit && special) {
        return Err(invalid(
            "password",
            "Password must contain uppercase, lowercase, number and special character (@$!%*?&)",
        ));
    }
    Ok(())
}

pub fn image_urls(urls: &Vec<String>) -> Result<(), ValidationError> {
    if urls.iter().all(|u| validator::validate_url(u.as_str())) {
        Ok(())
    } else {
        Err(invalid("url", "Each image must be a valid URL"))
    }
}

pub fn price(value: &Decimal) -> Result<(), ValidationError> {
    let min = Decimal::new(1, 2);
    let max = Decimal::new(99_999_999_999, 2);
    if *value < min || *value > max {
        return Err(invalid("price", "Price must be between 0.01 and 999999999.99"));
    }
    if value.scale() > 2 && value.normalize().scale() > 2 {
        return Err(invalid("price", "Price can have at most two decimal places"));
    }
    Ok(())
}

pub fn non_negative_price(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(invalid("price", "Price cannot be negative"));
    }
    Ok(())
}

pub fn percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        return Err(invalid("range", "Discount percentage must be between 0 and 100"));
    }
    Ok(())
}

pub fn attributes(map: &BTreeMap<String, String>) -> Result<(), ValidationError> {
    if map.is_empty() {
        return Err(invalid("attributes", "Variant attributes cannot be empty"));
    }
    if map.keys().any(|k| k.trim().is_empty()) {
        return Err(invalid("attributes", "Attribute names cannot be blank"));
    }
    Ok(())
}

pub fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "Value cannot be blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(username("shop_owner-1").is_ok());
        assert!(username("short").is_err());
        assert!(username("123456789").is_err());
        assert!(username("has space1").is_err());
        assert!(username("a".repeat(21).as_str()).is_err());
    }

    #[test]
    fn test_strong_password() {
        assert!(strong_password("Secret1!").is_ok());
        assert!(strong_password("secret1!").is_err());
        assert!(strong_password("SECRET1!").is_err());
        assert!(strong_password("Secretxx!").is_err());
        assert!(strong_password("Secret12").is_err());
        assert!(strong_password("Se1!").is_err());
    }

    #[test]
    fn test_price_bounds() {
        assert!(price(&Decimal::new(1999, 2)).is_ok());
        assert!(price(&Decimal::ZERO).is_err());
        assert!(price(&Decimal::new(100_000_000_000, 2)).is_err());
        assert!(price(&Decimal::new(10_001, 3)).is_err());
        assert!(price(&Decimal::new(10_000, 3)).is_ok());
    }

    #[test]
    fn test_image_urls() {
        assert!(image_urls(&vec!["https://cdn.example.com/a.png".into()]).is_ok());
        assert!(image_urls(&vec!["not a url".into()]).is_err());
        assert!(image_urls(&vec![]).is_ok());
    }

    #[test]
    fn test_attributes_not_empty() {
        assert!(attributes(&BTreeMap::new()).is_err());
        let mut map = BTreeMap::new();
        map.insert("color".to_string(), "Black".to_string());
        assert!(attributes(&map).is_ok());
    }

    #[test]
    fn test_percentage() {
        assert!(percentage(&Decimal::new(20, 0)).is_ok());
        assert!(percentage(&Decimal::new(101, 0)).is_err());
        assert!(percentage(&Decimal::new(-1, 0)).is_err());
    }
}
