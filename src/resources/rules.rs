//! Field rules shared by the request payloads.

use rust_decimal::Decimal;
use sea_orm::sea_query::Nullable;
use sea_orm::{ActiveValue, Set, Value};
use std::borrow::Cow;
use std::fmt::Display;
use std::str::FromStr;
use validator::ValidationError;

use crate::errors::ServiceError;
use crate::services::zone_ledger::MAX_KWH;

fn rejected(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

pub fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(rejected("non_negative", "The value must be at least 0."));
    }
    Ok(())
}

pub fn positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(rejected("positive", "The value must be greater than 0."));
    }
    Ok(())
}

/// Energy figure between 0 and the largest value the kWh columns store.
pub fn kwh_quantity(value: &Decimal) -> Result<(), ValidationError> {
    non_negative(value)?;
    if *value > MAX_KWH {
        return Err(rejected(
            "kwh_quantity",
            "The value may not be greater than 99999999999.999.",
        ));
    }
    Ok(())
}

pub fn positive_kwh_quantity(value: &Decimal) -> Result<(), ValidationError> {
    positive(value)?;
    kwh_quantity(value)
}

pub fn percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        return Err(rejected("percentage", "The value must be between 0 and 100."));
    }
    Ok(())
}

/// Lowercase letters, digits and single dashes, e.g. `community-solar`.
pub fn valid_slug(value: &str) -> Result<(), ValidationError> {
    let well_formed = !value.is_empty()
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--")
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !well_formed {
        return Err(rejected(
            "slug",
            "The slug may only contain lowercase letters, digits and dashes.",
        ));
    }
    Ok(())
}

/// ISO 4217 style code: three uppercase letters.
pub fn valid_currency(value: &str) -> Result<(), ValidationError> {
    if value.len() != 3 || !value.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(rejected(
            "currency",
            "The currency must be a three letter code such as EUR.",
        ));
    }
    Ok(())
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(rejected("not_blank", "The value may not be blank."));
    }
    Ok(())
}

/// Parses a status filter into its canonical spelling.
pub fn canonical_status<S>(raw: &str, label: &str) -> Result<String, ServiceError>
where
    S: FromStr + Display,
{
    raw.trim()
        .parse::<S>()
        .map(|status| status.to_string())
        .map_err(|_| ServiceError::field("status", format!("Unknown {} status '{}'.", label, raw)))
}

/// Overwrites `field` when the update payload carries a value.
pub fn assign<V>(field: &mut ActiveValue<V>, value: &Option<V>)
where
    V: Into<Value> + Clone,
{
    if let Some(value) = value {
        *field = Set(value.clone());
    }
}

/// Same as [`assign`] for nullable columns.
pub fn assign_nullable<V>(field: &mut ActiveValue<Option<V>>, value: &Option<V>)
where
    V: Into<Value> + Nullable + Clone,
{
    if let Some(value) = value {
        *field = Set(Some(value.clone()));
    }
}
