//! Field validation rules
//!
//! Validators receive the formatted display value, strip everything but
//! digits where the rule is digit-based, and return `None` when the value is
//! acceptable. Reasons are user-facing and meant to be shown inline.

use crate::formatter::{self, CARD_NUMBER_DIGITS, EXPIRY_DIGITS, TAX_ID_DIGITS};
use crate::types::{CardFormData, FieldKind};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Minimum CVV length
pub const CVV_MIN_DIGITS: usize = 3;

/// Reason a field value is rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldError {
    /// Holder name has fewer than two words
    #[error("incomplete name")]
    IncompleteName,

    /// Tax id has fewer than 11 digits
    #[error("invalid tax id")]
    InvalidTaxId,

    /// Card number has fewer than 16 digits
    #[error("invalid card number")]
    InvalidCardNumber,

    /// Expiry has fewer than 4 digits
    #[error("incomplete date")]
    IncompleteDate,

    /// Expiry month outside 01..=12
    #[error("invalid month")]
    InvalidMonth,

    /// Expiry is before the current month
    #[error("card expired")]
    CardExpired,

    /// CVV has fewer than 3 digits
    #[error("invalid CVV")]
    InvalidCvv,
}

/// Per-field validation results of a batch pass
pub type FieldErrors = BTreeMap<FieldKind, FieldError>;

/// Validate a formatted field value against `today`
pub fn validate(kind: FieldKind, value: &str, today: NaiveDate) -> Option<FieldError> {
    match kind {
        FieldKind::HolderName => holder_name(value),
        FieldKind::TaxId => min_digits(value, TAX_ID_DIGITS, FieldError::InvalidTaxId),
        FieldKind::CardNumber => {
            min_digits(value, CARD_NUMBER_DIGITS, FieldError::InvalidCardNumber)
        }
        FieldKind::Expiry => expiry(value, today),
        FieldKind::Cvv => min_digits(value, CVV_MIN_DIGITS, FieldError::InvalidCvv),
    }
}

/// Validate every card field in one pass, collecting all failures
pub fn validate_all(data: &CardFormData, today: NaiveDate) -> FieldErrors {
    FieldKind::ALL
        .into_iter()
        .filter_map(|kind| validate(kind, data.get(kind), today).map(|err| (kind, err)))
        .collect()
}

fn holder_name(value: &str) -> Option<FieldError> {
    if value.split_whitespace().count() < 2 {
        return Some(FieldError::IncompleteName);
    }
    None
}

fn min_digits(value: &str, min: usize, error: FieldError) -> Option<FieldError> {
    if formatter::digits(value).len() < min {
        return Some(error);
    }
    None
}

fn expiry(value: &str, today: NaiveDate) -> Option<FieldError> {
    let digits = formatter::digits(value);
    if digits.len() < EXPIRY_DIGITS {
        return Some(FieldError::IncompleteDate);
    }

    // Both slices are ASCII digits, so parsing cannot fail.
    let month: u32 = digits[0..2].parse().unwrap_or(0);
    let yy: i32 = digits[2..4].parse().unwrap_or(0);

    if !(1..=12).contains(&month) {
        return Some(FieldError::InvalidMonth);
    }

    let year = today.year() - today.year().rem_euclid(100) + yy;
    if year < today.year() || (year == today.year() && month < today.month()) {
        return Some(FieldError::CardExpired);
    }

    None
}
