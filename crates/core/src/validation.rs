//! Form validation shared by registration and the admin managers.
//!
//! Each check records a message under the field's name and returns the
//! parsed value when the input is valid, so a handler can validate every
//! field in one pass and re-render the form with all messages at once.
//!
//! ```
//! use marketplace_core::validation::FormErrors;
//!
//! let mut errors = FormErrors::new();
//! let name = errors.required("name", "  Dates ");
//! let price = errors.price("price", "0");
//! assert_eq!(name.as_deref(), Some("Dates"));
//! assert!(price.is_none());
//! assert_eq!(errors.get("price"), Some("Price must be greater than zero"));
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::{Email, Price};

/// Minimum password length accepted by the backend.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Validation messages keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    errors: BTreeMap<&'static str, String>,
}

impl FormErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message for `field`. The first message per field wins.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.entry(field).or_insert_with(|| message.into());
    }

    /// The message for `field`, if it failed validation.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// All messages in field order.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.errors.values().map(String::as_str)
    }

    /// A trimmed, non-empty value.
    pub fn required(&mut self, field: &'static str, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            self.add(field, "This field is required");
            return None;
        }
        Some(value.to_string())
    }

    /// A valid email address.
    pub fn email(&mut self, field: &'static str, value: &str) -> Option<Email> {
        match Email::parse(value) {
            Ok(email) => Some(email),
            Err(e) => {
                self.add(field, capitalize(&e.to_string()));
                None
            }
        }
    }

    /// A password of at least [`MIN_PASSWORD_LENGTH`] characters.
    pub fn password(&mut self, field: &'static str, value: &str) -> Option<String> {
        if value.chars().count() < MIN_PASSWORD_LENGTH {
            self.add(
                field,
                format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
            );
            return None;
        }
        Some(value.to_string())
    }

    /// A price greater than zero.
    pub fn price(&mut self, field: &'static str, value: &str) -> Option<Price> {
        let Ok(amount) = Decimal::from_str(value.trim()) else {
            self.add(field, "Enter a price such as 4.50");
            return None;
        };
        if amount <= Decimal::ZERO {
            self.add(field, "Price must be greater than zero");
            return None;
        }
        Some(Price::new(amount))
    }

    /// A stock quantity of zero or more.
    pub fn quantity(&mut self, field: &'static str, value: &str) -> Option<u32> {
        match value.trim().parse::<i64>() {
            Ok(n) if n < 0 => {
                self.add(field, "Quantity cannot be negative");
                None
            }
            Ok(n) => u32::try_from(n).ok().or_else(|| {
                self.add(field, "Quantity is too large");
                None
            }),
            Err(_) => {
                self.add(field, "Enter a whole number");
                None
            }
        }
    }
}

/// A trimmed value, or `None` when blank.
#[must_use]
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
