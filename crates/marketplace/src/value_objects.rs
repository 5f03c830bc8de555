//! Value objects shared by marketplace entities.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Free-form key/value data attached to an entity.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A normalized email address.
///
/// Stored trimmed and lower-cased so unique keys compare addresses the way
/// people expect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Parses and normalizes an address.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let normalized = value.trim().to_lowercase();
        let valid = match normalized.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !normalized.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if !valid {
            return Err(ValidationError::InvalidEmail(value.to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Email::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An amount of money in minor units of a currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in minor units (cents).
    pub amount: i64,

    /// Lower-case ISO 4217 code.
    pub currency: String,
}

impl Money {
    /// Creates an amount, normalizing the currency code.
    pub fn new(amount: i64, currency: &str) -> Result<Self, ValidationError> {
        let code = currency.trim().to_lowercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrency(currency.to_string()));
        }
        Ok(Self {
            amount,
            currency: code,
        })
    }

    /// Zero in the given currency.
    pub fn zero(currency: &str) -> Result<Self, ValidationError> {
        Self::new(0, currency)
    }

    pub fn is_negative(&self) -> bool {
        self.amount < 0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        write!(
            f,
            "{sign}{}.{:02} {}",
            abs / 100,
            abs % 100,
            self.currency.to_uppercase()
        )
    }
}
