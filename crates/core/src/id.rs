//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Product code: the integer primary key of a product.
///
/// Codes are assigned by the caller (spreadsheet or form), never generated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCode(i64);

impl ProductCode {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for ProductCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<i64> for ProductCode {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<ProductCode> for i64 {
    fn from(value: ProductCode) -> Self {
        value.0
    }
}

impl FromStr for ProductCode {
    type Err = DomainError;

    /// Parses a decimal integer, ignoring surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|e| DomainError::invalid_id(format!("ProductCode: {e}")))?;
        Ok(Self(value))
    }
}
