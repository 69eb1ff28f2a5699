//! Payout destination address.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from destination address validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("destination address is empty")]
    Empty,

    #[error("destination address too short ({0} chars, minimum {min})", min = DestAddress::MIN_LEN)]
    TooShort(usize),

    #[error("destination address too long ({0} chars, maximum {max})", max = DestAddress::MAX_LEN)]
    TooLong(usize),

    #[error("destination address contains whitespace")]
    Whitespace,
}

/// An externally-owned address that payouts are sent to.
///
/// The ledger treats it as opaque: it is validated for shape on entry and
/// otherwise passed through verbatim to the transfer collaborator, which owns
/// any chain-specific checksum rules.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DestAddress(String);

impl DestAddress {
    pub const MIN_LEN: usize = 3;
    pub const MAX_LEN: usize = 128;

    /// Validate and construct an address from raw input.
    ///
    /// Leading and trailing whitespace is trimmed; internal whitespace is an
    /// error.
    pub fn parse(raw: impl Into<String>) -> Result<Self, AddressError> {
        let s = raw.into();
        let s = s.trim();
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        if s.len() < Self::MIN_LEN {
            return Err(AddressError::TooShort(s.len()));
        }
        if s.len() > Self::MAX_LEN {
            return Err(AddressError::TooLong(s.len()));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(AddressError::Whitespace);
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
