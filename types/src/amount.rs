//! Money types for the reward ledger.
//!
//! Amounts are fixed-point integers to avoid floating-point errors. Platform
//! currency is held in micro-units (1 unit = 1_000_000 micros); the payout
//! destination asset is held in nano-units (1 coin = 1_000_000_000 nanos).
//! Floats appear only at the price-quote parse boundary (`Rate::from_f64`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

fn fmt_fixed(raw: u64, scale: u64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let digits = scale.ilog10() as usize;
    let whole = raw / scale;
    let mut frac = format!("{:0width$}", raw % scale, width = digits);
    while frac.len() > 2 && frac.ends_with('0') {
        frac.pop();
    }
    write!(f, "{}.{}", whole, frac)
}

/// Platform currency amount in micro-units.
///
/// Balances, rewards and payout amounts all use this type. Arithmetic that can
/// fail goes through the checked methods; the operator impls are for contexts
/// where overflow has already been ruled out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Self = Self(0);

    /// Micro-units per whole currency unit.
    pub const MICROS_PER_UNIT: u64 = 1_000_000;

    pub fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    /// Whole currency units, e.g. `from_units(5)` is 5.00.
    pub fn from_units(units: u64) -> Self {
        Self(units * Self::MICROS_PER_UNIT)
    }

    pub fn micros(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_fixed(self.0, Self::MICROS_PER_UNIT, f)
    }
}

/// Destination asset amount in nano-units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoinAmount(u64);

impl CoinAmount {
    pub const ZERO: Self = Self(0);

    /// Nano-units per whole coin.
    pub const NANOS_PER_COIN: u64 = 1_000_000_000;

    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub fn nanos(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for CoinAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_fixed(self.0, Self::NANOS_PER_COIN, f)
    }
}

/// Exchange rate: micro-units of platform currency per one destination coin.
///
/// A rate only exists if it is strictly positive; quotes of zero or less are
/// rejected at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rate(u64);

impl Rate {
    pub fn from_micros(micros: u64) -> Option<Self> {
        if micros == 0 {
            None
        } else {
            Some(Self(micros))
        }
    }

    /// Parse a quote expressed in currency units per coin.
    ///
    /// This is the single float boundary of the workspace. Non-finite,
    /// non-positive and out-of-range quotes yield `None`.
    pub fn from_f64(units_per_coin: f64) -> Option<Self> {
        if !units_per_coin.is_finite() || units_per_coin <= 0.0 {
            return None;
        }
        let micros = units_per_coin * Amount::MICROS_PER_UNIT as f64;
        if micros < 1.0 || micros >= u64::MAX as f64 {
            return None;
        }
        Self::from_micros(micros.round() as u64)
    }

    pub fn micros(&self) -> u64 {
        self.0
    }

    /// Convert a platform amount into destination coins at this rate.
    ///
    /// `coins = amount / rate`, computed as nanos with a u128 intermediate and
    /// floor division. `None` if the result does not fit in a `CoinAmount`.
    pub fn convert(&self, amount: Amount) -> Option<CoinAmount> {
        let nanos =
            amount.micros() as u128 * CoinAmount::NANOS_PER_COIN as u128 / self.0 as u128;
        u64::try_from(nanos).ok().map(CoinAmount::from_nanos)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_fixed(self.0, Amount::MICROS_PER_UNIT, f)?;
        write!(f, "/coin")
    }
}
