//! Token symbols and amounts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Token amount in minimal units. Never negative; arithmetic saturates or is
/// checked by the caller.
pub type Amount = u128;

/// Maximum supported precision of a token symbol.
pub const MAX_PRECISION: u8 = 18;

/// Errors that can occur when parsing a token symbol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolError {
    #[error("symbol code must be 1..=7 uppercase ASCII letters, got {0:?}")]
    InvalidCode(String),
    #[error("precision {0} exceeds maximum of {MAX_PRECISION}")]
    PrecisionTooLarge(u8),
    #[error("symbol must be written as `<precision>,<CODE>`, got {0:?}")]
    Malformed(String),
}

/// Token symbol: upper-case code plus display precision (e.g. `4,SNAX`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenSymbol {
    code: String,
    precision: u8,
}

impl TokenSymbol {
    pub fn new(code: impl Into<String>, precision: u8) -> Result<Self, SymbolError> {
        let code = code.into();
        if code.is_empty() || code.len() > 7 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(SymbolError::InvalidCode(code));
        }
        if precision > MAX_PRECISION {
            return Err(SymbolError::PrecisionTooLarge(precision));
        }
        Ok(Self { code, precision })
    }

    /// Build a symbol known at compile time.
    ///
    /// # Panics
    /// Panics if the code or precision is invalid.
    pub fn from_static(code: &'static str, precision: u8) -> Self {
        match Self::new(code, precision) {
            Ok(symbol) => symbol,
            Err(err) => panic!("invalid static token symbol {code:?}: {err}"),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    /// Minimal units per whole token (`10^precision`).
    pub fn unit(&self) -> Amount {
        10u128.pow(u32::from(self.precision))
    }
}

impl fmt::Display for TokenSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

impl FromStr for TokenSymbol {
    type Err = SymbolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (precision, code) = s
            .split_once(',')
            .ok_or_else(|| SymbolError::Malformed(s.to_string()))?;
        let precision = precision
            .trim()
            .parse::<u8>()
            .map_err(|_| SymbolError::Malformed(s.to_string()))?;
        Self::new(code.trim(), precision)
    }
}

impl TryFrom<String> for TokenSymbol {
    type Error = SymbolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TokenSymbol> for String {
    fn from(value: TokenSymbol) -> Self {
        value.to_string()
    }
}

/// An amount tagged with its token symbol.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub amount: Amount,
    pub symbol: TokenSymbol,
}

impl Asset {
    pub fn new(amount: Amount, symbol: TokenSymbol) -> Self {
        Self { amount, symbol }
    }

    pub fn zero(symbol: TokenSymbol) -> Self {
        Self { amount: 0, symbol }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.symbol.unit();
        if self.symbol.precision == 0 {
            write!(f, "{} {}", self.amount, self.symbol.code)
        } else {
            write!(
                f,
                "{}.{:0width$} {}",
                self.amount / unit,
                self.amount % unit,
                self.symbol.code,
                width = usize::from(self.symbol.precision)
            )
        }
    }
}
