use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing a chain account name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountNameError {
    #[error("account name must not be empty")]
    Empty,
    #[error("account name must be at most {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },
    #[error("account name contains invalid character {0:?}")]
    InvalidCharacter(char),
    #[error("account name must not start or end with '.'")]
    DotBoundary,
}

/// Maximum length of a chain account name.
pub const ACCOUNT_NAME_MAX_LEN: usize = 12;

/// Human readable chain account identifier (`[a-z1-5.]{1,12}`).
///
/// Ordering is lexical, which is the order the registered-account table is
/// swept in during payouts.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountName(String);

impl AccountName {
    /// Validate and wrap an account name.
    pub fn new(name: impl Into<String>) -> Result<Self, AccountNameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(AccountNameError::Empty);
        }
        if name.len() > ACCOUNT_NAME_MAX_LEN {
            return Err(AccountNameError::TooLong {
                max: ACCOUNT_NAME_MAX_LEN,
                actual: name.len(),
            });
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !matches!(c, 'a'..='z' | '1'..='5' | '.'))
        {
            return Err(AccountNameError::InvalidCharacter(bad));
        }
        if name.starts_with('.') || name.ends_with('.') {
            return Err(AccountNameError::DotBoundary);
        }
        Ok(Self(name))
    }

    /// Wrap a name known at compile time.
    ///
    /// # Panics
    /// Panics if `name` is not a valid account name.
    pub fn from_static(name: &'static str) -> Self {
        match Self::new(name) {
            Ok(name) => name,
            Err(err) => panic!("invalid static account name {name:?}: {err}"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountName {
    type Err = AccountNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AccountName {
    type Error = AccountNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountName> for String {
    fn from(value: AccountName) -> Self {
        value.0
    }
}

impl AsRef<str> for AccountName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
