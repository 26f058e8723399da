//! Role name validation policies.

use crate::error::{Error, Result};
use regex::Regex;

/// Default pattern accepted for role names.
pub const DEFAULT_ROLE_NAME_PATTERN: &str = "^[A-Za-z0-9_]+$";

/// Predicate deciding whether a candidate role name is acceptable.
pub trait NameValidator: Send + Sync {
    /// Returns true if `name` may be used as a role name.
    fn is_valid(&self, name: &str) -> bool;
}

impl<F> NameValidator for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_valid(&self, name: &str) -> bool {
        self(name)
    }
}

/// Validator that accepts names matching a regular expression.
#[derive(Debug, Clone)]
pub struct PatternValidator {
    pattern: Regex,
}

impl PatternValidator {
    /// Create a validator from a regular expression.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            Error::InvalidConfiguration(format!("Invalid role name pattern '{pattern}': {e}"))
        })?;
        Ok(Self { pattern })
    }

    /// Get the pattern source.
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Default for PatternValidator {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_ROLE_NAME_PATTERN)
                .expect("default role name pattern is valid"),
        }
    }
}

impl NameValidator for PatternValidator {
    fn is_valid(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }
}
