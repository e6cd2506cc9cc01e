//! Profile configuration error type.
//!
//! Raised at `DialectProfileBuilder::build()` time — before any query is
//! processed — so the developer gets an actionable message instead of a
//! cryptic validation failure later.

use std::fmt;

/// Result type for profile construction.
pub type ProfileResult<T> = Result<T, ProfileConfigError>;

/// A dialect profile was misconfigured.
#[derive(Debug, Clone)]
pub struct ProfileConfigError {
    message: String,
    capability: &'static str,
    requires: &'static str,
}

impl ProfileConfigError {
    /// Creates a dependency error: `capability` was enabled without
    /// `requires`.
    pub fn dependency(capability: &'static str, requires: &'static str) -> Self {
        Self {
            message: format!(
                "{capability}() requires {requires}(). Enable {requires} on the builder, \
                 or drop {capability}."
            ),
            capability,
            requires,
        }
    }

    /// Creates an empty-table-whitelist error.
    pub fn empty_tables() -> Self {
        Self {
            message: "No tables specified. A profile with an empty table whitelist denies \
                      every query."
                .to_string(),
            capability: "tables",
            requires: "at least one table name",
        }
    }

    /// The capability that was misconfigured.
    pub fn capability(&self) -> &'static str {
        self.capability
    }

    /// The unmet dependency.
    pub fn requires(&self) -> &'static str {
        self.requires
    }

    /// Human-readable description.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProfileConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[profile.config] {}", self.message)
    }
}

impl std::error::Error for ProfileConfigError {}
