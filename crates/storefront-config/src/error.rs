//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading.
///
/// All of them are fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more required variables are unset or blank.
    #[error("missing required environment variables: {}", vars.join(", "))]
    MissingVariables {
        /// Every missing variable name, in declaration order.
        vars: Vec<String>,
    },

    /// A variable is present but its value is unusable.
    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// The variable name.
        field: String,
        /// Explanation of why the value is invalid.
        reason: String,
    },
}

impl ConfigError {
    /// Create a missing variables error.
    pub fn missing_variables<I, S>(vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingVariables {
            vars: vars.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
