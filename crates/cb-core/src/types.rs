//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types and report requests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A worklog query named no users.
    #[error("at least one user account id is required")]
    MissingUsers,

    /// A required date was not supplied.
    #[error("{field} is required (YYYY-MM-DD)")]
    MissingDate { field: &'static str },

    /// A date was supplied but could not be parsed.
    #[error("invalid {field}: {value} (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },

    /// A status bucket name other than open, uat or closed.
    #[error("invalid status bucket: {value} (expected open, uat or closed)")]
    InvalidBucket { value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated issue key (e.g. `TICK-1`).
    IssueKey, "issue key"
);

define_string_id!(
    /// A validated account identifier of an issue-tracker user.
    ///
    /// Worklog authors and report users are matched on this value.
    AccountId, "account id"
);

/// An issue selected for worklog aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub key: IssueKey,
    /// Issue summary; rendered as `-` when absent or empty.
    pub summary: Option<String>,
}
