//! Correlation ids for log correlation across a retry sequence.
//!
//! One id is established before the first attempt and threaded by value
//! through every re-attempt, the exhaustion record, and the final outcome.
//! There is no ambient lookup: each sequence owns its copy, so concurrent
//! sequences can never observe each other's id.

use std::fmt;

use uuid::Uuid;

/// Opaque identifier, stable across all attempts of one publish sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Freshly generated id, used when the caller does not supply one.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
