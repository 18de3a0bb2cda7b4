//! Namespaced variable identifiers.
//!
//! A variable key has exactly three segments, `group:theme:name`
//! (e.g. `site:wave:dir`), lowercase alphanumeric plus underscore.
//! Keys are defined at catalog build time and never change.

use crate::error::{EngineError, EngineResult};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A globally unique namespaced variable key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(String);

impl VariableId {
    /// Parse and validate a variable key
    ///
    /// # Errors
    ///
    /// Returns a declaration error if the key is not three non-empty
    /// `:`-separated segments of `[a-z0-9_]`
    pub fn new(key: &str) -> EngineResult<Self> {
        let segments: Vec<&str> = key.split(':').collect();
        if segments.len() != 3 {
            return Err(EngineError::declaration(format!(
                "malformed variable key '{}': expected group:theme:name",
                key
            )));
        }
        for segment in &segments {
            if segment.is_empty()
                || !segment
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            {
                return Err(EngineError::declaration(format!(
                    "malformed variable key '{}': bad segment '{}'",
                    key, segment
                )));
            }
        }
        Ok(Self(key.to_string()))
    }

    /// Get the full key string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Get the group segment
    #[must_use]
    pub fn group(&self) -> &str {
        self.segment(0)
    }

    /// Get the theme segment
    #[must_use]
    pub fn theme(&self) -> &str {
        self.segment(1)
    }

    /// Get the name segment
    #[must_use]
    pub fn name(&self) -> &str {
        self.segment(2)
    }

    fn segment(&self, index: usize) -> &str {
        // Validated at construction: always three segments
        self.0.split(':').nth(index).unwrap_or("")
    }
}

impl FromStr for VariableId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for VariableId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for VariableId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Self::new(&key).map_err(D::Error::custom)
    }
}
