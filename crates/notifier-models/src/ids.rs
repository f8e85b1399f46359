//! Type-safe ID wrappers.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Macro to generate string ID newtypes with common functionality.
macro_rules! define_id {
    ($name:ident) => {
        impl $name {
            /// Creates an ID from an existing string.
            pub fn from_string(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            /// Returns the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Identifier of a tracked service, assigned by the record store.
///
/// The hosted table may hand out integer or UUID keys; both are kept as
/// their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl<'de> Deserialize<'de> for ServiceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Self(n.to_string()),
            Raw::Str(s) => Self(s),
        })
    }
}

define_id!(ServiceId);

/// Short opaque key correlating a button tap with a staged pending action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionToken(String);

define_id!(ActionToken);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_id_from_integer() {
        let id: ServiceId = serde_json::from_str("42").unwrap();
        assert_eq!(id.as_str(), "42");
    }

    #[test]
    fn test_service_id_from_uuid_string() {
        let id: ServiceId =
            serde_json::from_str("\"0b6c1f1e-5c1a-4a57-9c55-3f1b0e0d9a11\"").unwrap();
        assert_eq!(id.to_string(), "0b6c1f1e-5c1a-4a57-9c55-3f1b0e0d9a11");
    }

    #[test]
    fn test_service_id_serializes_as_string() {
        let id = ServiceId::from_string("7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"7\"");
    }
}
