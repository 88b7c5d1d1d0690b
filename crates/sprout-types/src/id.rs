use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque entity identifier. Numeric in the store, a string on the wire
/// (`"id": "42"`), matching the original JSON contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(i64);

impl Id {
    pub fn new(raw: i64) -> Self {
        Id(raw)
    }

    pub fn raw(self) -> i64 {
        self.0
    }

    /// Parse an identifier from its wire form. Malformed input resolves to
    /// `None`; callers surface that as "not found" rather than a parse
    /// error. This is a deliberate branch, not incidental integer parsing.
    pub fn from_param(s: &str) -> Option<Self> {
        s.parse::<i64>().ok().map(Id)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl serde::de::Visitor<'_> for IdVisitor {
            type Value = Id;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a numeric id as a string or integer")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Id, E> {
                v.parse::<i64>()
                    .map(Id)
                    .map_err(|_| E::invalid_value(serde::de::Unexpected::Str(v), &self))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Id, E> {
                Ok(Id(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Id, E> {
                i64::try_from(v)
                    .map(Id)
                    .map_err(|_| E::invalid_value(serde::de::Unexpected::Unsigned(v), &self))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numeric_strings() {
        assert_eq!(Id::from_param("42"), Some(Id::new(42)));
    }

    #[test]
    fn malformed_input_is_absent() {
        assert_eq!(Id::from_param("abc"), None);
        assert_eq!(Id::from_param(""), None);
        assert_eq!(Id::from_param("42x"), None);
    }

    #[test]
    fn integers_beyond_i64_are_rejected() {
        assert_eq!(
            serde_json::from_str::<Id>("9223372036854775807").unwrap(),
            Id::new(i64::MAX)
        );
        // One past i64::MAX arrives as u64 and must not wrap negative
        assert!(serde_json::from_str::<Id>("9223372036854775808").is_err());
        assert!(serde_json::from_str::<Id>("18446744073709551615").is_err());
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&Id::new(7)).unwrap();
        assert_eq!(json, "\"7\"");
        let back: Id = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Id::new(7));
    }
}
