use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// Identifier of a remote item (file, folder, template, job, hub, ...).
///
/// Callers frequently send numeric ids; those are accepted and stored in their
/// canonical decimal form so that everything downstream only ever sees strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BoxId(String);

impl BoxId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The id of a user's root folder.
    #[must_use]
    pub fn root() -> Self {
        Self(crate::schema::ROOT_FOLDER_ID.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Returns true when the id is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Default for BoxId {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BoxId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for BoxId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for BoxId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for BoxId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for BoxId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<BoxId> for String {
    fn from(value: BoxId) -> Self {
        value.0
    }
}

struct BoxIdVisitor;

impl Visitor<'_> for BoxIdVisitor {
    type Value = BoxId;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a string or numeric identifier")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
        Ok(BoxId(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<Self::Value, E> {
        Ok(BoxId(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
        Ok(BoxId(value.to_string()))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
        Ok(BoxId(value.to_string()))
    }

    fn visit_i128<E: de::Error>(self, value: i128) -> Result<Self::Value, E> {
        Ok(BoxId(value.to_string()))
    }

    fn visit_u128<E: de::Error>(self, value: u128) -> Result<Self::Value, E> {
        Ok(BoxId(value.to_string()))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
        // serde_json's float formatting keeps the fractional part ("1.0", "2.5").
        serde_json::Number::from_f64(value)
            .map(|number| BoxId(number.to_string()))
            .ok_or_else(|| E::custom("identifier must be a finite number"))
    }
}

impl<'de> Deserialize<'de> for BoxId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(BoxIdVisitor)
    }
}

/// Converts a list of ids into their string forms, preserving order.
#[must_use]
pub fn into_strings(ids: Vec<BoxId>) -> Vec<String> {
    ids.into_iter().map(BoxId::into_string).collect()
}
