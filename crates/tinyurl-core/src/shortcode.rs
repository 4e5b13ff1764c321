use crate::base62;
use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::Display;
use std::hash::{Hash, Hasher};

/// A base62 short code, guaranteed to decode to a record id.
///
/// Codes that differ only by leading `a` symbols (`"aab"` and `"b"`) name
/// the same record and compare equal; the text is kept as written.
#[derive(Clone, Debug)]
pub struct ShortCode {
    code: SmolStr,
    id: u64,
}

impl ShortCode {
    /// Creates the short code for a record id.
    pub fn from_id(id: u64) -> Self {
        Self {
            code: SmolStr::new(base62::encode(id)),
            id,
        }
    }

    /// Parses user input, rejecting anything that is not a base62 numeral.
    pub fn parse(code: &str) -> std::result::Result<Self, CodecError> {
        let id = base62::decode(code)?;
        Ok(Self {
            code: SmolStr::new(code),
            id,
        })
    }

    /// The record id this code stands for.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.code
    }

    /// Builds the public short URL. The domain carries its own trailing
    /// separator, nothing is inserted between the two.
    pub fn to_url(&self, domain: &str) -> String {
        format!("{domain}{}", self.code)
    }
}

impl PartialEq for ShortCode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ShortCode {}

impl Hash for ShortCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.code)
    }
}

impl Serialize for ShortCode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.code.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ShortCode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code = SmolStr::deserialize(deserializer)?;
        ShortCode::parse(&code).map_err(serde::de::Error::custom)
    }
}
