// SPDX-License-Identifier: MIT

//! Stable runtime identifiers.
//!
//! Every runtime the daemon hosts gets a 6-hex-character identifier,
//! assigned once at `create` time and persisted alongside the runtime's
//! config. IDs never collide within a daemon's lifetime (checked against
//! the registry on generation) and never change, even across `rename`.

use std::fmt;

const ID_LEN: usize = 6;
const HEX_ALPHABET: [char; 16] =
    ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f'];

/// A 6-hex-character runtime identifier, e.g. `a3f09c`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuntimeId([u8; ID_LEN]);

impl RuntimeId {
    /// Generate a new random identifier.
    pub fn new() -> Self {
        let s = nanoid::nanoid!(ID_LEN, &HEX_ALPHABET);
        // nanoid with a 16-char alphabet and length ID_LEN always yields a
        // valid hex string of the right length; fall back defensively rather
        // than unwrap so a future alphabet change can't panic in production.
        Self::from_str_checked(&s).unwrap_or(Self([b'0'; ID_LEN]))
    }

    /// Parse a 6-hex-character identifier, e.g. when loading persisted config.
    pub fn from_str_checked(s: &str) -> Option<Self> {
        if s.len() != ID_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let mut buf = [0u8; ID_LEN];
        buf.copy_from_slice(s.as_bytes());
        Some(Self(buf))
    }

    pub fn as_str(&self) -> &str {
        // Invariant: only ever constructed from validated ASCII hex bytes.
        std::str::from_utf8(&self.0).unwrap_or("??????")
    }
}

impl Default for RuntimeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RuntimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuntimeId({})", self.as_str())
    }
}

impl fmt::Display for RuntimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RuntimeId {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_checked(s).ok_or_else(|| crate::CoreError::InvalidId(s.to_string()))
    }
}

impl std::borrow::Borrow<str> for RuntimeId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl serde::Serialize for RuntimeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for RuntimeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        Self::from_str_checked(s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid runtime id: {s:?}")))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
