// SPDX-License-Identifier: MIT

//! Runtime names: human-chosen, and unique within a daemon. Backed by
//! `SmolStr` so lookups
//! and clones stay cheap for the short ASCII identifiers runtimes
//! normally get (`s1`, `cache-main`, ...).

use smol_str::SmolStr;
use std::borrow::Borrow;
use std::fmt;

use crate::CoreError;

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RuntimeName(SmolStr);

impl RuntimeName {
    /// Validate and construct a runtime name.
    ///
    /// Names must be 1-64 bytes of ASCII alphanumeric, `-`, or `_`, and
    /// must not start with a digit (keeps them distinguishable from
    /// bare 6-hex runtime IDs on the control socket).
    pub fn parse(s: impl AsRef<str>) -> Result<Self, CoreError> {
        let s = s.as_ref();
        let reason = if s.is_empty() {
            Some("name must not be empty")
        } else if s.len() > 64 {
            Some("name must be at most 64 bytes")
        } else if s.as_bytes()[0].is_ascii_digit() {
            Some("name must not start with a digit")
        } else if !s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_') {
            Some("name must be ASCII alphanumeric, '-', or '_'")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(CoreError::InvalidName { name: s.to_string(), reason }),
            None => Ok(Self(SmolStr::new(s))),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Borrow<str> for RuntimeName {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Debug for RuntimeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for RuntimeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
#[path = "name_tests.rs"]
mod tests;
