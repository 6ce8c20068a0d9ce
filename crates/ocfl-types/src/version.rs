use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// OCFL-style version number. Versions start at `v1` and increase by one per
/// commit; the ordering of version numbers is the commit order of an object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionNum(u32);

impl VersionNum {
    /// The first version of every object.
    pub const fn initial() -> Self {
        Self(1)
    }

    /// Create from a raw number. Zero is not a valid version.
    pub fn new(number: u32) -> Result<Self, TypeError> {
        if number == 0 {
            return Err(TypeError::InvalidVersion("v0".into()));
        }
        Ok(Self(number))
    }

    /// The version that follows this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    /// The version that follows `current`, or [`VersionNum::initial`] for a
    /// new object.
    pub fn after(current: Option<VersionNum>) -> Self {
        current.map(|v| v.next()).unwrap_or_else(Self::initial)
    }
}

impl FromStr for VersionNum {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('v')
            .ok_or_else(|| TypeError::InvalidVersion(s.to_string()))?;
        let number: u32 = digits
            .parse()
            .map_err(|_| TypeError::InvalidVersion(s.to_string()))?;
        Self::new(number).map_err(|_| TypeError::InvalidVersion(s.to_string()))
    }
}

impl TryFrom<String> for VersionNum {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionNum> for String {
    fn from(v: VersionNum) -> Self {
        v.to_string()
    }
}

impl fmt::Debug for VersionNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionNum(v{})", self.0)
    }
}

impl fmt::Display for VersionNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// The person or agent a version is attributed to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionAuthor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl VersionAuthor {
    pub fn new(name: impl Into<String>, address: Option<String>) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

impl fmt::Display for VersionAuthor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.address {
            Some(address) => write!(f, "{} <{}>", self.name, address),
            None => f.write_str(&self.name),
        }
    }
}
