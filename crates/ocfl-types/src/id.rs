use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Reserved suffix every ACL resource identifier must end with.
pub const ACL_SUFFIX: &str = "/fcr:acl";

fn validate_identifier(value: &str, kind: &str) -> Result<(), TypeError> {
    if value.is_empty() {
        return Err(TypeError::InvalidIdentifier {
            value: value.to_string(),
            reason: format!("{kind} must not be empty"),
        });
    }
    if value.chars().any(char::is_control) {
        return Err(TypeError::InvalidIdentifier {
            value: value.to_string(),
            reason: format!("{kind} must not contain control characters"),
        });
    }
    Ok(())
}

/// Stable external name of a versioned object.
///
/// The same identifier names the object across all of its versions.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OcflObjectId(String);

impl OcflObjectId {
    /// Create an object identifier, rejecting empty or control-character input.
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        validate_identifier(&value, "object id")?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OcflObjectId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OcflObjectId> for String {
    fn from(id: OcflObjectId) -> Self {
        id.0
    }
}

impl fmt::Debug for OcflObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OcflObjectId({})", self.0)
    }
}

impl fmt::Display for OcflObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a resource stored inside an object, e.g. `/obj1/file1`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Create a resource identifier, rejecting empty or control-character input.
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        validate_identifier(&value, "resource id")?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the identifier carries the reserved ACL suffix.
    pub fn is_acl(&self) -> bool {
        self.0.ends_with(ACL_SUFFIX) && self.0.len() > ACL_SUFFIX.len()
    }

    /// The identifier of the resource this ACL protects, if this is an ACL.
    pub fn acl_target(&self) -> Option<&str> {
        if self.is_acl() {
            self.0.strip_suffix(ACL_SUFFIX)
        } else {
            None
        }
    }
}

impl TryFrom<String> for ResourceId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ResourceId {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a session (UUID v7 for time-ordering).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Generate a new time-ordered session ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Parse the hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidIdentifier {
                value: s.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Short representation (first 8 characters of UUID).
    pub fn short_id(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.short_id())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
