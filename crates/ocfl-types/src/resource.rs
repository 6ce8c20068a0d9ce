//! Resource records: headers, content, and the operations staged against them.

use std::fmt;

use bytes::{Buf, Bytes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::ContentDigest;
use crate::id::ResourceId;

/// Classification of a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionModel {
    /// An RDF source (container or description).
    Rdf,
    /// A binary, stored byte for byte.
    NonRdf,
    /// The ACL of an RDF source.
    AclRdf,
    /// The ACL of a binary.
    AclNonRdf,
}

impl InteractionModel {
    pub fn is_acl(&self) -> bool {
        matches!(self, Self::AclRdf | Self::AclNonRdf)
    }

    /// Whether the content of this resource is an RDF serialization.
    pub fn is_rdf(&self) -> bool {
        !matches!(self, Self::NonRdf)
    }
}

impl fmt::Display for InteractionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Rdf => "rdf",
            Self::NonRdf => "non-rdf",
            Self::AclRdf => "acl-rdf",
            Self::AclNonRdf => "acl-non-rdf",
        };
        f.write_str(s)
    }
}

/// Per-resource metadata record.
///
/// Headers are immutable once written into a version; a later version may
/// carry revised headers for the same resource identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHeaders {
    pub id: ResourceId,
    pub interaction_model: InteractionModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Digest of the content. Filled in by the store engine on commit; a
    /// caller-supplied value is checked against the content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_digest: Option<ContentDigest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_size: Option<u64>,
    /// Logical path of the content file within the object, assigned by the
    /// store engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_path: Option<String>,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub deleted: bool,
}

impl ResourceHeaders {
    /// Fresh headers for a resource created now.
    pub fn new(id: ResourceId, interaction_model: InteractionModel) -> Self {
        let now = Utc::now();
        Self {
            id,
            interaction_model,
            mime_type: None,
            content_digest: None,
            content_size: None,
            content_path: None,
            created: now,
            last_modified: now,
            deleted: false,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_digest(mut self, digest: ContentDigest) -> Self {
        self.content_digest = Some(digest);
        self
    }

    /// Headers reflecting the deletion of this resource's content at `at`.
    ///
    /// The content digest, size, and path are cleared; the identity, model,
    /// and creation time are kept.
    pub fn into_deleted(mut self, at: DateTime<Utc>) -> Self {
        self.deleted = true;
        self.last_modified = at;
        self.content_digest = None;
        self.content_size = None;
        self.content_path = None;
        self
    }
}

/// Content bytes paired with the headers needed to interpret them.
///
/// A `ResourceContent` without bytes describes a headers-only resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceContent {
    pub headers: ResourceHeaders,
    pub content: Option<Bytes>,
}

impl ResourceContent {
    pub fn new(headers: ResourceHeaders, content: impl Into<Bytes>) -> Self {
        Self {
            headers,
            content: Some(content.into()),
        }
    }

    pub fn headers_only(headers: ResourceHeaders) -> Self {
        Self {
            headers,
            content: None,
        }
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// The content bytes, if any.
    pub fn bytes(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }

    /// A reader over the content. Cloning `Bytes` is cheap, so the record
    /// stays usable.
    pub fn reader(&self) -> Option<impl std::io::Read> {
        self.content.clone().map(Buf::reader)
    }
}

/// A pending mutation of one resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceOperation {
    /// Write content and headers, tagged with the interaction model so the
    /// engine can apply model-specific placement.
    Write {
        model: InteractionModel,
        content: ResourceContent,
    },
    /// Remove the content file and keep the supplied headers.
    DeleteContent { headers: ResourceHeaders },
    /// Remove the headers file. Only valid once no content remains.
    DeleteHeaders,
}

impl ResourceOperation {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Write { .. } => "write",
            Self::DeleteContent { .. } => "delete-content",
            Self::DeleteHeaders => "delete-headers",
        }
    }

    /// Headers this operation leaves behind, if any.
    pub fn headers(&self) -> Option<&ResourceHeaders> {
        match self {
            Self::Write { content, .. } => Some(&content.headers),
            Self::DeleteContent { headers } => Some(headers),
            Self::DeleteHeaders => None,
        }
    }

    /// Whether the resource still has content after this operation.
    pub fn leaves_content(&self) -> bool {
        matches!(self, Self::Write { content, .. } if content.has_content())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    fn rid(s: &str) -> ResourceId {
        ResourceId::new(s).unwrap()
    }

    #[test]
    fn acl_models() {
        assert!(InteractionModel::AclRdf.is_acl());
        assert!(InteractionModel::AclNonRdf.is_acl());
        assert!(!InteractionModel::Rdf.is_acl());
        assert!(!InteractionModel::NonRdf.is_rdf());
        assert!(InteractionModel::AclNonRdf.is_rdf());
    }

    #[test]
    fn deleted_headers_clear_content_fields() {
        let headers = ResourceHeaders::new(rid("/obj1/file1"), InteractionModel::NonRdf)
            .with_digest(ContentDigest::of(b"x"));
        let created = headers.created;
        let later = created + chrono::Duration::seconds(5);
        let deleted = headers.into_deleted(later);
        assert!(deleted.deleted);
        assert_eq!(deleted.created, created);
        assert_eq!(deleted.last_modified, later);
        assert!(deleted.content_digest.is_none());
    }

    #[test]
    fn content_reader_yields_bytes() {
        let headers = ResourceHeaders::new(rid("/obj1/file1"), InteractionModel::NonRdf);
        let content = ResourceContent::new(headers, vec![0x01, 0x02]);
        let mut buf = Vec::new();
        content.reader().unwrap().read_to_end(&mut buf).unwrap();
        assert_eq!(buf, vec![0x01, 0x02]);
        assert!(content.has_content());
    }

    #[test]
    fn operation_content_tracking() {
        let headers = ResourceHeaders::new(rid("/obj1/a"), InteractionModel::Rdf);
        let write = ResourceOperation::Write {
            model: InteractionModel::Rdf,
            content: ResourceContent::new(headers.clone(), "<> a <T> ."),
        };
        assert!(write.leaves_content());
        assert_eq!(write.name(), "write");

        let headers_only = ResourceOperation::Write {
            model: InteractionModel::Rdf,
            content: ResourceContent::headers_only(headers.clone()),
        };
        assert!(!headers_only.leaves_content());

        let delete = ResourceOperation::DeleteContent { headers };
        assert!(!delete.leaves_content());
        assert!(delete.headers().is_some());
        assert!(ResourceOperation::DeleteHeaders.headers().is_none());
    }

    #[test]
    fn headers_json_roundtrip() {
        let headers = ResourceHeaders::new(rid("/obj1/file1"), InteractionModel::AclRdf)
            .with_mime_type("text/turtle");
        let json = serde_json::to_string(&headers).unwrap();
        let parsed: ResourceHeaders = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, headers);
    }
}
