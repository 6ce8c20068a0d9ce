//! Placement rules mapping resource identifiers to logical paths inside an
//! object.
//!
//! - Non-RDF content lives at the resource's own path.
//! - RDF content lives at `<path>/fcr-container.nt`.
//! - The ACL of an RDF source lives at `<protected path>/fcr-acl.nt`.
//! - The ACL of a binary lives beside it at `<binary path>~fcr-acl.nt`, since
//!   the binary's own path is a file.
//! - Headers live at `.fcrepo/<path>.json`.
//!
//! Path segments are percent-encoded so that no identifier can escape the
//! object root or collide with the `.fcrepo` directory.

use ocfl_types::{InteractionModel, ResourceId};

/// File name of RDF container content.
pub const RDF_CONTENT_FILE: &str = "fcr-container.nt";
/// File name of ACL content.
pub const ACL_CONTENT_FILE: &str = "fcr-acl.nt";
/// Suffix appended to a binary's path for its ACL.
pub const BINARY_ACL_SUFFIX: &str = "~fcr-acl.nt";
/// Directory holding headers files.
pub const HEADERS_DIR: &str = ".fcrepo";

/// Stateless placement rules shared by every engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContentLayout;

impl ContentLayout {
    /// Logical path of the content file for `id` under the given model.
    pub fn content_path(id: &ResourceId, model: InteractionModel) -> String {
        match model {
            InteractionModel::NonRdf => Self::encode(id.as_str()),
            InteractionModel::Rdf => join(&Self::encode(id.as_str()), RDF_CONTENT_FILE),
            InteractionModel::AclRdf => {
                let target = id.acl_target().unwrap_or(id.as_str());
                join(&Self::encode(target), ACL_CONTENT_FILE)
            }
            InteractionModel::AclNonRdf => {
                let target = id.acl_target().unwrap_or(id.as_str());
                format!("{}{BINARY_ACL_SUFFIX}", Self::encode(target))
            }
        }
    }

    /// Logical path of the headers file for `id`.
    pub fn headers_path(id: &ResourceId) -> String {
        let encoded = Self::encode(id.as_str());
        if encoded.is_empty() {
            format!("{HEADERS_DIR}/root.json")
        } else {
            format!("{HEADERS_DIR}/{encoded}.json")
        }
    }

    /// Encode an identifier as a relative path of safe segments.
    pub fn encode(id: &str) -> String {
        id.split('/')
            .filter(|segment| !segment.is_empty())
            .map(encode_segment)
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn join(base: &str, file: &str) -> String {
    if base.is_empty() {
        file.to_string()
    } else {
        format!("{base}/{file}")
    }
}

fn encode_segment(segment: &str) -> String {
    if segment == "." || segment == ".." {
        return segment.replace('.', "%2E");
    }
    let mut out = String::with_capacity(segment.len());
    for (i, byte) in segment.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric()
            || matches!(byte, b'-' | b'_')
            || (byte == b'.' && i > 0);
        if keep {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(s: &str) -> ResourceId {
        ResourceId::new(s).unwrap()
    }

    #[test]
    fn non_rdf_uses_own_path() {
        assert_eq!(
            ContentLayout::content_path(&rid("/obj1/file1"), InteractionModel::NonRdf),
            "obj1/file1"
        );
    }

    #[test]
    fn rdf_and_acl_placement() {
        assert_eq!(
            ContentLayout::content_path(&rid("/obj1"), InteractionModel::Rdf),
            "obj1/fcr-container.nt"
        );
        assert_eq!(
            ContentLayout::content_path(&rid("/obj1/fcr:acl"), InteractionModel::AclRdf),
            "obj1/fcr-acl.nt"
        );
    }

    #[test]
    fn binary_acl_sits_beside_the_binary() {
        let binary = ContentLayout::content_path(&rid("/obj1/file1"), InteractionModel::NonRdf);
        let acl =
            ContentLayout::content_path(&rid("/obj1/file1/fcr:acl"), InteractionModel::AclNonRdf);
        assert_eq!(acl, "obj1/file1~fcr-acl.nt");
        assert!(!acl.starts_with(&format!("{binary}/")));
    }

    #[test]
    fn tilde_in_identifiers_cannot_forge_a_sidecar() {
        assert_eq!(
            ContentLayout::content_path(&rid("/obj1/file1~fcr-acl.nt"), InteractionModel::NonRdf),
            "obj1/file1%7Efcr-acl.nt"
        );
    }

    #[test]
    fn headers_path() {
        assert_eq!(
            ContentLayout::headers_path(&rid("/obj1/file1")),
            ".fcrepo/obj1/file1.json"
        );
        assert_eq!(ContentLayout::headers_path(&rid("/")), ".fcrepo/root.json");
    }

    #[test]
    fn traversal_and_hidden_segments_are_encoded() {
        assert_eq!(ContentLayout::encode("/a/../b"), "a/%2E%2E/b");
        assert_eq!(ContentLayout::encode("/.fcrepo/x"), "%2Efcrepo/x");
        assert_eq!(ContentLayout::encode("/a b/c:d"), "a%20b/c%3Ad");
        assert_eq!(ContentLayout::encode("/file.txt"), "file.txt");
    }
}
