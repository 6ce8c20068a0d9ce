//! Filesystem-backed store engine.
//!
//! Layout under the storage root:
//!
//! ```text
//! <root>/<hex(object id)>/inventory.json        current inventory
//! <root>/<hex(object id)>/v1/inventory.json     inventory as sealed by v1
//! <root>/<hex(object id)>/v1/content/<path>     content introduced by v1
//! <root>/<hex(object id)>/v2/...
//! ```
//!
//! A new version is assembled in a temporary `.staging-*` directory inside
//! the object root, renamed to `vN`, and only then published by atomically
//! replacing the root `inventory.json`. A crash or error before that last
//! step leaves the previous head untouched; a leftover `vN` directory that
//! the inventory does not reference is discarded by the next commit.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bytes::Bytes;
use tracing::{debug, warn};

use ocfl_types::{ContentDigest, OcflObjectId, ResourceContent, ResourceHeaders, ResourceId, VersionNum};

use crate::error::{StoreError, StoreResult};
use crate::inventory::{prepare_version, Inventory, PendingVersion};
use crate::traits::StoreEngine;
use crate::version::{VersionDetails, VersionRequest};

const INVENTORY_FILE: &str = "inventory.json";
const CONTENT_DIR: &str = "content";
const STAGING_PREFIX: &str = ".staging-";

/// Store engine persisting objects as version directories on disk.
#[derive(Debug)]
pub struct FsStoreEngine {
    root: PathBuf,
    /// Serializes writers within this process.
    write_lock: Mutex<()>,
}

impl FsStoreEngine {
    /// Open (or create) a storage root.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "filesystem store opened");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one object.
    pub fn object_root(&self, object_id: &OcflObjectId) -> PathBuf {
        self.root.join(hex::encode(object_id.as_str()))
    }

    /// Load the current inventory of an object.
    pub fn load_inventory(&self, object_id: &OcflObjectId) -> StoreResult<Option<Inventory>> {
        let path = self.object_root(object_id).join(INVENTORY_FILE);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let inventory: Inventory =
            serde_json::from_slice(&data).map_err(|e| StoreError::CorruptObject {
                object: object_id.clone(),
                reason: format!("unreadable inventory: {e}"),
            })?;
        if &inventory.id != object_id {
            return Err(StoreError::CorruptObject {
                object: object_id.clone(),
                reason: format!("inventory belongs to {}", inventory.id),
            });
        }
        inventory.validate()?;
        Ok(Some(inventory))
    }

    fn write_version(
        &self,
        object_root: &Path,
        inventory: &Inventory,
        pending: &PendingVersion,
    ) -> StoreResult<()> {
        fs::create_dir_all(object_root)?;
        let version_dir = object_root.join(pending.number.to_string());
        if version_dir.exists() {
            warn!(path = %version_dir.display(), "discarding unreferenced version directory");
            fs::remove_dir_all(&version_dir)?;
        }

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(object_root)?;

        let version_prefix = format!("{}/", pending.number);
        for new in &pending.new_content {
            let relative = new
                .stored_path
                .strip_prefix(&version_prefix)
                .unwrap_or(&new.stored_path);
            let target = staging.path().join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(&target)?;
            file.write_all(&new.bytes)?;
            file.sync_all()?;
        }

        let serialized = serialize_inventory(inventory)?;
        fs::write(staging.path().join(INVENTORY_FILE), &serialized)?;

        // Once renamed, the staging guard's cleanup finds nothing to remove.
        fs::rename(staging.path(), &version_dir)?;

        let mut published = tempfile::NamedTempFile::new_in(object_root)?;
        published.write_all(&serialized)?;
        published.as_file().sync_all()?;
        published
            .persist(object_root.join(INVENTORY_FILE))
            .map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    fn read_stored(
        &self,
        inventory: &Inventory,
        digest: &ContentDigest,
    ) -> StoreResult<Bytes> {
        let stored_path = inventory.stored_path(digest)?;
        let path = self.object_root(&inventory.id).join(stored_path);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::CorruptObject {
                    object: inventory.id.clone(),
                    reason: format!("content file {stored_path} missing"),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let computed = ContentDigest::of(&data);
        if computed != *digest {
            return Err(StoreError::HashMismatch {
                path: stored_path.to_string(),
                expected: *digest,
                computed,
            });
        }
        Ok(Bytes::from(data))
    }
}

fn serialize_inventory(inventory: &Inventory) -> StoreResult<Vec<u8>> {
    serde_json::to_vec_pretty(inventory).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl StoreEngine for FsStoreEngine {
    fn current_version(&self, object_id: &OcflObjectId) -> StoreResult<Option<VersionNum>> {
        Ok(self.load_inventory(object_id)?.map(|inv| inv.head))
    }

    fn materialize_version(&self, request: &VersionRequest) -> StoreResult<VersionNum> {
        let _guard = self.write_lock.lock().expect("lock poisoned");

        let current = self.load_inventory(&request.object_id)?;
        let pending = prepare_version(current.as_ref(), request)?;
        let next = match current {
            Some(mut inventory) => {
                inventory.seal(&pending);
                inventory
            }
            None => Inventory::genesis(request.object_id.clone(), &pending),
        };

        let object_root = self.object_root(&request.object_id);
        self.write_version(&object_root, &next, &pending)?;

        debug!(
            object = %request.object_id,
            version = %pending.number,
            new_files = pending.new_content.len(),
            "version sealed"
        );
        Ok(pending.number)
    }

    fn read_headers(
        &self,
        object_id: &OcflObjectId,
        resource_id: &ResourceId,
        version: Option<VersionNum>,
    ) -> StoreResult<Option<ResourceHeaders>> {
        match self.load_inventory(object_id)? {
            Some(inventory) => Ok(inventory.headers(resource_id, version)?.cloned()),
            None => Ok(None),
        }
    }

    fn read_content(
        &self,
        object_id: &OcflObjectId,
        resource_id: &ResourceId,
        version: Option<VersionNum>,
    ) -> StoreResult<Option<ResourceContent>> {
        let Some(inventory) = self.load_inventory(object_id)? else {
            return Ok(None);
        };
        let Some(headers) = inventory.headers(resource_id, version)? else {
            return Ok(None);
        };
        let content = match (headers.deleted, headers.content_digest, &headers.content_path) {
            (false, Some(digest), Some(_)) => Some(self.read_stored(&inventory, &digest)?),
            _ => None,
        };
        Ok(Some(ResourceContent {
            headers: headers.clone(),
            content,
        }))
    }

    fn list_versions(&self, object_id: &OcflObjectId) -> StoreResult<Vec<VersionDetails>> {
        Ok(self
            .load_inventory(object_id)?
            .map(|inv| inv.details())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionInfo;
    use chrono::Utc;
    use ocfl_types::{InteractionModel, ResourceOperation};

    fn oid(s: &str) -> OcflObjectId {
        OcflObjectId::new(s).unwrap()
    }

    fn rid(s: &str) -> ResourceId {
        ResourceId::new(s).unwrap()
    }

    fn write_request(base: Option<VersionNum>, resource: &str, bytes: &[u8]) -> VersionRequest {
        let headers = ResourceHeaders::new(rid(resource), InteractionModel::NonRdf)
            .with_mime_type("application/octet-stream");
        VersionRequest::new(
            oid("obj1"),
            base,
            VersionInfo::new(Utc::now()).with_message("test"),
        )
        .with_operation(
            rid(resource),
            ResourceOperation::Write {
                model: InteractionModel::NonRdf,
                content: ResourceContent::new(headers, bytes.to_vec()),
            },
        )
    }

    #[test]
    fn versions_land_in_their_own_directories() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FsStoreEngine::open(dir.path()).unwrap();
        let v1 = engine
            .materialize_version(&write_request(None, "/obj1/file1", &[1, 2]))
            .unwrap();
        let v2 = engine
            .materialize_version(&write_request(Some(v1), "/obj1/file2", b"second"))
            .unwrap();

        let root = engine.object_root(&oid("obj1"));
        assert!(root.join("v1/content/obj1/file1").is_file());
        assert!(root.join("v2/content/obj1/file2").is_file());
        assert!(root.join("v1/inventory.json").is_file());
        assert_eq!(engine.current_version(&oid("obj1")).unwrap(), Some(v2));

        let content = engine
            .read_content(&oid("obj1"), &rid("/obj1/file1"), None)
            .unwrap()
            .unwrap();
        assert_eq!(content.content.as_deref(), Some(&[1u8, 2][..]));
        assert_eq!(content.headers.content_digest, Some(ContentDigest::of(&[1, 2])));

        let history = engine.list_versions(&oid("obj1")).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].info.message.as_deref(), Some("test"));
    }

    #[test]
    fn binary_and_its_acl_share_one_version() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FsStoreEngine::open(dir.path()).unwrap();
        let acl_id = rid("/obj1/file1/fcr:acl");
        let acl_headers = ResourceHeaders::new(acl_id.clone(), InteractionModel::AclNonRdf);
        let request = write_request(None, "/obj1/file1", b"binary").with_operation(
            acl_id.clone(),
            ResourceOperation::Write {
                model: InteractionModel::AclNonRdf,
                content: ResourceContent::new(
                    acl_headers,
                    b"<#auth> a <http://www.w3.org/ns/auth/acl#Authorization> .".to_vec(),
                ),
            },
        );
        engine.materialize_version(&request).unwrap();

        let root = engine.object_root(&oid("obj1"));
        assert!(root.join("v1/content/obj1/file1").is_file());
        assert!(root.join("v1/content/obj1/file1~fcr-acl.nt").is_file());
        let acl = engine
            .read_content(&oid("obj1"), &acl_id, None)
            .unwrap()
            .unwrap();
        assert!(acl.content.is_some());
        let binary = engine
            .read_content(&oid("obj1"), &rid("/obj1/file1"), None)
            .unwrap()
            .unwrap();
        assert_eq!(binary.content.as_deref(), Some(&b"binary"[..]));
    }

    #[test]
    fn no_staging_directories_survive() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FsStoreEngine::open(dir.path()).unwrap();
        engine
            .materialize_version(&write_request(None, "/obj1/file1", b"x"))
            .unwrap();
        let leftovers: Vec<_> = fs::read_dir(engine.object_root(&oid("obj1")))
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn conflict_leaves_head_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FsStoreEngine::open(dir.path()).unwrap();
        engine
            .materialize_version(&write_request(None, "/obj1/file1", b"x"))
            .unwrap();
        let err = engine
            .materialize_version(&write_request(None, "/obj1/file1", b"y"))
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(!engine.object_root(&oid("obj1")).join("v2").exists());
    }

    #[test]
    fn tampered_content_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FsStoreEngine::open(dir.path()).unwrap();
        engine
            .materialize_version(&write_request(None, "/obj1/file1", b"original"))
            .unwrap();
        let path = engine
            .object_root(&oid("obj1"))
            .join("v1/content/obj1/file1");
        fs::write(&path, b"tampered").unwrap();

        let err = engine
            .read_content(&oid("obj1"), &rid("/obj1/file1"), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::HashMismatch { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn unreadable_inventory_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FsStoreEngine::open(dir.path()).unwrap();
        engine
            .materialize_version(&write_request(None, "/obj1/file1", b"x"))
            .unwrap();
        fs::write(
            engine.object_root(&oid("obj1")).join(INVENTORY_FILE),
            b"{ not json",
        )
        .unwrap();
        let err = engine.current_version(&oid("obj1")).unwrap_err();
        assert!(matches!(err, StoreError::CorruptObject { .. }));
    }

    #[test]
    fn orphaned_version_directory_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FsStoreEngine::open(dir.path()).unwrap();
        let root = engine.object_root(&oid("obj1"));
        fs::create_dir_all(root.join("v1/content")).unwrap();
        fs::write(root.join("v1/content/junk"), b"junk").unwrap();

        engine
            .materialize_version(&write_request(None, "/obj1/file1", b"x"))
            .unwrap();
        assert!(!root.join("v1/content/junk").exists());
        assert!(root.join("v1/content/obj1/file1").is_file());
    }
}
