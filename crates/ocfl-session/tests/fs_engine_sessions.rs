mod common;

use std::sync::Arc;

use common::{binary, container, content, oid, rid};
use ocfl_session::{
    DefaultSessionFactory, OcflObjectSessionFactory, SessionConfig, SessionError, SessionState,
};
use ocfl_store::{FsStoreEngine, StoreEngine, StoreError};
use ocfl_types::{InteractionModel, VersionNum};

fn fs_factory(root: &std::path::Path) -> (Arc<FsStoreEngine>, DefaultSessionFactory) {
    let engine = Arc::new(FsStoreEngine::open(root).unwrap());
    let factory = DefaultSessionFactory::new(engine.clone(), SessionConfig::default());
    (engine, factory)
}

#[test]
fn committed_versions_survive_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    {
        let (_, factory) = fs_factory(dir.path());
        let session = factory.new_session(&oid("info:fedora/obj1")).unwrap();
        session
            .write_rdf_resource(container("/obj1", "<> <http://purl.org/dc/terms/title> \"t\" ."))
            .unwrap();
        session
            .write_non_rdf_resource(binary("/obj1/file1", &[0x01, 0x02]))
            .unwrap();
        session.version_message("initial import").unwrap();
        assert_eq!(session.commit().unwrap(), Some(VersionNum::initial()));
    }

    let (engine, factory) = fs_factory(dir.path());
    assert_eq!(
        engine.current_version(&oid("info:fedora/obj1")).unwrap(),
        Some(VersionNum::initial())
    );
    let reader = factory.new_session(&oid("info:fedora/obj1")).unwrap();
    let found = reader.read_content(&rid("/obj1/file1")).unwrap();
    assert_eq!(found.bytes().unwrap().as_ref(), &[0x01, 0x02]);
    assert_eq!(found.headers.content_size, Some(2));
    let versions = reader.list_versions().unwrap();
    assert_eq!(versions[0].info.message.as_deref(), Some("initial import"));
    assert_eq!(versions[0].resource_count, 2);
}

#[test]
fn aborted_session_writes_nothing_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, factory) = fs_factory(dir.path());
    let session = factory.new_session(&oid("obj1")).unwrap();
    session.write_non_rdf_resource(binary("/obj1/a", b"a")).unwrap();
    session.abort().unwrap();

    assert!(!engine.object_root(&oid("obj1")).exists());
    assert_eq!(engine.current_version(&oid("obj1")).unwrap(), None);
}

#[test]
fn failed_commit_leaves_previous_version_intact() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, factory) = fs_factory(dir.path());
    let setup = factory.new_session(&oid("obj1")).unwrap();
    setup.write_non_rdf_resource(binary("/obj1/a", b"a")).unwrap();
    setup.commit().unwrap();
    let inventory_before = engine.load_inventory(&oid("obj1")).unwrap();

    let session = factory.new_session(&oid("obj1")).unwrap();
    let mut bad = binary("/obj1/b", b"actual");
    bad.headers.content_digest = Some(ocfl_types::ContentDigest::of(b"claimed"));
    session.write_non_rdf_resource(bad).unwrap();
    assert!(matches!(
        session.commit(),
        Err(SessionError::Store(StoreError::DigestMismatch { .. }))
    ));

    assert_eq!(engine.load_inventory(&oid("obj1")).unwrap(), inventory_before);
    assert!(!engine.object_root(&oid("obj1")).join("v2").exists());
    assert!(session.is_open());
}

#[test]
fn corrupt_inventory_aborts_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, factory) = fs_factory(dir.path());
    let setup = factory.new_session(&oid("obj1")).unwrap();
    setup.write_non_rdf_resource(binary("/obj1/a", b"a")).unwrap();
    setup.commit().unwrap();

    let session = factory.new_session(&oid("obj1")).unwrap();
    session.write_non_rdf_resource(binary("/obj1/b", b"b")).unwrap();
    std::fs::write(
        engine.object_root(&oid("obj1")).join("inventory.json"),
        b"{ not json",
    )
    .unwrap();

    let err = session.commit().unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(session.state(), SessionState::Aborted);
    assert!(factory.existing_session(session.session_id()).is_none());
}

#[test]
fn two_factories_on_one_root_still_detect_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    let (_, left) = fs_factory(dir.path());
    let (engine, right) = fs_factory(dir.path());

    let a = left.new_session(&oid("obj1")).unwrap();
    let b = right.new_session(&oid("obj1")).unwrap();
    a.write_non_rdf_resource(binary("/obj1/a", b"left")).unwrap();
    b.write_non_rdf_resource(binary("/obj1/a", b"right")).unwrap();

    a.commit().unwrap();
    assert!(matches!(b.commit(), Err(SessionError::CommitConflict { .. })));
    let head = engine
        .read_content(&oid("obj1"), &rid("/obj1/a"), None)
        .unwrap()
        .unwrap();
    assert_eq!(head.bytes().unwrap().as_ref(), b"left");
}

#[test]
fn binary_and_its_acl_commit_together() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, factory) = fs_factory(dir.path());
    let session = factory.new_session(&oid("obj1")).unwrap();
    session
        .write_non_rdf_resource(binary("/obj1/file1", &[0x01, 0x02]))
        .unwrap();
    session
        .write_acl_non_rdf_resource(content(
            "/obj1/file1/fcr:acl",
            InteractionModel::AclNonRdf,
            b"<#auth> a <http://www.w3.org/ns/auth/acl#Authorization> .",
        ))
        .unwrap();
    assert_eq!(session.commit().unwrap(), Some(VersionNum::initial()));

    let root = engine.object_root(&oid("obj1"));
    assert!(root.join("v1/content/obj1/file1").is_file());
    assert!(root.join("v1/content/obj1/file1~fcr-acl.nt").is_file());

    let reader = factory.new_session(&oid("obj1")).unwrap();
    let binary = reader.read_content(&rid("/obj1/file1")).unwrap();
    assert_eq!(binary.bytes().unwrap().as_ref(), &[0x01, 0x02]);
    let acl = reader.read_content(&rid("/obj1/file1/fcr:acl")).unwrap();
    assert_eq!(acl.headers.interaction_model, InteractionModel::AclNonRdf);
    assert!(acl.has_content());
}
