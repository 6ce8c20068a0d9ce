#![allow(dead_code)]

use std::sync::Arc;

use ocfl_session::{DefaultSessionFactory, SessionConfig};
use ocfl_store::InMemoryStoreEngine;
use ocfl_types::{InteractionModel, OcflObjectId, ResourceContent, ResourceHeaders, ResourceId};

pub fn oid(s: &str) -> OcflObjectId {
    OcflObjectId::new(s).unwrap()
}

pub fn rid(s: &str) -> ResourceId {
    ResourceId::new(s).unwrap()
}

pub fn content(id: &str, model: InteractionModel, bytes: &[u8]) -> ResourceContent {
    ResourceContent::new(ResourceHeaders::new(rid(id), model), bytes.to_vec())
}

pub fn binary(id: &str, bytes: &[u8]) -> ResourceContent {
    let headers = ResourceHeaders::new(rid(id), InteractionModel::NonRdf)
        .with_mime_type("application/octet-stream");
    ResourceContent::new(headers, bytes.to_vec())
}

pub fn container(id: &str, triples: &str) -> ResourceContent {
    content(id, InteractionModel::Rdf, triples.as_bytes())
}

pub fn memory_factory() -> (Arc<InMemoryStoreEngine>, DefaultSessionFactory) {
    memory_factory_with(SessionConfig::default())
}

pub fn memory_factory_with(config: SessionConfig) -> (Arc<InMemoryStoreEngine>, DefaultSessionFactory) {
    let engine = Arc::new(InMemoryStoreEngine::new());
    let factory = DefaultSessionFactory::new(engine.clone(), config);
    (engine, factory)
}
