//! # vts-store
//!
//! Dataset-facing access layer for the Sardonyx versioned dataset store.
//!
//! This crate provides:
//! - The `Datastore` contract: commit, checkout, history, metadata
//! - A direct archive-backed implementation and a caching decorator
//! - Metadata annotation stores (in-memory and filesystem-backed)

pub mod cache;
pub mod datastore;
pub mod metadata;

pub use cache::CachedDatastore;
pub use datastore::{ArchiveDatastore, Datastore, SnapshotMetadata};
pub use metadata::{
    annotation_key, AnnotationDoc, FileSystemMetadataStoreFactory, MetadataStore,
    MetadataStoreFactory, VolatileMetadataStoreFactory,
};
