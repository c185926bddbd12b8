//! Storage backend abstraction for the gateway.
//!
//! This module defines the traits that abstract over different storage implementations,
//! allowing the gateway to run against MongoDB in production and an in-memory store
//! in tests and local development.
//!
//! # Overview
//!
//! The [`StoreBackend`] trait is a one-call-per-operation async interface. Inputs are
//! already in native form (identifiers coerced) and outputs are raw documents; the
//! [`DocumentStore`](crate::store::DocumentStore) pipeline owns coercion and
//! serialization, so backends never see canonical identifier strings they must interpret.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use serde::Serialize;
use std::fmt::Debug;

use crate::{error::StoreResult, query::FindOptions};

/// Counts reported by a single-document update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    /// Number of documents matched by the `_id` filter (0 or 1).
    pub matched_count: u64,
    /// Number of matched documents whose content actually changed (0 or 1).
    pub modified_count: u64,
}

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// Implementations must be thread-safe: a single instance is shared by every in-flight
/// request for the lifetime of the process.
///
/// # Error Handling
///
/// Every failure is reported as a [`StoreError`](crate::error::StoreError); nothing is
/// retried and there is no partial success. Each method is a single driver call.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Returns the documents matching `filter`, ordered, offset and capped per `options`.
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>>;

    /// Returns the first document matching `filter` in natural order, if any.
    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>>;

    /// Inserts one document and returns its `_id`.
    ///
    /// A document without `_id` gets a freshly generated `ObjectId`.
    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Bson>;

    /// Inserts a non-empty batch of documents and returns their `_id`s in input order.
    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StoreResult<Vec<Bson>>;

    /// Applies `{"$set": fields}` to the document whose `_id` is `id`.
    async fn update_one(
        &self,
        collection: &str,
        id: ObjectId,
        fields: Document,
    ) -> StoreResult<UpdateOutcome>;

    /// Deletes the document whose `_id` is `id`, returning the number removed (0 or 1).
    async fn delete_one(&self, collection: &str, id: ObjectId) -> StoreResult<u64>;

    /// Counts the documents matching `filter`.
    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    /// Issues a no-op round trip to check connectivity.
    async fn ping(&self) -> StoreResult<()>;

    /// Cleanly shuts down the backend, releasing connections.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> StoreResult<Self::Backend>;
}
