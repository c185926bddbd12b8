//! In-memory storage implementation for the gateway.
//!
//! This module provides a backend that keeps every collection as an ordered list of
//! BSON documents behind an async-safe read-write lock. Insertion order is the
//! natural order, which is what unsorted finds return.

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};

use docgate_core::{
    backend::{StoreBackend, StoreBackendBuilder, UpdateOutcome},
    coercion::PRIMARY_KEY,
    error::{StoreError, StoreResult},
    query::{Expr, FindOptions},
};

use crate::evaluator::{Comparable, DocumentEvaluator, sort_documents};

type StoreMap = HashMap<String, Vec<Document>>;

const DEFAULT_DATABASE: &str = "test";

/// Thread-safe in-memory document storage backend.
///
/// This struct implements the [`StoreBackend`] trait with the same observable
/// behavior the gateway relies on from MongoDB: generated `ObjectId` primary keys,
/// unique `_id`s per collection, `$set` updates with dotted paths, and filters,
/// sorts, skips and limits evaluated by [`DocumentEvaluator`].
///
/// # Thread Safety
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// # Performance
///
/// Queries scan all documents in a collection (no indexing).
///
/// # Example
///
/// ```ignore
/// use docgate_memory::InMemoryStore;
/// use docgate_core::backend::StoreBackend;
/// use bson::doc;
///
/// let store = InMemoryStore::new("lms");
/// let id = store.insert_one("students", doc! { "name": "Ana" }).await?;
/// let found = store.find_one("students", doc! { "_id": id }).await?;
/// assert!(found.is_some());
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    /// The main storage map: collection_name -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
    /// Database name, used in the namespace of error messages
    database: String,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
            database: database.into(),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore` with custom options.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    fn namespace(&self, collection: &str) -> String {
        format!("{}.{}", self.database, collection)
    }

    fn ensure_unique(&self, existing: &[Document], id: &Bson, collection: &str) -> StoreResult<()> {
        let key = Comparable::from(id);

        if existing.iter().any(|document| primary_key_matches(document, &key)) {
            return Err(StoreError::DuplicateKey(id.to_string(), self.namespace(collection)));
        }

        Ok(())
    }

    async fn matching(&self, collection: &str, filter: &Document) -> StoreResult<Vec<Document>> {
        let expr = Expr::parse(filter)?;
        let store = self.store.read().await;

        let documents = match store.get(collection) {
            Some(documents) => documents,
            None => return Ok(vec![]),
        };

        Ok(
            DocumentEvaluator::filter_documents(documents, &expr)?
                .into_iter()
                .cloned()
                .collect()
        )
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE)
    }
}

fn primary_key_matches(document: &Document, key: &Comparable<'_>) -> bool {
    document
        .get(PRIMARY_KEY)
        .is_some_and(|id| Comparable::from(id) == *key)
}

/// Splits off the primary key, generating one when absent, and moves it to the front.
fn with_primary_key(mut document: Document) -> (Bson, Document) {
    let id = document
        .remove(PRIMARY_KEY)
        .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));

    let mut stored = Document::new();
    stored.insert(PRIMARY_KEY, id.clone());

    for (key, value) in document {
        stored.insert(key, value);
    }

    (id, stored)
}

/// Assigns `value` at a dotted `path`, creating intermediate documents as needed.
fn set_path(document: &mut Document, path: &str, value: Bson) -> StoreResult<()> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(StoreError::Backend(format!("The update path '{path}' contains an empty field name, which is not allowed.")));
    }

    match path.split_once('.') {
        None => {
            document.insert(path, value);
            Ok(())
        },
        Some((head, rest)) => {
            if !document.contains_key(head) {
                document.insert(head, Document::new());
            }

            match document.get_mut(head) {
                Some(Bson::Document(inner)) => set_path(inner, rest, value),
                _ => Err(StoreError::Backend(format!("Cannot create field '{rest}' in element {{{head}: ...}}"))),
            }
        },
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let expr = Expr::parse(&filter)?;
        let store = self.store.read().await;

        let documents = match store.get(collection) {
            Some(documents) => documents,
            None => return Ok(vec![]),
        };

        let mut matched = DocumentEvaluator::filter_documents(documents, &expr)?;
        sort_documents(&mut matched, &options.sort);

        let skip = options
            .skip
            .and_then(|skip| usize::try_from(skip).ok())
            .unwrap_or(0);
        let limit = options
            .limit
            .filter(|limit| *limit != 0)
            .and_then(|limit| usize::try_from(limit.unsigned_abs()).ok())
            .unwrap_or(usize::MAX);

        Ok(
            matched
                .into_iter()
                .skip(skip)
                .take(limit)
                .cloned()
                .collect()
        )
    }

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        Ok(
            self.matching(collection, &filter)
                .await?
                .into_iter()
                .next()
        )
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Bson> {
        let (id, stored) = with_primary_key(document);

        let mut store = self.store.write().await;
        let documents = store
            .entry(collection.to_string())
            .or_default();

        self.ensure_unique(documents, &id, collection)?;
        documents.push(stored);

        Ok(id)
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StoreResult<Vec<Bson>> {
        if documents.is_empty() {
            return Err(StoreError::InvalidDocument("documents must be a non-empty list".to_string()));
        }

        let batch = documents
            .into_iter()
            .map(with_primary_key)
            .collect::<Vec<_>>();

        let mut store = self.store.write().await;
        let existing = store
            .entry(collection.to_string())
            .or_default();

        // The whole batch is checked before anything is written.
        for (index, (id, _)) in batch.iter().enumerate() {
            self.ensure_unique(existing, id, collection)?;

            let key = Comparable::from(id);
            if batch[..index].iter().any(|(earlier, _)| Comparable::from(earlier) == key) {
                return Err(StoreError::DuplicateKey(id.to_string(), self.namespace(collection)));
            }
        }

        let mut ids = Vec::with_capacity(batch.len());

        for (id, stored) in batch {
            existing.push(stored);
            ids.push(id);
        }

        Ok(ids)
    }

    async fn update_one(
        &self,
        collection: &str,
        id: ObjectId,
        fields: Document,
    ) -> StoreResult<UpdateOutcome> {
        if fields.is_empty() {
            return Err(StoreError::Backend(
                "'$set' is empty. You must specify a field like so: {$set: {<field>: ...}}".to_string(),
            ));
        }

        let key = Bson::ObjectId(id);
        let key = Comparable::from(&key);

        let mut store = self.store.write().await;
        let document = match store
            .get_mut(collection)
            .and_then(|documents| documents.iter_mut().find(|document| primary_key_matches(document, &key)))
        {
            Some(document) => document,
            None => return Ok(UpdateOutcome::default()),
        };

        let mut updated = document.clone();

        for (path, value) in fields {
            if path == PRIMARY_KEY || path.starts_with("_id.") {
                if Comparable::from(&value) != key {
                    return Err(StoreError::Backend(
                        "Performing an update on the path '_id' would modify the immutable field '_id'".to_string()
                    ));
                }
                continue;
            }

            set_path(&mut updated, &path, value)?;
        }

        let modified = updated != *document;

        if modified {
            *document = updated;
        }

        Ok(UpdateOutcome {
            matched_count: 1,
            modified_count: u64::from(modified),
        })
    }

    async fn delete_one(&self, collection: &str, id: ObjectId) -> StoreResult<u64> {
        let key = Bson::ObjectId(id);
        let key = Comparable::from(&key);

        let mut store = self.store.write().await;
        let documents = match store.get_mut(collection) {
            Some(documents) => documents,
            None => return Ok(0),
        };

        match documents.iter().position(|document| primary_key_matches(document, &key)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            },
            None => Ok(0),
        }
    }

    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        Ok(self.matching(collection, &filter).await?.len() as u64)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docgate_memory::InMemoryStore;
/// use docgate_core::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().database("lms").build().await?;
/// ```
#[derive(Debug)]
pub struct InMemoryStoreBuilder {
    database: String,
}

impl Default for InMemoryStoreBuilder {
    fn default() -> Self {
        Self { database: DEFAULT_DATABASE.to_string() }
    }
}

impl InMemoryStoreBuilder {
    /// Sets the database name reported in error namespaces.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> StoreResult<Self::Backend> {
        Ok(InMemoryStore::new(self.database))
    }
}
