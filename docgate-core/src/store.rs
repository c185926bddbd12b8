//! The operation pipeline between the HTTP layer and a storage backend.
//!
//! Every gateway operation follows the same path:
//!
//! 1. resolve the named collection ([`DocumentStore::collection`])
//! 2. coerce the input with [`IdentifierCoercer`]
//! 3. call exactly one [`StoreBackend`] method
//! 4. serialize the output with [`DocumentSerializer`]
//!
//! # Example
//!
//! ```ignore
//! use docgate_core::{store::DocumentStore, query::FindOptions};
//! use bson::doc;
//!
//! let store = DocumentStore::new(backend);
//! let students = store.collection("students")?;
//! let page = students
//!     .find(doc! { "courseId": "507f1f77bcf86cd799439011" }, FindOptions::new())
//!     .await?;
//! ```

use bson::{Bson, Document};
use std::sync::Arc;

use crate::{
    backend::{StoreBackend, UpdateOutcome},
    coercion::IdentifierCoercer,
    error::{StoreError, StoreResult},
    query::FindOptions,
    serializer::DocumentSerializer,
};

/// A process-wide handle to a storage backend.
///
/// Cloning is cheap: all clones share the same backend (and, for MongoDB, the same
/// connection pool). Construct one at startup and hand it to every request handler.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    backend: Arc<dyn StoreBackend>,
}

impl DocumentStore {
    /// Creates a new document store with the given backend.
    pub fn new(backend: impl StoreBackend + 'static) -> Self {
        Self { backend: Arc::new(backend) }
    }

    /// Resolves a collection by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidCollection`] if the name is empty, contains `$` or a
    /// NUL byte, or addresses a `system.` collection.
    pub fn collection(&self, name: &str) -> StoreResult<Collection<'_>> {
        validate_collection_name(name)?;

        Ok(Collection {
            name: name.to_string(),
            backend: self.backend.as_ref(),
        })
    }

    /// Checks connectivity to the backend.
    pub async fn ping(&self) -> StoreResult<()> {
        self.backend.ping().await
    }

    /// Shuts the backend down. Other clones must not be used afterwards.
    pub async fn shutdown(&self) -> StoreResult<()> {
        self.backend.shutdown().await
    }
}

fn validate_collection_name(name: &str) -> StoreResult<()> {
    let problem = if name.is_empty() {
        Some("collection names cannot be empty")
    } else if name.contains('$') {
        Some("collection names must not contain '$'")
    } else if name.contains('\0') {
        Some("collection names must not contain the null character")
    } else if name.starts_with("system.") {
        Some("collection names must not start with 'system.'")
    } else {
        None
    };

    match problem {
        Some(problem) => Err(StoreError::InvalidCollection(format!("{problem}: '{name}'"))),
        None => Ok(()),
    }
}

/// A named collection bound to the store's backend.
#[derive(Debug)]
pub struct Collection<'a> {
    name: String,
    backend: &'a dyn StoreBackend,
}

impl<'a> Collection<'a> {
    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finds all documents matching `filter`, serialized.
    pub async fn find(&self, filter: Document, options: FindOptions) -> StoreResult<Vec<Bson>> {
        let documents = self
            .backend
            .find(&self.name, IdentifierCoercer::coerce_filter(filter), options)
            .await?;

        Ok(DocumentSerializer::serialize_all(&documents))
    }

    /// Finds the first document matching `filter`, serialized, or null when none matches.
    pub async fn find_one(&self, filter: Document) -> StoreResult<Bson> {
        let document = self
            .backend
            .find_one(&self.name, IdentifierCoercer::coerce_filter(filter))
            .await?;

        Ok(DocumentSerializer::serialize_optional(document.as_ref()))
    }

    /// Inserts one document and returns its serialized `_id`.
    pub async fn insert_one(&self, document: Document) -> StoreResult<Bson> {
        let id = self
            .backend
            .insert_one(&self.name, IdentifierCoercer::coerce_document(document))
            .await?;

        Ok(DocumentSerializer::serialize(&id))
    }

    /// Inserts a batch of documents and returns their serialized `_id`s in input order.
    pub async fn insert_many(&self, documents: Vec<Document>) -> StoreResult<Vec<Bson>> {
        let ids = self
            .backend
            .insert_many(
                &self.name,
                documents
                    .into_iter()
                    .map(IdentifierCoercer::coerce_document)
                    .collect(),
            )
            .await?;

        Ok(ids.iter().map(DocumentSerializer::serialize).collect())
    }

    /// Sets `fields` on the document whose primary key is `id`.
    ///
    /// # Errors
    ///
    /// Unlike identifier fields inside payloads, `id` must be a valid canonical
    /// identifier: anything else is [`StoreError::InvalidIdentifier`].
    pub async fn update_one(&self, id: &str, fields: Document) -> StoreResult<UpdateOutcome> {
        let id = IdentifierCoercer::parse_primary_key(id)?;

        self.backend
            .update_one(&self.name, id, IdentifierCoercer::coerce_update(fields))
            .await
    }

    /// Deletes the document whose primary key is `id`, returning the number removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidIdentifier`] if `id` is not a valid canonical identifier.
    pub async fn delete_one(&self, id: &str) -> StoreResult<u64> {
        let id = IdentifierCoercer::parse_primary_key(id)?;

        self.backend.delete_one(&self.name, id).await
    }

    /// Counts the documents matching `filter`.
    pub async fn count(&self, filter: Document) -> StoreResult<u64> {
        self.backend
            .count(&self.name, IdentifierCoercer::coerce_filter(filter))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bson::{doc, oid::ObjectId};
    use std::sync::Mutex;

    const HEX: &str = "507f1f77bcf86cd799439011";

    /// Records what reaches the backend and replays canned documents.
    #[derive(Debug, Default)]
    struct RecordingBackend {
        seen: Mutex<Vec<(String, Document)>>,
        reply: Vec<Document>,
    }

    impl RecordingBackend {
        fn record(&self, op: &str, document: Document) {
            self.seen.lock().unwrap().push((op.to_string(), document));
        }
    }

    #[async_trait]
    impl StoreBackend for RecordingBackend {
        async fn find(&self, _: &str, filter: Document, _: FindOptions) -> StoreResult<Vec<Document>> {
            self.record("find", filter);
            Ok(self.reply.clone())
        }

        async fn find_one(&self, _: &str, filter: Document) -> StoreResult<Option<Document>> {
            self.record("find_one", filter);
            Ok(self.reply.first().cloned())
        }

        async fn insert_one(&self, _: &str, document: Document) -> StoreResult<Bson> {
            self.record("insert_one", document);
            Ok(Bson::ObjectId(ObjectId::parse_str(HEX).unwrap()))
        }

        async fn insert_many(&self, _: &str, documents: Vec<Document>) -> StoreResult<Vec<Bson>> {
            let ids = documents.iter().map(|_| Bson::ObjectId(ObjectId::new())).collect();
            for document in documents {
                self.record("insert_many", document);
            }
            Ok(ids)
        }

        async fn update_one(&self, _: &str, id: ObjectId, fields: Document) -> StoreResult<UpdateOutcome> {
            self.record("update_one", doc! { "_id": id, "$set": fields });
            Ok(UpdateOutcome { matched_count: 1, modified_count: 1 })
        }

        async fn delete_one(&self, _: &str, id: ObjectId) -> StoreResult<u64> {
            self.record("delete_one", doc! { "_id": id });
            Ok(1)
        }

        async fn count(&self, _: &str, filter: Document) -> StoreResult<u64> {
            self.record("count", filter);
            Ok(0)
        }

        async fn ping(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    fn oid() -> ObjectId {
        ObjectId::parse_str(HEX).unwrap()
    }

    #[test]
    fn rejects_bad_collection_names() {
        let store = DocumentStore::new(RecordingBackend::default());

        for name in ["", "a$b", "nul\0", "system.users"] {
            assert!(matches!(store.collection(name), Err(StoreError::InvalidCollection(_))), "{name:?}");
        }

        assert_eq!(store.collection("students").unwrap().name(), "students");
    }

    #[tokio::test]
    async fn find_coerces_filter_and_serializes_results() {
        let backend = RecordingBackend {
            reply: vec![doc! { "_id": oid(), "courseId": oid(), "tags": [oid()] }],
            ..Default::default()
        };
        let store = DocumentStore::new(backend);
        let students = store.collection("students").unwrap();

        let found = students
            .find(doc! { "courseId": HEX }, FindOptions::new())
            .await
            .unwrap();

        assert_eq!(found, vec![Bson::Document(doc! { "_id": HEX, "courseId": HEX, "tags": [HEX] })]);
    }

    #[tokio::test]
    async fn find_one_maps_absence_to_null() {
        let store = DocumentStore::new(RecordingBackend::default());
        let found = store.collection("x").unwrap().find_one(doc! {}).await.unwrap();

        assert_eq!(found, Bson::Null);
    }

    #[tokio::test]
    async fn insert_returns_canonical_id() {
        let store = DocumentStore::new(RecordingBackend::default());
        let id = store
            .collection("students")
            .unwrap()
            .insert_one(doc! { "name": "Ana", "courseId": HEX })
            .await
            .unwrap();

        assert_eq!(id, Bson::String(HEX.to_string()));
    }

    #[tokio::test]
    async fn update_and_delete_require_valid_primary_keys() {
        let store = DocumentStore::new(RecordingBackend::default());
        let students = store.collection("students").unwrap();

        let err = students.update_one("nope", doc! { "name": "x" }).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidIdentifier(_)));

        let err = students.delete_one("zzzzzzzzzzzzzzzzzzzzzzzz").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidIdentifier(_)));

        let outcome = students.update_one(HEX, doc! { "studentIds": [HEX] }).await.unwrap();
        assert_eq!(outcome, UpdateOutcome { matched_count: 1, modified_count: 1 });
        assert_eq!(students.delete_one(HEX).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn backend_receives_native_identifiers() {
        let backend = Arc::new(RecordingBackend::default());
        let store = DocumentStore { backend: backend.clone() };
        let students = store.collection("students").unwrap();

        students.count(doc! { "_id": HEX }).await.unwrap();
        students.update_one(HEX, doc! { "courseIds": [HEX, "x"] }).await.unwrap();
        students
            .insert_many(vec![doc! { "quizId": HEX }, doc! { "quizId": "short" }])
            .await
            .unwrap();

        let seen = backend.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ("count".to_string(), doc! { "_id": oid() }),
                ("update_one".to_string(), doc! { "_id": oid(), "$set": { "courseIds": [oid(), "x"] } }),
                ("insert_many".to_string(), doc! { "quizId": oid() }),
                ("insert_many".to_string(), doc! { "quizId": "short" }),
            ]
        );
    }
}
