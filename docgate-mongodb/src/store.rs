use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as DriverError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions as DriverFindOptions},
};

use docgate_core::{
    backend::{StoreBackend, StoreBackendBuilder, UpdateOutcome},
    coercion::PRIMARY_KEY,
    error::{StoreError, StoreResult},
    query::FindOptions,
};

const DUPLICATE_KEY_CODE: i32 = 11000;

/// A [`StoreBackend`] over one MongoDB database.
///
/// The wrapped [`Client`] owns a connection pool and is shared by every request.
/// Each trait method issues exactly one driver call; driver failures surface as
/// [`StoreError::Backend`] carrying the driver's message, except duplicate `_id`
/// writes which become [`StoreError::DuplicateKey`].
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    fn write_error(&self, error: DriverError, collection: &str) -> StoreError {
        let duplicate = match error.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(failure)) if failure.code == DUPLICATE_KEY_CODE => {
                Some(failure.message.as_str())
            },
            ErrorKind::InsertMany(failure) => failure
                .write_errors
                .as_ref()
                .and_then(|errors| errors.iter().find(|e| e.code == DUPLICATE_KEY_CODE))
                .map(|e| e.message.as_str()),
            _ => None,
        };

        match duplicate {
            Some(message) => StoreError::DuplicateKey(
                duplicate_key(message),
                format!("{}.{}", self.database, collection),
            ),
            None => StoreError::Backend(error.to_string()),
        }
    }

    fn driver_options(options: &FindOptions) -> DriverFindOptions {
        let mut driver_options = DriverFindOptions::default();

        driver_options.sort = options.sort_document();
        driver_options.skip = options.skip;
        driver_options.limit = options.limit;

        driver_options
    }
}

/// Pulls the key out of a server message like
/// `E11000 duplicate key error collection: lms.students index: _id_ dup key: { _id: 1 }`.
fn duplicate_key(message: &str) -> String {
    message
        .split_once("dup key: { ")
        .and_then(|(_, rest)| rest.rsplit_once(" }"))
        .map(|(key, _)| key.trim_start_matches("_id: ").to_string())
        .unwrap_or_else(|| message.to_string())
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        self.get_collection(collection)
            .find(filter)
            .with_options(Self::driver_options(&options))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(filter)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<Bson> {
        Ok(
            self.get_collection(collection)
                .insert_one(document)
                .await
                .map_err(|e| self.write_error(e, collection))?
                .inserted_id
        )
    }

    async fn insert_many(&self, collection: &str, documents: Vec<Document>) -> StoreResult<Vec<Bson>> {
        if documents.is_empty() {
            return Err(StoreError::InvalidDocument("documents must be a non-empty list".to_string()));
        }

        let mut inserted = self.get_collection(collection)
            .insert_many(documents)
            .await
            .map_err(|e| self.write_error(e, collection))?
            .inserted_ids
            .into_iter()
            .collect::<Vec<(usize, Bson)>>();

        // The driver reports ids keyed by input position.
        inserted.sort_by_key(|(index, _)| *index);

        Ok(
            inserted
                .into_iter()
                .map(|(_, id)| id)
                .collect()
        )
    }

    async fn update_one(
        &self,
        collection: &str,
        id: ObjectId,
        fields: Document,
    ) -> StoreResult<UpdateOutcome> {
        let result = self.get_collection(collection)
            .update_one(
                doc! { PRIMARY_KEY: id },
                doc! { "$set": fields },
            )
            .await
            .map_err(|e| self.write_error(e, collection))?;

        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
        })
    }

    async fn delete_one(&self, collection: &str, id: ObjectId) -> StoreResult<u64> {
        Ok(
            self.get_collection(collection)
                .delete_one(doc! { PRIMARY_KEY: id })
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?
                .deleted_count
        )
    }

    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        self.get_collection(collection)
            .count_documents(filter)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn ping(&self) -> StoreResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn shutdown(&self) -> StoreResult<()> {
        self.client.clone().shutdown().await;

        Ok(())
    }
}

/// Builds a [`MongoDbStore`] from a connection string and a database name.
///
/// The connection string is parsed (including SRV resolution for `mongodb+srv://`)
/// when [`build`](StoreBackendBuilder::build) runs; no connection is opened until
/// the first operation.
#[derive(Debug)]
pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
    app_name: Option<String>,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
            app_name: None,
        }
    }

    /// Sets the application name reported to the server in connection handshakes.
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> StoreResult<Self::Backend> {
        if self.database.is_empty() {
            return Err(StoreError::Initialization("database name cannot be empty".to_string()));
        }

        let mut options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| StoreError::Initialization(e.to_string()))?;

        if self.app_name.is_some() {
            options.app_name = self.app_name;
        }

        Ok(MongoDbStore::new(
            Client::with_options(options)
                .map_err(|e| StoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgate_core::query::{SortDirection, SortKey};

    #[test]
    fn find_options_map_onto_the_driver() {
        let options = FindOptions {
            sort: vec![
                SortKey { field: "age".into(), direction: SortDirection::Desc },
                SortKey { field: "name".into(), direction: SortDirection::Asc },
            ],
            skip: Some(5),
            limit: Some(10),
        };

        let driver = MongoDbStore::driver_options(&options);

        assert_eq!(driver.sort, Some(doc! { "age": -1, "name": 1 }));
        assert_eq!(driver.skip, Some(5));
        assert_eq!(driver.limit, Some(10));
    }

    #[test]
    fn empty_find_options_leave_the_driver_defaults() {
        let driver = MongoDbStore::driver_options(&FindOptions::new());

        assert_eq!(driver.sort, None);
        assert_eq!(driver.skip, None);
        assert_eq!(driver.limit, None);
    }

    #[test]
    fn duplicate_keys_are_read_from_server_messages() {
        assert_eq!(
            duplicate_key("E11000 duplicate key error collection: lms.students index: _id_ dup key: { _id: ObjectId('507f1f77bcf86cd799439011') }"),
            "ObjectId('507f1f77bcf86cd799439011')"
        );
        assert_eq!(duplicate_key("something else"), "something else");
    }

    #[tokio::test]
    async fn builder_rejects_malformed_connection_strings() {
        let err = MongoDbStore::builder("postgres://localhost", "lms")
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Initialization(_)));
    }

    #[tokio::test]
    async fn builder_requires_a_database_name() {
        let err = MongoDbStore::builder("mongodb://localhost:27017", "")
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Initialization(_)));
    }
}
