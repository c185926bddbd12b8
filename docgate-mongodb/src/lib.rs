//! MongoDB backend implementation for docgate.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Filters, sorts, skips and limits are handed to the server unchanged, so the full
//! MongoDB query language is available to gateway clients.
//!
//! To use this backend, keep the default `mongodb` feature of the `docgate` crate enabled.
//!
//! # Connection
//!
//! The builder takes a connection string (`mongodb://` or `mongodb+srv://`) and the
//! name of the database that holds every collection the gateway serves.
//!
//! # Example
//!
//! ```ignore
//! use docgate_core::backend::StoreBackendBuilder;
//! use docgate_mongodb::MongoDbStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "lms")
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
