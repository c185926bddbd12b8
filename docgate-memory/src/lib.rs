//! In-memory document storage backend for docgate.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for local
//! development and tests, where it stands in for MongoDB without a running server.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Insertion-ordered collections** - Unsorted finds return documents in the order they were written
//! - **MongoDB-style filters** - Implicit equality, comparison, set, array and logical operators over dotted paths
//! - **`$set` updates** - With matched / modified counts
//!
//! # Quick Start
//!
//! ```ignore
//! use docgate_core::store::DocumentStore;
//! use docgate_memory::InMemoryStore;
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder().database("lms").build().await?;
//!     let store = DocumentStore::new(backend);
//!
//!     let students = store.collection("students")?;
//!     let id = students.insert_one(doc! { "name": "Alice" }).await?;
//!     assert_eq!(students.count(doc! {}).await?, 1);
//!
//!     Ok(())
//! }
//! ```

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
