//! Core of the docgate project: everything between a raw JSON request and a store call.
//!
//! This crate provides:
//!
//! - **Identifier coercion** ([`coercion`]) - Canonical hex strings to native `ObjectId`s for filters, documents and updates
//! - **Document serialization** ([`serializer`]) - Native `ObjectId`s back to canonical strings in results
//! - **JSON conversion** ([`convert`]) - Structural mapping between `serde_json` values and BSON
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing different storage backends
//! - **Queries** ([`query`]) - Find options and a filter AST for backends that evaluate filters themselves
//! - **Document store** ([`store`]) - The coerce / call / serialize pipeline over a shared backend
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docgate_core::store::DocumentStore;
//! use bson::doc;
//!
//! let store = DocumentStore::new(backend);
//! let students = store.collection("students")?;
//!
//! let id = students
//!     .insert_one(doc! { "name": "Ana", "courseId": "507f1f77bcf86cd799439011" })
//!     .await?;
//! let found = students.find_one(doc! { "_id": id }).await?;
//! ```

pub mod backend;
pub mod coercion;
pub mod convert;
pub mod error;
pub mod query;
pub mod serializer;
pub mod store;
