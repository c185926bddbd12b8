//! Identifier coercion from canonical strings to native `ObjectId`s.
//!
//! Clients send entity references as 24-character hex strings. The store keeps them
//! as `ObjectId`s, so every inbound filter, document and update passes through
//! [`IdentifierCoercer`] before it reaches a backend. Only a closed set of field
//! names is treated as identifier-bearing; everything else is left untouched.
//!
//! Conversion is best-effort: a value that cannot be parsed as an `ObjectId`
//! (wrong length, non-hex characters) is kept as the original string. The one
//! exception is [`IdentifierCoercer::parse_primary_key`], which backs the
//! `updateOne`/`deleteOne` operations and fails on malformed input.

use bson::{Bson, Document, oid::ObjectId};

use crate::error::{StoreError, StoreResult};

/// The reserved primary-key field.
pub const PRIMARY_KEY: &str = "_id";

/// Fields whose value is a single reference to another entity.
pub const SCALAR_ID_FIELDS: [&str; 6] = [
    "courseId",
    "semesterId",
    "instructorId",
    "quizId",
    "assignmentId",
    "studentId",
];

/// Fields whose value is a list of references to other entities.
pub const LIST_ID_FIELDS: [&str; 3] = ["studentIds", "groupIds", "courseIds"];

/// Length of a canonical identifier (12 bytes, hex encoded).
const CANONICAL_LEN: usize = 24;

/// Converts identifier-bearing fields of inbound payloads to native form.
///
/// All functions are pure and total: they never fail, preserve key order and
/// return every non-identifier value exactly as received.
pub struct IdentifierCoercer;

impl IdentifierCoercer {
    /// Returns `true` if `field` holds a single identifier reference.
    pub fn is_scalar_field(field: &str) -> bool {
        SCALAR_ID_FIELDS.iter().any(|name| *name == field)
    }

    /// Returns `true` if `field` holds a list of identifier references.
    pub fn is_list_field(field: &str) -> bool {
        LIST_ID_FIELDS.iter().any(|name| *name == field)
    }

    /// Attempts to build an `ObjectId` from a canonical string.
    ///
    /// Only 24-character strings are attempted. Anything that fails to parse yields `None`.
    pub fn to_object_id(value: &str) -> Option<ObjectId> {
        if value.len() != CANONICAL_LEN {
            return None;
        }

        ObjectId::parse_str(value).ok()
    }

    /// Strictly parses a primary key, used where the caller addresses a single record by id.
    pub fn parse_primary_key(value: &str) -> StoreResult<ObjectId> {
        ObjectId::parse_str(value).map_err(|_| StoreError::InvalidIdentifier(value.to_string()))
    }

    /// Coerces a query filter.
    ///
    /// For each key:
    /// - `_id` or a scalar identifier field with a convertible string becomes an `ObjectId`
    /// - any other mapping value (an operator expression or sub-document) is coerced recursively
    /// - everything else, including list values, is kept as is
    pub fn coerce_filter(filter: Document) -> Document {
        filter
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Bson::String(s) if key == PRIMARY_KEY || Self::is_scalar_field(&key) => {
                        Self::coerce_string(s)
                    }
                    Bson::Document(nested) => Bson::Document(Self::coerce_filter(nested)),
                    other => other,
                };

                (key, value)
            })
            .collect()
    }

    /// Coerces a document about to be inserted.
    ///
    /// Scalar identifier fields convert their string value; list identifier fields convert
    /// each convertible string element. No recursion into nested values.
    pub fn coerce_document(document: Document) -> Document {
        document
            .into_iter()
            .map(|(key, value)| {
                let value = Self::coerce_field(&key, value);
                (key, value)
            })
            .collect()
    }

    /// Coerces the fields of a `$set` update.
    ///
    /// Updates follow the same field rules as inserted documents.
    pub fn coerce_update(update: Document) -> Document {
        Self::coerce_document(update)
    }

    fn coerce_field(key: &str, value: Bson) -> Bson {
        match value {
            Bson::String(s) if Self::is_scalar_field(key) => Self::coerce_string(s),
            Bson::Array(items) if Self::is_list_field(key) => Bson::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Bson::String(s) => Self::coerce_string(s),
                        other => other,
                    })
                    .collect(),
            ),
            other => other,
        }
    }

    fn coerce_string(value: String) -> Bson {
        match Self::to_object_id(&value) {
            Some(oid) => Bson::ObjectId(oid),
            None => Bson::String(value),
        }
    }
}
