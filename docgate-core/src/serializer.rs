//! Serialization of store results back to wire-safe values.
//!
//! `ObjectId` is not a JSON value. Every result leaving the gateway goes through
//! [`DocumentSerializer`], which replaces native identifiers with their canonical
//! 24-character hex form at any depth, inside documents and arrays alike.

use bson::{Bson, Document};

/// Recursively replaces native identifiers with canonical strings.
pub struct DocumentSerializer;

impl DocumentSerializer {
    /// Serializes a single value.
    ///
    /// This function processes:
    /// - ObjectIds: replaced by their hex string
    /// - Arrays: each element is serialized
    /// - Documents: each value is serialized, keys and key order are kept
    /// - Other types (including null): returned as-is
    pub fn serialize(value: &Bson) -> Bson {
        match value {
            Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
            Bson::Array(arr) => Bson::Array(arr.iter().map(Self::serialize).collect()),
            Bson::Document(doc) => Bson::Document(Self::serialize_map(doc)),
            _ => value.clone(),
        }
    }

    /// Serializes a document returned by the store.
    pub fn serialize_document(document: &Document) -> Bson {
        Bson::Document(Self::serialize_map(document))
    }

    /// Serializes an optional document, mapping absence to null.
    pub fn serialize_optional(document: Option<&Document>) -> Bson {
        document
            .map(Self::serialize_document)
            .unwrap_or(Bson::Null)
    }

    /// Serializes a batch of documents, preserving order.
    pub fn serialize_all(documents: &[Document]) -> Vec<Bson> {
        documents
            .iter()
            .map(Self::serialize_document)
            .collect()
    }

    fn serialize_map(doc: &Document) -> Document {
        doc.iter()
            .map(|(k, v)| (k.clone(), Self::serialize(v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coercion::{IdentifierCoercer, SCALAR_ID_FIELDS};
    use bson::{doc, oid::ObjectId};

    const HEX: &str = "507f1f77bcf86cd799439011";

    fn is_wire_safe(value: &Bson) -> bool {
        match value {
            Bson::ObjectId(_) => false,
            Bson::Array(arr) => arr.iter().all(is_wire_safe),
            Bson::Document(doc) => doc.values().all(is_wire_safe),
            _ => true,
        }
    }

    #[test]
    fn null_stays_null() {
        assert_eq!(DocumentSerializer::serialize(&Bson::Null), Bson::Null);
        assert_eq!(DocumentSerializer::serialize_optional(None), Bson::Null);
    }

    #[test]
    fn identifier_becomes_canonical_string() {
        let oid = ObjectId::parse_str(HEX).unwrap();
        assert_eq!(
            DocumentSerializer::serialize(&Bson::ObjectId(oid)),
            Bson::String(HEX.to_string())
        );
    }

    #[test]
    fn walks_arbitrary_nesting() {
        let oid = ObjectId::new();
        let value = Bson::Document(doc! {
            "_id": oid,
            "name": "Ana",
            "groups": [
                { "groupId": oid, "members": [[oid, 1], { "deep": { "deeper": oid } }] },
            ],
            "score": 9.5,
            "active": true,
        });

        let out = DocumentSerializer::serialize(&value);
        let hex = oid.to_hex();

        assert!(is_wire_safe(&out));
        assert_eq!(
            out,
            Bson::Document(doc! {
                "_id": hex.clone(),
                "name": "Ana",
                "groups": [
                    { "groupId": hex.clone(), "members": [[hex.clone(), 1], { "deep": { "deeper": hex } }] },
                ],
                "score": 9.5,
                "active": true,
            })
        );
    }

    #[test]
    fn keeps_key_order() {
        let out = DocumentSerializer::serialize_document(&doc! { "b": 1, "_id": ObjectId::new(), "a": 2 });
        let keys = out
            .as_document()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>();

        assert_eq!(keys, vec!["b", "_id", "a"]);
    }

    #[test]
    fn serialization_is_idempotent() {
        let value = Bson::Array(vec![
            Bson::Document(doc! { "x": ObjectId::new(), "y": [ObjectId::new(), "s"] }),
            Bson::Null,
            Bson::Int64(3),
        ]);

        let once = DocumentSerializer::serialize(&value);
        assert_eq!(DocumentSerializer::serialize(&once), once);
    }

    #[test]
    fn round_trips_scalar_identifier_fields() {
        for field in SCALAR_ID_FIELDS {
            let coerced = IdentifierCoercer::coerce_document(doc! { field: HEX });
            let value = coerced.get(field).unwrap();

            assert!(matches!(value, Bson::ObjectId(_)));
            assert_eq!(DocumentSerializer::serialize(value), Bson::String(HEX.to_string()));
        }
    }

    #[test]
    fn batch_preserves_order() {
        let first = ObjectId::new();
        let second = ObjectId::new();

        let out = DocumentSerializer::serialize_all(&[doc! { "_id": first }, doc! { "_id": second }]);

        assert_eq!(
            out,
            vec![
                Bson::Document(doc! { "_id": first.to_hex() }),
                Bson::Document(doc! { "_id": second.to_hex() }),
            ]
        );
    }
}
