//! Query expression evaluation for in-memory document filtering.
//!
//! This module provides the evaluation engine for query expressions, with the
//! matching rules of the document database the gateway normally fronts: equality
//! reaches into arrays, null matches a missing field, and range comparisons only
//! hold between values of the same type bracket.

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};
use std::cmp::Ordering;

use docgate_core::{
    error::{StoreError, StoreResult},
    query::{Expr, FieldOp, QueryVisitor, SortDirection, SortKey},
};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to `f64`. Values of different type brackets are
/// never equal; for sorting they are ordered by bracket (null, numbers, strings,
/// documents, arrays, identifiers, booleans, dates).
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Number(f64),
    String(&'a str),
    /// Embedded document, field order kept.
    Map(Vec<(&'a str, Comparable<'a>)>),
    Array(Vec<Comparable<'a>>),
    ObjectId(ObjectId),
    Bool(bool),
    DateTime(DateTime),
    /// Any other BSON type, compared structurally.
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect()
            ),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect()
            ),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            other => Comparable::Other(other),
        }
    }
}

impl<'a> Comparable<'a> {
    fn bracket(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::ObjectId(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
            Comparable::Other(_) => 8,
        }
    }

    /// Total order used for sorting.
    pub(crate) fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Number(a), Comparable::Number(b)) => a
                .partial_cmp(b)
                .unwrap_or_else(|| b.is_nan().cmp(&a.is_nan())),
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::Map(a), Comparable::Map(b)) => a
                .iter()
                .zip(b.iter())
                .map(|((lk, lv), (rk, rv))| lv.compare(rv).then_with(|| lk.cmp(rk)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::Array(a), Comparable::Array(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(l, r)| l.compare(r))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.bytes().cmp(&b.bytes()),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.cmp(b),
            _ => self.bracket().cmp(&other.bracket()),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    /// Values in different type brackets are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::Other(_), Comparable::Other(_)) => None,
            _ if self.bracket() == other.bracket() => Some(self.compare(other)),
            _ => None,
        }
    }
}

/// Resolves a dotted field path inside a document.
///
/// Path segments step into embedded documents, or into arrays when the segment is
/// a numeric index.
pub(crate) fn lookup<'d>(document: &'d Document, path: &str) -> Option<&'d Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(doc) => doc.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Orders documents by the given keys, earlier keys taking precedence.
///
/// A missing field sorts as null. The sort is stable, so ties keep insertion order.
pub(crate) fn sort_documents(documents: &mut [&Document], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }

    documents.sort_by(|a, b| {
        for key in keys {
            let left = lookup(a, &key.field)
                .map(Comparable::from)
                .unwrap_or(Comparable::Null);
            let right = lookup(b, &key.field)
                .map(Comparable::from)
                .unwrap_or(Comparable::Null);

            let ordering = match key.direction {
                SortDirection::Asc => left.compare(&right),
                SortDirection::Desc => right.compare(&left),
            };

            if ordering.is_ne() {
                return ordering;
            }
        }

        Ordering::Equal
    });
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> StoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Keeps the documents matching `expr`, in their original order.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        expr: &Expr,
    ) -> StoreResult<Vec<&'a Document>> {
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).evaluate(expr)? {
                matched.push(document);
            }
        }

        Ok(matched)
    }

    fn field(&self, path: &str) -> Option<&'a Bson> {
        lookup(self.document, path)
    }
}

/// Equality with array membership: an array field equals a value if the whole
/// array does or any element does. A missing field equals null.
fn equals(candidate: Option<&Bson>, value: &Bson) -> bool {
    let expected = Comparable::from(value);

    match candidate {
        None => expected == Comparable::Null,
        Some(found) => {
            Comparable::from(found) == expected
                || found
                    .as_array()
                    .is_some_and(|items| items.iter().any(|item| Comparable::from(item) == expected))
        }
    }
}

fn compares(candidate: Option<&Bson>, value: &Bson, accept: fn(Ordering) -> bool) -> bool {
    let expected = Comparable::from(value);
    let check = |found: &Bson| {
        Comparable::from(found)
            .partial_cmp(&expected)
            .is_some_and(accept)
    };

    match candidate {
        None => expected == Comparable::Null && accept(Ordering::Equal),
        Some(found) => {
            check(found)
                || found
                    .as_array()
                    .is_some_and(|items| items.iter().any(|item| check(item)))
        }
    }
}

fn operand_list<'v>(op: &str, value: &'v Bson) -> StoreResult<&'v [Bson]> {
    match value {
        Bson::Array(items) => Ok(items),
        _ => Err(StoreError::InvalidQuery(format!("{op} needs an array"))),
    }
}

fn size_operand(value: &Bson) -> StoreResult<usize> {
    let size = match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        Bson::Double(f) if f.fract() == 0.0 => Some(*f as i64),
        _ => None,
    };

    size
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| StoreError::InvalidQuery(format!("Failed to parse $size. Expected a non-negative integer, got: {value}")))
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = StoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_nor(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_or(exprs)?)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(self.field(field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        let candidate = self.field(field);

        Ok(match op {
            FieldOp::Eq => equals(candidate, value),
            FieldOp::Ne => !equals(candidate, value),
            FieldOp::Gt => compares(candidate, value, Ordering::is_gt),
            FieldOp::Gte => compares(candidate, value, Ordering::is_ge),
            FieldOp::Lt => compares(candidate, value, Ordering::is_lt),
            FieldOp::Lte => compares(candidate, value, Ordering::is_le),
            FieldOp::In => operand_list("$in", value)?
                .iter()
                .any(|item| equals(candidate, item)),
            FieldOp::Nin => !operand_list("$nin", value)?
                .iter()
                .any(|item| equals(candidate, item)),
            FieldOp::All => {
                let items = operand_list("$all", value)?;
                !items.is_empty() && items.iter().all(|item| equals(candidate, item))
            },
            FieldOp::Size => {
                let size = size_operand(value)?;
                matches!(candidate, Some(Bson::Array(items)) if items.len() == size)
            },
        })
    }
}
