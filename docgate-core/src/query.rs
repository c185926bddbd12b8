//! Find options and the filter expression tree.
//!
//! [`FindOptions`] carries the ordering, offset and row cap of a `find` call. Sort keys
//! are kept in the order the caller gave them; they are never re-sorted or deduplicated.
//!
//! Filters reach backends as MongoDB-style documents. A backend that talks to MongoDB
//! passes them through untouched; a backend that evaluates filters itself parses them
//! into an [`Expr`] tree with [`Expr::parse`] and walks it with a [`QueryVisitor`].
//!
//! ```ignore
//! use bson::doc;
//! use docgate_core::query::Expr;
//!
//! let expr = Expr::parse(&doc! {
//!     "age": { "$gte": 18 },
//!     "$or": [{ "status": "active" }, { "role": "admin" }],
//! })?;
//! ```

use bson::{Bson, Document};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    /// The numeric form MongoDB expects in a sort document.
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }

    fn from_json(field: &str, value: &Value) -> StoreResult<Self> {
        let direction = match value {
            Value::Number(n) => match n.as_f64() {
                Some(v) if v == 1.0 => Some(SortDirection::Asc),
                Some(v) if v == -1.0 => Some(SortDirection::Desc),
                _ => None,
            },
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "asc" | "ascending" => Some(SortDirection::Asc),
                "desc" | "descending" => Some(SortDirection::Desc),
                _ => None,
            },
            _ => None,
        };

        direction.ok_or_else(|| {
            StoreError::InvalidQuery(format!("invalid sort direction for '{field}': {value}"))
        })
    }
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Ordering, offset and row cap of a `find` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Sort keys, most significant first.
    pub sort: Vec<SortKey>,
    /// Number of documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents to return.
    pub limit: Option<i64>,
}

impl FindOptions {
    /// Creates empty options: natural order, no offset, no cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds find options from the optional request parts.
    ///
    /// A `skip` or `limit` of zero is treated as absent.
    pub fn from_request(
        sort: Option<Map<String, Value>>,
        skip: Option<u64>,
        limit: Option<i64>,
    ) -> StoreResult<Self> {
        Ok(Self {
            sort: match sort {
                Some(sort) => Self::sort_from_json(&sort)?,
                None => vec![],
            },
            skip: skip.filter(|s| *s != 0),
            limit: limit.filter(|l| *l != 0),
        })
    }

    /// Converts a `{field: direction}` object into sort keys, keeping the caller's order.
    pub fn sort_from_json(sort: &Map<String, Value>) -> StoreResult<Vec<SortKey>> {
        sort.iter()
            .map(|(field, direction)| {
                Ok(SortKey {
                    field: field.clone(),
                    direction: SortDirection::from_json(field, direction)?,
                })
            })
            .collect()
    }

    /// The sort as a MongoDB sort document, or `None` if unsorted.
    pub fn sort_document(&self) -> Option<Document> {
        if self.sort.is_empty() {
            return None;
        }

        Some(
            self.sort
                .iter()
                .map(|key| (key.field.clone(), Bson::Int32(key.direction.as_i32())))
                .collect(),
        )
    }
}

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOp {
    /// Equal to (`$eq`, or an implicit `{field: value}`).
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// Equal to any element of the given array.
    In,
    /// Equal to no element of the given array.
    Nin,
    /// Array field contains every element of the given array.
    All,
    /// Array field has the given length.
    Size,
}

impl FieldOp {
    fn from_operator(op: &str) -> Option<Self> {
        Some(match op {
            "$eq" => FieldOp::Eq,
            "$ne" => FieldOp::Ne,
            "$gt" => FieldOp::Gt,
            "$gte" => FieldOp::Gte,
            "$lt" => FieldOp::Lt,
            "$lte" => FieldOp::Lte,
            "$in" => FieldOp::In,
            "$nin" => FieldOp::Nin,
            "$all" => FieldOp::All,
            "$size" => FieldOp::Size,
            _ => return None,
        })
    }
}

/// A filter expression for querying documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match). Empty matches everything.
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOR of multiple expressions (none may match).
    Nor(Vec<Expr>),
    /// Logical NOT of an expression (inverts the result).
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        /// The field path to compare, dotted for nested fields.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: impl Into<String>, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field: field.into(), op, value }
    }

    /// Parses a MongoDB-style filter document.
    ///
    /// Top-level keys are field paths or the logical operators `$and`, `$or` and `$nor`.
    /// A field whose value is a document starting with a `$` key is an operator
    /// expression; any other value is an implicit equality.
    pub fn parse(filter: &Document) -> StoreResult<Expr> {
        let mut clauses = Vec::with_capacity(filter.len());

        for (key, value) in filter {
            let clause = match key.as_str() {
                "$and" => Expr::And(Self::parse_list(key, value)?),
                "$or" => Expr::Or(Self::parse_list(key, value)?),
                "$nor" => Expr::Nor(Self::parse_list(key, value)?),
                op if op.starts_with('$') => {
                    return Err(StoreError::InvalidQuery(format!("unknown top level operator: {op}")));
                }
                field => Self::parse_field(field, value)?,
            };

            clauses.push(clause);
        }

        Ok(match clauses.len() {
            1 => clauses.remove(0),
            _ => Expr::And(clauses),
        })
    }

    fn parse_list(op: &str, value: &Bson) -> StoreResult<Vec<Expr>> {
        let items = match value {
            Bson::Array(items) if !items.is_empty() => items,
            _ => {
                return Err(StoreError::InvalidQuery(format!("{op} must be a nonempty array")));
            }
        };

        items
            .iter()
            .map(|item| match item {
                Bson::Document(doc) => Self::parse(doc),
                _ => Err(StoreError::InvalidQuery(format!("{op} argument's entries must be objects"))),
            })
            .collect()
    }

    fn parse_field(field: &str, value: &Bson) -> StoreResult<Expr> {
        let operators = match value {
            Bson::Document(doc) if Self::is_operator_document(doc) => doc,
            _ => return Ok(Expr::field(field, FieldOp::Eq, value.clone())),
        };

        let mut clauses = Vec::with_capacity(operators.len());

        for (op, arg) in operators {
            let clause = match op.as_str() {
                "$exists" => Expr::Exists(field.to_string(), Self::truthy(arg)),
                "$not" => match arg {
                    Bson::Document(doc) if Self::is_operator_document(doc) => {
                        Expr::Not(Box::new(Self::parse_field(field, arg)?))
                    }
                    _ => return Err(StoreError::InvalidQuery("$not needs a regex or a document".into())),
                },
                other => {
                    let field_op = FieldOp::from_operator(other).ok_or_else(|| {
                        StoreError::InvalidQuery(format!("unknown operator: {other}"))
                    })?;

                    if matches!(field_op, FieldOp::In | FieldOp::Nin | FieldOp::All)
                        && !matches!(arg, Bson::Array(_))
                    {
                        return Err(StoreError::InvalidQuery(format!("{other} needs an array")));
                    }

                    Expr::field(field, field_op, arg.clone())
                }
            };

            clauses.push(clause);
        }

        Ok(match clauses.len() {
            1 => clauses.remove(0),
            _ => Expr::And(clauses),
        })
    }

    fn is_operator_document(doc: &Document) -> bool {
        doc.keys()
            .next()
            .is_some_and(|key| key.starts_with('$'))
    }

    fn truthy(value: &Bson) -> bool {
        match value {
            Bson::Boolean(b) => *b,
            Bson::Int32(i) => *i != 0,
            Bson::Int64(i) => *i != 0,
            Bson::Double(f) => *f != 0.0,
            Bson::Null | Bson::Undefined => false,
            _ => true,
        }
    }
}

/// Walks an [`Expr`] tree.
pub trait QueryVisitor {
    type Output;
    type Error: Into<StoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_nor(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Nor(exprs) => self.visit_nor(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}
