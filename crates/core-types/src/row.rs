use crate::error::CoreError;
use crate::value::Value;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::sync::Arc;

/// One record of a result set: column names paired with decoded values.
///
/// The column list is shared between every row of the same result set, so the
/// keys of a row are exactly the query's projection, in projection order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Pairs a projection with one tuple of values.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Result<Self, CoreError> {
        if columns.len() != values.len() {
            return Err(CoreError::ColumnMismatch {
                columns: columns.len(),
                values: values.len(),
            });
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Iterates `(column, value)` pairs in projection order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// The ordered rows produced by one query execution.
///
/// An empty set is a successful query that matched nothing; a failed query
/// never produces a `ResultSet` at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row, rejecting it if its projection differs from the rows
    /// already in the set.
    pub fn push(&mut self, row: Row) -> Result<(), CoreError> {
        if let Some(first) = self.rows.first() {
            if first.columns() != row.columns() {
                return Err(CoreError::InvalidInput(
                    "row".to_string(),
                    format!(
                        "projection {:?} does not match {:?}",
                        row.columns(),
                        first.columns()
                    ),
                ));
            }
        }
        self.rows.push(row);
        Ok(())
    }

    /// The shared projection, or `None` when the set is empty.
    pub fn columns(&self) -> Option<&[String]> {
        self.rows.first().map(Row::columns)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }
}
