//! In-memory tabular store
//!
//! A [`Table`] is a named, rectangular dataset: ordered named columns, each
//! holding one [`Value`] per row, rows aligned by position. Tables are built
//! by extraction or by a stage transform, reshaped with the operations here,
//! and handed to a destination connector for persistence. All columns of a
//! table have equal length; constructors and row insertion enforce this.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Timestamp with UTC offset
    Timestamp(DateTime<Utc>),
}

/// Target type for an explicit cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Boolean
    Bool,
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// UTF-8 text
    Text,
    /// Timestamp with UTC offset
    Timestamp,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Text => "text",
            ValueType::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

impl Value {
    /// Whether this cell is missing
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The type of a non-null value
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ValueType::Bool),
            Value::Int(_) => Some(ValueType::Int),
            Value::Float(_) => Some(ValueType::Float),
            Value::Text(_) => Some(ValueType::Text),
            Value::Timestamp(_) => Some(ValueType::Timestamp),
        }
    }

    /// Coerce this value to `target`, or `None` if it is not convertible.
    ///
    /// Null passes through unchanged regardless of target: missing cells are
    /// the fill stage's concern, not the cast's.
    pub fn cast(&self, target: ValueType) -> Option<Value> {
        match (self, target) {
            (Value::Null, _) => Some(Value::Null),

            (Value::Bool(b), ValueType::Bool) => Some(Value::Bool(*b)),
            (Value::Int(n), ValueType::Bool) => match n {
                0 => Some(Value::Bool(false)),
                1 => Some(Value::Bool(true)),
                _ => None,
            },
            (Value::Text(s), ValueType::Bool) => s.parse().ok().map(Value::Bool),

            (Value::Int(n), ValueType::Int) => Some(Value::Int(*n)),
            (Value::Float(f), ValueType::Int) => Some(Value::Int(f.trunc() as i64)),
            (Value::Bool(b), ValueType::Int) => Some(Value::Int(*b as i64)),
            // Numeric-looking text may carry a fractional rendering after a
            // storage round trip ("3.0"), so fall back to a float parse.
            (Value::Text(s), ValueType::Int) => s
                .parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
                .map(Value::Int),

            (Value::Float(f), ValueType::Float) => Some(Value::Float(*f)),
            (Value::Int(n), ValueType::Float) => Some(Value::Float(*n as f64)),
            (Value::Text(s), ValueType::Float) => s.parse().ok().map(Value::Float),

            (Value::Text(s), ValueType::Text) => Some(Value::Text(s.clone())),
            (Value::Bool(b), ValueType::Text) => Some(Value::Text(b.to_string())),
            (Value::Int(n), ValueType::Text) => Some(Value::Text(n.to_string())),
            (Value::Float(f), ValueType::Text) => Some(Value::Text(f.to_string())),
            (Value::Timestamp(t), ValueType::Text) => Some(Value::Text(t.to_rfc3339())),

            (Value::Timestamp(t), ValueType::Timestamp) => Some(Value::Timestamp(*t)),
            (Value::Text(s), ValueType::Timestamp) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| Value::Timestamp(t.with_timezone(&Utc))),

            _ => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Timestamp(t) => t.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    values: Vec<Value>,
}

/// A named rectangular dataset
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
}

impl Table {
    /// Create an empty table with no columns
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Build a table from `(column name, values)` pairs.
    ///
    /// Fails if column names collide or column lengths differ.
    pub fn from_columns(
        name: impl Into<String>,
        columns: Vec<(String, Vec<Value>)>,
    ) -> Result<Self> {
        let name = name.into();
        let mut table = Table {
            name: name.clone(),
            columns: Vec::with_capacity(columns.len()),
        };
        for (col_name, values) in columns {
            if table.has_column(&col_name) {
                return Err(Error::Schema {
                    table: name,
                    message: format!("duplicate column '{}'", col_name),
                });
            }
            if let Some(first) = table.columns.first() {
                if first.values.len() != values.len() {
                    return Err(Error::Schema {
                        table: name,
                        message: format!(
                            "column '{}' has {} rows, expected {}",
                            col_name,
                            values.len(),
                            first.values.len()
                        ),
                    });
                }
            }
            table.columns.push(Column {
                name: col_name,
                values,
            });
        }
        Ok(table)
    }

    /// Table name, used for persistence naming
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the same table under a different name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Values of a column, if present
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Iterate `(name, values)` over all columns in order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.values.as_slice()))
    }

    /// One row as an owned vector, positionally aligned with column order.
    ///
    /// Panics if `index` is out of bounds.
    pub fn row(&self, index: usize) -> Vec<Value> {
        self.columns.iter().map(|c| c.values[index].clone()).collect()
    }

    /// Append a row. Fails if the arity does not match the column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::Schema {
                table: self.name.clone(),
                message: format!(
                    "row has {} values, table has {} columns",
                    row.len(),
                    self.columns.len()
                ),
            });
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.values.push(value);
        }
        Ok(())
    }

    /// Project onto the named columns, in the given order.
    ///
    /// Returns a new table with the same row count. Fails if any named
    /// column is absent.
    pub fn project<S: AsRef<str>>(&self, columns: &[S]) -> Result<Table> {
        let mut projected = Vec::with_capacity(columns.len());
        for name in columns {
            let name = name.as_ref();
            let column = self
                .columns
                .iter()
                .find(|c| c.name == name)
                .ok_or_else(|| Error::Schema {
                    table: self.name.clone(),
                    message: format!("column '{}' not found", name),
                })?;
            projected.push(column.clone());
        }
        Ok(Table {
            name: self.name.clone(),
            columns: projected,
        })
    }

    /// Replace null cells in `column` with `value`, in place.
    ///
    /// No-op if the column has no nulls. Idempotent.
    pub fn fill_missing(&mut self, column: &str, value: Value) -> Result<()> {
        let name = self.name.clone();
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == column)
            .ok_or_else(|| Error::Schema {
                table: name,
                message: format!("column '{}' not found", column),
            })?;
        for cell in &mut column.values {
            if cell.is_null() {
                *cell = value.clone();
            }
        }
        Ok(())
    }

    /// Rename columns per the `(old, new)` mapping.
    ///
    /// An old name that is not present is ignored. Fails if a new name
    /// collides with an existing column that is not itself being renamed.
    pub fn rename<S: AsRef<str>>(&mut self, mapping: &[(S, S)]) -> Result<()> {
        for (_, new) in mapping {
            let new = new.as_ref();
            let renamed_away = mapping.iter().any(|(old, _)| old.as_ref() == new);
            if self.has_column(new) && !renamed_away {
                return Err(Error::Schema {
                    table: self.name.clone(),
                    message: format!("rename collides with existing column '{}'", new),
                });
            }
        }
        for column in &mut self.columns {
            if let Some((_, new)) = mapping.iter().find(|(old, _)| old.as_ref() == column.name) {
                column.name = new.as_ref().to_string();
            }
        }
        Ok(())
    }

    /// Coerce every value of `column` to `target`, in place.
    ///
    /// Fails on the first unconvertible value. Nulls pass through.
    pub fn cast(&mut self, column: &str, target: ValueType) -> Result<()> {
        let name = self.name.clone();
        let col = self
            .columns
            .iter_mut()
            .find(|c| c.name == column)
            .ok_or_else(|| Error::Schema {
                table: name,
                message: format!("column '{}' not found", column),
            })?;
        for cell in &mut col.values {
            *cell = cell.cast(target).ok_or_else(|| Error::TypeCoercion {
                column: column.to_string(),
                value: cell.render(),
                target: target.to_string(),
            })?;
        }
        Ok(())
    }

    /// Inner equi-join with `other` on the shared column `on`.
    ///
    /// For each row of `self`, every row of `other` with an equal key value
    /// produces an output row (cross-product of matches); rows without a
    /// match on either side are dropped, as are null keys. Key values are
    /// compared exactly, with no implicit coercion: `Int(3)` does not match
    /// `Float(3.0)` unless a cast has been applied first.
    ///
    /// Output columns are `self`'s followed by `other`'s minus the duplicate
    /// join key. Fails if the key is missing on either side or a non-key
    /// column name appears in both tables.
    pub fn join(&self, other: &Table, on: &str) -> Result<Table> {
        let left_key = self.column(on).ok_or_else(|| Error::Schema {
            table: self.name.clone(),
            message: format!("join column '{}' not found", on),
        })?;
        let right_key = other.column(on).ok_or_else(|| Error::Schema {
            table: other.name.clone(),
            message: format!("join column '{}' not found", on),
        })?;

        let right_columns: Vec<&Column> =
            other.columns.iter().filter(|c| c.name != on).collect();
        for column in &right_columns {
            if self.has_column(&column.name) {
                return Err(Error::Schema {
                    table: self.name.clone(),
                    message: format!("column '{}' exists on both sides of the join", column.name),
                });
            }
        }

        let mut joined = Table {
            name: self.name.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: Vec::new(),
                })
                .chain(right_columns.iter().map(|c| Column {
                    name: c.name.clone(),
                    values: Vec::new(),
                }))
                .collect(),
        };

        for (i, key) in left_key.iter().enumerate() {
            if key.is_null() {
                continue;
            }
            for (j, other_key) in right_key.iter().enumerate() {
                if key != other_key {
                    continue;
                }
                let mut row = self.row(i);
                row.extend(right_columns.iter().map(|c| c.values[j].clone()));
                joined.push_row(row)?;
            }
        }
        Ok(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_columns(
            "products",
            vec![
                (
                    "key".to_string(),
                    vec![Value::Int(1), Value::Int(2), Value::Int(3)],
                ),
                (
                    "name".to_string(),
                    vec![
                        Value::Text("bike".to_string()),
                        Value::Text("helmet".to_string()),
                        Value::Text("lock".to_string()),
                    ],
                ),
                (
                    "price".to_string(),
                    vec![Value::Float(99.5), Value::Null, Value::Float(12.0)],
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_columns_rejects_ragged_lengths() {
        let result = Table::from_columns(
            "bad",
            vec![
                ("a".to_string(), vec![Value::Int(1)]),
                ("b".to_string(), vec![Value::Int(1), Value::Int(2)]),
            ],
        );
        assert!(matches!(result, Err(Error::Schema { .. })));
    }

    #[test]
    fn test_from_columns_rejects_duplicate_names() {
        let result = Table::from_columns(
            "bad",
            vec![
                ("a".to_string(), vec![Value::Int(1)]),
                ("a".to_string(), vec![Value::Int(2)]),
            ],
        );
        assert!(matches!(result, Err(Error::Schema { .. })));
    }

    #[test]
    fn test_project_preserves_order_and_row_count() {
        let table = sample();
        let projected = table.project(&["name", "key"]).unwrap();
        assert_eq!(projected.column_names(), vec!["name", "key"]);
        assert_eq!(projected.row_count(), 3);
    }

    #[test]
    fn test_project_missing_column_is_schema_error() {
        let table = sample();
        let result = table.project(&["key", "nonexistent"]);
        assert!(matches!(result, Err(Error::Schema { .. })));
    }

    #[test]
    fn test_fill_missing_replaces_nulls() {
        let mut table = sample();
        table
            .fill_missing("price", Value::Text("0".to_string()))
            .unwrap();
        assert_eq!(table.column("price").unwrap()[1], Value::Text("0".to_string()));
        // Non-null cells untouched
        assert_eq!(table.column("price").unwrap()[0], Value::Float(99.5));
    }

    #[test]
    fn test_fill_missing_is_idempotent() {
        let mut once = sample();
        once.fill_missing("price", Value::Float(0.0)).unwrap();
        let mut twice = sample();
        twice.fill_missing("price", Value::Float(0.0)).unwrap();
        twice.fill_missing("price", Value::Float(0.0)).unwrap();
        assert_eq!(once.column("price").unwrap(), twice.column("price").unwrap());
    }

    #[test]
    fn test_rename_then_project_commutes() {
        let renamed_first = {
            let mut t = sample();
            t.rename(&[("name", "product_name")]).unwrap();
            t.project(&["product_name", "key"]).unwrap()
        };
        let projected_first = {
            let mut t = sample().project(&["name", "key"]).unwrap();
            t.rename(&[("name", "product_name")]).unwrap();
            t
        };
        assert_eq!(renamed_first.column_names(), projected_first.column_names());
        assert_eq!(
            renamed_first.column("product_name").unwrap(),
            projected_first.column("product_name").unwrap()
        );
    }

    #[test]
    fn test_rename_collision_is_schema_error() {
        let mut table = sample();
        let result = table.rename(&[("name", "price")]);
        assert!(matches!(result, Err(Error::Schema { .. })));
    }

    #[test]
    fn test_rename_swap_is_allowed() {
        let mut table = sample();
        table
            .rename(&[("name", "price"), ("price", "name")])
            .unwrap();
        assert_eq!(table.column_names(), vec!["key", "price", "name"]);
    }

    #[test]
    fn test_rename_unknown_old_name_is_noop() {
        let mut table = sample();
        table.rename(&[("missing", "whatever")]).unwrap();
        assert_eq!(table.column_names(), vec!["key", "name", "price"]);
    }

    #[test]
    fn test_cast_float_and_text_to_int() {
        let mut table = Table::from_columns(
            "t",
            vec![(
                "k".to_string(),
                vec![
                    Value::Float(3.0),
                    Value::Text("0".to_string()),
                    Value::Text("7.0".to_string()),
                    Value::Null,
                ],
            )],
        )
        .unwrap();
        table.cast("k", ValueType::Int).unwrap();
        assert_eq!(
            table.column("k").unwrap(),
            &[Value::Int(3), Value::Int(0), Value::Int(7), Value::Null]
        );
    }

    #[test]
    fn test_cast_unconvertible_value_is_coercion_error() {
        let mut table = Table::from_columns(
            "t",
            vec![("k".to_string(), vec![Value::Text("NA".to_string())])],
        )
        .unwrap();
        let result = table.cast("k", ValueType::Int);
        assert!(matches!(result, Err(Error::TypeCoercion { .. })));
    }

    #[test]
    fn test_join_is_inner() {
        let left = Table::from_columns(
            "l",
            vec![
                ("k".to_string(), vec![Value::Int(1), Value::Int(2)]),
                (
                    "a".to_string(),
                    vec![Value::Text("x".to_string()), Value::Text("y".to_string())],
                ),
            ],
        )
        .unwrap();
        let right = Table::from_columns(
            "r",
            vec![
                ("k".to_string(), vec![Value::Int(2), Value::Int(3)]),
                (
                    "b".to_string(),
                    vec![Value::Text("p".to_string()), Value::Text("q".to_string())],
                ),
            ],
        )
        .unwrap();
        let joined = left.join(&right, "k").unwrap();
        assert_eq!(joined.column_names(), vec!["k", "a", "b"]);
        assert_eq!(joined.row_count(), 1);
        assert_eq!(joined.column("k").unwrap(), &[Value::Int(2)]);
    }

    #[test]
    fn test_join_cross_product_on_duplicate_keys() {
        let left = Table::from_columns(
            "l",
            vec![("k".to_string(), vec![Value::Int(1), Value::Int(1)])],
        )
        .unwrap();
        let right = Table::from_columns(
            "r",
            vec![
                ("k".to_string(), vec![Value::Int(1), Value::Int(1)]),
                ("b".to_string(), vec![Value::Int(10), Value::Int(20)]),
            ],
        )
        .unwrap();
        let joined = left.join(&right, "k").unwrap();
        assert_eq!(joined.row_count(), 4);
    }

    #[test]
    fn test_join_does_not_coerce_key_types() {
        let left = Table::from_columns(
            "l",
            vec![("k".to_string(), vec![Value::Float(3.0)])],
        )
        .unwrap();
        let right = Table::from_columns(
            "r",
            vec![("k".to_string(), vec![Value::Int(3)])],
        )
        .unwrap();
        // Without an explicit cast the key types differ and nothing matches.
        let joined = left.join(&right, "k").unwrap();
        assert_eq!(joined.row_count(), 0);

        let mut cast_left = left.clone();
        cast_left.cast("k", ValueType::Int).unwrap();
        let joined = cast_left.join(&right, "k").unwrap();
        assert_eq!(joined.row_count(), 1);
    }

    #[test]
    fn test_join_skips_null_keys() {
        let left = Table::from_columns(
            "l",
            vec![("k".to_string(), vec![Value::Null, Value::Int(1)])],
        )
        .unwrap();
        let right = Table::from_columns(
            "r",
            vec![("k".to_string(), vec![Value::Null, Value::Int(1)])],
        )
        .unwrap();
        let joined = left.join(&right, "k").unwrap();
        assert_eq!(joined.row_count(), 1);
    }

    #[test]
    fn test_chained_join_drops_unmatched_everywhere() {
        let a = Table::from_columns(
            "a",
            vec![
                ("k1".to_string(), vec![Value::Int(1), Value::Int(2)]),
                ("k2".to_string(), vec![Value::Int(10), Value::Int(20)]),
            ],
        )
        .unwrap();
        let b = Table::from_columns(
            "b",
            vec![("k1".to_string(), vec![Value::Int(1), Value::Int(2)])],
        )
        .unwrap();
        // Only k2 = 10 exists in c, so row two of a must be dropped even
        // though it matched b.
        let c = Table::from_columns(
            "c",
            vec![
                ("k2".to_string(), vec![Value::Int(10)]),
                ("extra".to_string(), vec![Value::Int(0)]),
            ],
        )
        .unwrap();
        let joined = a.join(&b, "k1").unwrap().join(&c, "k2").unwrap();
        assert_eq!(joined.row_count(), 1);
        assert_eq!(joined.column("k1").unwrap(), &[Value::Int(1)]);
    }

    #[test]
    fn test_push_row_arity_mismatch() {
        let mut table = sample();
        let result = table.push_row(vec![Value::Int(4)]);
        assert!(matches!(result, Err(Error::Schema { .. })));
    }
}
