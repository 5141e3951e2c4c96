//! Denormalized model specification
//!
//! A [`ModelSpec`] declares how staged tables merge into one reporting
//! table: a base table, the casts its join keys need, and a chain of inner
//! equi-joins. Casts are mandatory inputs to the join, never implicit; a
//! staged key that round-tripped through the destination as a float will
//! silently match nothing without one.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::table::{Table, ValueType};

/// Cast a column of the base table before joining
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastRule {
    /// Column to cast
    pub column: String,
    /// Target type
    pub to: ValueType,
}

/// One step of the join chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRule {
    /// Staged table to join against
    pub table: String,
    /// Shared key column
    pub on: String,
}

/// Specification of a denormalized reporting table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Model name, used for persistence naming
    pub name: String,
    /// Base staged table
    pub base: String,
    /// Casts applied to the base before joining
    #[serde(default)]
    pub cast: Vec<CastRule>,
    /// Join chain, applied in order
    pub joins: Vec<JoinRule>,
}

impl ModelSpec {
    /// Build the model from the staged tables, keyed by source table name.
    ///
    /// Any cast failure or missing table/key aborts the build.
    pub fn build(&self, staged: &HashMap<String, Table>) -> Result<Table> {
        let mut model = staged
            .get(&self.base)
            .ok_or_else(|| Error::Schema {
                table: self.base.clone(),
                message: "staged table not loaded".to_string(),
            })?
            .clone();
        for rule in &self.cast {
            model.cast(&rule.column, rule.to)?;
        }
        for join in &self.joins {
            let right = staged.get(&join.table).ok_or_else(|| Error::Schema {
                table: join.table.clone(),
                message: "staged table not loaded".to_string(),
            })?;
            model = model.join(right, &join.on)?;
        }
        Ok(model.with_name(self.name.clone()))
    }

    /// Source table names the model reads: the base, then each join.
    pub fn inputs(&self) -> Vec<&str> {
        std::iter::once(self.base.as_str())
            .chain(self.joins.iter().map(|j| j.table.as_str()))
            .collect()
    }
}

/// Built-in product reporting model: DimProduct joined with its subcategory
/// and category dimensions. The subcategory key comes back float-compatible
/// from staging, so the int cast is required for the join to match.
pub fn product_model() -> ModelSpec {
    ModelSpec {
        name: "ProductModel".to_string(),
        base: "DimProduct".to_string(),
        cast: vec![CastRule {
            column: "ProductSubcategoryKey".to_string(),
            to: ValueType::Int,
        }],
        joins: vec![
            JoinRule {
                table: "DimProductSubcategory".to_string(),
                on: "ProductSubcategoryKey".to_string(),
            },
            JoinRule {
                table: "DimProductCategory".to_string(),
                on: "ProductCategoryKey".to_string(),
            },
        ],
    }
}
