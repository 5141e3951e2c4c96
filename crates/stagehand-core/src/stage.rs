//! Per-table staging policies
//!
//! A [`StagePolicy`] turns one raw extracted table into a cleaned staging
//! table. The order of operations is fixed: project onto the kept columns,
//! fill nulls, rename. Policies are plain configuration and can be declared
//! in job YAML; the product-dimension policies ship as built-ins.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::table::{Table, Value};

/// Replace nulls in `column` with a fixed value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillRule {
    /// Column to fill
    pub column: String,
    /// Fill value, applied as text
    pub value: String,
}

/// Rename `from` to `to`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameRule {
    /// Existing column name
    pub from: String,
    /// New column name
    pub to: String,
}

/// Cleaning policy for one source table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagePolicy {
    /// Source table the policy applies to
    pub table: String,
    /// Columns to keep, in output order
    pub keep: Vec<String>,
    /// Null fills, applied after projection
    #[serde(default)]
    pub fill: Vec<FillRule>,
    /// Renames, applied last
    #[serde(default)]
    pub rename: Vec<RenameRule>,
}

impl StagePolicy {
    /// Apply the policy: project, then fill, then rename.
    pub fn apply(&self, table: &Table) -> Result<Table> {
        let mut staged = table.project(&self.keep)?;
        for rule in &self.fill {
            staged.fill_missing(&rule.column, Value::Text(rule.value.clone()))?;
        }
        let mapping: Vec<(&str, &str)> = self
            .rename
            .iter()
            .map(|r| (r.from.as_str(), r.to.as_str()))
            .collect();
        staged.rename(&mapping)?;
        Ok(staged)
    }
}

fn fill(column: &str, value: &str) -> FillRule {
    FillRule {
        column: column.to_string(),
        value: value.to_string(),
    }
}

fn rename(from: &str, to: &str) -> RenameRule {
    RenameRule {
        from: from.to_string(),
        to: to.to_string(),
    }
}

/// Built-in policies for the product dimension tables.
///
/// Numeric-like columns are filled with `"0"` and categorical columns with
/// `"NA"`; the `English*` column names are normalized.
pub fn product_dimension_policies() -> Vec<StagePolicy> {
    vec![
        StagePolicy {
            table: "DimProduct".to_string(),
            keep: [
                "ProductKey",
                "ProductAlternateKey",
                "ProductSubcategoryKey",
                "WeightUnitMeasureCode",
                "SizeUnitMeasureCode",
                "EnglishProductName",
                "StandardCost",
                "FinishedGoodsFlag",
                "Color",
                "SafetyStockLevel",
                "ReorderPoint",
                "ListPrice",
                "Size",
                "SizeRange",
                "Weight",
                "DaysToManufacture",
                "ProductLine",
                "DealerPrice",
                "Class",
                "Style",
                "ModelName",
                "EnglishDescription",
                "StartDate",
                "EndDate",
                "Status",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            fill: vec![
                fill("WeightUnitMeasureCode", "0"),
                fill("ProductSubcategoryKey", "0"),
                fill("SizeUnitMeasureCode", "0"),
                fill("StandardCost", "0"),
                fill("ListPrice", "0"),
                fill("ProductLine", "NA"),
                fill("Class", "NA"),
                fill("Style", "NA"),
                fill("Size", "NA"),
                fill("ModelName", "NA"),
                fill("EnglishDescription", "NA"),
                fill("DealerPrice", "0"),
                fill("Weight", "0"),
            ],
            rename: vec![
                rename("EnglishDescription", "Description"),
                rename("EnglishProductName", "ProductName"),
            ],
        },
        StagePolicy {
            table: "DimProductSubcategory".to_string(),
            keep: [
                "ProductSubcategoryKey",
                "EnglishProductSubcategoryName",
                "ProductSubcategoryAlternateKey",
                "ProductCategoryKey",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            fill: vec![],
            rename: vec![rename(
                "EnglishProductSubcategoryName",
                "ProductSubcategoryName",
            )],
        },
        StagePolicy {
            table: "DimProductCategory".to_string(),
            keep: [
                "ProductCategoryKey",
                "ProductCategoryAlternateKey",
                "EnglishProductCategoryName",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            fill: vec![],
            rename: vec![rename("EnglishProductCategoryName", "ProductCategoryName")],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn raw_subcategory() -> Table {
        Table::from_columns(
            "DimProductSubcategory",
            vec![
                (
                    "ProductSubcategoryKey".to_string(),
                    vec![Value::Int(1), Value::Int(2)],
                ),
                (
                    "EnglishProductSubcategoryName".to_string(),
                    vec![
                        Value::Text("Mountain Bikes".to_string()),
                        Value::Text("Road Bikes".to_string()),
                    ],
                ),
                (
                    "ProductSubcategoryAlternateKey".to_string(),
                    vec![Value::Int(1), Value::Int(2)],
                ),
                (
                    "ProductCategoryKey".to_string(),
                    vec![Value::Int(1), Value::Int(1)],
                ),
                (
                    "SpanishProductSubcategoryName".to_string(),
                    vec![Value::Null, Value::Null],
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_parse_policy_yaml() {
        let yaml = r#"
table: DimProduct
keep:
  - ProductKey
  - EnglishProductName
fill:
  - column: EnglishProductName
    value: "NA"
rename:
  - from: EnglishProductName
    to: ProductName
"#;
        let policy: StagePolicy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(policy.table, "DimProduct");
        assert_eq!(policy.keep.len(), 2);
        assert_eq!(policy.fill[0].value, "NA");
        assert_eq!(policy.rename[0].to, "ProductName");
    }

    #[test]
    fn test_parse_policy_defaults() {
        let yaml = r#"
table: DimProductCategory
keep:
  - ProductCategoryKey
"#;
        let policy: StagePolicy = serde_yaml::from_str(yaml).unwrap();
        assert!(policy.fill.is_empty());
        assert!(policy.rename.is_empty());
    }

    #[test]
    fn test_apply_projects_fills_renames() {
        let policy = &product_dimension_policies()[1];
        let staged = policy.apply(&raw_subcategory()).unwrap();
        assert_eq!(
            staged.column_names(),
            vec![
                "ProductSubcategoryKey",
                "ProductSubcategoryName",
                "ProductSubcategoryAlternateKey",
                "ProductCategoryKey",
            ]
        );
        // Untranslated column dropped by the projection
        assert!(!staged.has_column("SpanishProductSubcategoryName"));
        assert_eq!(staged.row_count(), 2);
    }

    #[test]
    fn test_apply_fills_null_key_with_zero_text() {
        let policy = StagePolicy {
            table: "DimProduct".to_string(),
            keep: vec!["ProductKey".to_string(), "ProductSubcategoryKey".to_string()],
            fill: vec![fill("ProductSubcategoryKey", "0")],
            rename: vec![],
        };
        let raw = Table::from_columns(
            "DimProduct",
            vec![
                ("ProductKey".to_string(), vec![Value::Int(100)]),
                ("ProductSubcategoryKey".to_string(), vec![Value::Null]),
            ],
        )
        .unwrap();
        let staged = policy.apply(&raw).unwrap();
        assert_eq!(
            staged.column("ProductSubcategoryKey").unwrap(),
            &[Value::Text("0".to_string())]
        );
    }

    #[test]
    fn test_apply_missing_kept_column_fails() {
        let policy = &product_dimension_policies()[2];
        let raw = Table::from_columns(
            "DimProductCategory",
            vec![("ProductCategoryKey".to_string(), vec![Value::Int(1)])],
        )
        .unwrap();
        assert!(policy.apply(&raw).is_err());
    }

    #[test]
    fn test_builtin_product_policy_shape() {
        let policies = product_dimension_policies();
        assert_eq!(policies.len(), 3);
        let product = &policies[0];
        assert_eq!(product.keep.len(), 25);
        assert_eq!(product.fill.len(), 13);
        assert!(product.rename.iter().any(|r| r.to == "Description"));
    }
}
