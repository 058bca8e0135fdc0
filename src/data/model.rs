use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use serde_json::{Map, Value as JsonValue};

// ---------------------------------------------------------------------------
// CellValue – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed scalar mirroring what a Pandas record holds.
/// Labels are encoded through `HashMap<CellValue, _>`, so `CellValue` must be
/// `Eq + Hash`; floats compare by `total_cmp`.
#[derive(Debug, Clone)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can key maps by CellValue --

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.4}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl From<&JsonValue> for CellValue {
    fn from(val: &JsonValue) -> Self {
        match val {
            JsonValue::String(s) => CellValue::String(s.clone()),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CellValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    CellValue::Float(f)
                } else {
                    CellValue::String(n.to_string())
                }
            }
            JsonValue::Bool(b) => CellValue::Bool(*b),
            JsonValue::Null => CellValue::Null,
            other => CellValue::String(other.to_string()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Integer(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::String(v.to_string())
    }
}

impl CellValue {
    /// Try to interpret the value as an `f64` for feature matrices and charts.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatasetError {
    #[error("invalid column set: {missing:?} not present in the dataset")]
    InvalidColumnSet { missing: Vec<String> },

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("row {row}: keys do not match the column list ({detail})")]
    SchemaMismatch { row: usize, detail: String },

    #[error("row {row}, column '{column}': value {value} is not numeric")]
    NonNumericValue {
        row: usize,
        column: String,
        value: String,
    },
}

// ---------------------------------------------------------------------------
// Dataset – columns + positional rows
// ---------------------------------------------------------------------------

/// A rectangular table whose rows are stored positionally against `columns`.
///
/// The conformance check runs once, when the dataset is built from records;
/// afterwards every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// Build a dataset from an ordered column list and row-major records.
    ///
    /// Every record's key set must equal `columns` exactly.
    pub fn from_records(
        columns: Vec<String>,
        records: &[Map<String, JsonValue>],
    ) -> Result<Self, DatasetError> {
        check_unique(&columns)?;

        let mut rows = Vec::with_capacity(records.len());
        for (i, rec) in records.iter().enumerate() {
            if rec.len() != columns.len() {
                return Err(DatasetError::SchemaMismatch {
                    row: i,
                    detail: format!("expected {} keys, got {}", columns.len(), rec.len()),
                });
            }
            let row = columns
                .iter()
                .map(|col| {
                    rec.get(col).map(CellValue::from).ok_or_else(|| {
                        DatasetError::SchemaMismatch {
                            row: i,
                            detail: format!("missing key '{col}'"),
                        }
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }

        Ok(Dataset { columns, rows })
    }

    /// Build a dataset from positional rows (each row ordered like `columns`).
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, DatasetError> {
        check_unique(&columns)?;
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(DatasetError::SchemaMismatch {
                row: i,
                detail: format!("expected {} cells, got {}", columns.len(), row.len()),
            });
        }
        Ok(Dataset { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// `(row count, column count)`, derived from the stored rows and columns.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, if present.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Resolve column names to positions, failing on any absent name.
    pub fn column_indices(&self, columns: &[String]) -> Result<Vec<usize>, DatasetError> {
        check_unique(columns)?;
        let missing: Vec<String> = columns
            .iter()
            .filter(|c| self.column_index(c).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(DatasetError::InvalidColumnSet { missing });
        }
        Ok(columns
            .iter()
            .filter_map(|c| self.column_index(c))
            .collect())
    }

    /// Keep only `columns` (in the given order), preserving row order and count.
    pub fn project(&self, columns: &[String]) -> Result<Dataset, DatasetError> {
        let indices = self.column_indices(columns)?;
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&j| row[j].clone()).collect())
            .collect();
        Ok(Dataset {
            columns: columns.to_vec(),
            rows,
        })
    }

    /// Row-major numeric matrix of `columns`, values ordered as given.
    pub fn to_feature_matrix(&self, columns: &[String]) -> Result<Vec<Vec<f64>>, DatasetError> {
        let indices = self.column_indices(columns)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                indices
                    .iter()
                    .map(|&j| {
                        row[j].as_f64().ok_or_else(|| DatasetError::NonNumericValue {
                            row: i,
                            column: self.columns[j].clone(),
                            value: row[j].to_string(),
                        })
                    })
                    .collect()
            })
            .collect()
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, column: &str) -> Option<Vec<CellValue>> {
        let j = self.column_index(column)?;
        Some(self.rows.iter().map(|row| row[j].clone()).collect())
    }

    /// Row-major records for the wire, keys in column order.
    pub fn to_records(&self) -> Vec<Map<String, JsonValue>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(col, cell)| (col.clone(), cell_to_json(cell)))
                    .collect()
            })
            .collect()
    }
}

fn cell_to_json(cell: &CellValue) -> JsonValue {
    match cell {
        CellValue::String(s) => JsonValue::String(s.clone()),
        CellValue::Integer(i) => JsonValue::from(*i),
        // Non-finite floats have no JSON form.
        CellValue::Float(v) => serde_json::Number::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        CellValue::Bool(b) => JsonValue::Bool(*b),
        CellValue::Null => JsonValue::Null,
    }
}

fn check_unique(columns: &[String]) -> Result<(), DatasetError> {
    let mut seen = HashSet::with_capacity(columns.len());
    for col in columns {
        if !seen.insert(col.as_str()) {
            return Err(DatasetError::DuplicateColumn(col.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: JsonValue) -> Vec<Map<String, JsonValue>> {
        values
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn sample() -> Dataset {
        let cols = vec!["age".to_string(), "income".to_string(), "label".to_string()];
        let recs = records(json!([
            {"age": 31, "income": 52000.5, "label": "yes"},
            {"age": 45, "income": 61000.0, "label": "no"},
            {"age": 27, "income": null, "label": "yes"},
        ]));
        Dataset::from_records(cols, &recs).unwrap()
    }

    #[test]
    fn shape_is_derived_from_rows_and_columns() {
        let ds = sample();
        assert_eq!(ds.shape(), (3, 3));
        assert_eq!(ds.rows()[2][1], CellValue::Null);
    }

    #[test]
    fn records_must_match_columns_exactly() {
        let cols = vec!["a".to_string(), "b".to_string()];
        let extra = records(json!([{"a": 1, "b": 2, "c": 3}]));
        assert!(matches!(
            Dataset::from_records(cols.clone(), &extra),
            Err(DatasetError::SchemaMismatch { row: 0, .. })
        ));

        let renamed = records(json!([{"a": 1, "b": 2}, {"a": 1, "x": 2}]));
        assert!(matches!(
            Dataset::from_records(cols, &renamed),
            Err(DatasetError::SchemaMismatch { row: 1, .. })
        ));
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let cols = vec!["a".to_string(), "a".to_string()];
        assert_eq!(
            Dataset::from_rows(cols, vec![]),
            Err(DatasetError::DuplicateColumn("a".into()))
        );
    }

    #[test]
    fn project_keeps_requested_order_and_row_count() {
        let ds = sample();
        let subset = vec!["label".to_string(), "age".to_string()];
        let projected = ds.project(&subset).unwrap();
        assert_eq!(projected.columns(), subset.as_slice());
        assert_eq!(projected.len(), ds.len());
        assert_eq!(projected.rows()[1][0], CellValue::from("no"));
        assert_eq!(projected.rows()[1][1], CellValue::Integer(45));
    }

    #[test]
    fn project_rejects_unknown_columns() {
        let err = sample().project(&["age".to_string(), "zip".to_string()]).unwrap_err();
        assert_eq!(
            err,
            DatasetError::InvalidColumnSet {
                missing: vec!["zip".into()]
            }
        );
    }

    #[test]
    fn feature_matrix_requires_numbers() {
        let ds = sample();
        let m = ds.to_feature_matrix(&["age".to_string()]).unwrap();
        assert_eq!(m, vec![vec![31.0], vec![45.0], vec![27.0]]);

        let err = ds.to_feature_matrix(&["income".to_string()]).unwrap_err();
        assert!(matches!(err, DatasetError::NonNumericValue { row: 2, .. }));
    }

    #[test]
    fn records_keep_column_order() {
        let ds = sample().project(&["label".to_string(), "age".to_string()]).unwrap();
        let recs = ds.to_records();
        let keys: Vec<&String> = recs[0].keys().collect();
        assert_eq!(keys, vec!["label", "age"]);
        assert_eq!(recs[0]["age"], json!(31));
    }

    #[test]
    fn float_cells_compare_totally() {
        assert_eq!(CellValue::Float(f64::NAN), CellValue::Float(f64::NAN));
        assert_ne!(CellValue::Integer(1), CellValue::Float(1.0));
    }
}
