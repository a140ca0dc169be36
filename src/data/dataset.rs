use std::collections::HashMap;

use faer::Col;

use super::error::DataError;
use super::value::Value;
use crate::core::NaInfo;

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every non-missing cell is a number.
    Numeric,
    /// At least one non-missing cell is text; levels are enumerable.
    Categorical,
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Build a float column; NaN becomes a missing cell.
    pub fn from_f64(name: impl Into<String>, values: &[f64]) -> Self {
        Self::new(name, values.iter().map(|&v| Value::from(v)).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn kind(&self) -> ColumnKind {
        if self
            .values
            .iter()
            .all(|v| v.is_null() || v.is_numeric())
        {
            ColumnKind::Numeric
        } else {
            ColumnKind::Categorical
        }
    }

    /// True when the column has no non-missing value at all.
    pub fn is_entirely_missing(&self) -> bool {
        self.values.iter().all(Value::is_null)
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }
}

/// A table of uniquely named, equally long columns in a fixed row order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    positions: HashMap<String, usize>,
    n_rows: usize,
}

impl Dataset {
    /// Assemble a dataset, checking name uniqueness and equal lengths.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, DataError> {
        let mut dataset = Dataset::default();
        for column in columns {
            dataset.push_column(column)?;
        }
        Ok(dataset)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&Column, DataError> {
        self.positions
            .get(name)
            .map(|&i| &self.columns[i])
            .ok_or_else(|| DataError::UnknownColumn(name.to_string()))
    }

    /// Append a column at the right edge.
    pub fn push_column(&mut self, column: Column) -> Result<(), DataError> {
        if self.positions.contains_key(&column.name) {
            return Err(DataError::DuplicateColumn(column.name));
        }
        if self.columns.is_empty() {
            self.n_rows = column.len();
        } else if column.len() != self.n_rows {
            let got = column.len();
            return Err(DataError::LengthMismatch {
                column: column.name,
                expected: self.n_rows,
                got,
            });
        }
        self.positions.insert(column.name.clone(), self.columns.len());
        self.columns.push(column);
        Ok(())
    }

    /// Replace the cells of an existing column.
    pub fn replace_column(&mut self, column: Column) -> Result<(), DataError> {
        let idx = *self
            .positions
            .get(&column.name)
            .ok_or_else(|| DataError::UnknownColumn(column.name.clone()))?;
        if column.len() != self.n_rows {
            let got = column.len();
            return Err(DataError::LengthMismatch {
                column: column.name,
                expected: self.n_rows,
                got,
            });
        }
        self.columns[idx] = column;
        Ok(())
    }

    /// Keep only the named columns, in the given order. Repeated names are kept once.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Dataset, DataError> {
        let mut selected = Dataset::default();
        for name in names {
            let name = name.as_ref();
            if selected.has_column(name) {
                continue;
            }
            selected.push_column(self.column(name)?.clone())?;
        }
        if selected.columns.is_empty() {
            selected.n_rows = self.n_rows;
        }
        Ok(selected)
    }

    /// Keep the rows at `rows`, in that order.
    pub fn take_rows(&self, rows: &[usize]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                Column::new(c.name.clone(), rows.iter().map(|&r| c.values[r].clone()).collect())
            })
            .collect();
        Dataset {
            columns,
            positions: self.positions.clone(),
            n_rows: rows.len(),
        }
    }

    /// Complete-case filter: drop every row with a missing cell in any of `fields`.
    pub fn drop_incomplete<S: AsRef<str>>(
        &self,
        fields: &[S],
    ) -> Result<(Dataset, NaInfo), DataError> {
        let cols = fields
            .iter()
            .map(|f| self.column(f.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut kept = Vec::with_capacity(self.n_rows);
        let mut dropped = Vec::new();
        for row in 0..self.n_rows {
            if cols.iter().any(|c| c.values[row].is_null()) {
                dropped.push(row);
            } else {
                kept.push(row);
            }
        }

        let info = NaInfo::new(self.n_rows, dropped);
        Ok((self.take_rows(&kept), info))
    }

    /// Numeric cells of a column. Missing cells become NaN; text is an error.
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>, DataError> {
        let column = self.column(name)?;
        column
            .values
            .iter()
            .enumerate()
            .map(|(row, v)| match v {
                v if v.is_null() => Ok(f64::NAN),
                v => v.as_f64().ok_or_else(|| DataError::NonNumeric {
                    column: name.to_string(),
                    row,
                    value: v.to_string(),
                }),
            })
            .collect()
    }

    /// Numeric column as a faer vector.
    pub fn numeric_column(&self, name: &str) -> Result<Col<f64>, DataError> {
        let values = self.numeric_values(name)?;
        Ok(Col::from_fn(values.len(), |i| values[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_columns(vec![
            Column::new("year", vec![Value::Integer(2019), Value::Integer(2020), Value::Null]),
            Column::from_f64("x", &[1.0, f64::NAN, 3.0]),
            Column::new("city", vec!["a".into(), "b".into(), "c".into()]),
        ])
        .unwrap()
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut ds = sample();
        let err = ds.push_column(Column::from_f64("x", &[0.0, 0.0, 0.0]));
        assert!(matches!(err, Err(DataError::DuplicateColumn(name)) if name == "x"));
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut ds = sample();
        let err = ds.push_column(Column::from_f64("z", &[0.0]));
        assert!(matches!(
            err,
            Err(DataError::LengthMismatch { ref column, got: 1, .. }) if column == "z"
        ));
    }

    #[test]
    fn test_replace_with_wrong_length_rejected() {
        let mut ds = sample();
        let err = ds.replace_column(Column::from_f64("x", &[0.0])).unwrap_err();
        assert!(matches!(
            err,
            DataError::LengthMismatch { ref column, expected: 3, got: 1 } if column == "x"
        ));
    }

    #[test]
    fn test_column_kinds() {
        let ds = sample();
        assert_eq!(ds.column("year").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(ds.column("x").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(ds.column("city").unwrap().kind(), ColumnKind::Categorical);
    }

    #[test]
    fn test_drop_incomplete_counts_rows() {
        let ds = sample();
        let (clean, info) = ds.drop_incomplete(&["year", "x"]).unwrap();
        assert_eq!(clean.n_rows(), 1);
        assert_eq!(info.dropped_rows, vec![1, 2]);
        assert_eq!(info.n_complete(), 1);

        let (clean, info) = ds.drop_incomplete(&["city"]).unwrap();
        assert_eq!(clean.n_rows(), 3);
        assert!(!info.has_missing());
    }

    #[test]
    fn test_select_preserves_order_and_skips_repeats() {
        let ds = sample();
        let sel = ds.select(&["city", "year", "city"]).unwrap();
        assert_eq!(sel.column_names(), vec!["city", "year"]);
        assert!(ds.select(&["missing"]).is_err());
    }

    #[test]
    fn test_numeric_values_reject_text() {
        let ds = sample();
        let x = ds.numeric_values("x").unwrap();
        assert!(x[1].is_nan());
        assert!(matches!(
            ds.numeric_values("city"),
            Err(DataError::NonNumeric { .. })
        ));
    }
}
