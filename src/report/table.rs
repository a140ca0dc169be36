//! Labelled numeric tables written as CSV.

use std::fs::File;
use std::path::Path;

use csv::{Writer, WriterBuilder};

use super::ReportError;

/// Header of an index level that has no name of its own.
pub const INDEX_HEADER: &str = "Parameters";

/// A table with one or more index columns and numeric data columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Sub-result label, used in file names and the summary CSV.
    pub label: String,
    pub index_names: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<(Vec<String>, Vec<f64>)>,
}

impl Table {
    pub fn new(label: impl Into<String>, index_names: Vec<String>, columns: Vec<String>) -> Self {
        Self {
            label: label.into(),
            index_names,
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, keys: Vec<String>, values: Vec<f64>) {
        self.rows.push((keys, values));
    }

    /// Round every value to `places` decimals.
    pub fn round(&mut self, places: usize) {
        for (_, values) in &mut self.rows {
            for v in values.iter_mut() {
                *v = round_to(*v, places);
            }
        }
    }

    pub fn header(&self) -> Vec<String> {
        self.index_names.iter().chain(&self.columns).cloned().collect()
    }

    fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().map(|(keys, values)| {
            keys.iter()
                .cloned()
                .chain(values.iter().map(|v| format_cell(*v)))
                .collect()
        })
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), ReportError> {
        let mut writer = open_writer(path)?;
        writer.write_record(self.header())?;
        for record in self.records() {
            writer.write_record(record)?;
        }
        flush(writer, path)
    }
}

/// Round half away from zero to `places` decimals. Non-finite values pass through.
pub fn round_to(value: f64, places: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(places as i32);
    let rounded = (value * factor).round() / factor;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

/// Missing values are written as empty cells.
fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

fn open_writer(path: &Path) -> Result<Writer<File>, ReportError> {
    let file = File::create(path).map_err(|source| ReportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(WriterBuilder::new().flexible(true).from_writer(file))
}

fn flush(mut writer: Writer<File>, path: &Path) -> Result<(), ReportError> {
    writer.flush().map_err(|source| ReportError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Write every table into one CSV.
///
/// A single table labelled `show_name` is written unchanged. Otherwise the
/// tables are stacked under a leading label column, with a header line
/// wherever the column layout changes.
pub fn write_summary_csv(
    path: &Path,
    tables: &[Table],
    show_name: &str,
) -> Result<(), ReportError> {
    if let [only] = tables {
        if only.label == show_name {
            return only.write_csv(path);
        }
    }

    let mut writer = open_writer(path)?;
    let mut last_header: Option<Vec<String>> = None;
    for table in tables {
        let header = table.header();
        if last_header.as_ref() != Some(&header) {
            writer.write_record(std::iter::once(String::new()).chain(header.iter().cloned()))?;
            last_header = Some(header);
        }
        for record in table.records() {
            writer.write_record(std::iter::once(table.label.clone()).chain(record))?;
        }
    }
    flush(writer, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn table(label: &str) -> Table {
        let mut t = Table::new(
            label,
            vec![INDEX_HEADER.to_string()],
            vec!["mean".into(), "std".into()],
        );
        t.push_row(vec!["x".into()], vec![1.23456, f64::NAN]);
        t.push_row(vec!["y".into()], vec![2.0, 0.5]);
        t
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 3), 1.235);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert!(round_to(f64::NAN, 2).is_nan());
    }

    #[test]
    fn test_write_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let mut t = table("pearson");
        t.round(3);
        t.write_csv(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Parameters,mean,std\nx,1.235,\ny,2,0.5\n");
    }

    #[test]
    fn test_summary_stacks_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sum.csv");
        write_summary_csv(&path, &[table("a"), table("b")], "Show").unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ",Parameters,mean,std");
        assert_eq!(lines.len(), 5);
        assert!(lines[3].starts_with("b,x,"));
    }

    #[test]
    fn test_summary_of_single_named_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sum.csv");
        write_summary_csv(&path, &[table("Show")], "Show").unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Parameters,mean,std\n"));
    }
}
