use std::io::Read;
use std::path::Path;

use log::debug;

use super::dataset::{Column, Dataset};
use super::error::DataError;
use super::value::Value;

/// Cell contents treated as missing.
const MISSING_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Read a comma-separated file with a header row.
///
/// Column types are inferred per column: all non-missing cells integers gives
/// an integer column, all parse as floats gives a float column, anything else
/// stays text.
pub fn read_csv(path: &Path) -> Result<Dataset, DataError> {
    if !path.is_file() {
        return Err(DataError::FileNotFound(path.to_path_buf()));
    }
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|source| DataError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    let dataset = parse(reader, path)?;
    debug!(
        "loaded {} rows x {} columns from {}",
        dataset.n_rows(),
        dataset.n_columns(),
        path.display()
    );
    Ok(dataset)
}

/// Parse CSV text already in memory. Mostly useful for tests and fixtures.
pub fn read_csv_str(text: &str) -> Result<Dataset, DataError> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());
    parse(reader, Path::new("<memory>"))
}

fn parse<R: Read>(mut reader: csv::Reader<R>, path: &Path) -> Result<Dataset, DataError> {
    let csv_error = |source| DataError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        for (j, cells) in raw.iter_mut().enumerate() {
            cells.push(record.get(j).unwrap_or("").trim().to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, cells)| Column::new(name, infer_column(&cells)))
        .collect();
    Dataset::from_columns(columns)
}

fn is_missing(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell)
}

fn infer_column(cells: &[String]) -> Vec<Value> {
    let present = || cells.iter().filter(|c| !is_missing(c));

    if present().all(|c| c.parse::<i64>().is_ok()) {
        return cells
            .iter()
            .map(|c| c.parse::<i64>().map_or(Value::Null, Value::Integer))
            .collect();
    }
    if present().all(|c| c.parse::<f64>().is_ok()) {
        return cells
            .iter()
            .map(|c| {
                if is_missing(c) {
                    Value::Null
                } else {
                    c.parse::<f64>().map_or(Value::Null, Value::from)
                }
            })
            .collect();
    }
    cells
        .iter()
        .map(|c| {
            if is_missing(c) {
                Value::Null
            } else {
                Value::Text(c.clone())
            }
        })
        .collect()
}
