//! Per-session output directory and file names.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use ulid::Ulid;

use super::error::AnalysisError;

/// `root/<analysis>/<YYYYMMDD>/` plus a unique file prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    pub dir: PathBuf,
    pub prefix: String,
    pub analysis_name: String,
}

impl OutputLocation {
    /// Create today's directory for an analysis.
    pub fn create(root: &Path, analysis_name: &str) -> Result<Self, AnalysisError> {
        Self::create_dated(root, analysis_name, Local::now().date_naive())
    }

    pub fn create_dated(
        root: &Path,
        analysis_name: &str,
        date: NaiveDate,
    ) -> Result<Self, AnalysisError> {
        let dir = root
            .join(analysis_name)
            .join(date.format("%Y%m%d").to_string());
        fs::create_dir_all(&dir).map_err(|source| AnalysisError::OutputDir {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self {
            dir,
            prefix: Ulid::new().to_string(),
            analysis_name: analysis_name.to_string(),
        })
    }

    /// `<prefix>_<analysis>.csv`
    pub fn file_name(&self) -> String {
        format!("{}_{}.csv", self.prefix, self.analysis_name)
    }

    pub fn out_file(&self) -> PathBuf {
        self.dir.join(self.file_name())
    }

    /// `<prefix>_<label>.csv` for one sub-result.
    pub fn sub_file(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", self.prefix, sanitize(label)))
    }

    pub fn html_file(&self) -> PathBuf {
        self.dir.join(format!("{}_{}.html", self.prefix, self.analysis_name))
    }
}

/// Labels come from column names; keep them inside the directory.
fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':' | '\0') { '_' } else { c })
        .collect()
}
