//! Summary of a single fitted model.

use std::fs;
use std::path::Path;

use csv::WriterBuilder;

use super::table::round_to;
use super::ReportError;
use crate::core::RegressionResult;

/// One line of the coefficient table.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientRow {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub statistic: f64,
    pub p_value: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Header statistics, coefficient table and notes of a fitted model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSummary {
    pub title: String,
    /// Label/value pairs shown above the coefficient table.
    pub header: Vec<(String, String)>,
    /// "t" or "z".
    pub statistic_label: String,
    pub confidence_level: f64,
    pub coefficients: Vec<CoefficientRow>,
    pub notes: Vec<String>,
    /// Decimal places used when rendering numbers.
    pub accuracy: usize,
}

impl ModelSummary {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            header: Vec::new(),
            statistic_label: "t".to_string(),
            confidence_level: 0.95,
            coefficients: Vec::new(),
            notes: Vec::new(),
            accuracy: 4,
        }
    }

    /// Coefficient table and the common fit statistics of a result.
    ///
    /// `feature_names` is aligned with `result.coefficients`; the intercept,
    /// when present, is listed first under `intercept_name`.
    pub fn from_result<S: AsRef<str>>(
        title: impl Into<String>,
        result: &RegressionResult,
        feature_names: &[S],
        intercept_name: &str,
    ) -> Self {
        let mut summary = Self::new(title);
        summary.statistic_label = result.distribution.statistic_label().to_string();
        summary.confidence_level = result.confidence_level;

        if let Some(intercept) = result.intercept {
            let (lower, upper) = result.intercept_conf_interval.unwrap_or((f64::NAN, f64::NAN));
            summary.coefficients.push(CoefficientRow {
                name: intercept_name.to_string(),
                estimate: intercept,
                std_error: result.intercept_std_error.unwrap_or(f64::NAN),
                statistic: result.intercept_t_statistic.unwrap_or(f64::NAN),
                p_value: result.intercept_p_value.unwrap_or(f64::NAN),
                lower,
                upper,
            });
        }
        let pick = |v: &Option<faer::Col<f64>>, j: usize| v.as_ref().map_or(f64::NAN, |c| c[j]);
        for (j, name) in feature_names.iter().enumerate().take(result.coefficients.nrows()) {
            summary.coefficients.push(CoefficientRow {
                name: name.as_ref().to_string(),
                estimate: result.coefficients[j],
                std_error: pick(&result.std_errors, j),
                statistic: pick(&result.t_statistics, j),
                p_value: pick(&result.p_values, j),
                lower: pick(&result.conf_interval_lower, j),
                upper: pick(&result.conf_interval_upper, j),
            });
        }

        summary.push_header("No. Observations", result.n_observations);
        summary.push_header("Df Residuals", result.residual_df());
        let df_model = result.n_parameters.saturating_sub(usize::from(result.intercept.is_some()));
        summary.push_header("Df Model", df_model);
        summary
    }

    pub fn push_header(&mut self, label: impl Into<String>, value: impl ToString) {
        self.header.push((label.into(), value.to_string()));
    }

    /// Add a numeric header entry, rounded to the summary accuracy.
    pub fn push_stat(&mut self, label: impl Into<String>, value: f64) {
        let text = self.format(value);
        self.header.push((label.into(), text));
    }

    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    fn format(&self, value: f64) -> String {
        if value.is_nan() {
            "nan".to_string()
        } else if value.is_infinite() {
            if value > 0.0 { "inf" } else { "-inf" }.to_string()
        } else {
            round_to(value, self.accuracy).to_string()
        }
    }

    fn interval_labels(&self) -> (String, String) {
        let alpha = 1.0 - self.confidence_level;
        (
            format!("[{}", round_to(alpha / 2.0, 4)),
            format!("{}]", round_to(1.0 - alpha / 2.0, 4)),
        )
    }

    fn table_header(&self) -> Vec<String> {
        let (lo, hi) = self.interval_labels();
        vec![
            String::new(),
            "coef".to_string(),
            "std err".to_string(),
            self.statistic_label.clone(),
            format!("P>|{}|", self.statistic_label),
            lo,
            hi,
        ]
    }

    fn row_cells(&self, row: &CoefficientRow) -> Vec<String> {
        vec![
            row.name.clone(),
            self.format(row.estimate),
            self.format(row.std_error),
            self.format(row.statistic),
            self.format(row.p_value),
            self.format(row.lower),
            self.format(row.upper),
        ]
    }

    /// HTML rendering: a header table, the coefficient table and the notes.
    pub fn as_html(&self) -> String {
        let mut html = String::new();
        html.push_str("<table class=\"simpletable\">\n");
        html.push_str(&format!("<caption>{}</caption>\n", escape_html(&self.title)));
        for pair in self.header.chunks(2) {
            html.push_str("<tr>\n");
            for (label, value) in pair {
                html.push_str(&format!(
                    "  <th>{}:</th> <td>{}</td>\n",
                    escape_html(label),
                    escape_html(value)
                ));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</table>\n<table class=\"simpletable\">\n<tr>\n");
        for cell in self.table_header() {
            html.push_str(&format!("  <th>{}</th>\n", escape_html(&cell)));
        }
        html.push_str("</tr>\n");
        for row in &self.coefficients {
            let cells = self.row_cells(row);
            html.push_str("<tr>\n");
            html.push_str(&format!("  <th>{}</th>\n", escape_html(&cells[0])));
            for cell in &cells[1..] {
                html.push_str(&format!("  <td>{}</td>\n", escape_html(cell)));
            }
            html.push_str("</tr>\n");
        }
        html.push_str("</table>");
        if !self.notes.is_empty() {
            html.push_str("<br/>\nNotes:<br/>\n");
            for (i, note) in self.notes.iter().enumerate() {
                html.push_str(&format!("[{}] {}<br/>\n", i + 1, escape_html(note)));
            }
        }
        html
    }

    /// CSV rendering with the same three sections as the HTML.
    pub fn as_csv(&self) -> Result<String, ReportError> {
        let mut output = Vec::new();
        {
            let mut writer = WriterBuilder::new().flexible(true).from_writer(&mut output);
            writer.write_record([self.title.as_str()])?;
            for (label, value) in &self.header {
                writer.write_record([format!("{label}:"), value.clone()])?;
            }
            writer.write_record(self.table_header())?;
            for row in &self.coefficients {
                writer.write_record(self.row_cells(row))?;
            }
            for (i, note) in self.notes.iter().enumerate() {
                writer.write_record([format!("[{}] {}", i + 1, note)])?;
            }
            writer.flush().map_err(|source| ReportError::Io {
                path: "<buffer>".to_string(),
                source,
            })?;
        }
        String::from_utf8(output).map_err(|_| ReportError::Encoding)
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), ReportError> {
        let text = self.as_csv()?;
        fs::write(path, text).map_err(|source| ReportError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn write_html(&self, path: &Path) -> Result<(), ReportError> {
        fs::write(path, self.as_html()).map_err(|source| ReportError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::ReferenceDistribution;
    use faer::Col;

    fn sample() -> ModelSummary {
        let mut result = RegressionResult::empty(2, 30);
        result.set_parameters(&Col::from_fn(3, |i| [1.0, 0.5, f64::NAN][i]), true);
        result.n_parameters = 2;
        result.set_inference(
            &Col::from_fn(3, |i| [0.25, 0.1, f64::NAN][i]),
            ReferenceDistribution::StudentT(28.0),
            0.95,
        );
        let mut s = ModelSummary::from_result("Linear <FE>", &result, &["x", "z"], "intercept");
        s.push_note("collinear column z dropped");
        s
    }

    #[test]
    fn test_rows_follow_intercept_then_features() {
        let s = sample();
        let names: Vec<&str> = s.coefficients.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["intercept", "x", "z"]);
        assert!((s.coefficients[1].statistic - 5.0).abs() < 1e-12);
        assert!(s.coefficients[2].estimate.is_nan());
        assert_eq!(s.header[1], ("Df Residuals".to_string(), "28".to_string()));
    }

    #[test]
    fn test_html_is_escaped() {
        let html = sample().as_html();
        assert!(html.contains("Linear &lt;FE&gt;"));
        assert!(html.contains("<th>P&gt;|t|</th>"));
        assert!(html.contains("[1] collinear column z dropped"));
    }

    #[test]
    fn test_csv_sections() {
        let csv = sample().as_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Linear <FE>");
        assert!(lines.contains(&",coef,std err,t,P>|t|,[0.025,0.975]"));
        assert!(lines.iter().any(|l| l.starts_with("x,0.5,0.1,5,")));
        assert!(lines.iter().any(|l| l.starts_with("z,nan,nan")));
    }
}
