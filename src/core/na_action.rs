//! Bookkeeping for the complete-case policy.
//!
//! Every analysis drops the rows that have a missing value in any of the
//! fields it uses before fitting. `NaInfo` records which rows went so the
//! summary can report the effective sample.

/// Rows removed by complete-case filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NaInfo {
    /// Number of rows before filtering.
    pub n_original: usize,
    /// Indices (into the unfiltered data) of the dropped rows, ascending.
    pub dropped_rows: Vec<usize>,
}

impl NaInfo {
    pub fn new(n_original: usize, dropped_rows: Vec<usize>) -> Self {
        Self {
            n_original,
            dropped_rows,
        }
    }

    /// Number of rows that survived.
    pub fn n_complete(&self) -> usize {
        self.n_original - self.dropped_rows.len()
    }

    pub fn n_dropped(&self) -> usize {
        self.dropped_rows.len()
    }

    pub fn has_missing(&self) -> bool {
        !self.dropped_rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let info = NaInfo::new(10, vec![2, 7]);
        assert_eq!(info.n_complete(), 8);
        assert_eq!(info.n_dropped(), 2);
        assert!(info.has_missing());
        assert!(!NaInfo::new(3, vec![]).has_missing());
    }
}
