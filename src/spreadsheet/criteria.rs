use crate::error::RustyMergeError;
use glob::Pattern;

/// Criteria for selecting data from spreadsheets.
#[derive(Clone, Debug)]
pub struct Criteria {
    /// Sheet name patterns for filtering which sheets to process.
    pub sheet_name_patterns: Option<Vec<Pattern>>,

    /// Maximum number of sheets to read.
    pub sheet_limit: Option<usize>,

    /// Skip data rows where all columns are empty.
    pub skip_empty_rows: bool,
}

impl Default for Criteria {
    /// Reads the first sheet and skips empty rows.
    fn default() -> Self {
        Criteria {
            sheet_name_patterns: None,
            sheet_limit: Some(1),
            skip_empty_rows: true,
        }
    }
}

impl Criteria {
    /// Restricts the sheets to those matching a glob pattern (e.g. `Sheet*`).
    pub fn with_sheet_pattern(mut self, pattern: &str) -> Result<Self, RustyMergeError> {
        self.sheet_name_patterns = Some(vec![Pattern::new(pattern)?]);
        Ok(self)
    }

    /// Checks if a sheet name matches the criteria patterns.
    /// Returns true if no patterns are specified or if name matches any pattern.
    pub(crate) fn accept(&self, sheet_name: &str) -> bool {
        if let Some(patterns) = &self.sheet_name_patterns {
            patterns.iter().any(|pattern| pattern.matches(sheet_name))
        } else {
            true
        }
    }

    /// Checks whether enough sheets have been read.
    pub(crate) fn is_exhausted(&self, sheet_count: usize) -> bool {
        self.sheet_limit.map(|limit| sheet_count >= limit).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_patterns() {
        let criteria = Criteria::default();
        assert!(criteria.accept("anything"));

        let criteria = Criteria::default().with_sheet_pattern("Data*").unwrap();
        assert!(criteria.accept("Data 2024"));
        assert!(!criteria.accept("Summary"));
        assert!(Criteria::default().with_sheet_pattern("[").is_err());
    }

    #[test]
    fn sheet_limit() {
        let criteria = Criteria::default();
        assert!(!criteria.is_exhausted(0));
        assert!(criteria.is_exhausted(1));
    }
}
