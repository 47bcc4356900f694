use crate::error::RustyMergeError;
use crate::merge::sanitize::sanitize;
use crate::spreadsheet::table::SpreadsheetTable;

/// Columns whose values name the generated documents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilenamePattern {
    columns: Vec<String>,
}

impl FilenamePattern {
    /// Blank column names are dropped.
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        let columns = columns
            .iter()
            .map(|column| column.as_ref().trim())
            .filter(|column| !column.is_empty())
            .map(str::to_owned)
            .collect();
        FilenamePattern { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Pattern columns missing from `columns`
    pub fn unknown_columns(&self, columns: &[String]) -> Vec<String> {
        self.columns
            .iter()
            .filter(|column| !columns.contains(column))
            .cloned()
            .collect()
    }

    /// File name of a row: `doc-<part>-...-<index>.<extension>`.
    ///
    /// # Arguments
    /// * `table` - Table holding the values
    /// * `row` - Data row, 0-based
    /// * `extension` - Extension without the dot; empty for none
    pub fn file_name(&self, table: &SpreadsheetTable, row: usize, extension: &str) -> Result<String, RustyMergeError> {
        let mut parts = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            parts.push(table.text(row, column)?.unwrap_or_default());
        }
        Ok(compose(&parts, row + 1, extension))
    }

    /// Sample name shown before a run, e.g. `doc-value1-value2-1.docx`.
    pub fn preview(&self, extension: &str) -> String {
        let parts: Vec<String> = (1..=self.columns.len()).map(|n| format!("value{n}")).collect();
        compose(&parts, 1, extension)
    }
}

fn compose(parts: &[String], index: usize, extension: &str) -> String {
    let mut name = String::from("doc-");
    for part in parts {
        name.push_str(&sanitize(part));
        name.push('-');
    }
    name.push_str(&index.to_string());
    if !extension.is_empty() {
        name.push('.');
        name.push_str(extension);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_differ_by_row_index() {
        let table = SpreadsheetTable::from_text(&["Company", "Name"], &[&["Acme", "Acme"], &["Acme", "Acme"]]);
        let pattern = FilenamePattern::new(&["Company", "Name"]);
        assert_eq!(pattern.file_name(&table, 0, "docx").unwrap(), "doc-Acme-Acme-1.docx");
        assert_eq!(pattern.file_name(&table, 1, "docx").unwrap(), "doc-Acme-Acme-2.docx");
    }

    #[test]
    fn sanitized_parts() {
        let table = SpreadsheetTable::from_text(&["Company", "City"], &[&["Smith & Sons Ltd", "São Paulo/SP"]]);
        let pattern = FilenamePattern::new(&["City", "", "Company"]);
        assert_eq!(pattern.columns(), ["City", "Company"]);
        assert_eq!(pattern.file_name(&table, 0, "odt").unwrap(), "doc-So_PauloSP-Smith__Sons_Ltd-1.odt");
        assert_eq!(pattern.file_name(&table, 0, "").unwrap(), "doc-So_PauloSP-Smith__Sons_Ltd-1");
    }

    #[test]
    fn preview() {
        assert_eq!(FilenamePattern::new(&["a", "b"]).preview("docx"), "doc-value1-value2-1.docx");
        assert_eq!(FilenamePattern::new(&["a"]).preview("txt"), "doc-value1-1.txt");
        assert!(FilenamePattern::new::<&str>(&[]).is_empty());
    }

    #[test]
    fn unknown_columns() {
        let pattern = FilenamePattern::new(&["Company", "Region"]);
        let columns = vec!["Company".to_owned()];
        assert_eq!(pattern.unknown_columns(&columns), vec!["Region"]);
    }
}
