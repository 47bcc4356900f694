use crate::error::RustyMergeError;
use crate::merge::filename::FilenamePattern;
use crate::merge::generator::generate;
use crate::merge::mapping::FieldMapping;
use crate::spreadsheet::table::SpreadsheetTable;
use crate::template::DocumentTemplate;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use tracing::error;
use tracing::info;

/// Outcome of one row
#[derive(Debug)]
pub struct RowOutcome {
    /// Row index, 1-based
    pub index: usize,
    /// Document path, when a file name could be built
    pub output: Option<PathBuf>,
    /// Why the row failed
    pub error: Option<String>,
}

impl RowOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Progress reported after each row
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    /// Rows processed so far
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.current as f64 * 100.0 / self.total as f64
        }
    }
}

/// Outcomes of a whole run, in row order
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<RowOutcome>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_success()).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true when every row produced its document.
    pub fn is_complete(&self) -> bool {
        self.succeeded() == self.total()
    }

    pub fn failures(&self) -> impl Iterator<Item = &RowOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_success())
    }
}

/// Generates one document per table row.
///
/// Rows are processed in table order and fail independently: a row whose
/// values cannot be turned into text, or whose document cannot be produced,
/// is recorded in the summary and the run moves on.
///
/// # Arguments
/// * `table` - Data rows
/// * `mapping` - Field to column bindings
/// * `pattern` - Columns naming the output files
/// * `template_path` - Template reloaded for every row
/// * `output_dir` - Directory receiving the documents
/// * `progress` - Called after each row
pub fn run<F>(
    table: &SpreadsheetTable,
    mapping: &FieldMapping,
    pattern: &FilenamePattern,
    template_path: &Path,
    output_dir: &Path,
    mut progress: F,
) -> BatchSummary
where
    F: FnMut(&Progress),
{
    let extension = DocumentTemplate::extension_of(template_path);
    let total = table.len();
    let mut summary = BatchSummary {
        outcomes: Vec::with_capacity(total),
    };

    for row in 0..total {
        let index = row + 1;
        let outcome = match pattern.file_name(table, row, &extension) {
            Ok(file_name) => {
                let output = output_dir.join(file_name);
                let result = row_context(table, mapping, row)
                    .and_then(|context| generate(template_path, &context, &output).map_err(RustyMergeError::from));
                RowOutcome {
                    index,
                    output: Some(output),
                    error: result.err().map(|error| error.to_string()),
                }
            }
            Err(error) => RowOutcome {
                index,
                output: None,
                error: Some(error.to_string()),
            },
        };

        if let Some(message) = &outcome.error {
            error!(row = index, error = %message, "document generation failed");
        }
        summary.outcomes.push(outcome);
        progress(&Progress { current: index, total });
    }

    info!(succeeded = summary.succeeded(), total = summary.total(), "batch finished");
    summary
}

/// Values of one row keyed by field name; missing cells are empty text.
fn row_context(
    table: &SpreadsheetTable,
    mapping: &FieldMapping,
    row: usize,
) -> Result<HashMap<String, String>, RustyMergeError> {
    let mut context = HashMap::with_capacity(mapping.len());
    for (field, column) in mapping.iter() {
        let value = table.text(row, column)?.unwrap_or_default();
        context.insert(field.to_owned(), value);
    }
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::Cell;
    use crate::spreadsheet::cell::CellType;
    use crate::testing::read_entry;
    use crate::testing::write_docx;

    fn fixture(dir: &Path) -> (PathBuf, FieldMapping) {
        let template = dir.join("letter.docx");
        write_docx(&template, "<w:p><w:r><w:t>{{name}} owes {{amount}}</w:t></w:r></w:p>", None);
        let fields = vec!["name".to_owned(), "amount".to_owned()];
        let selections = HashMap::from([
            ("name".to_owned(), "Name".to_owned()),
            ("amount".to_owned(), "Amount".to_owned()),
        ]);
        (template, FieldMapping::build_mapping(&fields, &selections))
    }

    #[test]
    fn every_row_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let (template, mapping) = fixture(dir.path());
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();
        let table = SpreadsheetTable::from_text(
            &["Name", "Amount"],
            &[&["Ann", "10"], &["Bo", "20"], &["Cy", "30"]],
        );

        let mut reports = Vec::new();
        let summary = run(&table, &mapping, &FilenamePattern::new(&["Name"]), &template, &out, |progress| {
            reports.push(*progress)
        });

        assert_eq!((summary.succeeded(), summary.total()), (3, 3));
        assert!(summary.is_complete());
        assert_eq!(reports.last(), Some(&Progress { current: 3, total: 3 }));
        assert_eq!(reports.len(), 3);

        let mut names: Vec<String> = std::fs::read_dir(&out)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["doc-Ann-1.docx", "doc-Bo-2.docx", "doc-Cy-3.docx"]);
        assert!(read_entry(&out.join("doc-Bo-2.docx"), "word/document.xml").contains("Bo owes 20"));
    }

    #[test]
    fn failing_row_is_attributed() {
        let dir = tempfile::tempdir().unwrap();
        let (template, mapping) = fixture(dir.path());
        let mut broken = Cell::text(2, 1, "#DIV/0!");
        broken.kind = CellType::Error;
        let table = SpreadsheetTable::new(
            vec!["Name".to_owned(), "Amount".to_owned()],
            vec![
                vec![Cell::text(1, 0, "Ann"), Cell::text(1, 1, "10")],
                vec![Cell::text(2, 0, "Bo"), broken],
                vec![Cell::text(3, 0, "Cy"), Cell::text(3, 1, "30")],
            ],
        );

        let summary = run(&table, &mapping, &FilenamePattern::new(&["Name"]), &template, dir.path(), |_| {});
        assert_eq!((summary.succeeded(), summary.total()), (2, 3));
        assert!(!summary.is_complete());

        let failures: Vec<&RowOutcome> = summary.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 2);
        assert!(failures[0].error.as_deref().unwrap().contains("#DIV/0!"));
        assert!(dir.path().join("doc-Ann-1.docx").exists());
        assert!(!dir.path().join("doc-Bo-2.docx").exists());
        assert!(dir.path().join("doc-Cy-3.docx").exists());
    }

    #[test]
    fn date_beyond_calendar_fails_its_row() {
        let dir = tempfile::tempdir().unwrap();
        let (template, mapping) = fixture(dir.path());
        let mut due = Cell::text(2, 1, "1e12");
        due.kind = CellType::NumberDate1900;
        let table = SpreadsheetTable::new(
            vec!["Name".to_owned(), "Amount".to_owned()],
            vec![
                vec![Cell::text(1, 0, "Ann"), Cell::text(1, 1, "10")],
                vec![Cell::text(2, 0, "Bo"), due],
            ],
        );

        let summary = run(&table, &mapping, &FilenamePattern::new(&["Name"]), &template, dir.path(), |_| {});
        assert_eq!((summary.succeeded(), summary.total()), (1, 2));
        let failure = summary.failures().next().unwrap();
        assert_eq!(failure.index, 2);
        assert_eq!(failure.error.as_deref(), Some("Cell B3 holds '1e12' which cannot be converted to text"));
    }

    #[test]
    fn empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let (template, mapping) = fixture(dir.path());
        let table = SpreadsheetTable::from_text(&["Name", "Amount"], &[]);
        let summary = run(&table, &mapping, &FilenamePattern::new(&["Name"]), &template, dir.path(), |_| {});
        assert_eq!(summary.total(), 0);
        assert!(summary.is_complete());
        assert_eq!(Progress { current: 0, total: 0 }.percent(), 100.0);
    }
}
