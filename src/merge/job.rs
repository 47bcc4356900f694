use crate::error::RustyMergeError;
use crate::merge::batch;
use crate::merge::batch::BatchSummary;
use crate::merge::batch::Progress;
use crate::merge::filename::FilenamePattern;
use crate::merge::mapping::FieldMapping;
use crate::merge::SetupError;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::is_supported;
use crate::spreadsheet::load_table;
use crate::spreadsheet::table::SpreadsheetTable;
use crate::template::DocumentTemplate;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use tracing::info;

/// Everything a run needs, as given by the user.
#[derive(Clone, Debug)]
pub struct MergeJob {
    pub spreadsheet: PathBuf,
    pub template: PathBuf,
    pub output_dir: Option<PathBuf>,
    /// Glob over sheet names; the first sheet when absent
    pub sheet: Option<String>,
    /// Columns naming the output files, in order
    pub name_columns: Vec<String>,
    /// Explicit field to column selections
    pub selections: HashMap<String, String>,
    pub skip_empty_rows: bool,
}

/// Spreadsheet rows and template fields read at load time
#[derive(Debug)]
pub struct MergeInputs {
    pub table: SpreadsheetTable,
    pub fields: Vec<String>,
    /// Extension of the generated documents
    pub extension: String,
}

/// Validated bindings of a run
#[derive(Debug)]
pub struct MergePlan {
    pub mapping: FieldMapping,
    pub pattern: FilenamePattern,
    pub output_dir: PathBuf,
}

impl MergeJob {
    /// Reads the spreadsheet and discovers the template fields.
    pub fn load(&self) -> Result<MergeInputs, RustyMergeError> {
        if !self.spreadsheet.is_file() {
            Err(SetupError::MissingSpreadsheet(self.spreadsheet.display().to_string()))?;
        }
        if !is_supported(&self.spreadsheet) {
            Err(SetupError::UnsupportedSpreadsheet(self.spreadsheet.display().to_string()))?;
        }
        if !self.template.is_file() {
            Err(SetupError::MissingTemplate(self.template.display().to_string()))?;
        }

        let mut criteria = Criteria {
            skip_empty_rows: self.skip_empty_rows,
            ..Criteria::default()
        };
        if let Some(sheet) = &self.sheet {
            criteria = criteria.with_sheet_pattern(sheet)?;
        }
        let table = load_table(&self.spreadsheet, &criteria)?;
        if table.is_empty() {
            Err(SetupError::EmptySpreadsheet(self.spreadsheet.display().to_string()))?;
        }

        let template = DocumentTemplate::load(&self.template)?;
        let fields = template.fields()?;
        if fields.is_empty() {
            Err(SetupError::NoFields(self.template.display().to_string()))?;
        }

        info!(rows = table.len(), columns = table.columns().len(), fields = fields.len(), "inputs loaded");
        Ok(MergeInputs {
            table,
            fields,
            extension: template.extension(),
        })
    }

    /// Checks the output directory, the filename columns and the field mapping,
    /// in that order. Fields named like a column are bound to it unless selected
    /// otherwise.
    pub fn plan(&self, inputs: &MergeInputs) -> Result<MergePlan, RustyMergeError> {
        let output_dir = match &self.output_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_owned(),
            _ => return Err(SetupError::MissingOutputDirectory.into()),
        };
        if output_dir.exists() && !output_dir.is_dir() {
            Err(SetupError::InvalidOutputDirectory(output_dir.display().to_string()))?;
        }

        let columns = inputs.table.columns();
        let pattern = FilenamePattern::new(&self.name_columns);
        if pattern.is_empty() {
            Err(SetupError::NoFilenameColumn)?;
        }
        if let Some(column) = pattern.unknown_columns(columns).into_iter().next() {
            Err(SetupError::UnknownFilenameColumn(column))?;
        }

        let mapping = FieldMapping::prefill(&inputs.fields, columns).with_selections(&self.selections);
        let unmapped = mapping.validate();
        if !unmapped.is_empty() {
            Err(SetupError::UnmappedFields(unmapped))?;
        }
        if let Some((field, column)) = mapping.unknown_columns(columns).into_iter().next() {
            Err(SetupError::UnknownColumn(field, column))?;
        }

        Ok(MergePlan {
            mapping,
            pattern,
            output_dir,
        })
    }

    /// Loads, validates and generates every document.
    /// Setup problems are returned before any file is written.
    pub fn run<F>(&self, progress: F) -> Result<BatchSummary, RustyMergeError>
    where
        F: FnMut(&Progress),
    {
        let inputs = self.load()?;
        let plan = self.plan(&inputs)?;
        ensure_dir(&plan.output_dir)?;
        Ok(batch::run(
            &inputs.table,
            &plan.mapping,
            &plan.pattern,
            &self.template,
            &plan.output_dir,
            progress,
        ))
    }
}

fn ensure_dir(dir: &Path) -> Result<(), RustyMergeError> {
    if !dir.is_dir() {
        info!(dir = %dir.display(), "creating output directory");
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::read_entry;
    use crate::testing::write_docx;
    use crate::testing::write_xlsx;

    const ROWS: &str = r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c></row>
<row r="2"><c r="A2" t="s"><v>3</v></c><c r="B2" t="s"><v>4</v></c><c r="C2"><v>1250</v></c></row>
<row r="3"><c r="A3" t="s"><v>3</v></c><c r="B3" t="s"><v>5</v></c><c r="C3"><v>99.5</v></c></row>"#;

    fn job(dir: &Path) -> MergeJob {
        let spreadsheet = dir.join("clients.xlsx");
        write_xlsx(&spreadsheet, &[("Clients", ROWS)], &["Company", "Name", "Total", "Acme", "Ann", "Bo"]);
        let template = dir.join("letter.docx");
        write_docx(&template, "<w:p><w:r><w:t>Dear {{Name}}, you owe {{ amount }}.</w:t></w:r></w:p>", None);
        MergeJob {
            spreadsheet,
            template,
            output_dir: Some(dir.join("out")),
            sheet: None,
            name_columns: vec!["Company".to_owned(), "Name".to_owned()],
            selections: HashMap::from([("amount".to_owned(), "Total".to_owned())]),
            skip_empty_rows: true,
        }
    }

    #[test]
    fn full_run() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path());
        let summary = job.run(|_| {}).unwrap();
        assert_eq!((summary.succeeded(), summary.total()), (2, 2));

        let out = dir.path().join("out");
        let document = read_entry(&out.join("doc-Acme-Ann-1.docx"), "word/document.xml");
        assert!(document.contains("Dear Ann, you owe 1250."), "{document}");
        let document = read_entry(&out.join("doc-Acme-Bo-2.docx"), "word/document.xml");
        assert!(document.contains("Dear Bo, you owe 99.5."), "{document}");
    }

    #[test]
    fn load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job(dir.path());
        let inputs = job.load().unwrap();
        assert_eq!(inputs.fields, vec!["Name", "amount"]);
        assert_eq!(inputs.extension, "docx");

        job.template = dir.path().join("missing.docx");
        assert!(matches!(job.load(), Err(RustyMergeError::SetupError(SetupError::MissingTemplate(_)))));

        let blank = dir.path().join("blank.docx");
        write_docx(&blank, "<w:p><w:r><w:t>Nothing here</w:t></w:r></w:p>", None);
        job.template = blank;
        assert!(matches!(job.load(), Err(RustyMergeError::SetupError(SetupError::NoFields(_)))));

        let legacy = dir.path().join("clients.xls");
        std::fs::write(&legacy, b"legacy workbook").unwrap();
        job.spreadsheet = legacy;
        let error = job.load().unwrap_err();
        assert!(matches!(error, RustyMergeError::SetupError(SetupError::UnsupportedSpreadsheet(_))));
        assert!(error.to_string().ends_with("is not an .xlsx, .xlsm, .xltx, .xltm or .ods workbook"));

        job.spreadsheet = dir.path().join("missing.xlsx");
        assert!(matches!(job.load(), Err(RustyMergeError::SetupError(SetupError::MissingSpreadsheet(_)))));

        let header_only = dir.path().join("header.xlsx");
        write_xlsx(&header_only, &[("Sheet1", r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row>"#)], &["Name"]);
        job.spreadsheet = header_only;
        assert!(matches!(job.load(), Err(RustyMergeError::SetupError(SetupError::EmptySpreadsheet(_)))));
    }

    #[test]
    fn plan_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job(dir.path());
        let inputs = job.load().unwrap();
        let plan = job.plan(&inputs).unwrap();
        assert_eq!(plan.mapping.column("Name"), Some("Name"));
        assert_eq!(plan.mapping.column("amount"), Some("Total"));

        job.selections.clear();
        let error = job.plan(&inputs).unwrap_err();
        assert_eq!(error.to_string(), "Please map the following template fields: amount");

        job.selections.insert("amount".to_owned(), "Price".to_owned());
        assert!(matches!(job.plan(&inputs), Err(RustyMergeError::SetupError(SetupError::UnknownColumn(_, _)))));

        job.name_columns = vec!["Region".to_owned()];
        assert!(matches!(job.plan(&inputs), Err(RustyMergeError::SetupError(SetupError::UnknownFilenameColumn(_)))));

        job.name_columns.clear();
        assert!(matches!(job.plan(&inputs), Err(RustyMergeError::SetupError(SetupError::NoFilenameColumn))));

        job.output_dir = None;
        assert!(matches!(job.plan(&inputs), Err(RustyMergeError::SetupError(SetupError::MissingOutputDirectory))));
        assert!(!dir.path().join("out").exists());
    }
}
