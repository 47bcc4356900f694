//! TOML job files.
//!
//! ```toml
//! spreadsheet = "people.xlsx"
//! template = "letter.docx"
//! output_dir = "out"
//! sheet = "Sheet*"
//! name_columns = ["Company", "Name"]
//! skip_empty_rows = true
//!
//! [mapping]
//! name = "Name"
//! ```
use crate::error::ResultMessage;
use crate::error::RustyMergeError;
use crate::merge::job::MergeJob;
use crate::merge::SetupError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use tracing::info;

/// Job settings from a file or the command line; every key is optional.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
    pub spreadsheet: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub sheet: Option<String>,
    pub name_columns: Vec<String>,
    pub skip_empty_rows: Option<bool>,
    /// Field to column selections
    pub mapping: HashMap<String, String>,
}

impl JobConfig {
    pub fn from_toml(text: &str) -> Result<Self, RustyMergeError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads a job file. Relative paths in it are taken from the file's directory.
    pub fn load(path: &Path) -> Result<Self, RustyMergeError> {
        let prefix = format!("Cannot load job file '{}'", path.display());
        let text = std::fs::read_to_string(path)
            .map_err(RustyMergeError::from)
            .with_prefix(&prefix)?;
        let config = Self::from_toml(&text).with_prefix(&prefix)?;
        info!(path = %path.display(), "job file loaded");

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.relative_to(base))
    }

    /// Joins relative paths onto `base`.
    pub fn relative_to(self, base: &Path) -> Self {
        let resolve = |path: Option<PathBuf>| path.map(|path| if path.is_relative() { base.join(path) } else { path });
        JobConfig {
            spreadsheet: resolve(self.spreadsheet),
            template: resolve(self.template),
            output_dir: resolve(self.output_dir),
            ..self
        }
    }

    /// Values set in `other` win; its mapping entries are merged into ours.
    pub fn overlay(mut self, other: JobConfig) -> Self {
        self.spreadsheet = other.spreadsheet.or(self.spreadsheet);
        self.template = other.template.or(self.template);
        self.output_dir = other.output_dir.or(self.output_dir);
        self.sheet = other.sheet.or(self.sheet);
        if !other.name_columns.is_empty() {
            self.name_columns = other.name_columns;
        }
        self.skip_empty_rows = other.skip_empty_rows.or(self.skip_empty_rows);
        self.mapping.extend(other.mapping);
        self
    }

    /// Builds the job; the spreadsheet and the template are required.
    pub fn into_job(self) -> Result<MergeJob, RustyMergeError> {
        let spreadsheet = self.spreadsheet.ok_or(SetupError::NotSelected("spreadsheet"))?;
        let template = self.template.ok_or(SetupError::NotSelected("template"))?;
        Ok(MergeJob {
            spreadsheet,
            template,
            output_dir: self.output_dir,
            sheet: self.sheet,
            name_columns: self.name_columns,
            selections: self.mapping,
            skip_empty_rows: self.skip_empty_rows.unwrap_or(true),
        })
    }
}

/// Parses a `FIELD=COLUMN` binding.
pub fn parse_binding(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((field, column)) if !field.trim().is_empty() => Ok((field.trim().to_owned(), column.trim().to_owned())),
        _ => Err(format!("expected FIELD=COLUMN, got '{text}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_job_file() {
        let config = JobConfig::from_toml(
            r#"
spreadsheet = "people.xlsx"
template = "/templates/letter.docx"
output_dir = "out"
sheet = "Sheet*"
name_columns = ["Company", "Name"]
skip_empty_rows = false

[mapping]
name = "Name"
"#,
        )
        .unwrap()
        .relative_to(Path::new("/jobs"));

        assert_eq!(config.spreadsheet, Some(PathBuf::from("/jobs/people.xlsx")));
        assert_eq!(config.template, Some(PathBuf::from("/templates/letter.docx")));
        assert_eq!(config.output_dir, Some(PathBuf::from("/jobs/out")));
        assert_eq!(config.name_columns, vec!["Company", "Name"]);
        assert_eq!(config.mapping.get("name").map(String::as_str), Some("Name"));

        let job = config.into_job().unwrap();
        assert!(!job.skip_empty_rows);
        assert_eq!(job.sheet.as_deref(), Some("Sheet*"));
    }

    #[test]
    fn rejects_unknown_keys() {
        let error = JobConfig::from_toml("spreadsheet = 'a.xlsx'\ncolour = 'red'\n").unwrap_err();
        assert!(matches!(error, RustyMergeError::TomlError(_)));
    }

    #[test]
    fn command_line_overrides() {
        let file = JobConfig {
            spreadsheet: Some(PathBuf::from("a.xlsx")),
            template: Some(PathBuf::from("a.docx")),
            name_columns: vec!["Name".to_owned()],
            mapping: HashMap::from([("name".to_owned(), "Name".to_owned()), ("city".to_owned(), "City".to_owned())]),
            ..JobConfig::default()
        };
        let cli = JobConfig {
            template: Some(PathBuf::from("b.docx")),
            mapping: HashMap::from([("city".to_owned(), "Town".to_owned())]),
            ..JobConfig::default()
        };

        let merged = file.overlay(cli);
        assert_eq!(merged.spreadsheet, Some(PathBuf::from("a.xlsx")));
        assert_eq!(merged.template, Some(PathBuf::from("b.docx")));
        assert_eq!(merged.name_columns, vec!["Name"]);
        assert_eq!(merged.mapping.get("name").map(String::as_str), Some("Name"));
        assert_eq!(merged.mapping.get("city").map(String::as_str), Some("Town"));

        let job = merged.into_job().unwrap();
        assert!(job.skip_empty_rows);
    }

    #[test]
    fn required_inputs() {
        let error = JobConfig::default().into_job().unwrap_err();
        assert_eq!(error.to_string(), "Please select a spreadsheet file");
    }

    #[test]
    fn bindings() {
        assert_eq!(parse_binding("name = Full Name"), Ok(("name".to_owned(), "Full Name".to_owned())));
        assert_eq!(parse_binding("name="), Ok(("name".to_owned(), String::new())));
        assert!(parse_binding("name").is_err());
        assert!(parse_binding("=Name").is_err());
    }

    #[test]
    fn load_resolves_against_file_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.toml");
        std::fs::write(&path, "spreadsheet = 'data/people.ods'\n").unwrap();
        let config = JobConfig::load(&path).unwrap();
        assert_eq!(config.spreadsheet, Some(dir.path().join("data/people.ods")));

        let error = JobConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(error.to_string().starts_with("Cannot load job file"));
    }
}
