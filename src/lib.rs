//! # Rusty Merge
//!
//! Mail merge for office documents: every data row of a spreadsheet becomes one
//! document rendered from a template with `{{field}}` placeholders.
//!
//! ## Features
//!
//! - **Spreadsheets**: `.xlsx`, `.xlsm`, `.xltx`, `.xltm` and `.ods`, with shared
//!   strings, booleans, error cells and date/time number formats decoded
//! - **Templates**: `.docx` and `.odt` packages, or any UTF-8 text file
//! - **Split placeholders**: fields broken across formatting runs are still found
//!   and replaced
//! - **Untouched packages**: every entry that holds no placeholder is copied byte
//!   for byte
//! - **Per-row failures**: a row that cannot be rendered is reported and the run
//!   goes on
//!
//! ## Example
//!
//! ```no_run
//! use rusty_merge::merge::job::MergeJob;
//! use std::collections::HashMap;
//!
//! let job = MergeJob {
//!     spreadsheet: "clients.xlsx".into(),
//!     template: "letter.docx".into(),
//!     output_dir: Some("out".into()),
//!     sheet: None,
//!     name_columns: vec!["Company".to_owned()],
//!     selections: HashMap::new(),
//!     skip_empty_rows: true,
//! };
//! let summary = job.run(|_| {})?;
//! println!("Generated {} of {} documents", summary.succeeded(), summary.total());
//! # Ok::<(), rusty_merge::error::RustyMergeError>(())
//! ```
pub mod config;
pub mod error;
pub(crate) mod helpers;
pub mod merge;
pub mod spreadsheet;
pub mod template;

#[cfg(test)]
mod testing;
