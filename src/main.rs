use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use rusty_merge::config::parse_binding;
use rusty_merge::config::JobConfig;
use rusty_merge::merge::filename::FilenamePattern;
use rusty_merge::merge::job::MergeJob;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rusty-merge", version)]
#[command(about = "Generate one document per spreadsheet row from a {{field}} template", long_about = None)]
struct Args {
    /// TOML job file; command line values override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Spreadsheet holding the data rows (.xlsx, .ods)
    #[arg(short, long)]
    spreadsheet: Option<PathBuf>,

    /// Document template (.docx, .odt or text)
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Directory receiving the generated documents
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Glob selecting the sheet; the first sheet by default
    #[arg(long)]
    sheet: Option<String>,

    /// Column used in the file names, repeat for more
    #[arg(short = 'n', long = "name-column", value_name = "COLUMN")]
    name_columns: Vec<String>,

    /// Binds a template field to a column
    #[arg(short, long = "map", value_name = "FIELD=COLUMN", value_parser = parse_binding)]
    mappings: Vec<(String, String)>,

    /// Keep data rows whose cells are all empty
    #[arg(long)]
    keep_empty_rows: bool,

    /// Print the template fields, the columns and a file name preview, then exit
    #[arg(long)]
    fields_only: bool,

    /// Log filter such as `debug` or `rusty_merge=trace`; RUST_LOG when absent
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn job(&self) -> Result<MergeJob> {
        let file = match &self.config {
            Some(path) => JobConfig::load(path)?,
            None => JobConfig::default(),
        };
        let command_line = JobConfig {
            spreadsheet: self.spreadsheet.to_owned(),
            template: self.template.to_owned(),
            output_dir: self.output_dir.to_owned(),
            sheet: self.sheet.to_owned(),
            name_columns: self.name_columns.to_owned(),
            skip_empty_rows: self.keep_empty_rows.then_some(false),
            mapping: self.mappings.iter().cloned().collect(),
        };
        Ok(file.overlay(command_line).into_job()?)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    match execute(&args) {
        Ok(code) => code,
        Err(error) => {
            error!("{error:#}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn execute(args: &Args) -> Result<ExitCode> {
    let job = args.job().context("Invalid job")?;

    if args.fields_only {
        let inputs = job.load().context("Error loading files")?;
        println!("Template fields: {}", inputs.fields.join(", "));
        println!("Spreadsheet columns: {}", inputs.table.columns().join(", "));
        let pattern = if job.name_columns.is_empty() {
            FilenamePattern::new(&["value1", "value2"])
        } else {
            FilenamePattern::new(&job.name_columns)
        };
        println!("Preview: {}", pattern.preview(&inputs.extension));
        return Ok(ExitCode::SUCCESS);
    }

    let summary = job
        .run(|progress| {
            info!(
                "Processing document {} of {} ({:.0}%)",
                progress.current,
                progress.total,
                progress.percent()
            )
        })
        .context("Error generating documents")?;

    if summary.is_complete() {
        info!("Successfully generated all {} documents", summary.total());
        Ok(ExitCode::SUCCESS)
    } else {
        for failure in summary.failures() {
            warn!(row = failure.index, "{}", failure.error.as_deref().unwrap_or_default());
        }
        warn!(
            "Generated {} of {} documents. Some documents may need to be checked for errors.",
            summary.succeeded(),
            summary.total()
        );
        Ok(ExitCode::from(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_arguments() {
        let args = Args::try_parse_from([
            "rusty-merge",
            "-s",
            "people.xlsx",
            "-t",
            "letter.docx",
            "-o",
            "out",
            "-n",
            "Company",
            "--name-column",
            "Name",
            "--map",
            "amount=Total",
            "--keep-empty-rows",
        ])
        .unwrap();
        let job = args.job().unwrap();
        assert_eq!(job.spreadsheet, PathBuf::from("people.xlsx"));
        assert_eq!(job.name_columns, vec!["Company", "Name"]);
        assert_eq!(job.selections.get("amount").map(String::as_str), Some("Total"));
        assert!(!job.skip_empty_rows);
    }

    #[test]
    fn rejects_bad_binding() {
        assert!(Args::try_parse_from(["rusty-merge", "--map", "amount"]).is_err());
    }
}
