//! `casebook export` command - render a case sheet

use clap::ValueEnum;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::io::Write;
use std::path::PathBuf;

use crate::cli::helpers::{authenticate, open_service, parse_case_id, SECRET_ENV};
use crate::cli::GlobalOpts;
use crate::export::{CaseSheetExporter, DocumentExporter, JsonExporter};

#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum SheetFormat {
    /// Plain-text case sheet
    #[default]
    Text,
    /// Full case record as JSON
    Json,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Case id, e.g. INC-20240315-0042
    pub id: String,

    /// Document format
    #[arg(long, short = 'f', default_value = "text")]
    pub format: SheetFormat,

    /// Write to this file instead of stdout ("-" for stdout)
    #[arg(long = "out", short = 'O')]
    pub out: Option<PathBuf>,

    /// Account secret
    #[arg(long, env = SECRET_ENV, hide_env_values = true)]
    pub secret: Option<String>,
}

pub fn run(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let (config, service) = open_service(global)?;
    authenticate(&config, args.secret)?;
    let case_id = parse_case_id(&args.id)?;

    let exporter: Box<dyn DocumentExporter> = match args.format {
        SheetFormat::Text => Box::new(CaseSheetExporter::new()?),
        SheetFormat::Json => Box::new(JsonExporter),
    };
    let bytes = service.render(&case_id, exporter.as_ref())?;

    match args.out.filter(|p| p.as_os_str() != "-") {
        Some(path) => {
            std::fs::write(&path, &bytes).into_diagnostic()?;
            if !global.quiet {
                println!(
                    "{} Wrote {} ({} bytes)",
                    style("✓").green(),
                    style(path.display()).cyan(),
                    bytes.len()
                );
            }
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes).into_diagnostic()?;
            stdout.flush().into_diagnostic()?;
        }
    }
    Ok(())
}
