//! `casebook verify` command - check audit trail hash chains

use console::style;
use miette::{bail, IntoDiagnostic, Result};

use crate::cli::helpers::{authenticate, open_service, parse_case_id, SECRET_ENV};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{AuditReport, CaseFilter};

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    /// Case ids to check (default: every case)
    pub ids: Vec<String>,

    /// Account secret
    #[arg(long, env = SECRET_ENV, hide_env_values = true)]
    pub secret: Option<String>,
}

pub fn run(args: VerifyArgs, global: &GlobalOpts) -> Result<()> {
    let (config, service) = open_service(global)?;
    authenticate(&config, args.secret)?;

    let ids = if args.ids.is_empty() {
        service
            .list(&CaseFilter::default())?
            .into_iter()
            .map(|case| case.case_id)
            .collect()
    } else {
        args.ids
            .iter()
            .map(|raw| parse_case_id(raw))
            .collect::<Result<Vec<_>>>()?
    };

    let reports: Vec<AuditReport> = ids
        .iter()
        .map(|id| service.verify_audit(id))
        .collect::<Result<_, _>>()?;
    let broken = reports.iter().filter(|r| !r.is_intact()).count();

    match global.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&reports).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yml::to_string(&reports).into_diagnostic()?);
        }
        OutputFormat::Id => {
            for report in reports.iter().filter(|r| !r.is_intact()) {
                println!("{}", report.case_id);
            }
        }
        _ => {
            for report in &reports {
                match &report.problem {
                    None if !global.quiet => println!(
                        "{} {} ({} entries)",
                        style("✓").green(),
                        report.case_id,
                        report.entries
                    ),
                    None => {}
                    Some(problem) => println!(
                        "{} {}: {}",
                        style("✗").red(),
                        style(report.case_id.as_str()).yellow(),
                        problem
                    ),
                }
            }
            if !global.quiet {
                println!();
                println!(
                    "{} checked, {} broken",
                    style(reports.len()).cyan(),
                    style(broken).red()
                );
            }
        }
    }

    if broken > 0 {
        bail!("{} case(s) have a broken audit trail", broken);
    }
    Ok(())
}
