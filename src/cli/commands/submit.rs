//! `casebook submit` command - file a new incident report

use console::style;
use dialoguer::{theme::ColorfulTheme, Input};
use miette::{bail, IntoDiagnostic, Result};
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use crate::cli::helpers::{attach_evidence, open_service};
use crate::cli::GlobalOpts;
use crate::core::entity::IncidentType;
use crate::entities::case::NewCase;

#[derive(clap::Args, Debug)]
pub struct SubmitArgs {
    /// Incident type (bullying, fighting, vandalism, theft, substance, harassment, truancy, other)
    #[arg(long = "type", short = 't', default_value = "other")]
    pub incident_type: IncidentType,

    /// Where it happened
    #[arg(long, short = 'l')]
    pub location: Option<String>,

    /// What happened
    #[arg(long, short = 'd')]
    pub details: Option<String>,

    /// Reporter name (anonymous if omitted)
    #[arg(long, short = 'r')]
    pub reporter: Option<String>,

    /// Evidence file to attach
    #[arg(long, short = 'e')]
    pub evidence: Option<PathBuf>,
}

fn ask(prompt: &str, given: Option<String>) -> Result<String> {
    if let Some(value) = given {
        return Ok(value);
    }
    if !io::stdin().is_terminal() {
        bail!("--{} is required", prompt.to_lowercase());
    }
    Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()
        .into_diagnostic()
}

pub fn run(args: SubmitArgs, global: &GlobalOpts) -> Result<()> {
    let (_config, service) = open_service(global)?;

    let location = ask("Location", args.location)?;
    let details = ask("Details", args.details)?;

    let mut input = NewCase::new(args.incident_type, &location, &details);
    if let Some(reporter) = args.reporter {
        input = input.with_reporter(reporter);
    }
    if let Some(path) = &args.evidence {
        input = input.with_evidence(attach_evidence(&service, path)?);
    }

    let case_id = service.submit(input)?;

    if global.quiet {
        println!("{}", case_id);
    } else {
        println!(
            "{} Report submitted as {}",
            style("✓").green(),
            style(case_id.as_str()).cyan().bold()
        );
        println!("  Keep this id to follow up on the case.");
    }
    Ok(())
}
