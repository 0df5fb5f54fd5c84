//! `casebook update` command - officer changes to a case
//!
//! Resolved cases are locked. Passing `--unlock` asks for a supervisor
//! secret; the unlock applies to this one invocation only.

use console::style;
use miette::{bail, Result};
use std::path::PathBuf;

use crate::cli::helpers::{
    attach_evidence, authenticate, open_service, parse_case_id, resolve_secret, styled_status,
    SECRET_ENV, UNLOCK_SECRET_ENV,
};
use crate::cli::output::print_case;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::CaseStatus;
use crate::core::team::{Actor, Authenticator};
use crate::core::workflow::TransitionError;
use crate::core::{CaseError, CaseUpdate};
use crate::entities::case::FindingsPatch;

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Case id, e.g. INC-20240315-0042
    pub id: String,

    /// New status (pending, in-progress, resolved, cancelled)
    #[arg(long, short = 's')]
    pub status: Option<CaseStatus>,

    #[arg(long)]
    pub victim: Option<String>,

    #[arg(long)]
    pub accused: Option<String>,

    #[arg(long)]
    pub witnesses: Option<String>,

    #[arg(long = "staff-investigator")]
    pub staff_investigator: Option<String>,

    #[arg(long = "peer-investigator")]
    pub peer_investigator: Option<String>,

    /// Action taken / closing statement
    #[arg(long, visible_alias = "action")]
    pub statement: Option<String>,

    /// Free-text note for the audit trail
    #[arg(long, short = 'm')]
    pub note: Option<String>,

    /// Evidence file to attach
    #[arg(long, short = 'e')]
    pub evidence: Option<PathBuf>,

    /// Officer secret
    #[arg(long, env = SECRET_ENV, hide_env_values = true)]
    pub secret: Option<String>,

    /// Request a supervisor unlock to edit a resolved case
    #[arg(long)]
    pub unlock: bool,

    /// Supervisor secret for --unlock (prompted if omitted)
    #[arg(long, env = UNLOCK_SECRET_ENV, hide_env_values = true)]
    pub unlock_secret: Option<String>,
}

pub fn run(args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let (config, service) = open_service(global)?;
    let identity = authenticate(&config, args.secret)?;
    let actor = Actor::from(&identity);
    let case_id = parse_case_id(&args.id)?;

    let unlock_granted = if args.unlock {
        let authenticator = config.authenticator();
        let granted = resolve_secret(args.unlock_secret, "Supervisor secret")?
            .is_some_and(|secret| authenticator.grant_unlock(&secret));
        if !granted {
            bail!("Unlock denied: the supervisor secret is unknown or lacks unlock rights");
        }
        true
    } else {
        false
    };

    let mut update = CaseUpdate {
        findings: FindingsPatch {
            victim: args.victim,
            accused: args.accused,
            witnesses: args.witnesses,
            staff_investigator: args.staff_investigator,
            peer_investigator: args.peer_investigator,
            statement: args.statement,
        },
        status: args.status,
        evidence: None,
        note: args.note,
    };
    if let Some(path) = &args.evidence {
        // Refuse before storing anything the update could never reference
        if !identity.role.can_edit() {
            return Err(CaseError::from(TransitionError::ReadOnlyRole).into());
        }
        if service.get(&case_id)?.status.is_locked() && !unlock_granted {
            return Err(CaseError::from(TransitionError::CaseLocked).into());
        }
        update.evidence = Some(attach_evidence(&service, path)?);
    }

    let case = service.update_findings(&case_id, &actor, update, unlock_granted)?;

    match global.output {
        OutputFormat::Auto | OutputFormat::Table if !global.quiet => {
            println!(
                "{} {} is now {}",
                style("✓").green(),
                style(case.case_id.as_str()).cyan().bold(),
                styled_status(case.status)
            );
            if let Some(last) = case.audit_trail.last() {
                println!("  {}: {}", style(&last.actor).yellow(), last.note);
            }
            Ok(())
        }
        OutputFormat::Auto | OutputFormat::Table => {
            println!("{}", case.case_id);
            Ok(())
        }
        format => print_case(&case, format),
    }
}
