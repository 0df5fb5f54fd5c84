//! Shared helper functions for CLI commands

use console::{style, StyledObject};
use dialoguer::{theme::ColorfulTheme, Password};
use miette::{bail, IntoDiagnostic, Result, WrapErr};
use std::io::{self, IsTerminal};
use std::path::Path;

use crate::cli::GlobalOpts;
use crate::core::entity::CaseStatus;
use crate::core::identity::CaseId;
use crate::core::team::{Authenticator, Identity};
use crate::core::{CaseService, Config, EvidenceRef};

/// Environment variable holding the officer secret
pub const SECRET_ENV: &str = "CASEBOOK_SECRET";

/// Environment variable holding the supervisor unlock secret
pub const UNLOCK_SECRET_ENV: &str = "CASEBOOK_UNLOCK_SECRET";

pub fn load_config(global: &GlobalOpts) -> Result<Config> {
    Ok(Config::discover(global.config.as_deref())?)
}

/// Load config and build the case service from it
pub fn open_service(global: &GlobalOpts) -> Result<(Config, CaseService)> {
    let config = load_config(global)?;
    let service = config.build_service();
    tracing::debug!(store = %service.store().describe(), "opened case store");
    Ok((config, service))
}

/// Read a secret from the flag, or prompt for it on a terminal
pub fn resolve_secret(given: Option<String>, prompt: &str) -> Result<Option<String>> {
    if let Some(secret) = given.filter(|s| !s.is_empty()) {
        return Ok(Some(secret));
    }
    if !io::stdin().is_terminal() {
        return Ok(None);
    }
    let secret = Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()
        .into_diagnostic()?;
    Ok(Some(secret).filter(|s| !s.is_empty()))
}

/// Resolve the caller's identity from a secret
pub fn authenticate(config: &Config, secret: Option<String>) -> Result<Identity> {
    let Some(secret) = resolve_secret(secret, "Secret")? else {
        bail!(
            help = format!("pass --secret or set {}", SECRET_ENV),
            "No secret given"
        );
    };
    match config.authenticator().authenticate(&secret) {
        Some(identity) => {
            tracing::debug!(name = %identity.display_name, role = %identity.role, "authenticated");
            Ok(identity)
        }
        None => bail!("Unknown secret"),
    }
}

pub fn parse_case_id(raw: &str) -> Result<CaseId> {
    CaseId::parse(raw.trim()).map_err(|e| miette::miette!("Invalid case id '{}': {}", raw, e))
}

/// Read an evidence file and store it through the service's media transform
pub fn attach_evidence(service: &CaseService, path: &Path) -> Result<EvidenceRef> {
    let bytes = std::fs::read(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Cannot read evidence file {}", path.display()))?;
    let hint = path.file_name().and_then(|n| n.to_str());
    Ok(service.attach_evidence(&bytes, hint)?)
}

/// Style a status label the same way everywhere
pub fn styled_status(status: CaseStatus) -> StyledObject<&'static str> {
    let label = status.as_label();
    match status {
        CaseStatus::Pending => style(label).yellow(),
        CaseStatus::InProgress => style(label).cyan(),
        CaseStatus::Resolved => style(label).green(),
        CaseStatus::Cancelled => style(label).dim(),
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// First line of a multi-line value, for one-row displays
pub fn first_line(s: &str) -> &str {
    s.lines().next().unwrap_or_default().trim()
}
