//! `casebook init` command - write a starter config file

use clap::ValueEnum;
use console::style;
use dialoguer::{theme::ColorfulTheme, Password};
use miette::{bail, IntoDiagnostic, Result};
use std::fs;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use crate::cli::helpers::SECRET_ENV;
use crate::cli::GlobalOpts;
use crate::core::config::CONFIG_FILE;
use crate::core::identity::DEFAULT_PREFIX;
use crate::core::team::{hash_secret, Credential, Role};
use crate::export::{StarterConfig, TemplateGenerator};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum BackendChoice {
    Csv,
    Sqlite,
}

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Where to write the config (default: --config or ./casebook.yaml)
    pub path: Option<PathBuf>,

    /// Table backend
    #[arg(long, default_value = "csv")]
    pub backend: BackendChoice,

    /// Table file (default: cases.csv or cases.db)
    #[arg(long)]
    pub store_path: Option<String>,

    /// Case id prefix
    #[arg(long, default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Create a first officer account with this name
    #[arg(long)]
    pub officer: Option<String>,

    /// Secret for the first officer (prompted if omitted)
    #[arg(long, env = SECRET_ENV, hide_env_values = true)]
    pub secret: Option<String>,

    /// Allow the first officer to unlock resolved cases
    #[arg(long)]
    pub can_unlock: bool,

    /// Overwrite an existing config file
    #[arg(long, short = 'f')]
    pub force: bool,
}

fn prompt_new_secret(name: &str) -> Result<String> {
    if !io::stdin().is_terminal() {
        bail!(
            help = format!("pass --secret or set {}", SECRET_ENV),
            "No secret given for {}",
            name
        );
    }
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Secret for {}", name))
        .with_confirmation("Repeat secret", "Secrets do not match")
        .interact()
        .into_diagnostic()
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = args
        .path
        .or_else(|| global.config.clone())
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

    if path.exists() && !args.force {
        bail!(
            help = "pass --force to overwrite it",
            "{} already exists",
            path.display()
        );
    }

    let mut credentials = Vec::new();
    if let Some(name) = args.officer.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        let secret = match args.secret.filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => prompt_new_secret(name)?,
        };
        credentials.push(Credential {
            name: name.to_string(),
            role: Role::Officer,
            secret_sha256: hash_secret(&secret),
            can_unlock: args.can_unlock,
        });
    }

    let (backend, default_store) = match args.backend {
        BackendChoice::Csv => ("csv", "cases.csv"),
        BackendChoice::Sqlite => ("sqlite", "cases.db"),
    };
    let starter = StarterConfig {
        backend: backend.to_string(),
        store_path: args.store_path.unwrap_or_else(|| default_store.to_string()),
        prefix: args.prefix,
        credentials,
    };

    let generator = TemplateGenerator::new()?;
    let yaml = generator.starter_config(&starter)?;

    // Refuse to write something the loader would reject
    crate::core::Config::parse(&yaml, &path.display().to_string())?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    fs::write(&path, yaml).into_diagnostic()?;

    if global.quiet {
        println!("{}", path.display());
    } else {
        println!(
            "{} Wrote {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
        if starter.credentials.is_empty() {
            println!(
                "  No accounts yet. Add one with {}",
                style("casebook init --force --officer <NAME>").yellow()
            );
        }
    }
    Ok(())
}
