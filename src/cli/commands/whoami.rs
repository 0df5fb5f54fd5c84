//! `casebook whoami` command

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{authenticate, load_config, SECRET_ENV};
use crate::cli::{GlobalOpts, OutputFormat};

#[derive(clap::Args, Debug)]
pub struct WhoamiArgs {
    /// Account secret
    #[arg(long, env = SECRET_ENV, hide_env_values = true)]
    pub secret: Option<String>,
}

pub fn run(args: WhoamiArgs, global: &GlobalOpts) -> Result<()> {
    let config = load_config(global)?;
    let identity = authenticate(&config, args.secret)?;

    match global.output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&identity).into_diagnostic()?)
        }
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&identity).into_diagnostic()?),
        _ if global.quiet => println!("{}", identity.display_name),
        _ => {
            println!(
                "{} ({})",
                style(&identity.display_name).cyan().bold(),
                identity.role
            );
            if identity.can_unlock {
                println!("  may unlock resolved cases");
            }
        }
    }
    Ok(())
}
