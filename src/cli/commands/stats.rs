//! `casebook stats` command - dashboard counts

use miette::Result;

use crate::cli::helpers::{authenticate, open_service, SECRET_ENV};
use crate::cli::output::print_summary;
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct StatsArgs {
    /// Account secret
    #[arg(long, env = SECRET_ENV, hide_env_values = true)]
    pub secret: Option<String>,
}

pub fn run(args: StatsArgs, global: &GlobalOpts) -> Result<()> {
    let (config, service) = open_service(global)?;
    authenticate(&config, args.secret)?;

    let summary = service.summary()?;
    print_summary(&summary, global.output)
}
