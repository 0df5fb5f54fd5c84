//! `casebook show` command - one case with its audit trail

use miette::Result;

use crate::cli::helpers::{authenticate, open_service, parse_case_id, SECRET_ENV};
use crate::cli::output::print_case;
use crate::cli::GlobalOpts;

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Case id, e.g. INC-20240315-0042
    pub id: String,

    /// Account secret
    #[arg(long, env = SECRET_ENV, hide_env_values = true)]
    pub secret: Option<String>,
}

pub fn run(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let (config, service) = open_service(global)?;
    authenticate(&config, args.secret)?;

    let case_id = parse_case_id(&args.id)?;
    let case = service.get(&case_id)?;
    print_case(&case, global.output)
}
