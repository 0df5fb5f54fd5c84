//! `casebook list` command - list cases with filtering

use miette::Result;

use crate::cli::filters::{StatusFilter, TypeFilter};
use crate::cli::helpers::{authenticate, open_service, SECRET_ENV};
use crate::cli::output::print_case_list;
use crate::cli::GlobalOpts;
use crate::core::CaseFilter;

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's', default_value = "all")]
    pub status: StatusFilter,

    /// Filter by incident type
    #[arg(long = "type", short = 't', default_value = "all")]
    pub incident_type: TypeFilter,

    /// Search id, reporter, location, details and findings (case-insensitive)
    #[arg(long)]
    pub search: Option<String>,

    /// Limit output to N cases
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show count only, not the cases
    #[arg(long)]
    pub count: bool,

    /// Account secret
    #[arg(long, env = SECRET_ENV, hide_env_values = true)]
    pub secret: Option<String>,
}

pub fn run(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let (config, service) = open_service(global)?;
    authenticate(&config, args.secret)?;

    let filter = CaseFilter {
        status: args.status.as_status(),
        incident_type: args.incident_type.as_incident_type(),
        search: args.search,
    };
    let mut cases = service.list(&filter)?;
    cases.retain(|case| args.status.matches(case.status));
    if let Some(limit) = args.limit {
        cases.truncate(limit);
    }

    if args.count {
        println!("{}", cases.len());
        return Ok(());
    }

    print_case_list(&cases, global.output)
}
