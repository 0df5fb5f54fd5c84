//! CLI module - argument parsing and command dispatch

pub mod args;
pub mod commands;
pub mod filters;
pub mod helpers;
pub mod output;

pub use args::{Cli, Commands, GlobalOpts, OutputFormat};
pub use filters::{StatusFilter, TypeFilter};

use miette::Result;

/// Dispatch a parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let global = cli.global;
    match cli.command {
        Commands::Init(args) => commands::init::run(args, &global),
        Commands::Submit(args) => commands::submit::run(args, &global),
        Commands::List(args) => commands::list::run(args, &global),
        Commands::Show(args) => commands::show::run(args, &global),
        Commands::Update(args) => commands::update::run(args, &global),
        Commands::Export(args) => commands::export::run(args, &global),
        Commands::Verify(args) => commands::verify::run(args, &global),
        Commands::Stats(args) => commands::stats::run(args, &global),
        Commands::Whoami(args) => commands::whoami::run(args, &global),
        Commands::Completions(args) => commands::completions::run(args),
    }
}
