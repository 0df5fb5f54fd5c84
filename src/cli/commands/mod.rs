//! CLI command implementations

pub mod completions;
pub mod export;
pub mod init;
pub mod list;
pub mod show;
pub mod stats;
pub mod submit;
pub mod update;
pub mod verify;
pub mod whoami;
