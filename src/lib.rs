//! Casebook: incident case records on a whole-table store
//!
//! Anonymous reporters file cases; authenticated officers move them through a
//! fixed lifecycle and record findings. The table behind it only supports
//! whole-snapshot reads and overwrites, so every change goes through an
//! optimistic read-modify-write cycle with integrity checks, bounded retry and
//! a hash-chained audit trail per case.

pub mod cli;
pub mod core;
pub mod entities;
pub mod export;
