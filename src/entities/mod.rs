//! Entity type definitions

pub mod case;

pub use case::{Case, Findings, FindingsPatch, NewCase};
