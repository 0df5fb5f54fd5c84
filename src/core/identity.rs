//! Case identifiers
//!
//! Identifiers are human-readable: `PREFIX-YYYYMMDD-NNNN`, where the date is the
//! server-local civil date and `NNNN` is a random decimal suffix. The suffix
//! space is small, so collisions are possible and the record store resolves them.

use chrono::{Local, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default identifier prefix
pub const DEFAULT_PREFIX: &str = "INC";

/// Smallest allowed number of suffix digits
pub const MIN_SUFFIX_DIGITS: usize = 4;

/// Errors from parsing a case identifier
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("case id must look like PREFIX-YYYYMMDD-NNNN, got '{0}'")]
    Malformed(String),

    #[error("case id prefix must be uppercase ASCII letters, got '{0}'")]
    InvalidPrefix(String),

    #[error("case id date '{0}' is not a valid calendar date")]
    InvalidDate(String),

    #[error("case id suffix must be at least {MIN_SUFFIX_DIGITS} digits, got '{0}'")]
    InvalidSuffix(String),
}

/// A validated case identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CaseId(String);

impl CaseId {
    /// Parse and validate an identifier string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        let s = s.trim();
        let mut parts = s.splitn(3, '-');
        let (Some(prefix), Some(date), Some(suffix)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(IdParseError::Malformed(s.to_string()));
        };

        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(IdParseError::InvalidPrefix(prefix.to_string()));
        }
        if date.len() != 8 || NaiveDate::parse_from_str(date, "%Y%m%d").is_err() {
            return Err(IdParseError::InvalidDate(date.to_string()));
        }
        if suffix.len() < MIN_SUFFIX_DIGITS || !suffix.chars().all(|c| c.is_ascii_digit()) {
            return Err(IdParseError::InvalidSuffix(suffix.to_string()));
        }

        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The prefix part (e.g. "INC")
    pub fn prefix(&self) -> &str {
        self.0.split('-').next().unwrap_or_default()
    }

    /// The civil date encoded in the identifier
    pub fn date(&self) -> Option<NaiveDate> {
        let date = self.0.split('-').nth(1)?;
        NaiveDate::parse_from_str(date, "%Y%m%d").ok()
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CaseId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CaseId::parse(s)
    }
}

impl TryFrom<String> for CaseId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CaseId::parse(&value)
    }
}

impl From<CaseId> for String {
    fn from(id: CaseId) -> Self {
        id.0
    }
}

/// Source of fresh case identifiers
pub trait IdSource: Send + Sync {
    fn next_id(&self) -> CaseId;
}

/// Generates `PREFIX-YYYYMMDD-NNNN` identifiers from the local clock and thread RNG
#[derive(Debug, Clone)]
pub struct DatedIdGenerator {
    prefix: String,
    suffix_digits: usize,
}

impl DatedIdGenerator {
    /// Create a generator; the prefix is upper-cased and stripped of non-letters,
    /// and the suffix width is clamped to at least four digits
    pub fn new(prefix: &str, suffix_digits: usize) -> Self {
        let prefix: String = prefix
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        Self {
            prefix: if prefix.is_empty() {
                DEFAULT_PREFIX.to_string()
            } else {
                prefix
            },
            suffix_digits: suffix_digits.clamp(MIN_SUFFIX_DIGITS, 9),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Build an identifier for a specific date and suffix value
    pub fn format(&self, date: NaiveDate, suffix: u32) -> CaseId {
        CaseId(format!(
            "{}-{}-{:0width$}",
            self.prefix,
            date.format("%Y%m%d"),
            suffix,
            width = self.suffix_digits
        ))
    }
}

impl Default for DatedIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX, MIN_SUFFIX_DIGITS)
    }
}

impl IdSource for DatedIdGenerator {
    fn next_id(&self) -> CaseId {
        let upper = 10u32.pow(self.suffix_digits as u32);
        let suffix = rand::rng().random_range(0..upper);
        self.format(Local::now().date_naive(), suffix)
    }
}
