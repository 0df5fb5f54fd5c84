//! Configuration loaded from `casebook.yaml`
//!
//! Discovery order: explicit path, `CASEBOOK_CONFIG`, `./casebook.yaml`, the
//! platform config directory, then built-in defaults. Relative paths inside
//! the file resolve against the directory the file was loaded from.

use directories::ProjectDirs;
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::core::evidence::{EvidenceVault, DEFAULT_MAX_BYTES};
use crate::core::identity::{DatedIdGenerator, DEFAULT_PREFIX, MIN_SUFFIX_DIGITS};
use crate::core::service::CaseService;
use crate::core::store::{CsvTable, MemoryTable, RecordStore, RetryPolicy, SqliteTable, TableBackend};
use crate::core::team::{Credential, StaticAuthenticator};

/// File name looked up in the working and platform config directories
pub const CONFIG_FILE: &str = "casebook.yaml";

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "CASEBOOK_CONFIG";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("Cannot read config file {path}")]
    #[diagnostic(code(casebook::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in config: {message}")]
    #[diagnostic(code(casebook::config::syntax))]
    Syntax {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("Invalid config: {0}")]
    #[diagnostic(code(casebook::config::invalid), help("see 'casebook init' for a starter file"))]
    Invalid(String),
}

/// Which table backend holds the cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Csv,
    Sqlite,
    /// Process-local table; nothing persists
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Csv,
            path: PathBuf::from("cases.csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdConfig {
    pub prefix: String,
    pub suffix_digits: usize,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            suffix_digits: MIN_SUFFIX_DIGITS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub guard_reads: bool,
    pub verify_writes: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            guard_reads: policy.guard_reads,
            verify_writes: policy.verify_writes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("evidence"),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Everything `casebook.yaml` can set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub ids: IdConfig,
    pub retry: RetryConfig,
    pub evidence: EvidenceConfig,
    pub credentials: Vec<Credential>,

    /// Directory relative paths resolve against
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Config {
    /// Find and load the config file, falling back to defaults
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
            return Self::load(Path::new(&path));
        }

        let local = PathBuf::from(CONFIG_FILE);
        if local.is_file() {
            return Self::load(&local);
        }
        if let Some(path) = Self::user_config_path().filter(|p| p.is_file()) {
            return Self::load(&path);
        }

        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    /// Platform config location, e.g. `~/.config/casebook/casebook.yaml`
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "casebook", "casebook")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&content, &path.display().to_string())?;
        config.base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf);
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse and validate config text; `filename` is used in diagnostics
    pub fn parse(content: &str, filename: &str) -> Result<Self, ConfigError> {
        let config: Config = if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yml::from_str(content).map_err(|e| ConfigError::Syntax {
                message: e.to_string(),
                span: e.location().map(|loc| SourceSpan::from((loc.index(), 1))),
                src: NamedSource::new(filename, content.to_string()),
            })?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::Invalid(
                "retry.base_delay_ms must not exceed retry.max_delay_ms".to_string(),
            ));
        }
        let prefix = self.ids.prefix.trim();
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Invalid(format!(
                "ids.prefix must be ASCII letters only, got '{}'",
                self.ids.prefix
            )));
        }
        if self.evidence.max_bytes == 0 {
            return Err(ConfigError::Invalid(
                "evidence.max_bytes must be positive".to_string(),
            ));
        }
        for (i, credential) in self.credentials.iter().enumerate() {
            if credential.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "credentials[{}] has no name",
                    i
                )));
            }
            let digest = &credential.secret_sha256;
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ConfigError::Invalid(format!(
                    "credentials[{}] ({}): secret_sha256 must be 64 hex characters",
                    i, credential.name
                )));
            }
        }
        Ok(())
    }

    /// Resolve a configured path against the config file's directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            guard_reads: self.retry.guard_reads,
            verify_writes: self.retry.verify_writes,
        }
    }

    pub fn open_backend(&self) -> Arc<dyn TableBackend> {
        let path = self.resolve(&self.store.path);
        match self.store.backend {
            BackendKind::Csv => Arc::new(CsvTable::new(path)),
            BackendKind::Sqlite => Arc::new(SqliteTable::new(path)),
            BackendKind::Memory => Arc::new(MemoryTable::new()),
        }
    }

    pub fn id_source(&self) -> DatedIdGenerator {
        DatedIdGenerator::new(self.ids.prefix.trim(), self.ids.suffix_digits)
    }

    pub fn authenticator(&self) -> StaticAuthenticator {
        StaticAuthenticator::new(self.credentials.clone())
    }

    pub fn evidence_vault(&self) -> EvidenceVault {
        EvidenceVault::new(self.resolve(&self.evidence.dir), self.evidence.max_bytes)
    }

    /// Wire up a service from this config
    pub fn build_service(&self) -> CaseService {
        let store = RecordStore::new(self.open_backend(), self.retry_policy());
        CaseService::new(store, Arc::new(self.id_source()))
            .with_media(Arc::new(self.evidence_vault()))
    }

    /// Serialize for writing a starter file
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yml::to_string(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
