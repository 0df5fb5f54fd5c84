//! Officer accounts and credential lookup
//!
//! Credentials are a static table of SHA-256 secret digests mapped to an
//! identity and role. Callers pass the resolved identity into every service
//! call; nothing here is ambient session state.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// What an authenticated account may do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May change status and findings
    Officer,
    /// May only list and view cases
    #[serde(alias = "read_only", alias = "read-only")]
    ReadOnly,
}

impl Role {
    pub fn can_edit(&self) -> bool {
        matches!(self, Role::Officer)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Officer => write!(f, "officer"),
            Role::ReadOnly => write!(f, "readonly"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "officer" => Ok(Role::Officer),
            "readonly" | "read_only" | "read-only" => Ok(Role::ReadOnly),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// An authenticated account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub display_name: String,
    pub role: Role,
    /// Whether this account can unlock resolved cases
    pub can_unlock: bool,
}

/// Who is performing a change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }

    pub fn officer(name: impl Into<String>) -> Self {
        Self::new(name, Role::Officer)
    }

    pub fn readonly(name: impl Into<String>) -> Self {
        Self::new(name, Role::ReadOnly)
    }
}

impl From<&Identity> for Actor {
    fn from(identity: &Identity) -> Self {
        Actor::new(identity.display_name.clone(), identity.role)
    }
}

/// Credential lookup
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, secret: &str) -> Option<Identity>;

    /// The privileged check that unlocks a resolved case for one edit
    fn grant_unlock(&self, secret: &str) -> bool {
        self.authenticate(secret)
            .map(|identity| identity.role == Role::Officer && identity.can_unlock)
            .unwrap_or(false)
    }
}

/// One entry of the credential table as it appears in config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub name: String,
    pub role: Role,
    /// Lowercase hex SHA-256 of the secret
    pub secret_sha256: String,
    #[serde(default)]
    pub can_unlock: bool,
}

/// Hash a secret the way credential entries store it
pub fn hash_secret(secret: &str) -> String {
    format!("{:x}", Sha256::digest(secret.as_bytes()))
}

/// Authenticator backed by a fixed credential list
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    credentials: Vec<Credential>,
}

impl StaticAuthenticator {
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self { credentials }
    }

    /// Add an account from a plaintext secret
    pub fn with_account(mut self, name: &str, role: Role, secret: &str, can_unlock: bool) -> Self {
        self.credentials.push(Credential {
            name: name.to_string(),
            role,
            secret_sha256: hash_secret(secret),
            can_unlock,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

impl Authenticator for StaticAuthenticator {
    fn authenticate(&self, secret: &str) -> Option<Identity> {
        if secret.is_empty() {
            return None;
        }
        let digest = hash_secret(secret);
        self.credentials
            .iter()
            .find(|c| c.secret_sha256.eq_ignore_ascii_case(&digest))
            .map(|c| Identity {
                display_name: c.name.clone(),
                role: c.role,
                can_unlock: c.can_unlock,
            })
    }
}
