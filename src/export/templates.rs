//! Embedded tera templates for case sheets and starter config files

use chrono::{DateTime, Local, Utc};
use rust_embed::Embed;
use serde::Serialize;
use tera::{Context, Tera};

use super::ExportError;
use crate::core::team::Credential;
use crate::entities::case::Case;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

pub const CASE_SHEET: &str = "case_sheet.txt.tera";
pub const STARTER_CONFIG: &str = "casebook.yaml.tera";

/// Values for a freshly initialised `casebook.yaml`
#[derive(Debug, Clone)]
pub struct StarterConfig {
    pub backend: String,
    pub store_path: String,
    pub prefix: String,
    pub credentials: Vec<Credential>,
}

#[derive(Serialize)]
struct AuditLine {
    when: String,
    actor: String,
    note: String,
}

#[derive(Serialize)]
struct CredentialLine {
    name: String,
    role: String,
    secret_sha256: String,
    can_unlock: bool,
}

fn local_time(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// YAML-safe scalar: a JSON string literal is valid double-quoted YAML
fn yaml_quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value.escape_default()))
}

/// Template generator using Tera
pub struct TemplateGenerator {
    tera: Tera,
}

impl TemplateGenerator {
    /// Create a new template generator with embedded templates
    pub fn new() -> Result<Self, ExportError> {
        let mut tera = Tera::default();

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                if let Ok(template_str) = std::str::from_utf8(&content.data) {
                    tera.add_raw_template(filename, template_str)
                        .map_err(|e| ExportError::Template(e.to_string()))?;
                }
            }
        }

        Ok(Self { tera })
    }

    fn render(&self, name: &str, context: &Context) -> Result<String, ExportError> {
        if !self.tera.get_template_names().any(|n| n == name) {
            return Err(ExportError::NotFound(name.to_string()));
        }
        self.tera
            .render(name, context)
            .map_err(|e| ExportError::Template(e.to_string()))
    }

    /// Plain-text sheet for one case
    pub fn case_sheet(&self, case: &Case) -> Result<String, ExportError> {
        let mut context = Context::new();
        context.insert("case_id", case.case_id.as_str());
        context.insert("status", case.status.as_label());
        context.insert("submitted", &local_time(&case.created_at));
        context.insert("reporter", &case.reporter_name);
        context.insert("incident_type", &case.incident_type.to_string());
        context.insert("location", &case.location);
        context.insert("details", &case.details);

        // Empty values stay out of the context so `default` applies
        let findings = &case.findings;
        for (key, value) in [
            ("victim", &findings.victim),
            ("accused", &findings.accused),
            ("witnesses", &findings.witnesses),
            ("staff_investigator", &findings.staff_investigator),
            ("peer_investigator", &findings.peer_investigator),
            ("statement", &findings.statement),
            ("handled_by", &case.handled_by),
        ] {
            if !value.trim().is_empty() {
                context.insert(key, value);
            }
        }
        if let Some(evidence) = &case.evidence {
            context.insert("evidence", evidence.as_str());
        }

        let audit: Vec<AuditLine> = case
            .audit_trail
            .iter()
            .map(|e| AuditLine {
                when: local_time(&e.timestamp),
                actor: e.actor.clone(),
                note: e.note.clone(),
            })
            .collect();
        context.insert("audit", &audit);
        context.insert("generated", &local_time(&Utc::now()));

        self.render(CASE_SHEET, &context)
    }

    /// Commented `casebook.yaml` for `casebook init`
    pub fn starter_config(&self, starter: &StarterConfig) -> Result<String, ExportError> {
        let mut context = Context::new();
        context.insert("backend", &starter.backend);
        context.insert("store_path", &yaml_quote(&starter.store_path));
        context.insert("prefix", &yaml_quote(&starter.prefix));

        let credentials: Vec<CredentialLine> = starter
            .credentials
            .iter()
            .map(|c| CredentialLine {
                name: yaml_quote(&c.name),
                role: c.role.to_string(),
                secret_sha256: c.secret_sha256.clone(),
                can_unlock: c.can_unlock,
            })
            .collect();
        context.insert("credentials", &credentials);

        self.render(STARTER_CONFIG, &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{BackendKind, Config};
    use crate::core::team::{hash_secret, Role};

    #[test]
    fn test_templates_are_embedded() {
        let generator = TemplateGenerator::new().unwrap();
        let names: Vec<&str> = generator.tera.get_template_names().collect();
        assert!(names.contains(&CASE_SHEET));
        assert!(names.contains(&STARTER_CONFIG));
    }

    #[test]
    fn test_starter_config_parses_back() {
        let generator = TemplateGenerator::new().unwrap();
        let yaml = generator
            .starter_config(&StarterConfig {
                backend: "sqlite".to_string(),
                store_path: "data/cases: main.db".to_string(),
                prefix: "INC".to_string(),
                credentials: vec![Credential {
                    name: "Officer \"Mali\"".to_string(),
                    role: Role::Officer,
                    secret_sha256: hash_secret("s3cret"),
                    can_unlock: true,
                }],
            })
            .unwrap();

        let config = Config::parse(&yaml, "casebook.yaml").unwrap();
        assert_eq!(config.store.backend, BackendKind::Sqlite);
        assert_eq!(config.store.path.to_str(), Some("data/cases: main.db"));
        assert_eq!(config.credentials.len(), 1);
        assert_eq!(config.credentials[0].name, "Officer \"Mali\"");
        assert!(config.credentials[0].can_unlock);
    }

    #[test]
    fn test_starter_config_without_credentials() {
        let generator = TemplateGenerator::new().unwrap();
        let yaml = generator
            .starter_config(&StarterConfig {
                backend: "csv".to_string(),
                store_path: "cases.csv".to_string(),
                prefix: "INC".to_string(),
                credentials: Vec::new(),
            })
            .unwrap();
        let config = Config::parse(&yaml, "casebook.yaml").unwrap();
        assert!(config.credentials.is_empty());
    }
}
