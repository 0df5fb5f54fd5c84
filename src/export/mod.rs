//! Document export - turning a case into a shareable document

pub mod templates;

pub use templates::{StarterConfig, TemplateGenerator};

use miette::Diagnostic;
use thiserror::Error;

use crate::entities::case::Case;

#[derive(Debug, Error, Diagnostic)]
pub enum ExportError {
    #[error("Template not found: {0}")]
    #[diagnostic(code(casebook::export::missing_template))]
    NotFound(String),

    #[error("Template rendering error: {0}")]
    #[diagnostic(code(casebook::export::template))]
    Template(String),

    #[error("Encoding error: {0}")]
    #[diagnostic(code(casebook::export::encoding))]
    Encoding(#[from] serde_json::Error),
}

/// Renders one case into document bytes
pub trait DocumentExporter: Send + Sync {
    fn render(&self, case: &Case) -> Result<Vec<u8>, ExportError>;

    /// File extension for the rendered document, without the dot
    fn extension(&self) -> &'static str;
}

/// Plain-text case sheet from the embedded template
pub struct CaseSheetExporter {
    templates: TemplateGenerator,
}

impl CaseSheetExporter {
    pub fn new() -> Result<Self, ExportError> {
        Ok(Self {
            templates: TemplateGenerator::new()?,
        })
    }
}

impl DocumentExporter for CaseSheetExporter {
    fn render(&self, case: &Case) -> Result<Vec<u8>, ExportError> {
        Ok(self.templates.case_sheet(case)?.into_bytes())
    }

    fn extension(&self) -> &'static str {
        "txt"
    }
}

/// Pretty-printed JSON of the full case record
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonExporter;

impl DocumentExporter for JsonExporter {
    fn render(&self, case: &Case) -> Result<Vec<u8>, ExportError> {
        let mut bytes = serde_json::to_vec_pretty(case)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}
