//! Report projection types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Output format for a projected report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Markdown,
    Pdf,
    Html,
}

impl ReportFormat {
    /// `true` for the two formats this crate actually renders; PDF and HTML
    /// are thin pass-throughs out of scope.
    pub fn is_natively_supported(self) -> bool {
        matches!(self, ReportFormat::Json | ReportFormat::Markdown)
    }

    pub fn file_extension(self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "md",
            ReportFormat::Pdf => "pdf",
            ReportFormat::Html => "html",
        }
    }
}

/// A rendered report, ready to be written to disk or returned to a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub content: String,
    pub format: ReportFormat,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default = "Utc::now")]
    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub fn new(content: String, format: ReportFormat) -> Self {
        Self {
            content,
            format,
            metadata: Map::new(),
            generated_at: Utc::now(),
        }
    }

    /// File name following the convention:
    /// `compliance_report_<application_name>_<timestamp>.{json|md}`.
    pub fn file_name(application_name: &str) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d_%H%M%S");
        format!("compliance_report_{application_name}_{timestamp}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_and_html_are_not_natively_supported() {
        assert!(!ReportFormat::Pdf.is_natively_supported());
        assert!(!ReportFormat::Html.is_natively_supported());
        assert!(ReportFormat::Json.is_natively_supported());
        assert!(ReportFormat::Markdown.is_natively_supported());
    }

    #[test]
    fn file_name_embeds_application_name() {
        let name = Report::file_name("acme-app");
        assert!(name.contains("acme-app"));
        assert!(name.starts_with("compliance_report_"));
    }
}
