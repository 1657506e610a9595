//! Renderer trait and the JSON envelope shared by machine-readable output.

use anyhow::Result;
use firmex_core::ExtractionReport;
use serde::Serialize;

/// Renders the outcome of a CLI run.
pub trait OutputFormatter {
    /// Renders a finished extraction.
    fn render_report(&self, report: &ExtractionReport) -> Result<()>;

    /// Renders a failure. Rendering errors are swallowed; the exit code
    /// already carries the failure.
    fn render_error(&self, error: &anyhow::Error);
}

/// Top-level JSON document: `{"operation", "status", "data" | "error"}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub operation: &'static str,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl<T: Serialize> Envelope<T> {
    pub fn completed(operation: &'static str, data: T) -> Self {
        Self {
            operation,
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }
}

impl Envelope<()> {
    pub fn failed(operation: &'static str, error: &anyhow::Error) -> Self {
        Self {
            operation,
            status: Status::Error,
            data: None,
            error: Some(format!("{error:#}")),
        }
    }
}
