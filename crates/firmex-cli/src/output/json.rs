//! JSON output formatter for machine-readable results.

use super::formatter::Envelope;
use super::formatter::OutputFormatter;
use anyhow::Result;
use firmex_core::ExtractionReport;
use serde::Serialize;
use std::io::Write;
use std::io::{self};

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct FileOutput {
    entry: String,
    path: String,
    size: u64,
}

#[derive(Serialize)]
struct ArtifactOutput {
    kind: &'static str,
    files: Vec<FileOutput>,
    bytes_written: u64,
}

#[derive(Serialize)]
struct SkippedOutput {
    kind: &'static str,
    reason: String,
}

#[derive(Serialize)]
struct ExtractionOutput {
    destination: String,
    artifacts: Vec<ArtifactOutput>,
    skipped: Vec<SkippedOutput>,
    files_extracted: usize,
    bytes_written: u64,
    duration_ms: u128,
    warnings: Vec<String>,
}

impl From<&ExtractionReport> for ExtractionOutput {
    fn from(report: &ExtractionReport) -> Self {
        Self {
            destination: report.destination.display().to_string(),
            artifacts: report
                .artifacts
                .iter()
                .map(|outcome| ArtifactOutput {
                    kind: outcome.kind.id(),
                    files: outcome
                        .files
                        .iter()
                        .map(|f| FileOutput {
                            entry: f.entry.clone(),
                            path: f.path.display().to_string(),
                            size: f.size,
                        })
                        .collect(),
                    bytes_written: outcome.bytes_written(),
                })
                .collect(),
            skipped: report
                .skipped
                .iter()
                .map(|s| SkippedOutput {
                    kind: s.kind.id(),
                    reason: s.reason.clone(),
                })
                .collect(),
            files_extracted: report.files_extracted(),
            bytes_written: report.bytes_written(),
            duration_ms: report.duration.as_millis(),
            warnings: report.warnings.clone(),
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn render_report(&self, report: &ExtractionReport) -> Result<()> {
        Self::output(&Envelope::completed("extract", ExtractionOutput::from(report)))
    }

    fn render_error(&self, error: &anyhow::Error) {
        let _ = Self::output(&Envelope::failed("extract", error));
    }
}
