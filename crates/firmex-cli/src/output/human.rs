//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use firmex_core::ExtractionReport;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
    err: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
            err: Term::stderr(),
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn warn(&self, message: &str) {
        let line = if self.use_colors {
            format!("{} {message}", style("⚠").yellow().bold())
        } else {
            format!("WARNING: {message}")
        };
        let _ = self.err.write_line(&line);
    }
}

impl OutputFormatter for HumanFormatter {
    fn render_report(&self, report: &ExtractionReport) -> Result<()> {
        // Skipped selectors are reported even in quiet mode.
        for skipped in &report.skipped {
            self.warn(&skipped.reason);
        }

        if self.quiet {
            return Ok(());
        }

        for warning in &report.warnings {
            self.warn(warning);
        }

        if self.use_colors {
            let _ = self.term.write_line(&format!(
                "{} Extraction complete",
                style("✓").green().bold()
            ));
        } else {
            let _ = self.term.write_line("Extraction complete");
        }

        let _ = self.term.write_line(&format!(
            "  Destination: {}",
            report.destination.display()
        ));

        for outcome in &report.artifacts {
            let _ = self.term.write_line(&format!(
                "  {}: {} file(s), {}",
                outcome.kind,
                outcome.files.len(),
                Self::format_size(outcome.bytes_written())
            ));

            if self.verbose {
                for file in &outcome.files {
                    let _ = self
                        .term
                        .write_line(&format!("    {}", file.path.display()));
                }
            }
        }

        let _ = self.term.write_line(&format!(
            "  Total size: {}",
            Self::format_size(report.bytes_written())
        ));

        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("  Duration: {:?}", report.duration));
        }

        Ok(())
    }

    fn render_error(&self, error: &anyhow::Error) {
        let prefix = if self.use_colors {
            style("Error:").red().bold().to_string()
        } else {
            "Error:".to_string()
        };
        let _ = self.err.write_line(&format!("{prefix} {error:?}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(HumanFormatter::format_size(0), "0 B");
        assert_eq!(HumanFormatter::format_size(512), "512 B");
        assert_eq!(HumanFormatter::format_size(1536), "1.5 KB");
        assert_eq!(HumanFormatter::format_size(3 * 1024 * 1024), "3.0 MB");
        assert_eq!(HumanFormatter::format_size(2 * 1024 * 1024 * 1024), "2.0 GB");
    }
}
