mod chart;
mod html;

use crate::config::ReportConfig;
use crate::domain::change::PriceChange;
use crate::domain::snapshot::StockSnapshot;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// One watchlist entry's snapshot paired with its computed change.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub snapshot: StockSnapshot,
    pub change: PriceChange,
}

/// A full report run: generation timestamp plus rows in watchlist order.
#[derive(Debug, Clone)]
pub struct Report {
    pub generated_at: DateTime<Local>,
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn new(rows: Vec<ReportRow>) -> Self {
        Self {
            generated_at: Local::now(),
            rows,
        }
    }
}

/// Writes HTML reports and their chart images under one output directory.
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    /// Creates the output directory and its `charts/` subdirectory if absent.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(output_dir.join(chart::CHARTS_SUBDIR)).with_context(|| {
            format!("failed to create report output dir {}", output_dir.display())
        })?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Renders charts and the HTML document, writes both to disk, and returns
    /// the path of the written HTML file.
    pub fn generate_html_report(&self, report: &Report) -> Result<PathBuf> {
        let charts = chart::render_charts(&self.output_dir, report);
        let rendered = html::render_html(report, &charts)?;

        let filename = format!(
            "stock_report_{}.html",
            report.generated_at.format("%Y%m%d_%H%M%S")
        );
        let path = self.output_dir.join(filename);
        std::fs::write(&path, rendered)
            .with_context(|| format!("failed to write report {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            rows = report.rows.len(),
            charts = charts.len(),
            "html report written"
        );
        Ok(path)
    }
}

/// Writes a finished report in its configured format.
///
/// Only `"html"` is supported; any other format is logged and skipped with
/// nothing written to disk. Returns the written file's path, if any.
pub fn write_report(config: &ReportConfig, report: &Report) -> Result<Option<PathBuf>> {
    match config.format.as_str() {
        "html" => {
            let generator = ReportGenerator::new(&config.output_dir)?;
            let path = generator.generate_html_report(report)?;
            Ok(Some(path))
        }
        other => {
            tracing::warn!(format = %other, "unsupported report format; no report written");
            Ok(None)
        }
    }
}
