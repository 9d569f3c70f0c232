use crate::domain::snapshot::StockSnapshot;
use crate::report::Report;
use anyhow::Result;
use chrono::{Duration, NaiveDate};
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

pub(crate) const CHARTS_SUBDIR: &str = "charts";

const CHART_SIZE: (u32, u32) = (1200, 600);
// #3498db, matching the report's accent color.
const LINE_COLOR: RGBColor = RGBColor(52, 152, 219);

pub(crate) fn chart_filename(ticker: &str, date: NaiveDate) -> String {
    format!("{}_chart_{}.png", ticker, date.format("%Y%m%d"))
}

/// Snapshots eligible for a trend chart: non-error with a non-empty yearly
/// series.
pub(crate) fn chart_targets(report: &Report) -> Vec<&StockSnapshot> {
    report
        .rows
        .iter()
        .map(|row| &row.snapshot)
        .filter(|s| !s.is_error() && !s.yearly.is_empty())
        .collect()
}

/// Renders one chart per eligible ticker into `{output_dir}/charts/`.
///
/// Returns ticker -> HTML-relative image path. A per-ticker failure is logged
/// and skipped; it never aborts the report.
pub(crate) fn render_charts(output_dir: &Path, report: &Report) -> BTreeMap<String, String> {
    let date = report.generated_at.date_naive();
    let mut out = BTreeMap::new();

    for snapshot in chart_targets(report) {
        let filename = chart_filename(&snapshot.ticker, date);
        let path = output_dir.join(CHARTS_SUBDIR).join(&filename);

        match render_price_chart(&path, snapshot) {
            Ok(()) => {
                tracing::debug!(ticker = %snapshot.ticker, path = %path.display(), "chart rendered");
                out.insert(snapshot.ticker.clone(), format!("{CHARTS_SUBDIR}/{filename}"));
            }
            Err(err) => {
                tracing::error!(ticker = %snapshot.ticker, error = %err, "chart rendering failed; skipping");
            }
        }
    }

    out
}

fn render_price_chart(path: &Path, snapshot: &StockSnapshot) -> Result<()> {
    let series = &snapshot.yearly;
    anyhow::ensure!(!series.is_empty(), "yearly series is empty");

    let first = series.first().map(|p| p.date).unwrap_or_default();
    let mut last = series.last().map(|p| p.date).unwrap_or_default();
    if last <= first {
        last = first + Duration::days(1);
    }

    let mut low = f64::INFINITY;
    let mut high = f64::NEG_INFINITY;
    for p in series {
        low = low.min(p.close);
        high = high.max(p.close);
    }
    // Pad a flat or narrow range so the mesh stays well-formed.
    let pad = ((high - low) * 0.05).max(high.abs() * 0.01).max(0.5);
    let (y_min, y_max) = (low - pad, high + pad);

    let title = format!(
        "{} ({}) - 1 Year Price Trend",
        snapshot.company_name, snapshot.ticker
    );

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| anyhow::anyhow!("failed to fill chart background: {e}"))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(first..last, y_min..y_max)
        .map_err(|e| anyhow::anyhow!("failed to build chart axes: {e}"))?;

    chart
        .configure_mesh()
        .x_label_formatter(&|d| d.format("%Y-%m").to_string())
        .y_label_formatter(&|v| format!("{v:.2}"))
        .draw()
        .map_err(|e| anyhow::anyhow!("failed to draw chart mesh: {e}"))?;

    chart
        .draw_series(
            AreaSeries::new(
                series.iter().map(|p| (p.date, p.close)),
                y_min,
                LINE_COLOR.mix(0.3),
            )
            .border_style(LINE_COLOR.stroke_width(2)),
        )
        .map_err(|e| anyhow::anyhow!("failed to draw price series: {e}"))?;

    root.present()
        .map_err(|e| anyhow::anyhow!("failed to write chart image: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::change::PriceChange;
    use crate::domain::snapshot::PricePoint;
    use crate::report::ReportRow;
    use chrono::{Local, TimeZone};

    fn yearly_snapshot(ticker: &str, points: usize) -> StockSnapshot {
        let mut s = StockSnapshot::failed(ticker, "");
        s.error = None;
        s.company_name = ticker.to_string();
        s.yearly = (0..points)
            .map(|i| {
                let date =
                    NaiveDate::from_ymd_opt(2025, 9, 1).unwrap() + Duration::days(i as i64 * 7);
                PricePoint::new(date, 100.0 + i as f64)
            })
            .collect();
        s
    }

    fn report_with(snapshots: Vec<StockSnapshot>) -> Report {
        Report {
            generated_at: Local.with_ymd_and_hms(2026, 8, 31, 9, 0, 0).unwrap(),
            rows: snapshots
                .into_iter()
                .map(|snapshot| ReportRow {
                    snapshot,
                    change: PriceChange::default(),
                })
                .collect(),
        }
    }

    #[test]
    fn filename_keys_ticker_and_day() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        assert_eq!(chart_filename("AAPL", date), "AAPL_chart_20260831.png");
    }

    #[test]
    fn targets_require_non_error_and_non_empty_yearly() {
        let with_yearly = yearly_snapshot("AAPL", 10);
        let empty_yearly = {
            let mut s = yearly_snapshot("MSFT", 0);
            s.yearly.clear();
            s
        };
        let failed = StockSnapshot::failed("NOSUCH", "lookup error");

        let report = report_with(vec![with_yearly, empty_yearly, failed]);
        let targets = chart_targets(&report);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].ticker, "AAPL");
    }
}
