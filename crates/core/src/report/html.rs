use crate::domain::change::WindowChange;
use crate::report::{Report, ReportRow};
use anyhow::{Context, Result};
use askama::Template;
use std::collections::BTreeMap;

const DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate<'a> {
    report_date: &'a str,
    rows: &'a [StockCardView],
}

/// Display-ready projection of one non-error snapshot. All numbers are
/// formatted here so the template only interpolates.
pub(crate) struct StockCardView {
    pub(crate) ticker: String,
    pub(crate) company_name: String,
    pub(crate) sector: String,
    pub(crate) industry: String,
    pub(crate) price_display: String,
    pub(crate) week: Option<ChangeView>,
    pub(crate) month: Option<ChangeView>,
    pub(crate) year: Option<ChangeView>,
    pub(crate) market_cap: Option<String>,
    pub(crate) pe_ratio: Option<String>,
    pub(crate) dividend_yield: Option<String>,
    pub(crate) website: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) chart_path: Option<String>,
}

pub(crate) struct ChangeView {
    pub(crate) css_class: &'static str,
    pub(crate) percentage: String,
    pub(crate) absolute: String,
}

impl ChangeView {
    fn new(change: &WindowChange, currency: &str) -> Self {
        Self {
            css_class: change_class(change.percentage),
            percentage: format!("{:+.2}%", change.percentage),
            absolute: format!("{:+.2} {currency}", change.absolute),
        }
    }
}

fn change_class(percentage: f64) -> &'static str {
    if percentage >= 0.0 {
        "change-positive"
    } else {
        "change-negative"
    }
}

/// Renders the report body. Deterministic for a given (rows, charts,
/// timestamp) input; file naming and IO live in the generator.
pub(crate) fn render_html(report: &Report, charts: &BTreeMap<String, String>) -> Result<String> {
    let report_date = report.generated_at.format("%Y-%m-%d %H:%M").to_string();
    let rows = build_rows(&report.rows, charts);

    ReportTemplate {
        report_date: &report_date,
        rows: &rows,
    }
    .render()
    .context("failed to render report template")
}

/// Projects non-error rows into card views, preserving watchlist order.
fn build_rows(rows: &[ReportRow], charts: &BTreeMap<String, String>) -> Vec<StockCardView> {
    rows.iter()
        .filter(|row| !row.snapshot.is_error())
        .map(|row| {
            let snapshot = &row.snapshot;
            let change = &row.change;

            let price_display = match snapshot.current_price {
                Some(price) => format!("{price:.2} {}", snapshot.currency),
                None => "N/A".to_string(),
            };

            StockCardView {
                ticker: snapshot.ticker.clone(),
                company_name: snapshot.company_name.clone(),
                sector: snapshot.sector.clone(),
                industry: snapshot.industry.clone(),
                price_display,
                week: change
                    .week
                    .as_ref()
                    .map(|c| ChangeView::new(c, &snapshot.currency)),
                month: change
                    .month
                    .as_ref()
                    .map(|c| ChangeView::new(c, &snapshot.currency)),
                year: change
                    .year
                    .as_ref()
                    .map(|c| ChangeView::new(c, &snapshot.currency)),
                market_cap: snapshot
                    .market_cap
                    .map(|v| format!("{} {}", group_thousands(v), snapshot.currency)),
                pe_ratio: snapshot.pe_ratio.map(|v| format!("{v:.2}")),
                dividend_yield: snapshot.dividend_yield.map(|v| format!("{:.2}%", v * 100.0)),
                website: snapshot.website.clone(),
                description: snapshot.description.as_deref().map(truncate_description),
                chart_path: charts.get(&snapshot.ticker).cloned(),
            }
        })
        .collect()
}

/// Rounds to a whole number and inserts thousands separators.
pub(crate) fn group_thousands(v: f64) -> String {
    let rounded = format!("{v:.0}");
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    format!("{sign}{out}")
}

fn truncate_description(s: &str) -> String {
    if s.chars().count() <= DESCRIPTION_MAX_CHARS {
        return s.to_string();
    }
    let truncated: String = s.chars().take(DESCRIPTION_MAX_CHARS).collect();
    format!("{truncated}...")
}
