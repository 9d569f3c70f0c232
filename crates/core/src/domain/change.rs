use crate::domain::snapshot::{PricePoint, StockSnapshot};
use serde::{Deserialize, Serialize};

/// Delta between the current price and the first close of one trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowChange {
    pub absolute: f64,
    pub percentage: f64,
    pub from_price: f64,
}

/// Price changes over the trailing windows, each present only when the
/// corresponding series was non-empty with a usable baseline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub week: Option<WindowChange>,
    pub month: Option<WindowChange>,
    pub year: Option<WindowChange>,
}

impl PriceChange {
    pub fn is_empty(&self) -> bool {
        self.week.is_none() && self.month.is_none() && self.year.is_none()
    }
}

/// Computes the per-window change for a snapshot. Pure.
///
/// Error-bearing or priceless snapshots produce the empty change; this is the
/// documented degraded case, not a failure.
pub fn compute_price_change(snapshot: &StockSnapshot) -> PriceChange {
    if snapshot.is_error() {
        return PriceChange::default();
    }
    let Some(current) = snapshot.current_price else {
        return PriceChange::default();
    };

    PriceChange {
        week: window_change(current, &snapshot.weekly),
        month: window_change(current, &snapshot.monthly),
        year: window_change(current, &snapshot.yearly),
    }
}

fn window_change(current: f64, series: &[PricePoint]) -> Option<WindowChange> {
    let from_price = series.first()?.close;

    // A zero or non-finite baseline makes the percentage undefined; treat the
    // window as unavailable instead of dividing.
    if from_price == 0.0 || !from_price.is_finite() {
        return None;
    }

    let absolute = current - from_price;
    Some(WindowChange {
        absolute,
        percentage: absolute / from_price * 100.0,
        from_price,
    })
}
