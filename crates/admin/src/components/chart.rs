//! CSS bar charts for daily series.

use aiq_core::SeriesPoint;

/// One bar, with its height as a percentage of the tallest bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bar {
    pub label: String,
    pub value: i64,
    pub height_pct: u8,
}

/// A titled series of bars.
#[derive(Debug, Clone)]
pub struct BarSeries {
    pub title: String,
    pub bars: Vec<Bar>,
}

impl BarSeries {
    /// Scale `points` so the largest value fills the chart.
    ///
    /// An all-zero (or empty) series renders flat.
    pub fn new(title: &str, points: &[SeriesPoint]) -> Self {
        let max = points.iter().map(|p| p.count).max().unwrap_or(0).max(0);
        let bars = points
            .iter()
            .map(|point| Bar {
                label: short_date(&point.date),
                value: point.count,
                height_pct: scale(point.count, max),
            })
            .collect();

        Self {
            title: title.to_string(),
            bars,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scale(value: i64, max: i64) -> u8 {
    if max <= 0 || value <= 0 {
        return 0;
    }
    // value <= max, so the quotient is at most 100
    (value.saturating_mul(100) / max).clamp(0, 100) as u8
}

/// `2024-05-17` → `05-17`; anything else passes through.
fn short_date(date: &str) -> String {
    match date.split_once('-') {
        Some((year, rest)) if year.len() == 4 && !rest.is_empty() => rest.to_string(),
        _ => date.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn point(date: &str, count: i64) -> SeriesPoint {
        SeriesPoint {
            date: date.to_string(),
            count,
        }
    }

    #[test]
    fn test_bars_normalised_to_max() {
        let series = BarSeries::new(
            "Daily active users",
            &[point("2024-05-01", 5), point("2024-05-02", 20), point("2024-05-03", 0)],
        );
        let heights: Vec<u8> = series.bars.iter().map(|b| b.height_pct).collect();
        assert_eq!(heights, [25, 100, 0]);
        assert_eq!(series.bars[1].label, "05-02");
    }

    #[test]
    fn test_all_zero_series_is_flat() {
        let series = BarSeries::new("New users", &[point("2024-05-01", 0)]);
        assert_eq!(series.bars[0].height_pct, 0);
        assert!(BarSeries::new("Empty", &[]).is_empty());
    }
}
