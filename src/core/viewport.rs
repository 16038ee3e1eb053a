//! Viewport-driven vertical autoscaling
//!
//! Whenever the chart reports a new horizontal window, the vertical range
//! is recomputed from the points inside that window only, padded, snapped
//! to integers and applied after a short debounce.

use tracing::{debug, trace, warn};

use super::chart::{ChartSurface, WindowChange, XBounds, YRange};
use super::error::EvoError;
use super::series::{Figure, Series};

/// Tuning of the autoscaling policy
#[derive(Clone, Debug)]
pub struct ViewportConfig {
    /// Name of the series the range is computed from
    pub total_series: String,
    pub insertions_series: String,
    pub deletions_series: String,
    /// Combine total with insertion/deletion bars when both are present
    pub use_bands: bool,
    /// Padding as a fraction of the span (total only)
    pub padding: f64,
    /// Padding as a fraction of the span (banded envelope)
    pub banded_padding: f64,
    /// Windows starting within this fraction of the domain include zero
    pub zero_anchor_fraction: f64,
    /// Ranges closer than this on both bounds are not re-applied
    pub epsilon: f64,
    /// Debounce window in seconds
    pub debounce_secs: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            total_series: "Total Triples".into(),
            insertions_series: "Insertions".into(),
            deletions_series: "Deletions".into(),
            use_bands: true,
            padding: 0.1,
            banded_padding: 0.2,
            zero_anchor_fraction: 0.2,
            epsilon: 1e-3,
            debounce_secs: 0.1,
        }
    }
}

/// Cancellable one-shot timer: only the last scheduled value fires.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: f64,
    pending: Option<(f64, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: f64) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Schedule `value`, cancelling whatever was pending
    pub fn schedule(&mut self, value: T, now: f64) {
        self.pending = Some((now + self.window, value));
    }

    /// Take the pending value if its deadline has passed
    pub fn poll(&mut self, now: f64) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if now >= *deadline => self.pending.take().map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn deadline(&self) -> Option<f64> {
        self.pending.as_ref().map(|(d, _)| *d)
    }
}

/// Map horizontal bounds to inclusive indices over `reference`.
///
/// Returns `None` when no point is visible.
pub fn visible_indices(bounds: &XBounds, reference: &Series) -> Option<(usize, usize)> {
    let len = reference.len();
    if len == 0 {
        return None;
    }
    let last = len - 1;

    let (start, end) = match *bounds {
        XBounds::Indices { start, end } => {
            if !start.is_finite() || !end.is_finite() {
                return None;
            }
            // partially visible buckets count as visible
            let start = start.floor();
            let end = end.ceil();
            if end < 0.0 || start > last as f64 {
                return None;
            }
            (start.max(0.0) as usize, (end as usize).min(last))
        }
        XBounds::Times { start, end } => {
            let first_inside = reference.x.iter().position(|x| *x >= start)?;
            let last_inside = reference.x.iter().rposition(|x| *x <= end)?;
            (first_inside, last_inside)
        }
    };

    (start <= end).then_some((start, end))
}

fn finite_at(series: &Series, i: usize) -> Option<f64> {
    series.y.get(i).copied().filter(|v| v.is_finite())
}

/// Padded, integer-snapped vertical range for the inclusive index window.
pub fn compute_range(
    figure: &Figure,
    start: usize,
    end: usize,
    config: &ViewportConfig,
) -> Option<YRange> {
    let Some(total) = figure.series(&config.total_series) else {
        let err = EvoError::MissingSeries(config.total_series.clone());
        warn!(error = %err, "Skipping rescale");
        return None;
    };

    let bands = if config.use_bands {
        figure
            .series(&config.insertions_series)
            .zip(figure.series(&config.deletions_series))
    } else {
        None
    };

    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for i in start..=end {
        let Some(t) = finite_at(total, i) else {
            continue;
        };
        let (lo, hi) = match bands {
            Some((ins, del)) => (
                t - finite_at(ins, i).unwrap_or(0.0).abs(),
                t + finite_at(del, i).unwrap_or(0.0).abs(),
            ),
            None => (t, t),
        };
        y_min = y_min.min(lo);
        y_max = y_max.max(hi);
    }

    if !y_min.is_finite() || !y_max.is_finite() {
        debug!(start, end, "No visible y-values, skipping rescale");
        return None;
    }

    let fraction = if bands.is_some() {
        config.banded_padding
    } else {
        config.padding
    };
    let pad = if y_max != y_min {
        (y_max - y_min) * fraction
    } else {
        let p = y_max.abs() * fraction;
        if p == 0.0 {
            1.0
        } else {
            p
        }
    };

    let mut lower = (y_min - pad).floor();
    let upper = (y_max + pad).ceil();

    // Keep the first bars from being clipped at the bottom
    let domain = figure.point_count().saturating_sub(1) as f64;
    if start as f64 <= config.zero_anchor_fraction * domain {
        lower = lower.min(0.0);
    }

    trace!(y_min, y_max, pad, lower, upper, "Visible y-range");
    Some(YRange::new(lower, upper))
}

/// Keeps the chart's vertical range matched to the visible window
#[derive(Debug)]
pub struct ViewportRangeController {
    config: ViewportConfig,
    debounce: Debouncer<YRange>,
    /// Last range handed to the chart (or scheduled for it)
    last: Option<YRange>,
}

impl ViewportRangeController {
    pub fn new(config: ViewportConfig) -> Self {
        let debounce = Debouncer::new(config.debounce_secs);
        Self {
            config,
            debounce,
            last: None,
        }
    }

    /// Handle a window-change event.
    ///
    /// Returns the range that was scheduled, if any.
    pub fn on_window_change(
        &mut self,
        event: &WindowChange,
        figure: &Figure,
        now: f64,
    ) -> Option<YRange> {
        let Some(bounds) = event.x else {
            trace!("Window change without x bounds ignored");
            return None;
        };
        let reference = figure.reference()?;
        let Some((start, end)) = visible_indices(&bounds, reference) else {
            debug!(?bounds, "No visible data in range");
            return None;
        };

        let range = compute_range(figure, start, end, &self.config)?;

        if let Some(last) = &self.last {
            if last.approx_eq(&range, self.config.epsilon) {
                trace!(?range, "y-range unchanged, skipping");
                return None;
            }
        }

        debug!(start, end, min = range.min, max = range.max, "Scheduling y-range update");
        self.last = Some(range);
        self.debounce.schedule(range, now);
        Some(range)
    }

    /// Apply the debounced range once its deadline passed.
    ///
    /// Chart failures are logged, never propagated.
    pub fn poll(&mut self, now: f64, chart: &mut dyn ChartSurface) -> Option<YRange> {
        let range = self.debounce.poll(now)?;
        match chart.set_y_range(range) {
            Ok(()) => {
                debug!(min = range.min, max = range.max, "y-range applied");
                Some(range)
            }
            Err(e) => {
                warn!(error = %e, "Failed to apply y-range");
                self.last = None;
                None
            }
        }
    }

    /// Forget the applied range and any pending update (chart was replaced)
    pub fn reset(&mut self) {
        self.debounce.cancel();
        self.last = None;
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.debounce.deadline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chart::testing::RecordingChart;
    use crate::core::timestamp::parse_timestamp;
    use chrono::{Duration, NaiveDateTime};

    fn day(i: i64) -> NaiveDateTime {
        parse_timestamp("2024-01-01").unwrap() + Duration::days(i)
    }

    fn series(name: &str, values: &[f64]) -> Series {
        let points: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, v)| (day(i as i64), *v))
            .collect();
        Series::from_points(name, &points)
    }

    fn total_only(values: &[f64]) -> Figure {
        Figure::new(vec![series("Total Triples", values)])
    }

    const SCENARIO: [f64; 10] = [1.0, 2.0, 3.0, 10.0, 11.0, 12.0, 13.0, 5.0, 6.0, 7.0];

    #[test]
    fn test_scenario_window_2_to_9() {
        let fig = total_only(&SCENARIO);
        let cfg = ViewportConfig::default();
        let (start, end) =
            visible_indices(&XBounds::Indices { start: 2.0, end: 9.0 }, fig.reference().unwrap())
                .unwrap();
        assert_eq!((start, end), (2, 9));
        assert_eq!(compute_range(&fig, start, end, &cfg), Some(YRange::new(2.0, 14.0)));
    }

    #[test]
    fn test_padding_formula() {
        let fig = total_only(&[100.0, 130.0, 170.0, 120.0, 110.0, 150.0]);
        let cfg = ViewportConfig::default();
        // window 2..=5 : min 110, max 170, span 60
        let r = compute_range(&fig, 2, 5, &cfg).unwrap();
        let pad = (170.0 - 110.0) * 0.1;
        assert_eq!(r, YRange::new((110.0f64 - pad).floor(), (170.0f64 + pad).ceil()));
    }

    #[test]
    fn test_flat_zero_uses_unit_pad() {
        let fig = total_only(&[0.0; 10]);
        let r = compute_range(&fig, 5, 9, &ViewportConfig::default()).unwrap();
        assert_eq!(r, YRange::new(-1.0, 1.0));
    }

    #[test]
    fn test_flat_nonzero_pads_by_value() {
        let fig = total_only(&[50.0; 10]);
        let r = compute_range(&fig, 5, 9, &ViewportConfig::default()).unwrap();
        assert_eq!(r, YRange::new(45.0, 55.0));
    }

    #[test]
    fn test_zero_anchor_near_domain_start() {
        let fig = total_only(&[100.0, 101.0, 102.0, 103.0, 104.0, 105.0, 106.0, 107.0, 108.0, 109.0]);
        let cfg = ViewportConfig::default();
        let anchored = compute_range(&fig, 1, 9, &cfg).unwrap();
        assert!(anchored.min <= 0.0);
        let free = compute_range(&fig, 5, 9, &cfg).unwrap();
        assert!(free.min > 0.0);
    }

    #[test]
    fn test_banded_envelope() {
        let fig = Figure::new(vec![
            series("Insertions", &[0.0, 0.0, 5.0, 0.0]),
            series("Deletions", &[0.0, 0.0, -3.0, 8.0]),
            series("Total Triples", &[100.0, 100.0, 100.0, 100.0]),
        ]);
        let cfg = ViewportConfig::default();
        // envelope over 2..=3: lo = 100 - 5 = 95, hi = 100 + 8 = 108, span 13, pad 2.6
        let r = compute_range(&fig, 2, 3, &cfg).unwrap();
        assert_eq!(r, YRange::new(92.0, 111.0));

        let plain = ViewportConfig {
            use_bands: false,
            ..ViewportConfig::default()
        };
        assert_eq!(compute_range(&fig, 2, 3, &plain), Some(YRange::new(90.0, 110.0)));
    }

    #[test]
    fn test_time_bounds_map_to_indices() {
        let s = series("Total Triples", &SCENARIO);
        let bounds = XBounds::Times {
            start: day(2) - Duration::hours(3),
            end: day(9) + Duration::hours(3),
        };
        assert_eq!(visible_indices(&bounds, &s), Some((2, 9)));

        let between = XBounds::Times {
            start: day(3) + Duration::hours(1),
            end: day(3) + Duration::hours(2),
        };
        assert_eq!(visible_indices(&between, &s), None);

        let before = XBounds::Times {
            start: day(-10),
            end: day(-5),
        };
        assert_eq!(visible_indices(&before, &s), None);
    }

    #[test]
    fn test_index_bounds_are_clamped() {
        let s = series("Total Triples", &SCENARIO);
        let b = XBounds::Indices { start: -4.0, end: 42.0 };
        assert_eq!(visible_indices(&b, &s), Some((0, 9)));
        let off = XBounds::Indices { start: 12.0, end: 20.0 };
        assert_eq!(visible_indices(&off, &s), None);
    }

    #[test]
    fn test_fractional_index_bounds_round_outward() {
        let s = series("Total Triples", &SCENARIO);
        let b = XBounds::Indices { start: 2.5, end: 8.5 };
        assert_eq!(visible_indices(&b, &s), Some((2, 9)));
        let edge = XBounds::Indices { start: -0.5, end: 9.2 };
        assert_eq!(visible_indices(&edge, &s), Some((0, 9)));

        // half-visible bar at index 3 (value 10) must widen the range
        let fig = total_only(&SCENARIO);
        let (start, end) = visible_indices(&XBounds::Indices { start: 3.5, end: 6.0 }, &s).unwrap();
        assert_eq!((start, end), (3, 6));
        assert_eq!(compute_range(&fig, start, end, &ViewportConfig::default()), Some(YRange::new(9.0, 14.0)));
    }

    #[test]
    fn test_missing_total_aborts() {
        let fig = Figure::new(vec![series("Something else", &SCENARIO)]);
        let mut ctl = ViewportRangeController::new(ViewportConfig::default());
        assert!(ctl.on_window_change(&WindowChange::indices(0.0, 9.0), &fig, 0.0).is_none());
        assert!(ctl.next_deadline().is_none());
    }

    #[test]
    fn test_y_only_event_ignored() {
        let fig = total_only(&SCENARIO);
        let mut ctl = ViewportRangeController::new(ViewportConfig::default());
        assert!(ctl.on_window_change(&WindowChange::y_only(), &fig, 0.0).is_none());
    }

    #[test]
    fn test_debounce_applies_only_last() {
        let fig = total_only(&SCENARIO);
        let mut ctl = ViewportRangeController::new(ViewportConfig::default());
        let mut chart = RecordingChart::default();

        ctl.on_window_change(&WindowChange::indices(0.0, 9.0), &fig, 0.0);
        ctl.on_window_change(&WindowChange::indices(2.0, 9.0), &fig, 0.05);
        assert!(ctl.poll(0.1, &mut chart).is_none());
        assert_eq!(ctl.poll(0.2, &mut chart), Some(YRange::new(2.0, 14.0)));
        assert_eq!(chart.y_ranges, vec![YRange::new(2.0, 14.0)]);
        assert!(ctl.poll(1.0, &mut chart).is_none());
    }

    #[test]
    fn test_unchanged_range_updates_once() {
        let fig = total_only(&SCENARIO);
        let mut ctl = ViewportRangeController::new(ViewportConfig::default());
        let mut chart = RecordingChart::default();

        ctl.on_window_change(&WindowChange::indices(2.0, 9.0), &fig, 0.0);
        ctl.poll(0.2, &mut chart);
        // same visible slice again, later
        assert!(ctl.on_window_change(&WindowChange::indices(2.0, 9.4), &fig, 1.0).is_none());
        ctl.poll(2.0, &mut chart);
        assert_eq!(chart.y_ranges.len(), 1);
    }

    #[test]
    fn test_chart_failure_is_swallowed_and_retried() {
        let fig = total_only(&SCENARIO);
        let mut ctl = ViewportRangeController::new(ViewportConfig::default());
        let mut chart = RecordingChart {
            fail_range: true,
            ..Default::default()
        };

        ctl.on_window_change(&WindowChange::indices(2.0, 9.0), &fig, 0.0);
        assert!(ctl.poll(0.2, &mut chart).is_none());

        chart.fail_range = false;
        assert!(ctl.on_window_change(&WindowChange::indices(2.0, 9.0), &fig, 1.0).is_some());
        assert_eq!(ctl.poll(1.2, &mut chart), Some(YRange::new(2.0, 14.0)));
    }

    #[test]
    fn test_reset_cancels_pending() {
        let fig = total_only(&SCENARIO);
        let mut ctl = ViewportRangeController::new(ViewportConfig::default());
        let mut chart = RecordingChart::default();
        ctl.on_window_change(&WindowChange::indices(2.0, 9.0), &fig, 0.0);
        ctl.reset();
        assert!(ctl.poll(1.0, &mut chart).is_none());
        assert!(ctl.on_window_change(&WindowChange::indices(2.0, 9.0), &fig, 1.0).is_some());
    }
}
