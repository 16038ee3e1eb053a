//! Aggregation period (bucket granularity) of the evolution chart

use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use tracing::{debug, info};

use super::api::InfosQuery;
use super::chart::WindowChange;
use super::request::{Issued, RequestToken, RequestTracker};
use super::series::Figure;
use super::timestamp::parse_timestamp;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AggregationLevel {
    Hour,
    #[default]
    Day,
    Week,
}

impl AggregationLevel {
    pub const ALL: &'static [AggregationLevel] = &[Self::Hour, Self::Day, Self::Week];

    /// Value of the `agg` query parameter
    pub fn as_query(&self) -> &'static str {
        match self {
            Self::Hour => "HOUR",
            Self::Day => "DAY",
            Self::Week => "WEEK",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Hour => "Hourly",
            Self::Day => "Daily",
            Self::Week => "Weekly",
        }
    }

    /// Timestamp to query a snapshot for a clicked bucket.
    ///
    /// Hourly buckets use the raw value; coarser buckets ask for the last
    /// second of the bucket's day. `None` if `raw` is not a calendar date.
    pub fn snapshot_timestamp(&self, raw: &str) -> Option<String> {
        let parsed = parse_timestamp(raw)?;
        match self {
            Self::Hour => Some(raw.trim().to_string()),
            Self::Day | Self::Week => {
                let end_of_day = NaiveTime::from_hms_opt(23, 59, 59)?;
                Some(
                    parsed
                        .date()
                        .and_time(end_of_day)
                        .format("%Y-%m-%dT%H:%M:%S")
                        .to_string(),
                )
            }
        }
    }
}

impl fmt::Display for AggregationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for AggregationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HOUR" => Ok(Self::Hour),
            "DAY" => Ok(Self::Day),
            "WEEK" => Ok(Self::Week),
            other => Err(format!("invalid aggregation level: {other}")),
        }
    }
}

/// Tracks the active granularity and the full-series fetch for it
#[derive(Debug, Default)]
pub struct AggregationPeriodController {
    active: AggregationLevel,
    requests: RequestTracker,
}

impl AggregationPeriodController {
    pub fn new(level: AggregationLevel) -> Self {
        Self {
            active: level,
            requests: RequestTracker::new(),
        }
    }

    pub fn active(&self) -> AggregationLevel {
        self.active
    }

    /// Mark `level` active and issue the fetch for its series
    pub fn begin(&mut self, repo: &str, level: AggregationLevel) -> Issued<InfosQuery> {
        info!(repo, level = %level, "Switching aggregation period");
        self.active = level;
        self.requests.issue(InfosQuery {
            repo: repo.to_string(),
            level,
        })
    }

    /// Accept a completion; stale ones (superseded period) are rejected
    pub fn settle(&mut self, token: RequestToken) -> bool {
        let accepted = self.requests.settle(token);
        if !accepted {
            debug!(%token, "Discarding stale period response");
        }
        accepted
    }

    pub fn loading(&self) -> bool {
        self.requests.in_flight()
    }

    /// Window event covering every point of a freshly loaded figure
    pub fn full_range_event(figure: &Figure) -> Option<WindowChange> {
        let len = figure.point_count();
        (len > 0).then(|| WindowChange::indices(0.0, (len - 1) as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::series::Series;

    #[test]
    fn test_parse_levels() {
        assert_eq!("day".parse::<AggregationLevel>(), Ok(AggregationLevel::Day));
        assert_eq!("HOUR".parse::<AggregationLevel>(), Ok(AggregationLevel::Hour));
        assert!("month".parse::<AggregationLevel>().is_err());
        assert_eq!(AggregationLevel::default(), AggregationLevel::Day);
    }

    #[test]
    fn test_snapshot_timestamp_per_level() {
        let raw = "2024-05-01T13:00:00";
        assert_eq!(
            AggregationLevel::Hour.snapshot_timestamp(raw).as_deref(),
            Some("2024-05-01T13:00:00")
        );
        assert_eq!(
            AggregationLevel::Day.snapshot_timestamp(raw).as_deref(),
            Some("2024-05-01T23:59:59")
        );
        assert_eq!(
            AggregationLevel::Week.snapshot_timestamp("05.05.2024").as_deref(),
            Some("2024-05-05T23:59:59")
        );
        assert!(AggregationLevel::Day.snapshot_timestamp("garbage").is_none());
        assert!(AggregationLevel::Hour.snapshot_timestamp("garbage").is_none());
    }

    #[test]
    fn test_stale_period_response_rejected() {
        let mut ctl = AggregationPeriodController::default();
        let day = ctl.begin("orkg", AggregationLevel::Day);
        let hour = ctl.begin("orkg", AggregationLevel::Hour);
        assert_eq!(ctl.active(), AggregationLevel::Hour);
        assert!(!ctl.settle(day.token));
        assert!(ctl.loading());
        assert!(ctl.settle(hour.token));
        assert!(!ctl.loading());
    }

    #[test]
    fn test_full_range_event() {
        let ts = parse_timestamp("2024-01-01").unwrap();
        let fig = Figure::new(vec![Series::from_points(
            "Total Triples",
            &[(ts, 1.0), (ts, 2.0), (ts, 3.0)],
        )]);
        assert_eq!(
            AggregationPeriodController::full_range_event(&fig),
            Some(WindowChange::indices(0.0, 2.0))
        );
        assert!(AggregationPeriodController::full_range_event(&Figure::default()).is_none());
    }
}
