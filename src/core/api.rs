//! Backend endpoints and payloads
//!
//! - `GET /infos/{repo}?agg={level}`: evolution figure + tracking info
//! - `GET /statistics?repo=..&timestamp=..`: snapshot hierarchies
//! - `GET /statistics?repo=..&ts1=..&ts2=..`: diff hierarchies

use serde::Deserialize;

use super::error::EvoError;
use super::hierarchy::HierarchyNode;
use super::period::AggregationLevel;

/// Query parameters as `(name, value)` pairs
pub type QueryParams = Vec<(&'static str, String)>;

/// Full-series fetch for one repository and granularity
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InfosQuery {
    pub repo: String,
    pub level: AggregationLevel,
}

impl InfosQuery {
    pub fn path(&self) -> String {
        format!("/infos/{}", self.repo)
    }

    pub fn params(&self) -> QueryParams {
        vec![("agg", self.level.as_query().to_string())]
    }
}

/// Hierarchy statistics fetch
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatisticsQuery {
    Snapshot { repo: String, timestamp: String },
    Diff { repo: String, ts1: String, ts2: String },
}

impl StatisticsQuery {
    pub fn path(&self) -> &'static str {
        "/statistics"
    }

    pub fn params(&self) -> QueryParams {
        match self {
            Self::Snapshot { repo, timestamp } => {
                vec![("repo", repo.clone()), ("timestamp", timestamp.clone())]
            }
            Self::Diff { repo, ts1, ts2 } => vec![
                ("repo", repo.clone()),
                ("ts1", ts1.clone()),
                ("ts2", ts2.clone()),
            ],
        }
    }

    pub fn is_diff(&self) -> bool {
        matches!(self, Self::Diff { .. })
    }
}

/// Polling interval: seconds, or text already formatted by the backend
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PollingInterval {
    Seconds(u64),
    Text(String),
}

impl PollingInterval {
    pub fn display(&self) -> String {
        match self {
            Self::Seconds(s) => format_polling_interval(*s),
            Self::Text(t) => t.clone(),
        }
    }
}

/// `/infos` response
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct InfosResponse {
    /// Serialized figure, see [`crate::core::series::Figure::from_json`]
    pub evo_plot: Option<String>,
    pub rdf_dataset_url: Option<String>,
    pub polling_interval: Option<PollingInterval>,
    pub next_run: Option<String>,
    pub cnt_triples_static_core: Option<u64>,
    pub cnt_triples_version_oblivious: Option<u64>,
    pub error: Option<String>,
}

impl InfosResponse {
    pub fn into_result(self) -> Result<Self, EvoError> {
        match self.error {
            Some(e) => Err(EvoError::Backend(e)),
            None => Ok(self),
        }
    }
}

/// `/statistics` response
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct StatisticsResponse {
    pub class_hierarchy: Option<Vec<HierarchyNode>>,
    pub property_hierarchy: Option<Vec<HierarchyNode>>,
    pub snapshot_ts: Option<String>,
    pub error: Option<String>,
}

impl StatisticsResponse {
    pub fn into_result(self) -> Result<Self, EvoError> {
        match self.error {
            Some(e) => Err(EvoError::Backend(e)),
            None => Ok(self),
        }
    }
}

/// Tracking details shown next to the chart
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackingInfo {
    pub rdf_dataset_url: String,
    pub polling_interval: String,
    pub next_run: String,
    pub static_core_triples: String,
    pub version_oblivious_triples: String,
}

impl From<&InfosResponse> for TrackingInfo {
    fn from(r: &InfosResponse) -> Self {
        Self {
            rdf_dataset_url: r.rdf_dataset_url.clone().unwrap_or_default(),
            polling_interval: r
                .polling_interval
                .as_ref()
                .map(PollingInterval::display)
                .unwrap_or_default(),
            next_run: r.next_run.clone().unwrap_or_default(),
            static_core_triples: r.cnt_triples_static_core.map(format_count).unwrap_or_default(),
            version_oblivious_triples: r
                .cnt_triples_version_oblivious
                .map(format_count)
                .unwrap_or_default(),
        }
    }
}

/// `1234567` -> `1,234,567`
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Human readable polling interval
pub fn format_polling_interval(seconds: u64) -> String {
    if seconds < 60 {
        format!("{seconds} seconds")
    } else if seconds < 3600 {
        format!("{} minutes {} seconds", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        let (h, rem) = (seconds / 3600, seconds % 3600);
        format!("{:02}:{:02}:{:02}", h, rem / 60, rem % 60)
    } else {
        let (d, rem) = (seconds / 86400, seconds % 86400);
        let (h, rem) = (rem / 3600, rem % 3600);
        format!("{} days, {:02}:{:02}:{:02}", d, h, rem / 60, rem % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_format_polling_interval() {
        assert_eq!(format_polling_interval(42), "42 seconds");
        assert_eq!(format_polling_interval(125), "2 minutes 5 seconds");
        assert_eq!(format_polling_interval(3 * 3600 + 61), "03:01:01");
        assert_eq!(format_polling_interval(86400 + 3600), "1 days, 01:00:00");
    }

    #[test]
    fn test_query_params() {
        let q = StatisticsQuery::Diff {
            repo: "orkg".into(),
            ts1: "2024-05-01T23:59:59".into(),
            ts2: "2024-05-03T23:59:59".into(),
        };
        assert!(q.is_diff());
        assert_eq!(q.params()[1], ("ts1", "2024-05-01T23:59:59".to_string()));

        let i = InfosQuery {
            repo: "orkg".into(),
            level: AggregationLevel::Week,
        };
        assert_eq!(i.path(), "/infos/orkg");
        assert_eq!(i.params(), vec![("agg", "WEEK".to_string())]);
    }

    #[test]
    fn test_infos_response() {
        let json = r#"{
            "evo_plot": "{}",
            "rdf_dataset_url": "https://example.org/dump.nt",
            "polling_interval": 86400,
            "next_run": "2024-05-02 00:00:00",
            "cnt_triples_static_core": 1500000,
            "cnt_triples_version_oblivious": 1700000
        }"#;
        let r: InfosResponse = serde_json::from_str(json).unwrap();
        let info = TrackingInfo::from(&r);
        assert_eq!(info.polling_interval, "1 days, 00:00:00");
        assert_eq!(info.static_core_triples, "1,500,000");

        let err: InfosResponse = serde_json::from_str(r#"{"error": "Repository not found"}"#).unwrap();
        assert_eq!(err.into_result(), Err(EvoError::Backend("Repository not found".into())));
    }
}
