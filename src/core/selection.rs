//! Click-driven selection of snapshot / diff timestamps
//!
//! The click contract is fixed per session by [`ClickMode`]:
//! - `Replace`: every click asks for the snapshot at that timestamp.
//! - `Accumulate`: the first click asks for a snapshot and remembers the
//!   timestamp, the second one asks for the diff of both and starts over.

use tracing::{debug, trace};

use super::api::StatisticsQuery;
use super::chart::{MarkerPoint, PointClick};
use super::period::AggregationLevel;
use super::request::{Issued, RequestToken, RequestTracker};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClickMode {
    Replace,
    #[default]
    Accumulate,
}

/// What the last issued request asked for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionMode {
    #[default]
    None,
    Single,
    Diff,
}

/// Session-scoped selection state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionState {
    pub mode: SelectionMode,
    /// Formatted timestamps waiting for a partner click (0..=2)
    pub pending: Vec<String>,
    pub active_highlight: Option<MarkerPoint>,
}

impl SelectionState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Default)]
pub struct SelectionStateMachine {
    click_mode: ClickMode,
    state: SelectionState,
    requests: RequestTracker,
}

impl SelectionStateMachine {
    pub fn new(click_mode: ClickMode) -> Self {
        Self {
            click_mode,
            ..Default::default()
        }
    }

    pub fn click_mode(&self) -> ClickMode {
        self.click_mode
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Handle a point activation.
    ///
    /// Returns the statistics request to fire, or `None` when the clicked
    /// timestamp is not a valid calendar date.
    pub fn on_point_clicked(
        &mut self,
        repo: &str,
        click: &PointClick,
        level: AggregationLevel,
    ) -> Option<Issued<StatisticsQuery>> {
        let Some(timestamp) = level.snapshot_timestamp(&click.raw_timestamp) else {
            debug!(raw = %click.raw_timestamp, "Clicked point has no valid date, ignoring");
            return None;
        };
        trace!(raw = %click.raw_timestamp, %timestamp, level = %level, "Point clicked");

        let query = match self.click_mode {
            ClickMode::Replace => {
                self.state.pending.clear();
                self.single(repo, timestamp)
            }
            ClickMode::Accumulate => {
                self.state.pending.push(timestamp.clone());
                if self.state.pending.len() == 2 {
                    let mut pending = std::mem::take(&mut self.state.pending).into_iter();
                    let (ts1, ts2) = (pending.next()?, pending.next()?);
                    self.state.mode = SelectionMode::Diff;
                    StatisticsQuery::Diff {
                        repo: repo.to_string(),
                        ts1,
                        ts2,
                    }
                } else {
                    self.single(repo, timestamp)
                }
            }
        };

        let issued = self.requests.issue(query);
        debug!(token = %issued.token, mode = ?self.state.mode, pending = self.state.pending.len(), "Statistics request issued");
        Some(issued)
    }

    fn single(&mut self, repo: &str, timestamp: String) -> StatisticsQuery {
        self.state.mode = SelectionMode::Single;
        StatisticsQuery::Snapshot {
            repo: repo.to_string(),
            timestamp,
        }
    }

    pub fn set_active_highlight(&mut self, point: Option<MarkerPoint>) {
        self.state.active_highlight = point;
    }

    /// Accept a statistics completion (latest request only)
    pub fn settle(&mut self, token: RequestToken) -> bool {
        let accepted = self.requests.settle(token);
        if !accepted {
            debug!(%token, "Discarding stale statistics response");
        }
        accepted
    }

    pub fn loading(&self) -> bool {
        self.requests.in_flight()
    }

    /// Back to the initial state (period change)
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Reset and forget in-flight requests (repository change)
    pub fn reset_and_invalidate(&mut self) {
        self.state.reset();
        self.requests.invalidate();
    }
}
