//! Dashboard session: the single owner of all mutable UI state
//!
//! Front ends feed chart events and fetch completions in, execute the
//! returned requests (fire-and-forget) and call [`Session::tick`] on
//! every frame so that debounced rescales fire.

use tracing::{debug, error, info};

use super::api::{InfosQuery, InfosResponse, StatisticsQuery, StatisticsResponse, TrackingInfo};
use super::chart::{ChartSurface, PointClick, WindowChange, YRange};
use super::error::EvoError;
use super::hierarchy::{HierarchyKind, PanelState};
use super::highlight::HighlightMarkerManager;
use super::period::{AggregationLevel, AggregationPeriodController};
use super::request::{Issued, RequestToken};
use super::selection::{ClickMode, SelectionState, SelectionStateMachine};
use super::series::Figure;
use super::viewport::{ViewportConfig, ViewportRangeController};

/// Default repository label
pub const DEFAULT_REPO: &str = "orkg";

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub repo: String,
    pub click_mode: ClickMode,
    pub initial_level: AggregationLevel,
    pub viewport: ViewportConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            repo: DEFAULT_REPO.into(),
            click_mode: ClickMode::default(),
            initial_level: AggregationLevel::default(),
            viewport: ViewportConfig::default(),
        }
    }
}

/// State of the evolution chart area
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ChartState {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

pub struct Session {
    repo: String,
    period: AggregationPeriodController,
    selection: SelectionStateMachine,
    highlight: HighlightMarkerManager,
    viewport: ViewportRangeController,
    figure: Option<Figure>,
    chart_state: ChartState,
    tracking: Option<TrackingInfo>,
    classes: PanelState,
    properties: PanelState,
    show_only_changed: bool,
    /// Query whose result is on display / being fetched
    requested: Option<StatisticsQuery>,
    displayed: Option<StatisticsQuery>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        info!(repo = %config.repo, click_mode = ?config.click_mode, "Session created");
        Self {
            repo: config.repo,
            period: AggregationPeriodController::new(config.initial_level),
            selection: SelectionStateMachine::new(config.click_mode),
            highlight: HighlightMarkerManager::new(),
            viewport: ViewportRangeController::new(config.viewport),
            figure: None,
            chart_state: ChartState::Idle,
            tracking: None,
            classes: PanelState::Idle,
            properties: PanelState::Idle,
            show_only_changed: false,
            requested: None,
            displayed: None,
        }
    }

    // ========================================================================
    // Aggregation period / repository
    // ========================================================================

    /// Switch granularity: resets the selection, drops the halo and asks
    /// for the full series at `level`.
    pub fn set_period(
        &mut self,
        level: AggregationLevel,
        chart: &mut dyn ChartSurface,
    ) -> Issued<InfosQuery> {
        self.selection.reset();
        self.highlight.clear_highlight(chart);
        self.chart_state = ChartState::Loading;
        self.period.begin(&self.repo, level)
    }

    /// Switch repository; starts over at the default granularity
    pub fn change_repo(&mut self, repo: &str, chart: &mut dyn ChartSurface) -> Issued<InfosQuery> {
        info!(from = %self.repo, to = repo, "Repository changed");
        self.repo = repo.to_string();
        self.selection.reset_and_invalidate();
        self.classes = PanelState::Idle;
        self.properties = PanelState::Idle;
        self.tracking = None;
        self.requested = None;
        self.displayed = None;
        self.set_period(AggregationLevel::Day, chart)
    }

    /// Apply a `/infos` completion: replace the chart and autoscale it
    pub fn complete_infos(
        &mut self,
        token: RequestToken,
        result: Result<InfosResponse, EvoError>,
        chart: &mut dyn ChartSurface,
        now: f64,
    ) {
        if !self.period.settle(token) {
            return;
        }

        let loaded = result.and_then(InfosResponse::into_result).and_then(|r| {
            let plot = r
                .evo_plot
                .as_deref()
                .ok_or_else(|| EvoError::Backend("response carries no evolution plot".into()))?;
            let figure = Figure::from_json(plot)?;
            Ok((TrackingInfo::from(&r), figure))
        });

        match loaded {
            Ok((tracking, figure)) => {
                self.highlight.clear_highlight(chart);
                self.selection.set_active_highlight(None);
                self.viewport.reset();
                chart.replace_data(&figure);
                self.highlight.forget();

                info!(
                    points = figure.point_count(),
                    traces = figure.series.len(),
                    level = %self.period.active(),
                    "Evolution chart replaced"
                );

                // the widget's own autorange knows nothing about padding/zero anchoring
                if let Some(event) = AggregationPeriodController::full_range_event(&figure) {
                    self.viewport.on_window_change(&event, &figure, now);
                }
                self.tracking = Some(tracking);
                self.figure = Some(figure);
                self.chart_state = ChartState::Ready;
            }
            Err(e) => {
                error!(error = %e, "Failed to load evolution chart");
                self.chart_state = ChartState::Failed(e.to_string());
            }
        }
    }

    // ========================================================================
    // Chart events
    // ========================================================================

    pub fn on_window_change(&mut self, event: &WindowChange, now: f64) -> Option<YRange> {
        let figure = self.figure.as_ref()?;
        self.viewport.on_window_change(event, figure, now)
    }

    /// Fire debounced work that is due
    pub fn tick(&mut self, now: f64, chart: &mut dyn ChartSurface) -> Option<YRange> {
        self.viewport.poll(now, chart)
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.viewport.next_deadline()
    }

    /// Point activation: issue the snapshot/diff request and move the halo.
    ///
    /// Ignored until the chart shows data of the active period, since the
    /// clicked bucket would be formatted with the wrong granularity.
    pub fn on_point_clicked(
        &mut self,
        click: &PointClick,
        chart: &mut dyn ChartSurface,
    ) -> Option<Issued<StatisticsQuery>> {
        if self.period.loading() || self.chart_state != ChartState::Ready {
            debug!(raw = %click.raw_timestamp, state = ?self.chart_state, "Chart not ready, ignoring click");
            return None;
        }
        let issued = self
            .selection
            .on_point_clicked(&self.repo, click, self.period.active())?;

        // immediate feedback, independent of the request
        self.highlight.set_highlight(chart, click.point);
        self.selection.set_active_highlight(Some(click.point));

        self.classes = PanelState::Loading;
        self.properties = PanelState::Loading;
        self.requested = Some(issued.query.clone());
        Some(issued)
    }

    /// Apply a `/statistics` completion; stale ones are dropped silently
    pub fn complete_statistics(
        &mut self,
        token: RequestToken,
        result: Result<StatisticsResponse, EvoError>,
    ) {
        if !self.selection.settle(token) {
            return;
        }

        match result.and_then(StatisticsResponse::into_result) {
            Ok(resp) => {
                let ts = resp.snapshot_ts.as_deref();
                self.classes = PanelState::from_payload(
                    resp.class_hierarchy.as_deref(),
                    ts,
                    self.show_only_changed,
                );
                self.properties = PanelState::from_payload(
                    resp.property_hierarchy.as_deref(),
                    ts,
                    self.show_only_changed,
                );
                self.displayed = self.requested.take();
                debug!(snapshot_ts = ?resp.snapshot_ts, "Hierarchies rendered");
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch hierarchy statistics");
                self.classes = PanelState::Failed(e.to_string());
                self.properties = PanelState::Failed(e.to_string());
                self.requested = None;
            }
        }
    }

    // ========================================================================
    // Hierarchy panels
    // ========================================================================

    pub fn apply_change_filter(&mut self, show_only_changed: bool) {
        self.show_only_changed = show_only_changed;
        for panel in [&mut self.classes, &mut self.properties] {
            if let Some(tree) = panel.tree_mut() {
                tree.apply_change_filter(show_only_changed);
            }
        }
    }

    pub fn panel(&self, kind: HierarchyKind) -> &PanelState {
        match kind {
            HierarchyKind::Classes => &self.classes,
            HierarchyKind::Properties => &self.properties,
        }
    }

    pub fn panel_mut(&mut self, kind: HierarchyKind) -> &mut PanelState {
        match kind {
            HierarchyKind::Classes => &mut self.classes,
            HierarchyKind::Properties => &mut self.properties,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn level(&self) -> AggregationLevel {
        self.period.active()
    }

    pub fn selection(&self) -> &SelectionState {
        self.selection.state()
    }

    pub fn click_mode(&self) -> ClickMode {
        self.selection.click_mode()
    }

    pub fn highlight(&self) -> &HighlightMarkerManager {
        &self.highlight
    }

    pub fn figure(&self) -> Option<&Figure> {
        self.figure.as_ref()
    }

    pub fn chart_state(&self) -> &ChartState {
        &self.chart_state
    }

    pub fn tracking(&self) -> Option<&TrackingInfo> {
        self.tracking.as_ref()
    }

    pub fn show_only_changed(&self) -> bool {
        self.show_only_changed
    }

    /// Query whose result the panels currently show
    pub fn displayed(&self) -> Option<&StatisticsQuery> {
        self.displayed.as_ref()
    }

    pub fn statistics_loading(&self) -> bool {
        self.selection.loading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chart::testing::RecordingChart;
    use crate::core::chart::MarkerPoint;
    use crate::core::hierarchy::HierarchyNode;
    use crate::core::selection::SelectionMode;

    const TOTALS: [i64; 10] = [1, 2, 3, 10, 11, 12, 13, 5, 6, 7];

    fn infos_json() -> InfosResponse {
        let x: Vec<String> = (1..=10).map(|d| format!("2024-05-{d:02}T00:00:00")).collect();
        let figure = serde_json::json!({
            "data": [{"type": "scatter", "name": "Total Triples", "x": x, "y": TOTALS}],
            "layout": {}
        });
        InfosResponse {
            evo_plot: Some(figure.to_string()),
            polling_interval: Some(crate::core::api::PollingInterval::Seconds(3600)),
            ..Default::default()
        }
    }

    fn click(day: u32, y: f64) -> PointClick {
        PointClick {
            raw_timestamp: format!("2024-05-{day:02}T00:00:00"),
            point: MarkerPoint { x: day as f64, y },
        }
    }

    fn loaded() -> (Session, RecordingChart) {
        let mut session = Session::new(SessionConfig::default());
        let mut chart = RecordingChart::default();
        let req = session.set_period(AggregationLevel::Day, &mut chart);
        session.complete_infos(req.token, Ok(infos_json()), &mut chart, 0.0);
        (session, chart)
    }

    #[test]
    fn test_period_load_replaces_and_autoscales() {
        let (mut session, mut chart) = loaded();
        assert_eq!(chart.replaced, 1);
        assert_eq!(session.chart_state(), &ChartState::Ready);
        assert_eq!(session.tracking().unwrap().polling_interval, "01:00:00");

        // full range 0..=9 anchored at zero: min 1, max 13, pad 1.2
        assert!(session.tick(0.05, &mut chart).is_none());
        assert_eq!(session.tick(0.2, &mut chart), Some(YRange::new(-1.0, 15.0)));

        // zoom to indices 2..=9
        session.on_window_change(&WindowChange::indices(2.0, 9.0), 1.0);
        assert_eq!(session.tick(1.2, &mut chart), Some(YRange::new(2.0, 14.0)));
    }

    #[test]
    fn test_period_change_resets_selection() {
        let (mut session, mut chart) = loaded();
        session.on_point_clicked(&click(3, 10.0), &mut chart).unwrap();
        assert_eq!(session.selection().pending.len(), 1);
        assert!(session.selection().active_highlight.is_some());

        session.set_period(AggregationLevel::Hour, &mut chart);
        assert!(session.selection().pending.is_empty());
        assert_eq!(session.selection().active_highlight, None);
        assert!(!session.highlight().is_present());
        assert!(chart.overlays.is_empty());
        assert_eq!(session.level(), AggregationLevel::Hour);
    }

    #[test]
    fn test_click_during_period_load_ignored() {
        let (mut session, mut chart) = loaded();
        let hourly = session.set_period(AggregationLevel::Hour, &mut chart);

        // daily buckets are still on screen
        assert!(session.on_point_clicked(&click(3, 10.0), &mut chart).is_none());
        assert!(!session.highlight().is_present());
        assert!(chart.overlays.is_empty());
        assert!(session.selection().pending.is_empty());
        assert!(!session.statistics_loading());

        session.complete_infos(hourly.token, Ok(infos_json()), &mut chart, 0.0);
        let issued = session.on_point_clicked(&click(3, 10.0), &mut chart).unwrap();
        assert_eq!(
            issued.query,
            StatisticsQuery::Snapshot {
                repo: DEFAULT_REPO.into(),
                timestamp: "2024-05-03T00:00:00".into()
            }
        );
    }

    #[test]
    fn test_click_after_failed_load_ignored() {
        let (mut session, mut chart) = loaded();
        let req = session.set_period(AggregationLevel::Week, &mut chart);
        session.complete_infos(req.token, Err(EvoError::Status(500)), &mut chart, 0.0);
        assert!(session.on_point_clicked(&click(3, 10.0), &mut chart).is_none());
    }

    #[test]
    fn test_two_clicks_render_diff() {
        let (mut session, mut chart) = loaded();
        let first = session.on_point_clicked(&click(2, 2.0), &mut chart).unwrap();
        let second = session.on_point_clicked(&click(5, 11.0), &mut chart).unwrap();
        assert_eq!(chart.overlays.len(), 1);
        assert_eq!(session.selection().mode, SelectionMode::Diff);
        assert!(session.selection().pending.is_empty());

        let resp = StatisticsResponse {
            class_hierarchy: Some(vec![HierarchyNode::new("Paper", 10, 3, 0)]),
            property_hierarchy: Some(vec![]),
            snapshot_ts: None,
            error: None,
        };
        // the diff arrives first, the snapshot for the first click is stale
        session.complete_statistics(second.token, Ok(resp));
        session.complete_statistics(
            first.token,
            Ok(StatisticsResponse {
                class_hierarchy: Some(vec![]),
                ..Default::default()
            }),
        );

        let classes = session.panel(HierarchyKind::Classes).tree().unwrap();
        assert_eq!(classes.changed_count(), 1);
        assert_eq!(session.panel(HierarchyKind::Properties), &PanelState::NoData);
        assert!(session.displayed().unwrap().is_diff());
    }

    #[test]
    fn test_stale_period_response_ignored() {
        let mut session = Session::new(SessionConfig::default());
        let mut chart = RecordingChart::default();
        let day = session.set_period(AggregationLevel::Day, &mut chart);
        let week = session.set_period(AggregationLevel::Week, &mut chart);

        session.complete_infos(day.token, Ok(infos_json()), &mut chart, 0.0);
        assert_eq!(chart.replaced, 0);
        assert_eq!(session.chart_state(), &ChartState::Loading);

        session.complete_infos(week.token, Ok(infos_json()), &mut chart, 0.0);
        assert_eq!(chart.replaced, 1);
    }

    #[test]
    fn test_failures_render_inline() {
        let mut session = Session::new(SessionConfig::default());
        let mut chart = RecordingChart::default();
        let req = session.set_period(AggregationLevel::Day, &mut chart);
        let backend_err = InfosResponse {
            error: Some("Repository not found".into()),
            ..Default::default()
        };
        session.complete_infos(req.token, Ok(backend_err), &mut chart, 0.0);
        assert_eq!(
            session.chart_state(),
            &ChartState::Failed("Repository not found".into())
        );

        let (mut session, mut chart) = loaded();
        let issued = session.on_point_clicked(&click(4, 10.0), &mut chart).unwrap();
        session.complete_statistics(issued.token, Err(EvoError::Status(500)));
        assert!(matches!(
            session.panel(HierarchyKind::Classes),
            PanelState::Failed(_)
        ));
        // halo stays, view remains usable
        assert!(session.highlight().is_present());
    }

    #[test]
    fn test_change_filter_survives_rerender() {
        let (mut session, mut chart) = loaded();
        session.apply_change_filter(true);

        let issued = session.on_point_clicked(&click(4, 10.0), &mut chart).unwrap();
        session.complete_statistics(
            issued.token,
            Ok(StatisticsResponse {
                class_hierarchy: Some(vec![
                    HierarchyNode::new("Changed", 5, 1, 0),
                    HierarchyNode::new("Static", 5, 0, 0),
                ]),
                property_hierarchy: Some(vec![]),
                snapshot_ts: Some("2024-05-04T23:59:59".into()),
                error: None,
            }),
        );
        let tree = session.panel(HierarchyKind::Classes).tree().unwrap();
        let hidden: Vec<_> = tree.rows().iter().filter(|r| r.hidden).collect();
        assert_eq!(hidden.len(), 1);
        assert_eq!(hidden[0].label, "Static");

        session.apply_change_filter(false);
        let tree = session.panel(HierarchyKind::Classes).tree().unwrap();
        assert!(tree.rows().iter().all(|r| !r.hidden));
    }

    #[test]
    fn test_repo_change_discards_in_flight_statistics() {
        let (mut session, mut chart) = loaded();
        let issued = session.on_point_clicked(&click(4, 10.0), &mut chart).unwrap();
        let req = session.change_repo("wikidata", &mut chart);
        assert_eq!(req.query.level, AggregationLevel::Day);
        assert_eq!(req.query.repo, "wikidata");

        session.complete_statistics(
            issued.token,
            Ok(StatisticsResponse {
                class_hierarchy: Some(vec![HierarchyNode::new("Paper", 1, 0, 0)]),
                ..Default::default()
            }),
        );
        assert_eq!(session.panel(HierarchyKind::Classes), &PanelState::Idle);
        assert!(!session.highlight().is_present());
    }
}
