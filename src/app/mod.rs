//! Browser dashboard
//!
//! Fetches run as `spawn_local` futures; their results are pushed into a
//! shared queue and applied to the session at the start of each frame.

mod header;
mod plot;
mod tree;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use eframe::egui;
use tracing::{debug, info};

use crate::core::{
    ChartState, ClickMode, EvoError, HierarchyKind, InfosQuery, InfosResponse, Issued,
    RequestToken, Session, SessionConfig, StatisticsQuery, StatisticsResponse,
};
use crate::http::ApiClient;
use crate::theme::{colors, dashboard_visuals};
use crate::time::{now_seconds, until};

use plot::PlotChart;

/// A finished fetch, tagged with the token it was issued under
enum Completion {
    Infos(RequestToken, Result<InfosResponse, EvoError>),
    Statistics(RequestToken, Result<StatisticsResponse, EvoError>),
}

/// Page-provided settings
struct DashboardConfig {
    server: String,
    repos: Vec<String>,
    click_mode: ClickMode,
}

fn window_string(name: &str) -> Option<String> {
    js_sys::eval(&format!("window.{name}"))
        .ok()
        .and_then(|v| v.as_string())
        .filter(|s| !s.trim().is_empty())
}

impl DashboardConfig {
    fn from_window() -> Self {
        let server = window_string("__evo_server")
            .or_else(|| web_sys::window().and_then(|w| w.location().origin().ok()))
            .unwrap_or_else(|| crate::http::DEFAULT_SERVER.to_string());

        let mut repos: Vec<String> = window_string("__evo_repos")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        if repos.is_empty() {
            repos.push(crate::core::session::DEFAULT_REPO.to_string());
        }

        let click_mode = match window_string("__evo_click_mode").as_deref() {
            Some("replace") => ClickMode::Replace,
            _ => ClickMode::Accumulate,
        };

        Self {
            server,
            repos,
            click_mode,
        }
    }
}

pub struct EvoApp {
    session: Session,
    chart: PlotChart,
    api: ApiClient,
    repos: Vec<String>,
    completions: Rc<RefCell<VecDeque<Completion>>>,
    ctx: egui::Context,
}

impl EvoApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(dashboard_visuals());

        let config = DashboardConfig::from_window();
        info!(server = %config.server, repos = ?config.repos, "Starting dashboard");

        let session_config = SessionConfig {
            repo: config.repos[0].clone(),
            click_mode: config.click_mode,
            ..SessionConfig::default()
        };
        let chart = PlotChart::new(&session_config.viewport.total_series);

        let mut app = Self {
            session: Session::new(session_config),
            chart,
            api: ApiClient::new(&config.server),
            repos: config.repos,
            completions: Rc::new(RefCell::new(VecDeque::new())),
            ctx: cc.egui_ctx.clone(),
        };

        let level = app.session.level();
        let issued = app.session.set_period(level, &mut app.chart);
        app.fetch_infos(issued);
        app
    }

    pub(crate) fn fetch_infos(&self, issued: Issued<InfosQuery>) {
        let api = self.api.clone();
        let queue = self.completions.clone();
        let ctx = self.ctx.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = api.fetch_infos(&issued.query).await;
            queue
                .borrow_mut()
                .push_back(Completion::Infos(issued.token, result));
            ctx.request_repaint();
        });
    }

    fn fetch_statistics(&self, issued: Issued<StatisticsQuery>) {
        let api = self.api.clone();
        let queue = self.completions.clone();
        let ctx = self.ctx.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = api.fetch_statistics(&issued.query).await;
            queue
                .borrow_mut()
                .push_back(Completion::Statistics(issued.token, result));
            ctx.request_repaint();
        });
    }

    fn drain_completions(&mut self, now: f64) {
        let pending: Vec<Completion> = self.completions.borrow_mut().drain(..).collect();
        for completion in pending {
            match completion {
                Completion::Infos(token, result) => {
                    debug!(%token, ok = result.is_ok(), "Infos completion");
                    self.session
                        .complete_infos(token, result, &mut self.chart, now);
                }
                Completion::Statistics(token, result) => {
                    debug!(%token, ok = result.is_ok(), "Statistics completion");
                    self.session.complete_statistics(token, result);
                }
            }
        }
    }

    fn render_chart(&mut self, ui: &mut egui::Ui, now: f64) {
        match self.session.chart_state() {
            ChartState::Failed(message) => {
                let text = format!("Error: {message}");
                PlotChart::show_empty(ui, &text, colors::ERROR);
                return;
            }
            ChartState::Loading if !self.chart.has_data() => {
                PlotChart::show_empty(ui, "Loading...", colors::TEXT_MUTED);
                return;
            }
            ChartState::Idle => return,
            _ => {}
        }

        let output = self.chart.show(ui);
        if let Some(event) = output.window {
            self.session.on_window_change(&event, now);
        }
        if let Some(click) = output.click {
            if let Some(issued) = self.session.on_point_clicked(&click, &mut self.chart) {
                self.fetch_statistics(issued);
            }
        }
    }
}

impl eframe::App for EvoApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = now_seconds();
        self.drain_completions(now);

        egui::TopBottomPanel::top("header")
            .frame(egui::Frame::new().fill(colors::BG_PRIMARY).inner_margin(8.0))
            .show(ctx, |ui| {
                self.render_header(ui);
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(colors::BG_PRIMARY).inner_margin(8.0))
            .show(ctx, |ui| {
                let available = ui.available_size();
                ui.allocate_ui(egui::vec2(available.x, available.y * 0.5), |ui| {
                    self.render_chart(ui, now);
                });

                ui.add_space(8.0);

                ui.columns(2, |cols| {
                    self.render_panel(&mut cols[0], HierarchyKind::Classes);
                    self.render_panel(&mut cols[1], HierarchyKind::Properties);
                });
            });

        // debounced rescale
        let now = now_seconds();
        self.session.tick(now, &mut self.chart);
        if let Some(deadline) = self.session.next_deadline() {
            ctx.request_repaint_after(until(deadline, now));
        }
    }
}
