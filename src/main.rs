//! Command-line client for the evolution backend
//!
//! Run with: cargo run --features cli --bin evo-cli -- --repo orkg --diff 2024-05-01 2024-05-03

#[cfg(not(target_arch = "wasm32"))]
mod text_chart {
    use evo_timeline::core::chart::{ChartSurface, Overlay, OverlayId, OverlaySlots};
    use evo_timeline::core::timestamp::to_chart_x;
    use evo_timeline::core::{ChartError, Figure, YRange};

    /// Chart adapter printing one row per bucket of the total series
    #[derive(Default)]
    pub struct TextChart {
        figure: Option<Figure>,
        y_range: Option<YRange>,
        overlays: OverlaySlots,
    }

    impl ChartSurface for TextChart {
        fn replace_data(&mut self, figure: &Figure) {
            self.figure = Some(figure.clone());
            self.y_range = None;
            self.overlays.clear();
        }

        fn set_y_range(&mut self, range: YRange) -> Result<(), ChartError> {
            if range.min >= range.max {
                return Err(ChartError::Rejected(format!(
                    "empty y-range [{}, {}]",
                    range.min, range.max
                )));
            }
            self.y_range = Some(range);
            Ok(())
        }

        fn add_overlay(&mut self, overlay: Overlay) -> Result<OverlayId, ChartError> {
            Ok(self.overlays.add(overlay))
        }

        fn remove_overlay(&mut self, id: OverlayId) -> Result<(), ChartError> {
            self.overlays.remove(id)
        }
    }

    impl TextChart {
        fn is_highlighted(&self, x: f64) -> bool {
            self.overlays
                .iter()
                .any(|Overlay::Halo { at, .. }| (at.x - x).abs() < 1e-6)
        }

        /// Rows `start..=end` of `series`, bars scaled to the applied y-range
        pub fn render(&self, series: &str, window: Option<(usize, usize)>, width: usize) -> String {
            let Some(total) = self
                .figure
                .as_ref()
                .and_then(|f| f.series(series).or_else(|| f.reference()))
            else {
                return "(no data)\n".to_string();
            };
            if total.is_empty() {
                return "(no data)\n".to_string();
            }

            let (start, end) = window.unwrap_or((0, total.len() - 1));
            let range = self.y_range.unwrap_or_else(|| {
                let (lo, hi) = total
                    .y
                    .iter()
                    .filter(|v| v.is_finite())
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(*v), hi.max(*v))
                    });
                YRange::new(lo.min(0.0), hi.max(lo + 1.0))
            });

            let mut out = format!("{} [{}, {}]\n", total.name, range.min, range.max);
            let span = range.max - range.min;
            for i in start..=end.min(total.len() - 1) {
                let (Some(x), Some(raw), Some(y)) = (total.x.get(i), total.x_raw.get(i), total.y.get(i))
                else {
                    continue;
                };
                let filled = if y.is_finite() && span > 0.0 {
                    (((y - range.min) / span).clamp(0.0, 1.0) * width as f64).round() as usize
                } else {
                    0
                };
                let mark = if self.is_highlighted(to_chart_x(*x)) { '◉' } else { ' ' };
                out.push_str(&format!(
                    "{raw:>20} {mark} {:<width$} {y}\n",
                    "█".repeat(filled),
                    width = width
                ));
            }
            out
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod args {
    use clap::{Parser, ValueEnum};
    use evo_timeline::core::session::DEFAULT_REPO;
    use evo_timeline::core::{AggregationLevel, ClickMode};
    use evo_timeline::http::DEFAULT_SERVER;

    #[derive(Clone, Copy, Debug, ValueEnum)]
    pub enum CliClickMode {
        /// Every timestamp asks for its own snapshot
        Replace,
        /// Two timestamps are diffed against each other
        Accumulate,
    }

    impl From<CliClickMode> for ClickMode {
        fn from(m: CliClickMode) -> Self {
            match m {
                CliClickMode::Replace => ClickMode::Replace,
                CliClickMode::Accumulate => ClickMode::Accumulate,
            }
        }
    }

    #[derive(Parser, Debug)]
    #[command(name = "evo-cli", about = "Inspect the evolution of a versioned RDF repository")]
    pub struct Args {
        /// Backend base URL
        #[arg(long, env = "EVO_SERVER", default_value = DEFAULT_SERVER)]
        pub server: String,

        #[arg(long, default_value = DEFAULT_REPO)]
        pub repo: String,

        /// Aggregation level: HOUR, DAY or WEEK
        #[arg(long, default_value = "DAY")]
        pub agg: AggregationLevel,

        /// Zoom the chart to a time window before printing it
        #[arg(long, num_args = 2, value_names = ["START", "END"])]
        pub window: Option<Vec<String>>,

        /// Show the hierarchies of the snapshot nearest to this timestamp
        #[arg(long, conflicts_with = "diff")]
        pub at: Option<String>,

        /// Click two timestamps (a diff in accumulate mode)
        #[arg(long, num_args = 2, value_names = ["TS1", "TS2"])]
        pub diff: Option<Vec<String>>,

        #[arg(long, value_enum, default_value_t = CliClickMode::Accumulate)]
        pub click_mode: CliClickMode,

        /// Hide unchanged nodes
        #[arg(long)]
        pub changed_only: bool,

        /// Print only top-level nodes
        #[arg(long)]
        pub collapsed: bool,

        /// Print tree markup instead of text
        #[arg(long)]
        pub markup: bool,

        /// Width of the chart bars in characters
        #[arg(long, default_value_t = 60)]
        pub width: usize,
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn print_panel(kind: evo_timeline::core::HierarchyKind, panel: &evo_timeline::core::PanelState) {
    use evo_timeline::core::hierarchy::fmt_count;
    use evo_timeline::core::PanelState;

    println!("== {} ==", kind.title());
    match panel {
        PanelState::Idle => println!("(nothing selected)"),
        PanelState::Loading => println!("(loading)"),
        PanelState::NoData => println!("No data for this repository at this time"),
        PanelState::Failed(message) => println!("Error: {message}"),
        PanelState::Tree(tree) => {
            for idx in tree.visible_rows() {
                let Some(row) = tree.row(idx) else {
                    continue;
                };
                let expander = match (row.has_children(), row.expanded) {
                    (false, _) => ' ',
                    (true, true) => '-',
                    (true, false) => '+',
                };
                let mut line = format!(
                    "{}{expander} {}  Instances: {}",
                    "  ".repeat(row.depth),
                    row.label,
                    fmt_count(row.instances)
                );
                if let Some(added) = row.added {
                    line.push_str(&format!("  Added: {}", fmt_count(added)));
                }
                if let Some(deleted) = row.deleted {
                    line.push_str(&format!("  Deleted: {}", fmt_count(deleted)));
                }
                println!("{line}");
            }
        }
    }
    println!();
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use clap::Parser;
    use evo_timeline::core::timestamp::parse_timestamp;
    use evo_timeline::core::viewport::visible_indices;
    use evo_timeline::core::{
        ChartState, HierarchyKind, Session, SessionConfig, StatisticsQuery, WindowChange, XBounds,
    };
    use evo_timeline::http::ApiClient;
    use evo_timeline::time::{now_seconds, until};
    use futures_util::future::join_all;
    use tracing::{error, info, warn};
    use tracing_subscriber::{fmt, EnvFilter};

    use args::Args;
    use text_chart::TextChart;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,evo_timeline=debug"));
    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();
    let config = SessionConfig {
        repo: args.repo.clone(),
        click_mode: args.click_mode.into(),
        initial_level: args.agg,
        ..SessionConfig::default()
    };
    let total_series = config.viewport.total_series.clone();

    let api = ApiClient::new(&args.server);
    let mut session = Session::new(config);
    let mut chart = TextChart::default();
    session.apply_change_filter(args.changed_only);

    info!(server = %api.base(), repo = %args.repo, level = %args.agg, "Loading evolution");
    let issued = session.set_period(args.agg, &mut chart);
    let result = api.fetch_infos(&issued.query).await;
    session.complete_infos(issued.token, result, &mut chart, now_seconds());
    if let ChartState::Failed(message) = session.chart_state() {
        error!(%message, "Cannot load evolution chart");
        return Err(message.clone().into());
    }

    let mut window = None;
    if let Some([start, end]) = args.window.as_deref() {
        let start = parse_timestamp(start).ok_or_else(|| format!("invalid timestamp: {start}"))?;
        let end = parse_timestamp(end).ok_or_else(|| format!("invalid timestamp: {end}"))?;
        session.on_window_change(&WindowChange::times(start, end), now_seconds());
        window = session
            .figure()
            .and_then(|f| f.reference())
            .and_then(|r| visible_indices(&XBounds::Times { start, end }, r));
        if window.is_none() {
            warn!("No data in the requested window");
        }
    }

    // let the debounced rescale fire
    while let Some(deadline) = session.next_deadline() {
        tokio::time::sleep(until(deadline, now_seconds())).await;
        session.tick(now_seconds(), &mut chart);
    }

    let clicks: Vec<String> = args
        .at
        .iter()
        .chain(args.diff.iter().flatten())
        .cloned()
        .collect();

    let mut fetches = Vec::new();
    for raw in &clicks {
        let ts = parse_timestamp(raw).ok_or_else(|| format!("invalid timestamp: {raw}"))?;
        let Some(click) = session.figure().and_then(|f| f.point_near(&total_series, ts)) else {
            warn!(%raw, "No point near timestamp");
            continue;
        };
        info!(clicked = %click.raw_timestamp, "Selecting point");
        if let Some(issued) = session.on_point_clicked(&click, &mut chart) {
            let api = api.clone();
            fetches.push(async move {
                let result = api.fetch_statistics(&issued.query).await;
                (issued.token, result)
            });
        }
    }
    // completions for superseded clicks are dropped by the session
    for (token, result) in join_all(fetches).await {
        session.complete_statistics(token, result);
    }

    if let Some(info) = session.tracking() {
        println!("Dataset:          {}", info.rdf_dataset_url);
        println!("Polling interval: {}", info.polling_interval);
        println!("Next run:         {}", info.next_run);
        if !info.static_core_triples.is_empty() {
            println!("Static core:      {}", info.static_core_triples);
        }
        if !info.version_oblivious_triples.is_empty() {
            println!("Version oblivious: {}", info.version_oblivious_triples);
        }
        println!();
    }
    print!("{}", chart.render(&total_series, window, args.width));
    println!();

    match session.displayed() {
        Some(StatisticsQuery::Snapshot { timestamp, .. }) => println!("Snapshot at {timestamp}\n"),
        Some(StatisticsQuery::Diff { ts1, ts2, .. }) => println!("Diff {ts1} -> {ts2}\n"),
        None => {}
    }

    for kind in [HierarchyKind::Classes, HierarchyKind::Properties] {
        if !args.collapsed {
            if let Some(tree) = session.panel_mut(kind).tree_mut() {
                tree.set_all_expanded(true);
            }
        }
        if args.markup {
            println!("{}", session.panel(kind).to_markup(kind));
        } else if !clicks.is_empty() {
            print_panel(kind, session.panel(kind));
        }
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {}
