//! egui_plot adapter for the chart command contract
//!
//! The widget keeps its own bounds in egui memory, so commands are queued
//! here and pushed into the plot on the next frame. x is seconds since the
//! epoch (see [`to_chart_x`]).

use eframe::egui;
use egui_plot::{Bar, BarChart, Legend, Line, MarkerShape, Plot, PlotBounds, PlotPoints, Points};
use tracing::{debug, trace};

use crate::core::chart::{ChartSurface, Overlay, OverlayId, OverlaySlots};
use crate::core::timestamp::{from_chart_x, to_chart_x};
use crate::core::{ChartError, Figure, PointClick, Series, TraceKind, WindowChange, YRange};
use crate::theme::{parse_hex, rgba, series_color};

/// Fallback bar width (one hour) for single-point series
const DEFAULT_BAR_WIDTH_SECS: f64 = 3600.0;

/// Events the plot produced during one frame
#[derive(Default)]
pub(crate) struct ChartOutput {
    pub window: Option<WindowChange>,
    pub click: Option<PointClick>,
}

pub(crate) struct PlotChart {
    /// Series clicks snap to
    total_series: String,
    figure: Option<Figure>,
    overlays: OverlaySlots,
    /// Bumped on every data replace so egui_plot forgets its old bounds
    generation: u64,
    pending_x: Option<(f64, f64)>,
    pending_y: Option<YRange>,
    last_x: Option<(f64, f64)>,
}

impl ChartSurface for PlotChart {
    fn replace_data(&mut self, figure: &Figure) {
        self.generation += 1;
        self.overlays.clear();
        self.last_x = None;
        self.pending_y = None;
        self.pending_x = initial_window(figure);
        self.figure = Some(figure.clone());
        debug!(generation = self.generation, "Plot data replaced");
    }

    fn set_y_range(&mut self, range: YRange) -> Result<(), ChartError> {
        if !range.min.is_finite() || !range.max.is_finite() || range.min >= range.max {
            return Err(ChartError::Rejected(format!(
                "invalid y-range [{}, {}]",
                range.min, range.max
            )));
        }
        self.pending_y = Some(range);
        Ok(())
    }

    fn add_overlay(&mut self, overlay: Overlay) -> Result<OverlayId, ChartError> {
        Ok(self.overlays.add(overlay))
    }

    fn remove_overlay(&mut self, id: OverlayId) -> Result<(), ChartError> {
        self.overlays.remove(id)
    }
}

fn initial_window(figure: &Figure) -> Option<(f64, f64)> {
    if let Some((start, end)) = figure.initial_x_range {
        return Some((to_chart_x(start), to_chart_x(end)));
    }
    let reference = figure.reference()?;
    let first = reference.x.first()?;
    let last = reference.x.last()?;
    Some((to_chart_x(*first), to_chart_x(*last)))
}

fn bar_width(series: &Series) -> f64 {
    if let Some(ms) = series.bar_width_ms {
        return ms / 1000.0;
    }
    match (series.x.first(), series.x.get(1)) {
        (Some(a), Some(b)) => ((to_chart_x(*b) - to_chart_x(*a)) * 0.8).abs(),
        _ => DEFAULT_BAR_WIDTH_SECS,
    }
}

fn trace_color(series: &Series) -> egui::Color32 {
    series
        .color
        .as_deref()
        .and_then(parse_hex)
        .unwrap_or_else(|| series_color(&series.name))
}

impl PlotChart {
    pub fn new(total_series: &str) -> Self {
        Self {
            total_series: total_series.to_string(),
            figure: None,
            overlays: OverlaySlots::default(),
            generation: 0,
            pending_x: None,
            pending_y: None,
            last_x: None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.figure.is_some()
    }

    /// Nearest point of the total (or reference) series to the pointer
    fn hit_test(&self, x: f64) -> Option<PointClick> {
        let figure = self.figure.as_ref()?;
        figure.point_near(&self.total_series, from_chart_x(x)?)
    }

    pub fn show(&mut self, ui: &mut egui::Ui) -> ChartOutput {
        let Some(figure) = self.figure.as_ref() else {
            return ChartOutput::default();
        };

        let pending_x = self.pending_x.take();
        let pending_y = self.pending_y.take();

        let resp = Plot::new(("evolution", self.generation))
            .legend(Legend::default())
            .allow_zoom([true, false])
            .allow_drag([true, false])
            .allow_scroll([true, false])
            .allow_boxed_zoom(false)
            .allow_double_click_reset(false)
            .show_grid([false, true])
            .x_axis_formatter(|mark, _range| {
                from_chart_x(mark.value)
                    .map(|t| t.format("%Y-%m-%d").to_string())
                    .unwrap_or_default()
            })
            .label_formatter(|name, value| {
                let ts = from_chart_x(value.x)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                if name.is_empty() {
                    ts
                } else {
                    format!("{name}\n{ts}\n{:.0}", value.y)
                }
            })
            .show(ui, |plot_ui| {
                if pending_x.is_some() || pending_y.is_some() {
                    let current = plot_ui.plot_bounds();
                    let (x0, x1) = pending_x.unwrap_or((current.min()[0], current.max()[0]));
                    let (y0, y1) = pending_y
                        .map(|r| (r.min, r.max))
                        .unwrap_or((current.min()[1], current.max()[1]));
                    trace!(x0, x1, y0, y1, "Pushing plot bounds");
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max([x0, y0], [x1, y1]));
                }

                for series in &figure.series {
                    let color = trace_color(series);
                    match series.kind {
                        TraceKind::Bar => {
                            let width = bar_width(series);
                            let bars: Vec<Bar> = series
                                .x
                                .iter()
                                .zip(&series.y)
                                .enumerate()
                                .filter(|(_, (_, y))| y.is_finite())
                                .map(|(i, (x, y))| {
                                    let base = series
                                        .base
                                        .as_ref()
                                        .and_then(|b| b.get(i))
                                        .copied()
                                        .filter(|b| b.is_finite())
                                        .unwrap_or(0.0);
                                    Bar::new(to_chart_x(*x), *y)
                                        .width(width)
                                        .base_offset(base)
                                        .fill(color)
                                })
                                .collect();
                            plot_ui.bar_chart(BarChart::new(bars).name(&series.name).color(color));
                        }
                        TraceKind::Line => {
                            let points: PlotPoints = series
                                .x
                                .iter()
                                .zip(&series.y)
                                .filter(|(_, y)| y.is_finite())
                                .map(|(x, y)| [to_chart_x(*x), *y])
                                .collect();
                            plot_ui.line(Line::new(points).name(&series.name).color(color).width(2.0));
                        }
                    }
                }

                for overlay in self.overlays.iter() {
                    let Overlay::Halo {
                        at,
                        size,
                        fill,
                        stroke,
                        stroke_width,
                    } = *overlay;
                    let at = [at.x, at.y];
                    plot_ui.points(
                        Points::new(vec![at])
                            .shape(MarkerShape::Circle)
                            .radius(size / 2.0)
                            .filled(true)
                            .color(rgba(fill)),
                    );
                    plot_ui.points(
                        Points::new(vec![at])
                            .shape(MarkerShape::Circle)
                            .radius(size / 2.0 + stroke_width)
                            .filled(false)
                            .color(rgba(stroke)),
                    );
                }

                let bounds = plot_ui.plot_bounds();
                let pointer = plot_ui
                    .response()
                    .clicked()
                    .then(|| plot_ui.pointer_coordinate())
                    .flatten();
                ((bounds.min()[0], bounds.max()[0]), pointer)
            });

        let ((x0, x1), pointer) = resp.inner;
        let mut out = ChartOutput::default();

        let moved = match self.last_x {
            Some((a, b)) => (a - x0).abs() > f64::EPSILON || (b - x1).abs() > f64::EPSILON,
            None => true,
        };
        if moved {
            self.last_x = Some((x0, x1));
            if let (Some(start), Some(end)) = (from_chart_x(x0), from_chart_x(x1)) {
                out.window = Some(WindowChange::times(start, end));
            }
        }

        out.click = pointer.and_then(|p| self.hit_test(p.x));
        out
    }

    /// Placeholder while nothing is plotted
    pub fn show_empty(ui: &mut egui::Ui, text: &str, color: egui::Color32) {
        ui.add_space(40.0);
        ui.vertical_centered(|ui| {
            ui.label(egui::RichText::new(text).color(color).size(14.0));
        });
        ui.add_space(40.0);
    }
}
