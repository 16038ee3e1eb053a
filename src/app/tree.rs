//! Hierarchy panels (classes / properties)

use eframe::egui;

use super::EvoApp;
use crate::core::hierarchy::{fmt_count, ChangeStatus, TreeView};
use crate::core::{HierarchyKind, PanelState};
use crate::theme::colors;

const INDENT: f32 = 16.0;

/// Draw the visible rows; returns the row whose expander was clicked
fn render_rows(ui: &mut egui::Ui, tree: &TreeView) -> Option<usize> {
    let mut toggled = None;

    for idx in tree.visible_rows() {
        let Some(row) = tree.row(idx) else {
            continue;
        };

        ui.horizontal(|ui| {
            ui.add_space(row.depth as f32 * INDENT);

            if row.has_children() {
                let arrow = if row.expanded { "▾" } else { "▸" };
                if ui.small_button(arrow).clicked() {
                    toggled = Some(idx);
                }
            } else {
                ui.add_space(INDENT + 2.0);
            }

            let label_color = match row.status {
                ChangeStatus::Changed => colors::TEXT_PRIMARY,
                ChangeStatus::Unchanged => colors::TEXT_SECONDARY,
            };
            ui.label(egui::RichText::new(&row.label).color(label_color).strong());

            ui.label(
                egui::RichText::new(format!("Instances: {}", fmt_count(row.instances)))
                    .color(colors::TEXT_MUTED)
                    .monospace()
                    .size(11.0),
            );
            if let Some(added) = row.added {
                ui.label(
                    egui::RichText::new(format!("+{}", fmt_count(added)))
                        .color(colors::ADDED)
                        .monospace()
                        .size(11.0),
                );
            }
            if let Some(deleted) = row.deleted {
                ui.label(
                    egui::RichText::new(format!("-{}", fmt_count(deleted)))
                        .color(colors::DELETED)
                        .monospace()
                        .size(11.0),
                );
            }
        });
    }

    toggled
}

impl EvoApp {
    pub(crate) fn render_panel(&mut self, ui: &mut egui::Ui, kind: HierarchyKind) {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(kind.title())
                    .color(colors::TEXT_PRIMARY)
                    .size(14.0),
            );
            if let Some(tree) = self.session.panel_mut(kind).tree_mut() {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("Collapse all").clicked() {
                        tree.set_all_expanded(false);
                    }
                    if ui.small_button("Expand all").clicked() {
                        tree.set_all_expanded(true);
                    }
                    ui.label(
                        egui::RichText::new(format!("{} changed", tree.changed_count()))
                            .color(colors::TEXT_MUTED)
                            .size(11.0),
                    );
                });
            }
        });
        ui.separator();

        let toggled = match self.session.panel(kind) {
            PanelState::Idle => {
                ui.label(
                    egui::RichText::new("Click a point on the chart to inspect a snapshot")
                        .color(colors::TEXT_MUTED),
                );
                None
            }
            PanelState::Loading => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(egui::RichText::new("Loading...").color(colors::TEXT_MUTED));
                });
                None
            }
            PanelState::NoData => {
                ui.label(
                    egui::RichText::new("No data for this repository at this time")
                        .color(colors::TEXT_SECONDARY),
                );
                None
            }
            PanelState::Failed(message) => {
                ui.colored_label(colors::ERROR, format!("Error: {message}"));
                None
            }
            PanelState::Tree(tree) => egui::ScrollArea::vertical()
                .id_salt(kind.title())
                .auto_shrink([false, false])
                .show(ui, |ui| render_rows(ui, tree))
                .inner,
        };

        if let Some(idx) = toggled {
            if let Some(tree) = self.session.panel_mut(kind).tree_mut() {
                tree.toggle(idx);
            }
        }
    }
}
