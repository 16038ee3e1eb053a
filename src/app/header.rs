//! Header bar: repository, aggregation period, tracking info, filters

use eframe::egui;

use super::EvoApp;
use crate::core::{AggregationLevel, ClickMode, SelectionMode, StatisticsQuery};
use crate::theme::colors;

fn muted(text: impl Into<String>) -> egui::RichText {
    egui::RichText::new(text.into())
        .color(colors::TEXT_MUTED)
        .size(11.0)
}

impl EvoApp {
    pub(crate) fn render_header(&mut self, ui: &mut egui::Ui) {
        let mut new_repo = None;
        let mut new_level = None;
        let mut show_only_changed = self.session.show_only_changed();

        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new("Evolution")
                    .color(colors::TEXT_PRIMARY)
                    .size(14.0),
            );
            ui.add_space(10.0);

            egui::ComboBox::from_id_salt("repo")
                .selected_text(self.session.repo())
                .show_ui(ui, |ui| {
                    for repo in &self.repos {
                        if ui
                            .selectable_label(repo == self.session.repo(), repo.as_str())
                            .clicked()
                            && repo != self.session.repo()
                        {
                            new_repo = Some(repo.clone());
                        }
                    }
                });

            ui.add_space(10.0);

            let active = self.session.level();
            for &level in AggregationLevel::ALL {
                if ui.selectable_label(active == level, level.label()).clicked() && active != level {
                    new_level = Some(level);
                }
            }

            ui.add_space(10.0);
            ui.checkbox(&mut show_only_changed, "Changed only");

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                ui.label(muted(self.selection_summary()));
                if self.session.statistics_loading() {
                    ui.spinner();
                }
            });
        });

        if let Some(info) = self.session.tracking() {
            ui.horizontal_wrapped(|ui| {
                if !info.rdf_dataset_url.is_empty() {
                    ui.hyperlink_to(muted("RDF dataset"), &info.rdf_dataset_url);
                    ui.label(muted("/"));
                }
                ui.label(muted(format!("polling every {}", info.polling_interval)));
                ui.label(muted("/"));
                ui.label(muted(format!("next run {}", info.next_run)));
                if !info.static_core_triples.is_empty() {
                    ui.label(muted("/"));
                    ui.label(muted(format!("{} static core triples", info.static_core_triples)));
                }
                if !info.version_oblivious_triples.is_empty() {
                    ui.label(muted("/"));
                    ui.label(muted(format!(
                        "{} version-oblivious triples",
                        info.version_oblivious_triples
                    )));
                }
            });
        }

        if show_only_changed != self.session.show_only_changed() {
            self.session.apply_change_filter(show_only_changed);
        }
        if let Some(repo) = new_repo {
            let issued = self.session.change_repo(&repo, &mut self.chart);
            self.fetch_infos(issued);
        } else if let Some(level) = new_level {
            let issued = self.session.set_period(level, &mut self.chart);
            self.fetch_infos(issued);
        }
    }

    fn selection_summary(&self) -> String {
        let state = self.session.selection();
        let shown = match self.session.displayed() {
            Some(StatisticsQuery::Snapshot { timestamp, .. }) => format!("snapshot {timestamp}"),
            Some(StatisticsQuery::Diff { ts1, ts2, .. }) => format!("diff {ts1} → {ts2}"),
            None => "no selection".to_string(),
        };
        match (self.session.click_mode(), state.mode, state.pending.first()) {
            (ClickMode::Accumulate, SelectionMode::Single, Some(first)) => {
                format!("{shown} / click another point to diff against {first}")
            }
            _ => shown,
        }
    }
}
