//! Light theme with the evolution chart palette

use egui::Color32;

use crate::core::chart::Rgba;

pub mod colors {
    use super::Color32;

    // === Backgrounds ===
    pub const BG_PRIMARY: Color32 = Color32::from_rgb(255, 255, 255);
    pub const BG_ELEVATED: Color32 = Color32::from_rgb(246, 247, 249);
    pub const BG_HOVER: Color32 = Color32::from_rgb(232, 236, 241);

    // === Text ===
    pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(33, 37, 41);
    pub const TEXT_SECONDARY: Color32 = Color32::from_rgb(90, 98, 104);
    pub const TEXT_MUTED: Color32 = Color32::from_rgb(160, 166, 172);

    pub const BORDER: Color32 = Color32::from_rgb(222, 226, 230);

    // === Series ===
    pub const TOTAL: Color32 = Color32::from_rgb(0x54, 0x85, 0xAB);
    pub const INSERTIONS: Color32 = Color32::from_rgb(0x00, 0x7E, 0x71);
    pub const DELETIONS: Color32 = Color32::from_rgb(0xBA, 0x46, 0x82);

    // === Hierarchy change markers ===
    pub const ADDED: Color32 = INSERTIONS;
    pub const DELETED: Color32 = DELETIONS;
    pub const ERROR: Color32 = Color32::from_rgb(200, 60, 60);
}

pub fn rgba(c: Rgba) -> Color32 {
    Color32::from_rgba_unmultiplied(c[0], c[1], c[2], c[3])
}

/// Parse `#RRGGBB` (trace colors shipped with the figure)
pub fn parse_hex(s: &str) -> Option<Color32> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color32::from_rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Fallback color for a known trace name
pub fn series_color(name: &str) -> Color32 {
    match name {
        "Insertions" => colors::INSERTIONS,
        "Deletions" => colors::DELETIONS,
        _ => colors::TOTAL,
    }
}

pub fn dashboard_visuals() -> egui::Visuals {
    use colors::*;

    let mut visuals = egui::Visuals::light();

    visuals.panel_fill = BG_PRIMARY;
    visuals.window_fill = BG_PRIMARY;
    visuals.extreme_bg_color = BG_PRIMARY;
    visuals.faint_bg_color = BG_ELEVATED;

    visuals.override_text_color = Some(TEXT_PRIMARY);

    visuals.widgets.noninteractive.bg_stroke = egui::Stroke::new(1.0, BORDER);
    visuals.widgets.inactive.weak_bg_fill = BG_ELEVATED;
    visuals.widgets.hovered.weak_bg_fill = BG_HOVER;
    visuals.widgets.active.weak_bg_fill = BG_HOVER;

    visuals.selection.bg_fill = TOTAL.gamma_multiply(0.3);
    visuals.selection.stroke = egui::Stroke::new(1.0, TOTAL);
    visuals.hyperlink_color = TOTAL;

    visuals.window_shadow = egui::Shadow::NONE;
    visuals.popup_shadow = egui::Shadow::NONE;

    visuals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#007E71"), Some(colors::INSERTIONS));
        assert_eq!(parse_hex("007E71"), None);
        assert_eq!(parse_hex("#12"), None);
        assert_eq!(parse_hex("#zzzzzz"), None);
    }
}
