//! Selection halo on the evolution chart
//!
//! At most one halo exists at any time. The overlay id handed out by the
//! chart is tracked, so removal hits exactly that overlay even when other
//! overlays were added or removed in between.

use tracing::{debug, warn};

use super::chart::{ChartSurface, MarkerPoint, Overlay, OverlayId, Rgba};

/// Translucent blue halo
pub const HALO_FILL: Rgba = [0, 102, 153, 102];
pub const HALO_STROKE: Rgba = [0, 102, 153, 255];
pub const HALO_SIZE: f32 = 20.0;
pub const HALO_STROKE_WIDTH: f32 = 2.0;

#[derive(Debug, Default)]
pub struct HighlightMarkerManager {
    current: Option<(OverlayId, MarkerPoint)>,
}

impl HighlightMarkerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current halo (if any) with one at `point`
    pub fn set_highlight(&mut self, chart: &mut dyn ChartSurface, point: MarkerPoint) {
        self.clear_highlight(chart);

        let overlay = Overlay::Halo {
            at: point,
            size: HALO_SIZE,
            fill: HALO_FILL,
            stroke: HALO_STROKE,
            stroke_width: HALO_STROKE_WIDTH,
        };
        match chart.add_overlay(overlay) {
            Ok(id) => {
                debug!(id, x = point.x, y = point.y, "Halo added");
                self.current = Some((id, point));
            }
            Err(e) => warn!(error = %e, "Failed to add halo"),
        }
    }

    /// Remove the tracked halo, if present
    pub fn clear_highlight(&mut self, chart: &mut dyn ChartSurface) {
        if let Some((id, _)) = self.current.take() {
            if let Err(e) = chart.remove_overlay(id) {
                // Already gone with a data replace; nothing left to remove
                debug!(id, error = %e, "Halo removal skipped");
            }
        }
    }

    /// Drop tracking without touching the chart (its overlays were wiped)
    pub fn forget(&mut self) {
        self.current = None;
    }

    pub fn position(&self) -> Option<MarkerPoint> {
        self.current.map(|(_, p)| p)
    }

    pub fn is_present(&self) -> bool {
        self.current.is_some()
    }
}
