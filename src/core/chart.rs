//! Chart widget contract
//!
//! The rendering widget is never reimplemented by the core. It reports
//! window changes and point activations, and accepts four commands:
//! replace data, set vertical range, add overlay, remove overlay.

use chrono::NaiveDateTime;

use super::error::ChartError;
use super::series::Figure;

/// Vertical axis range applied to the chart
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YRange {
    pub min: f64,
    pub max: f64,
}

impl YRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Both bounds differ from `other` by less than `epsilon`
    pub fn approx_eq(&self, other: &YRange, epsilon: f64) -> bool {
        (self.min - other.min).abs() < epsilon && (self.max - other.max).abs() < epsilon
    }
}

/// Horizontal bounds carried by a window-change event
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum XBounds {
    /// Fractional indices into the reference series
    Indices { start: f64, end: f64 },
    /// Timestamps (what a pan/zoom gesture reports)
    Times {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

/// "Window changed" event. Partial relayouts (y-only zoom) carry no x bounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowChange {
    pub x: Option<XBounds>,
}

impl WindowChange {
    pub fn indices(start: f64, end: f64) -> Self {
        Self {
            x: Some(XBounds::Indices { start, end }),
        }
    }

    pub fn times(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            x: Some(XBounds::Times { start, end }),
        }
    }

    pub fn y_only() -> Self {
        Self { x: None }
    }
}

/// A chart position in chart coordinates (x in seconds since epoch)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerPoint {
    pub x: f64,
    pub y: f64,
}

/// "Point activated" event
#[derive(Clone, Debug, PartialEq)]
pub struct PointClick {
    /// x value of the clicked point exactly as the chart holds it
    pub raw_timestamp: String,
    pub point: MarkerPoint,
}

/// RGBA colour, alpha in 0..=255
pub type Rgba = [u8; 4];

/// Overlay drawn on top of the series
#[derive(Clone, Debug, PartialEq)]
pub enum Overlay {
    /// Translucent circular halo around a selected point
    Halo {
        at: MarkerPoint,
        /// Diameter in screen pixels
        size: f32,
        fill: Rgba,
        stroke: Rgba,
        stroke_width: f32,
    },
}

/// Identity of an overlay, handed out by the chart
pub type OverlayId = u64;

/// Commands the core issues to the chart widget
pub trait ChartSurface {
    /// Replace all data and layout wholesale
    fn replace_data(&mut self, figure: &Figure);

    /// Fix the vertical range (disables the widget's own autorange)
    fn set_y_range(&mut self, range: YRange) -> Result<(), ChartError>;

    fn add_overlay(&mut self, overlay: Overlay) -> Result<OverlayId, ChartError>;

    fn remove_overlay(&mut self, id: OverlayId) -> Result<(), ChartError>;
}

/// Overlay bookkeeping shared by chart adapters
#[derive(Default, Debug)]
pub struct OverlaySlots {
    next_id: OverlayId,
    slots: Vec<(OverlayId, Overlay)>,
}

impl OverlaySlots {
    pub fn add(&mut self, overlay: Overlay) -> OverlayId {
        self.next_id += 1;
        self.slots.push((self.next_id, overlay));
        self.next_id
    }

    pub fn remove(&mut self, id: OverlayId) -> Result<(), ChartError> {
        let pos = self
            .slots
            .iter()
            .position(|(slot, _)| *slot == id)
            .ok_or(ChartError::UnknownOverlay(id))?;
        self.slots.remove(pos);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Overlay> {
        self.slots.iter().map(|(_, o)| o)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording chart double

    use super::*;

    #[derive(Default)]
    pub struct RecordingChart {
        pub replaced: usize,
        pub y_ranges: Vec<YRange>,
        pub overlays: OverlaySlots,
        pub removed: Vec<OverlayId>,
        /// Reject every `set_y_range`
        pub fail_range: bool,
    }

    impl ChartSurface for RecordingChart {
        fn replace_data(&mut self, _figure: &Figure) {
            self.replaced += 1;
            self.overlays.clear();
        }

        fn set_y_range(&mut self, range: YRange) -> Result<(), ChartError> {
            if self.fail_range {
                return Err(ChartError::Rejected("range".into()));
            }
            self.y_ranges.push(range);
            Ok(())
        }

        fn add_overlay(&mut self, overlay: Overlay) -> Result<OverlayId, ChartError> {
            Ok(self.overlays.add(overlay))
        }

        fn remove_overlay(&mut self, id: OverlayId) -> Result<(), ChartError> {
            self.overlays.remove(id)?;
            self.removed.push(id);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn halo(x: f64) -> Overlay {
        Overlay::Halo {
            at: MarkerPoint { x, y: 0.0 },
            size: 20.0,
            fill: [0, 0, 0, 0],
            stroke: [0, 0, 0, 0],
            stroke_width: 1.0,
        }
    }

    #[test]
    fn test_overlay_ids_survive_foreign_removals() {
        let mut slots = OverlaySlots::default();
        let a = slots.add(halo(1.0));
        let b = slots.add(halo(2.0));
        let c = slots.add(halo(3.0));

        slots.remove(a).unwrap();
        // b is no longer "last but one", removal by id still hits it
        slots.remove(b).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots.iter().next(), Some(&halo(3.0)));
        assert_eq!(slots.remove(b), Err(ChartError::UnknownOverlay(b)));
        slots.remove(c).unwrap();
        assert!(slots.is_empty());
    }

    #[test]
    fn test_range_approx_eq() {
        let a = YRange::new(2.0, 14.0);
        assert!(a.approx_eq(&YRange::new(2.0005, 13.9995), 1e-3));
        assert!(!a.approx_eq(&YRange::new(2.01, 14.0), 1e-3));
    }
}
