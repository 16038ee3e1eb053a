//! Platform-agnostic core module - shared between WASM dashboard and CLI
//!
//! Nothing in here performs I/O: operations return the requests to issue
//! and front ends feed completions back in.

pub mod api;
pub mod chart;
pub mod error;
pub mod hierarchy;
pub mod highlight;
pub mod period;
pub mod request;
pub mod selection;
pub mod series;
pub mod session;
pub mod timestamp;
pub mod viewport;

pub use api::{InfosQuery, InfosResponse, StatisticsQuery, StatisticsResponse, TrackingInfo};
pub use chart::{
    ChartSurface, MarkerPoint, Overlay, OverlayId, OverlaySlots, PointClick, WindowChange,
    XBounds, YRange,
};
pub use error::{ChartError, EvoError};
pub use hierarchy::{HierarchyKind, HierarchyNode, PanelState, TreeView};
pub use highlight::HighlightMarkerManager;
pub use period::{AggregationLevel, AggregationPeriodController};
pub use request::{Issued, RequestToken};
pub use selection::{ClickMode, SelectionMode, SelectionState, SelectionStateMachine};
pub use series::{Figure, Series, TraceKind};
pub use session::{ChartState, Session, SessionConfig};
pub use viewport::{ViewportConfig, ViewportRangeController};
