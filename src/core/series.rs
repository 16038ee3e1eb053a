//! Evolution figure decoding
//!
//! `/infos` delivers the evolution chart as a serialized figure:
//! `{"data": [trace, ...], "layout": {"xaxis": {"range": [start, end]}}}`.
//! Numeric arrays are either plain JSON arrays or typed buffers
//! (`{"dtype": "i4", "bdata": "<base64>"}`); both end up as `Vec<f64>`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDateTime;
use serde_json::Value;
use tracing::{debug, trace, warn};

use super::chart::{MarkerPoint, PointClick};
use super::error::EvoError;
use super::timestamp::{parse_timestamp, to_chart_x};

/// How a trace is drawn
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceKind {
    Line,
    Bar,
}

/// One named time series of the evolution chart
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    pub name: String,
    pub kind: TraceKind,
    /// Parsed x values, aligned with `y`
    pub x: Vec<NaiveDateTime>,
    /// x values exactly as delivered (used for snapshot queries)
    pub x_raw: Vec<String>,
    pub y: Vec<f64>,
    /// Bar offsets (stacked bars start at `base[i]`)
    pub base: Option<Vec<f64>>,
    /// Bar width in milliseconds
    pub bar_width_ms: Option<f64>,
    /// `#RRGGBB` as sent by the backend
    pub color: Option<String>,
}

impl Series {
    /// Build a line series from already parsed points
    pub fn from_points(name: &str, points: &[(NaiveDateTime, f64)]) -> Self {
        Self {
            name: name.to_string(),
            kind: TraceKind::Line,
            x: points.iter().map(|(x, _)| *x).collect(),
            x_raw: points
                .iter()
                .map(|(x, _)| x.format("%Y-%m-%dT%H:%M:%S").to_string())
                .collect(),
            y: points.iter().map(|(_, y)| *y).collect(),
            base: None,
            bar_width_ms: None,
            color: None,
        }
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Index of the point closest to `ts`
    pub fn nearest_index(&self, ts: NaiveDateTime) -> Option<usize> {
        self.x
            .iter()
            .enumerate()
            .min_by_key(|(_, x)| (**x - ts).num_milliseconds().unsigned_abs())
            .map(|(i, _)| i)
    }

    fn from_trace(trace: &Value) -> Result<Self, EvoError> {
        let name = trace["name"].as_str().unwrap_or_default().to_string();
        let kind = match trace["type"].as_str() {
            Some("bar") => TraceKind::Bar,
            _ => TraceKind::Line,
        };

        let mut x_raw: Vec<String> = match &trace["x"] {
            Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => Vec::new(),
        };
        let mut x = x_raw
            .iter()
            .map(|raw| {
                parse_timestamp(raw).ok_or_else(|| EvoError::InvalidTimestamp(raw.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut y = numeric_values(&trace["y"])?;
        if y.len() != x.len() {
            warn!(name = %name, x_len = x.len(), y_len = y.len(), "Trace x/y length mismatch, truncating");
        }
        let len = x.len().min(y.len());
        y.truncate(len);
        x.truncate(len);
        x_raw.truncate(len);

        let base = match &trace["base"] {
            Value::Null => None,
            v => Some(numeric_values(v)?),
        };

        let bar_width_ms = match &trace["width"] {
            Value::Number(n) => n.as_f64(),
            Value::Null => None,
            v => numeric_values(v)?.first().copied(),
        };

        let color = trace["marker"]["color"]
            .as_str()
            .or_else(|| trace["line"]["color"].as_str())
            .map(str::to_string);

        Ok(Self {
            name,
            kind,
            x,
            x_raw,
            y,
            base,
            bar_width_ms,
            color,
        })
    }
}

/// Decoded evolution figure
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Figure {
    pub series: Vec<Series>,
    /// Initially visible window as chosen by the backend
    pub initial_x_range: Option<(NaiveDateTime, NaiveDateTime)>,
}

impl Figure {
    pub fn new(series: Vec<Series>) -> Self {
        Self {
            series,
            initial_x_range: None,
        }
    }

    /// Decode a serialized figure (`evo_plot` field of `/infos`)
    pub fn from_json(text: &str) -> Result<Self, EvoError> {
        trace!(len = text.len(), "Decoding evolution figure");
        let json: Value = serde_json::from_str(text)?;

        let traces = json["data"]
            .as_array()
            .ok_or_else(|| EvoError::Json("figure has no data array".into()))?;

        let mut series = Vec::with_capacity(traces.len());
        for trace in traces {
            match Series::from_trace(trace) {
                Ok(s) => series.push(s),
                Err(e) => {
                    warn!(error = %e, name = ?trace["name"].as_str(), "Skipping undecodable trace");
                }
            }
        }

        let initial_x_range = match json["layout"]["xaxis"]["range"].as_array() {
            Some(r) if r.len() == 2 => {
                let start = r[0].as_str().and_then(parse_timestamp);
                let end = r[1].as_str().and_then(parse_timestamp);
                start.zip(end)
            }
            _ => None,
        };

        debug!(traces = series.len(), has_range = initial_x_range.is_some(), "Figure decoded");
        Ok(Self {
            series,
            initial_x_range,
        })
    }

    /// Look up a series by its stable name
    pub fn series(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.name == name)
    }

    /// The series whose x values define the index domain (first trace)
    pub fn reference(&self) -> Option<&Series> {
        self.series.first()
    }

    /// Number of points of the reference series
    pub fn point_count(&self) -> usize {
        self.reference().map_or(0, Series::len)
    }

    /// Activation of the point of `name` (or the reference series) nearest to `ts`
    pub fn point_near(&self, name: &str, ts: NaiveDateTime) -> Option<PointClick> {
        let series = self.series(name).or_else(|| self.reference())?;
        let i = series.nearest_index(ts)?;
        Some(PointClick {
            raw_timestamp: series.x_raw.get(i)?.clone(),
            point: MarkerPoint {
                x: to_chart_x(*series.x.get(i)?),
                y: *series.y.get(i)?,
            },
        })
    }
}

/// Normalize a numeric array (plain or typed buffer) to `Vec<f64>`.
///
/// `null` entries become NaN so that indices stay aligned.
pub fn numeric_values(value: &Value) -> Result<Vec<f64>, EvoError> {
    match value {
        Value::Array(items) => Ok(items
            .iter()
            .map(|v| match v {
                Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
                Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
                _ => f64::NAN,
            })
            .collect()),
        Value::Object(obj) => {
            let dtype = obj.get("dtype").and_then(Value::as_str).unwrap_or_default();
            let bdata = obj
                .get("bdata")
                .and_then(Value::as_str)
                .ok_or_else(|| EvoError::Buffer {
                    dtype: dtype.to_string(),
                    reason: "missing bdata".into(),
                })?;
            decode_buffer(dtype, bdata)
        }
        Value::Null => Ok(Vec::new()),
        other => Err(EvoError::Json(format!("expected numeric array, got {other}"))),
    }
}

fn decode_buffer(dtype: &str, bdata: &str) -> Result<Vec<f64>, EvoError> {
    let bytes = STANDARD.decode(bdata).map_err(|e| EvoError::Buffer {
        dtype: dtype.to_string(),
        reason: e.to_string(),
    })?;

    macro_rules! le {
        ($ty:ty) => {{
            const N: usize = std::mem::size_of::<$ty>();
            if bytes.len() % N != 0 {
                return Err(EvoError::Buffer {
                    dtype: dtype.to_string(),
                    reason: format!("{} bytes is not a multiple of {}", bytes.len(), N),
                });
            }
            bytes
                .chunks_exact(N)
                .map(|c| {
                    let mut buf = [0u8; N];
                    buf.copy_from_slice(c);
                    <$ty>::from_le_bytes(buf) as f64
                })
                .collect()
        }};
    }

    let values: Vec<f64> = match dtype {
        "i1" => le!(i8),
        "u1" | "u1c" => le!(u8),
        "i2" => le!(i16),
        "u2" => le!(u16),
        "i4" => le!(i32),
        "u4" => le!(u32),
        "i8" => le!(i64),
        "u8" => le!(u64),
        "f4" => le!(f32),
        "f8" => le!(f64),
        other => {
            return Err(EvoError::Buffer {
                dtype: other.to_string(),
                reason: "unsupported dtype".into(),
            })
        }
    };
    Ok(values)
}
