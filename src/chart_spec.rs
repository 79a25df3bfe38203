//! Declarative, renderer-agnostic chart descriptions.
//!
//! A `ChartSpec` names the mark, binds axes and color to fields of its data
//! rows, and carries the layout theme. It holds no business logic; the
//! figure builders fill it in and the page hands it to a renderer.
use serde::Serialize;
use serde_json::{Map, Value};

use crate::stats::LinearFit;

// ── Theme ───────────────────────────────────────────────────────────────────

pub mod palette {
    pub const TEXT: &str = "#2d3748";
    pub const BACKGROUND1: &str = "#f8fafc";
    pub const BACKGROUND2: &str = "#e2e8f0";
    pub const PRIMARY: &str = "#3b82f6";

    pub const BLUE_SCALE: [&str; 5] = ["#93c5fd", "#60a5fa", "#3b82f6", "#2563eb", "#1d4ed8"];
}

pub const DARK_TEMPLATE: &str = "plotly_dark";
pub const UNIFIED_X_HOVER: &str = "x unified";
pub const COUNTRY_NAMES: &str = "country names";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

impl Margin {
    pub const fn uniform(px: u32) -> Self {
        Self {
            l: px,
            r: px,
            t: px,
            b: px,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub plot_bgcolor: String,
    pub paper_bgcolor: String,
    pub font_color: String,
    pub template: Option<String>,
    pub hovermode: Option<String>,
    pub title_x: Option<f64>,
    pub margin: Margin,
}

impl Layout {
    /// Dashboard palette with 40px margins and nothing else set.
    pub fn themed() -> Self {
        Self {
            plot_bgcolor: palette::BACKGROUND1.to_string(),
            paper_bgcolor: palette::BACKGROUND2.to_string(),
            font_color: palette::TEXT.to_string(),
            template: None,
            hovermode: None,
            title_x: None,
            margin: Margin::uniform(40),
        }
    }

    pub fn template(mut self, name: &str) -> Self {
        self.template = Some(name.to_string());
        self
    }

    pub fn hovermode(mut self, mode: &str) -> Self {
        self.hovermode = Some(mode.to_string());
        self
    }

    pub fn centered_title(mut self) -> Self {
        self.title_x = Some(0.5);
        self
    }
}

// ── Encodings ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Line,
    Bar,
    Choropleth,
    Treemap,
    Heatmap,
    Scatter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Axis {
    /// Data field bound to this axis.
    pub field: Option<String>,
    pub title: Option<String>,
    /// Fixed `[min, max]`; autoscaled when absent.
    pub range: Option<[f64; 2]>,
}

impl Axis {
    pub fn bound(field: &str) -> Self {
        Self {
            field: Some(field.to_string()),
            ..Default::default()
        }
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some([min, max]);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorEncoding {
    pub field: String,
    pub label: Option<String>,
    /// Continuous scale, low to high. Renderer default when absent.
    pub scale: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ChartData {
    /// One JSON object per row, keyed by field name.
    Records { rows: Vec<Map<String, Value>> },
    /// Labelled grid; `z[row][column]`, `None` where no data exists.
    Matrix {
        x: Vec<String>,
        y: Vec<String>,
        z: Vec<Vec<Option<f64>>>,
    },
}

impl ChartData {
    pub fn is_empty(&self) -> bool {
        match self {
            ChartData::Records { rows } => rows.is_empty(),
            ChartData::Matrix { z, .. } => z.iter().flatten().all(Option::is_none),
        }
    }
}

/// Overlaid least-squares line. `fit` is `None` when the points do not
/// determine a slope; `points` then is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trendline {
    pub fit: Option<LinearFit>,
    pub points: Vec<[f64; 2]>,
}

/// Build a data row from `(field, value)` pairs.
pub fn record<const N: usize>(fields: [(&str, Value); N]) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

// ── ChartSpec ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub mark: Mark,
    pub title: String,
    pub x: Axis,
    pub y: Axis,
    pub orientation: Option<Orientation>,
    pub color: Option<ColorEncoding>,
    pub line_color: Option<String>,
    /// Print values on the marks.
    pub text_auto: bool,
    pub location_mode: Option<String>,
    /// Hierarchy fields, outermost first.
    pub path: Vec<String>,
    /// Field sizing treemap areas.
    pub values: Option<String>,
    pub marker_size: Option<u32>,
    pub trendline: Option<Trendline>,
    pub data: ChartData,
    pub layout: Layout,
}

impl ChartSpec {
    pub fn new(mark: Mark, title: impl Into<String>) -> Self {
        Self {
            mark,
            title: title.into(),
            x: Axis::default(),
            y: Axis::default(),
            orientation: None,
            color: None,
            line_color: None,
            text_auto: false,
            location_mode: None,
            path: Vec::new(),
            values: None,
            marker_size: None,
            trendline: None,
            data: ChartData::Records { rows: Vec::new() },
            layout: Layout::themed(),
        }
    }

    pub fn x(mut self, axis: Axis) -> Self {
        self.x = axis;
        self
    }

    pub fn y(mut self, axis: Axis) -> Self {
        self.y = axis;
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    /// Continuous color bound to `field`, on the dashboard blue scale.
    pub fn blue_color(self, field: &str) -> Self {
        let scale = palette::BLUE_SCALE.iter().map(|c| c.to_string()).collect();
        self.color_encoding(field, Some(scale))
    }

    /// Continuous color bound to `field`, on the renderer's default scale.
    pub fn default_color(self, field: &str) -> Self {
        self.color_encoding(field, None)
    }

    fn color_encoding(mut self, field: &str, scale: Option<Vec<String>>) -> Self {
        self.color = Some(ColorEncoding {
            field: field.to_string(),
            label: None,
            scale,
        });
        self
    }

    pub fn color_label(mut self, label: &str) -> Self {
        if let Some(color) = self.color.as_mut() {
            color.label = Some(label.to_string());
        }
        self
    }

    pub fn line_color(mut self, color: &str) -> Self {
        self.line_color = Some(color.to_string());
        self
    }

    pub fn text_auto(mut self) -> Self {
        self.text_auto = true;
        self
    }

    pub fn location_mode(mut self, mode: &str) -> Self {
        self.location_mode = Some(mode.to_string());
        self
    }

    pub fn path(mut self, fields: &[&str]) -> Self {
        self.path = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn values(mut self, field: &str) -> Self {
        self.values = Some(field.to_string());
        self
    }

    pub fn marker_size(mut self, px: u32) -> Self {
        self.marker_size = Some(px);
        self
    }

    pub fn trendline(mut self, trendline: Trendline) -> Self {
        self.trendline = Some(trendline);
        self
    }

    pub fn records(mut self, rows: Vec<Map<String, Value>>) -> Self {
        self.data = ChartData::Records { rows };
        self
    }

    pub fn matrix(mut self, x: Vec<String>, y: Vec<String>, z: Vec<Vec<Option<f64>>>) -> Self {
        self.data = ChartData::Matrix { x, y, z };
        self
    }

    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
