//! Bar charts of ranked nodes
//!
//! [`BarChart`] is the plain description of one chart. [`PngRenderer`] draws
//! it with plotters into a fixed per-metric file, overwriting the previous
//! image.

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontStyle, register_font};
use tracing::{debug, instrument};

use crate::config::ChartConfig;
use crate::ranking::TOP_N;
use crate::{Metric, NodeRecord};

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 600;

const FONT_FAMILY: &str = "sans-serif";

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("failed to load font {path}: {reason}")]
    Font { path: PathBuf, reason: String },

    #[error("nothing to draw")]
    Empty,

    #[error("failed to draw chart: {0}")]
    Draw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub metric: Metric,
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub bars: Vec<Bar>,
}

impl BarChart {
    /// One bar per ranked node, in ranking order.
    pub fn new(ranked: &[NodeRecord], metric: Metric) -> Self {
        Self {
            metric,
            title: format!("Top {TOP_N} Nodos por {}", metric.label()),
            x_desc: String::from("Nodos"),
            y_desc: format!("{} (%)", metric.field()),
            bars: ranked
                .iter()
                .map(|node| Bar {
                    label: node.display_name().to_string(),
                    value: node.value(metric),
                })
                .collect(),
        }
    }

    pub fn color(&self) -> RGBColor {
        metric_color(self.metric)
    }

    /// Upper bound of the value axis, leaving room for the labels above the
    /// bars.
    pub fn y_max(&self) -> f64 {
        let highest = self
            .bars
            .iter()
            .map(|bar| bar.value)
            .filter(|value| value.is_finite())
            .fold(100.0, f64::max);
        highest * 1.1
    }
}

pub fn metric_color(metric: Metric) -> RGBColor {
    match metric {
        Metric::Cpu => GREEN,
        Metric::Memory => BLUE,
    }
}

/// Text printed above a bar.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

pub trait ChartRenderer: Send + Sync {
    /// Draw the chart and return the path of the written image.
    fn render(&self, chart: &BarChart) -> Result<PathBuf, ChartError>;
}

#[derive(Debug, Clone)]
pub struct PngRenderer {
    output_dir: PathBuf,
}

impl PngRenderer {
    /// Create a renderer, registering the configured font for all chart text.
    pub fn new(config: &ChartConfig) -> Result<Self, ChartError> {
        load_font(&config.font_path)?;
        Ok(Self {
            output_dir: config.output_dir.clone(),
        })
    }

    pub fn path_for(&self, metric: Metric) -> PathBuf {
        self.output_dir.join(metric.file_name())
    }
}

fn load_font(path: &Path) -> Result<(), ChartError> {
    let font_error = |reason: String| ChartError::Font {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = std::fs::read(path).map_err(|e| font_error(e.to_string()))?;
    // plotters keeps registered fonts for the rest of the process
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    register_font(FONT_FAMILY, FontStyle::Normal, bytes)
        .map_err(|_| font_error(String::from("not a valid TrueType font")))?;

    debug!("loaded chart font from {}", path.display());
    Ok(())
}

fn draw_error(e: impl std::fmt::Display) -> ChartError {
    ChartError::Draw(e.to_string())
}

impl ChartRenderer for PngRenderer {
    #[instrument(skip_all, fields(metric = ?chart.metric))]
    fn render(&self, chart: &BarChart) -> Result<PathBuf, ChartError> {
        if chart.bars.is_empty() {
            return Err(ChartError::Empty);
        }

        let path = self.path_for(chart.metric);
        draw(chart, &path)?;

        debug!("wrote {} bars to {}", chart.bars.len(), path.display());
        Ok(path)
    }
}

/// Draw `chart` into a PNG at `path`.
fn draw(chart: &BarChart, path: &Path) -> Result<(), ChartError> {
    let color = chart.color();
    let count = chart.bars.len();

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_error)?;

    let mut context = ChartBuilder::on(&root)
        .caption(&chart.title, (FONT_FAMILY, 28.0))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d((0..count).into_segmented(), 0f64..chart.y_max())
        .map_err(draw_error)?;

    let label_of = |value: &SegmentValue<usize>| match value {
        SegmentValue::CenterOf(index) => chart
            .bars
            .get(*index)
            .map(|bar| bar.label.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };

    context
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(count)
        .x_label_formatter(&label_of)
        .x_desc(chart.x_desc.as_str())
        .y_desc(chart.y_desc.as_str())
        .axis_desc_style((FONT_FAMILY, 18.0))
        .label_style((FONT_FAMILY, 14.0))
        .draw()
        .map_err(draw_error)?;

    context
        .draw_series(
            Histogram::vertical(&context)
                .margin(20)
                .style(color.filled())
                .data(chart.bars.iter().enumerate().map(|(i, bar)| (i, bar.value))),
        )
        .map_err(draw_error)?;

    let value_style = TextStyle::from((FONT_FAMILY, 16.0).into_font())
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    context
        .draw_series(chart.bars.iter().enumerate().map(|(i, bar)| {
            Text::new(
                format_value(bar.value),
                (SegmentValue::CenterOf(i), bar.value),
                value_style.clone(),
            )
        }))
        .map_err(draw_error)?;

    root.present().map_err(draw_error)
}
