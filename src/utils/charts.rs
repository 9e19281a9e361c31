//! SVG Chart Generator for Training History
//!
//! Renders the accuracy and loss curves of a training run as two side-by-side
//! panels in a single SVG file.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::training::TrainingHistory;
use crate::utils::error::{FlowerError, Result};

/// Chart styling constants
const PANEL_WIDTH: f64 = 480.0;
const CHART_HEIGHT: f64 = 520.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 70.0;
const MARGIN_LEFT: f64 = 70.0;
const GRID_LINES: usize = 5;

pub const COLOR_TRAINING: &str = "#3498db";
pub const COLOR_VALIDATION: &str = "#e67e22";
const COLOR_GRID: &str = "#ecf0f1";
const COLOR_AXIS: &str = "#2c3e50";
const COLOR_TEXT: &str = "#2c3e50";

/// A data point for a line chart
#[derive(Debug, Clone, Copy)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
}

/// A named data series
#[derive(Debug, Clone)]
pub struct DataSeries {
    pub name: String,
    pub points: Vec<DataPoint>,
    pub color: String,
}

impl DataSeries {
    /// Build a series from per-epoch values, using the epoch index as x
    pub fn from_epochs(name: &str, values: &[f64], color: &str) -> Self {
        Self {
            name: name.to_string(),
            points: values
                .iter()
                .enumerate()
                .map(|(epoch, &y)| DataPoint { x: epoch as f64, y })
                .collect(),
            color: color.to_string(),
        }
    }
}

/// Where the legend box is drawn inside a panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendPosition {
    LowerRight,
    UpperRight,
}

/// One panel of a multi-panel chart
#[derive(Debug, Clone)]
pub struct Panel {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<DataSeries>,
    pub legend: LegendPosition,
    /// Fixed y range; derived from the data when `None`
    pub y_range: Option<(f64, f64)>,
}

/// Write the accuracy/loss chart for a training history.
pub fn generate_history_chart(history: &TrainingHistory, output_path: &Path) -> Result<()> {
    if history.is_empty() {
        return Err(FlowerError::InvalidInput(
            "Cannot chart an empty training history".to_string(),
        ));
    }

    let panels = vec![
        Panel {
            title: "Training and Validation Accuracy".to_string(),
            x_label: "Epoch".to_string(),
            y_label: "Accuracy".to_string(),
            series: vec![
                DataSeries::from_epochs("Training Accuracy", &history.accuracy, COLOR_TRAINING),
                DataSeries::from_epochs(
                    "Validation Accuracy",
                    &history.val_accuracy,
                    COLOR_VALIDATION,
                ),
            ],
            legend: LegendPosition::LowerRight,
            y_range: Some((0.0, 1.0)),
        },
        Panel {
            title: "Training and Validation Loss".to_string(),
            x_label: "Epoch".to_string(),
            y_label: "Loss".to_string(),
            series: vec![
                DataSeries::from_epochs("Training Loss", &history.loss, COLOR_TRAINING),
                DataSeries::from_epochs("Validation Loss", &history.val_loss, COLOR_VALIDATION),
            ],
            legend: LegendPosition::UpperRight,
            y_range: None,
        },
    ];

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(output_path, render_panels(&panels))?;
    Ok(())
}

/// Render panels left to right into one SVG document
pub fn render_panels(panels: &[Panel]) -> String {
    let width = PANEL_WIDTH * panels.len().max(1) as f64;
    let mut svg = String::new();

    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}">"#,
        w = width,
        h = CHART_HEIGHT
    );
    let _ = write!(
        svg,
        r#"<rect width="{}" height="{}" fill="white"/>"#,
        width, CHART_HEIGHT
    );

    for (i, panel) in panels.iter().enumerate() {
        render_panel(&mut svg, panel, i as f64 * PANEL_WIDTH);
    }

    svg.push_str("</svg>");
    svg
}

fn render_panel(svg: &mut String, panel: &Panel, offset_x: f64) {
    let plot_width = PANEL_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let left = offset_x + MARGIN_LEFT;
    let bottom = MARGIN_TOP + plot_height;

    let (x_min, x_max, data_y_min, data_y_max) = find_ranges(&panel.series);
    let (y_min, y_max) = panel
        .y_range
        .unwrap_or_else(|| padded_range(data_y_min, data_y_max));
    // A single epoch collapses the x range
    let x_span = if x_max > x_min { x_max - x_min } else { 1.0 };
    let y_span = if y_max > y_min { y_max - y_min } else { 1.0 };

    let to_x = |x: f64| left + ((x - x_min) / x_span) * plot_width;
    let to_y = |y: f64| bottom - ((y - y_min) / y_span) * plot_height;

    let _ = write!(
        svg,
        r#"<text x="{}" y="35" text-anchor="middle" font-family="Arial, sans-serif" font-size="16" font-weight="bold" fill="{}">{}</text>"#,
        left + plot_width / 2.0,
        COLOR_TEXT,
        escape_xml(&panel.title)
    );

    for i in 0..=GRID_LINES {
        let frac = i as f64 / GRID_LINES as f64;
        let y = bottom - frac * plot_height;
        let value = y_min + frac * y_span;

        let _ = write!(
            svg,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="1"/>"#,
            left,
            y,
            left + plot_width,
            y,
            COLOR_GRID
        );
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="end" font-family="Arial, sans-serif" font-size="11" fill="{}">{:.2}</text>"#,
            left - 8.0,
            y + 4.0,
            COLOR_TEXT,
            value
        );
    }

    // Axes
    let _ = write!(
        svg,
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        left,
        bottom,
        left + plot_width,
        bottom,
        COLOR_AXIS
    );
    let _ = write!(
        svg,
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        left, MARGIN_TOP, left, bottom, COLOR_AXIS
    );

    let _ = write!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="13" fill="{}">{}</text>"#,
        left + plot_width / 2.0,
        CHART_HEIGHT - 20.0,
        COLOR_TEXT,
        escape_xml(&panel.x_label)
    );
    let label_x = offset_x + 18.0;
    let _ = write!(
        svg,
        r#"<text x="{lx}" y="{cy}" text-anchor="middle" font-family="Arial, sans-serif" font-size="13" fill="{}" transform="rotate(-90 {lx} {cy})">{}</text>"#,
        COLOR_TEXT,
        escape_xml(&panel.y_label),
        lx = label_x,
        cy = CHART_HEIGHT / 2.0
    );

    for series in &panel.series {
        if series.points.is_empty() {
            continue;
        }

        let mut path = String::new();
        for (i, point) in series.points.iter().enumerate() {
            let cmd = if i == 0 { "M" } else { " L" };
            let _ = write!(path, "{} {:.2} {:.2}", cmd, to_x(point.x), to_y(point.y));
        }
        let _ = write!(
            svg,
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="2.5"/>"#,
            path, series.color
        );

        for point in &series.points {
            let _ = write!(
                svg,
                r#"<circle cx="{:.2}" cy="{:.2}" r="3.5" fill="{}" stroke="white" stroke-width="1"/>"#,
                to_x(point.x),
                to_y(point.y),
                series.color
            );
        }
    }

    // X tick labels from the first non-empty series
    if let Some(series) = panel.series.iter().find(|s| !s.points.is_empty()) {
        for point in &series.points {
            let _ = write!(
                svg,
                r#"<text x="{:.2}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="11" fill="{}">{:.0}</text>"#,
                to_x(point.x),
                bottom + 18.0,
                COLOR_TEXT,
                point.x
            );
        }
    }

    let legend_x = left + plot_width - 150.0;
    let legend_height = 22.0 * panel.series.len() as f64;
    let mut legend_y = match panel.legend {
        LegendPosition::UpperRight => MARGIN_TOP + 10.0,
        LegendPosition::LowerRight => bottom - 10.0 - legend_height,
    };
    for series in &panel.series {
        let _ = write!(
            svg,
            r#"<rect x="{}" y="{}" width="14" height="14" fill="{}"/>"#,
            legend_x, legend_y, series.color
        );
        let _ = write!(
            svg,
            r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            legend_x + 20.0,
            legend_y + 11.0,
            COLOR_TEXT,
            escape_xml(&series.name)
        );
        legend_y += 22.0;
    }
}

fn find_ranges(series: &[DataSeries]) -> (f64, f64, f64, f64) {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for p in series.iter().flat_map(|s| s.points.iter()) {
        x_min = x_min.min(p.x);
        x_max = x_max.max(p.x);
        y_min = y_min.min(p.y);
        y_max = y_max.max(p.y);
    }

    if !x_min.is_finite() {
        return (0.0, 1.0, 0.0, 1.0);
    }
    (x_min, x_max, y_min, y_max)
}

/// Loss curves start at zero and get 10% headroom
fn padded_range(_min: f64, max: f64) -> (f64, f64) {
    let top = if max.is_finite() && max > 0.0 { max * 1.1 } else { 1.0 };
    (0.0, top)
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_history() -> TrainingHistory {
        let mut history = TrainingHistory::default();
        history.push(1.4, 0.42, 1.2, 0.48);
        history.push(1.0, 0.61, 1.05, 0.57);
        history.push(0.8, 0.70, 0.98, 0.62);
        history
    }

    #[test]
    fn test_history_chart_has_both_panels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("charts").join("history.svg");

        generate_history_chart(&sample_history(), &path).unwrap();

        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Training and Validation Accuracy"));
        assert!(svg.contains("Training and Validation Loss"));
        assert!(svg.contains("Validation Loss"));
        // One path per curve
        assert_eq!(svg.matches("<path ").count(), 4);
    }

    #[test]
    fn test_empty_history_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = generate_history_chart(&TrainingHistory::default(), &dir.path().join("x.svg"));
        assert!(matches!(result, Err(FlowerError::InvalidInput(_))));
    }

    #[test]
    fn test_single_epoch_renders_without_nan() {
        let mut history = TrainingHistory::default();
        history.push(0.9, 0.5, 1.0, 0.4);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.svg");

        generate_history_chart(&history, &path).unwrap();
        let svg = fs::read_to_string(&path).unwrap();
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b & c>"), "a&lt;b &amp; c&gt;");
    }
}
