#![cfg(feature = "web")]
use crate::error::{Error, Result};
use crate::inventory::DailyAggregate;
use chrono::{NaiveDate, TimeDelta};
use plotters::prelude::*;

/// Configuration options for chart generation
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            title: "Estoque".to_string(),
            x_label: "Data".to_string(),
            y_label: "Quantidade".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// Creates a line chart of a daily stock series
///
/// Dates are plotted as day offsets from the first point and labelled back as
/// `dd/mm`.
///
/// # Returns
/// * PNG image data
///
/// # Errors
/// * `Error::Export` for an empty series or a drawing failure
///
/// # Implementation Notes
/// * Draws into a temporary PNG file before reading it back
pub fn create_line_graph(series: &[DailyAggregate], options: &GraphOptions) -> Result<Vec<u8>> {
    let first = series
        .first()
        .ok_or_else(|| Error::Export("no data points to plot".to_string()))?;
    let origin = first.date;

    let points: Vec<(f64, f64)> = series
        .iter()
        .map(|p| ((p.date - origin).num_days() as f64, p.total_quantity))
        .collect();

    let max_x = points.iter().map(|(x, _)| *x).fold(0.0, f64::max);
    let min_y = points.iter().map(|(_, y)| *y).fold(f64::INFINITY, f64::min);
    let max_y = points.iter().map(|(_, y)| *y).fold(f64::NEG_INFINITY, f64::max);

    let x_range = 0.0..max_x + 1.0;
    let y_range = min_y.min(0.0)..max_y + 1.0;

    let file = tempfile::Builder::new()
        .prefix("wms-chart")
        .suffix(".png")
        .tempfile()
        .map_err(|e| Error::Export(e.to_string()))?;

    draw(file.path(), &points, origin, x_range, y_range, options)
        .map_err(|e| Error::Export(e.to_string()))?;

    std::fs::read(file.path()).map_err(|e| Error::Export(e.to_string()))
}

fn draw(
    path: &std::path::Path,
    points: &[(f64, f64)],
    origin: NaiveDate,
    x_range: std::ops::Range<f64>,
    y_range: std::ops::Range<f64>,
    options: &GraphOptions,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&options.title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, y_range)?;

    let label_date = |x: &f64| {
        TimeDelta::try_days(x.round() as i64)
            .and_then(|d| origin.checked_add_signed(d))
            .map(|d| d.format("%d/%m").to_string())
            .unwrap_or_default()
    };

    chart
        .configure_mesh()
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .x_label_formatter(&label_date)
        .draw()?;

    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, BLUE.filled())),
    )?;

    root.present()?;
    Ok(())
}
