//! PNG rendering of fields, profiles and streamline vectors.
//!
//! This module provides functions to render a gridded field as a colormapped
//! heatmap, an extracted profile as a line plot with an autoscaled value
//! axis, and a resampled velocity grid as a vector plot, all via the
//! plotters library.

use std::path::Path;

use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;
use thiserror::Error;

use crate::core::loaders::Dataset;
use crate::processors::colormap::ColorWindow;
use crate::processors::profile::{value_axis_bounds, Profile, AUTOSCALE_MARGIN};
use crate::processors::streamlines::StreamlineGrid;

/// Errors that can occur during rendering.
#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("plotting error: {0}")]
    PlottingError(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("nothing to plot")]
    EmptyPlot,
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, VisualizationError>;

/// Default plot width in pixels.
pub const DEFAULT_WIDTH: u32 = 1080;

/// Default plot height in pixels.
pub const DEFAULT_HEIGHT: u32 = 1080;

/// Maps a normalized value in `[0, 1]` onto the jet colormap.
///
/// Classic blue-cyan-yellow-red ramp, matching what PIV operators expect
/// from the desktop tools this pipeline replaces.
fn jet_color(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let r = (1.5 - (4.0 * t - 3.0).abs()).clamp(0.0, 1.0);
    let g = (1.5 - (4.0 * t - 2.0).abs()).clamp(0.0, 1.0);
    let b = (1.5 - (4.0 * t - 1.0).abs()).clamp(0.0, 1.0);
    RGBColor((r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8)
}

fn plot_err<E: std::fmt::Display>(e: E) -> VisualizationError {
    VisualizationError::PlottingError(e.to_string())
}

/// Midpoint cell edges for one coordinate vector.
///
/// Cell `i` spans from the midpoint with its left neighbor to the midpoint
/// with its right neighbor; the outer edges extend half a step outwards.
fn cell_edges(coords: &[f64]) -> Vec<(f64, f64)> {
    let n = coords.len();
    (0..n)
        .map(|i| {
            let lo = if i == 0 {
                coords[0] - (coords[1.min(n - 1)] - coords[0]) / 2.0
            } else {
                (coords[i - 1] + coords[i]) / 2.0
            };
            let hi = if i == n - 1 {
                coords[n - 1] + (coords[n - 1] - coords[n.saturating_sub(2)]) / 2.0
            } else {
                (coords[i] + coords[i + 1]) / 2.0
            };
            (lo, hi)
        })
        .collect()
}

/// Renders a field as a colormapped heatmap PNG.
///
/// Every grid cell is filled with the jet color of its value normalized into
/// the color window; values outside the window saturate at the extremes.
pub fn render_field_png(
    output_path: &Path,
    dataset: &Dataset,
    key: &str,
    window: &ColorWindow,
    size: (u32, u32),
) -> Result<()> {
    let store = dataset.store();
    let field = store
        .get(key)
        .ok_or_else(|| VisualizationError::UnknownField(key.to_string()))?;
    if field.rows() == 0 || field.cols() == 0 {
        return Err(VisualizationError::EmptyPlot);
    }

    let x = store.x_coord().row(0);
    let y = store.y_coord().column(0);
    let x_edges = cell_edges(x);
    let y_edges = cell_edges(&y);

    let (low, high) = window.bounds();
    let span = high - low;

    let x_range = x_edges[0].0..x_edges[x_edges.len() - 1].1;
    let y_range = y_edges[0].0..y_edges[y_edges.len() - 1].1;

    let root = BitMapBackend::new(output_path, size).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .build_cartesian_2d(x_range, y_range)
        .map_err(plot_err)?;

    chart
        .draw_series((0..field.rows()).flat_map(|r| {
            let x_edges = &x_edges;
            let y_edge = y_edges[r];
            (0..field.cols()).map(move |c| {
                let t = if span > 0.0 {
                    (field.get(r, c) - low) / span
                } else {
                    0.5
                };
                Rectangle::new(
                    [(x_edges[c].0, y_edge.0), (x_edges[c].1, y_edge.1)],
                    jet_color(t).filled(),
                )
            })
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Renders extracted profiles as a line plot PNG.
///
/// The coordinate axis spans all profiles with 5% padding; the value axis
/// comes from the autoscale of the values visible in that span.
pub fn render_profile_png(
    output_path: &Path,
    profiles: &[Profile],
    size: (u32, u32),
) -> Result<()> {
    let mut c_min = f64::INFINITY;
    let mut c_max = f64::NEG_INFINITY;
    for profile in profiles {
        for &c in &profile.coords {
            c_min = c_min.min(c);
            c_max = c_max.max(c);
        }
    }
    if !c_min.is_finite() || !c_max.is_finite() {
        return Err(VisualizationError::EmptyPlot);
    }

    let padding = (c_max - c_min).abs().max(f64::EPSILON) * 0.05;
    let view = (c_min - padding, c_max + padding);
    let (v_min, v_max) = value_axis_bounds(profiles, view, AUTOSCALE_MARGIN)
        .ok_or(VisualizationError::EmptyPlot)?;

    let root = BitMapBackend::new(output_path, size).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(view.0..view.1, v_min..v_max)
        .map_err(plot_err)?;

    chart.configure_mesh().draw().map_err(plot_err)?;

    for profile in profiles {
        let series: Vec<(f64, f64)> = profile
            .coords
            .iter()
            .zip(&profile.values)
            .map(|(&c, &v)| (c, v))
            .collect();

        chart
            .draw_series(LineSeries::new(series.iter().copied(), &RED))
            .map_err(plot_err)?;
        chart
            .draw_series(
                series
                    .iter()
                    .map(|&(c, v)| Circle::new((c, v), 3, RED.filled())),
            )
            .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Renders a resampled velocity grid as a vector plot PNG.
///
/// One line segment per node, scaled so the fastest vector spans roughly one
/// cell of the uniform grid. Streamline curve integration stays with the
/// consumer; the vector plot is the direct rendering of the resampled data.
pub fn render_streamlines_png(
    output_path: &Path,
    grid: &StreamlineGrid,
    size: (u32, u32),
) -> Result<()> {
    if grid.xi.is_empty() || grid.yi.is_empty() {
        return Err(VisualizationError::EmptyPlot);
    }

    let speed_peak = grid
        .u
        .iter()
        .flatten()
        .zip(grid.v.iter().flatten())
        .map(|(&u, &v)| (u * u + v * v).sqrt())
        .fold(0.0_f64, f64::max);

    let x_min = grid.xi[0];
    let x_max = grid.xi[grid.xi.len() - 1];
    let y_min = grid.yi[0];
    let y_max = grid.yi[grid.yi.len() - 1];

    let cell = ((x_max - x_min) / grid.xi.len() as f64)
        .hypot((y_max - y_min) / grid.yi.len() as f64);
    let scale = if speed_peak > 0.0 { cell / speed_peak } else { 0.0 };

    let x_pad = (x_max - x_min).abs().max(f64::EPSILON) * 0.05;
    let y_pad = (y_max - y_min).abs().max(f64::EPSILON) * 0.05;

    let root = BitMapBackend::new(output_path, size).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .build_cartesian_2d(
            (x_min - x_pad)..(x_max + x_pad),
            (y_min - y_pad)..(y_max + y_pad),
        )
        .map_err(plot_err)?;

    chart
        .draw_series(grid.yi.iter().enumerate().flat_map(|(j, &yc)| {
            let u_row = &grid.u[j];
            let v_row = &grid.v[j];
            grid.xi.iter().enumerate().map(move |(i, &xc)| {
                let tip = (xc + u_row[i] * scale, yc + v_row[i] * scale);
                PathElement::new(vec![(xc, yc), tip], BLACK.stroke_width(1))
            })
        }))
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}
