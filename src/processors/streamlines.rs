//! Velocity-field resampling for streamline rendering.
//!
//! Streamline tracing wants the two velocity components on a uniform grid.
//! The measurement grid is rectilinear but not necessarily uniform, so both
//! components are refit with tensor-product natural cubic splines and
//! evaluated on evenly spaced target vectors. The target resolution swaps
//! the axis cardinalities: each axis is sampled as densely as the *other*
//! axis's original sample count, which squares the grid without inventing
//! resolution along either direction. The curve integration itself is the
//! renderer's job.

use rayon::prelude::*;
use thiserror::Error;

use crate::core::loaders::{Dataset, Field};

/// Minimum samples per axis for cubic spline fitting.
pub const MIN_SPLINE_POINTS: usize = 4;

/// Errors that can occur while resampling velocity fields.
#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error("axis '{axis}' has {len} samples, spline fitting needs at least {min}", min = MIN_SPLINE_POINTS)]
    TooFewPoints { axis: &'static str, len: usize },

    #[error("'{0}' contains non-finite samples")]
    NonFinite(&'static str),

    #[error("axis '{0}' coordinates must be strictly increasing")]
    NotMonotonic(&'static str),

    #[error("dataset has {0} fields, velocity components expected at positions 2 and 3")]
    MissingComponents(usize),
}

/// Result type for resampling operations.
pub type Result<T> = std::result::Result<T, InterpolationError>;

/// Velocity components resampled onto a uniform grid.
///
/// `u` and `v` have shape `(yi.len(), xi.len())`; element `[j][i]` is the
/// component at `(xi[i], yi[j])`.
#[derive(Debug, Clone)]
pub struct StreamlineGrid {
    pub xi: Vec<f64>,
    pub yi: Vec<f64>,
    pub u: Vec<Vec<f64>>,
    pub v: Vec<Vec<f64>>,
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

fn check_axis(axis: &'static str, coords: &[f64]) -> Result<()> {
    if coords.len() < MIN_SPLINE_POINTS {
        return Err(InterpolationError::TooFewPoints {
            axis,
            len: coords.len(),
        });
    }
    if coords.iter().any(|v| !v.is_finite()) {
        return Err(InterpolationError::NonFinite(axis));
    }
    if coords.windows(2).any(|w| w[1] <= w[0]) {
        return Err(InterpolationError::NotMonotonic(axis));
    }
    Ok(())
}

/// Second derivatives of a natural cubic spline through `(xs, ys)`.
fn spline_second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut y2 = vec![0.0; n];
    let mut u = vec![0.0; n - 1];

    for i in 1..n - 1 {
        let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
        let p = sig * y2[i - 1] + 2.0;
        y2[i] = (sig - 1.0) / p;
        let slope_diff = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
            - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
        u[i] = (6.0 * slope_diff / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
    }
    for i in (0..n - 1).rev() {
        y2[i] = y2[i] * y2[i + 1] + u[i];
    }
    y2
}

/// Evaluates the spline at `x` by bisecting for the bracketing interval.
fn spline_eval(xs: &[f64], ys: &[f64], y2: &[f64], x: f64) -> f64 {
    let mut klo = 0;
    let mut khi = xs.len() - 1;
    while khi - klo > 1 {
        let k = (khi + klo) / 2;
        if xs[k] > x {
            khi = k;
        } else {
            klo = k;
        }
    }

    let h = xs[khi] - xs[klo];
    let a = (xs[khi] - x) / h;
    let b = (x - xs[klo]) / h;
    a * ys[klo]
        + b * ys[khi]
        + ((a * a * a - a) * y2[klo] + (b * b * b - b) * y2[khi]) * h * h / 6.0
}

/// Resamples one 1D sequence onto `queries`.
fn resample_1d(xs: &[f64], ys: &[f64], queries: &[f64]) -> Vec<f64> {
    let y2 = spline_second_derivatives(xs, ys);
    queries
        .iter()
        .map(|&q| spline_eval(xs, ys, &y2, q))
        .collect()
}

/// Resamples a `(rows, grid)` field onto the `(xi, yi)` target grid.
///
/// Two separable passes: first along x within each source row, then along y
/// within each target column. Rows and columns are independent, so both
/// passes run in parallel.
fn resample_grid(x0: &[f64], y0: &[f64], field: &Field, xi: &[f64], yi: &[f64]) -> Vec<Vec<f64>> {
    let intermediate: Vec<Vec<f64>> = (0..field.rows())
        .into_par_iter()
        .map(|r| resample_1d(x0, field.row(r), xi))
        .collect();

    let columns: Vec<Vec<f64>> = (0..xi.len())
        .into_par_iter()
        .map(|i| {
            let column: Vec<f64> = intermediate.iter().map(|row| row[i]).collect();
            resample_1d(y0, &column, yi)
        })
        .collect();

    (0..yi.len())
        .map(|j| (0..xi.len()).map(|i| columns[i][j]).collect())
        .collect()
}

/// Resamples the velocity components `u`, `v` onto a uniform grid.
///
/// `x0` (length `grid`) and `y0` (length `rows`) are the coordinate vectors
/// of the measurement grid. The targets are
/// `xi = linspace(min x0, max x0, y0.len())` and
/// `yi = linspace(min y0, max y0, x0.len())`.
///
/// # Errors
///
/// Fails when either axis has fewer than [`MIN_SPLINE_POINTS`] samples, is
/// not strictly increasing, or when any coordinate or sample is non-finite.
pub fn resample_velocity(x0: &[f64], y0: &[f64], u: &Field, v: &Field) -> Result<StreamlineGrid> {
    check_axis("x", x0)?;
    check_axis("y", y0)?;
    if !u.is_finite() {
        return Err(InterpolationError::NonFinite("u"));
    }
    if !v.is_finite() {
        return Err(InterpolationError::NonFinite("v"));
    }

    let xi = linspace(x0[0], x0[x0.len() - 1], y0.len());
    let yi = linspace(y0[0], y0[y0.len() - 1], x0.len());

    let u_grid = resample_grid(x0, y0, u, &xi, &yi);
    let v_grid = resample_grid(x0, y0, v, &xi, &yi);

    Ok(StreamlineGrid {
        xi,
        yi,
        u: u_grid,
        v: v_grid,
    })
}

/// Pulls the velocity components out of a dataset.
///
/// By convention the two components are the first data fields, i.e. store
/// positions 2 and 3 right after the coordinate fields.
pub fn dataset_velocity(dataset: &Dataset) -> Result<(&Field, &Field)> {
    let store = dataset.store();
    match (store.by_position(2), store.by_position(3)) {
        (Some(u), Some(v)) => Ok((u, v)),
        _ => Err(InterpolationError::MissingComponents(store.len())),
    }
}

/// Computes the streamline grid for a dataset's velocity components.
pub fn compute_streamlines(dataset: &Dataset) -> Result<StreamlineGrid> {
    let (u, v) = dataset_velocity(dataset)?;
    let x0 = dataset.store().x_coord().row(0).to_vec();
    let y0 = dataset.store().y_coord().column(0);
    resample_velocity(&x0, &y0, u, v)
}

/// Cached streamline result with a visibility flag.
///
/// The grid is computed on the first toggle and reused afterwards; toggling
/// visibility never recomputes. A failed computation keeps any previously
/// cached grid. Call [`invalidate`](StreamlineState::invalidate) when the
/// active dataset or field changes.
#[derive(Debug, Default)]
pub struct StreamlineState {
    cache: Option<StreamlineGrid>,
    visible: bool,
}

impl StreamlineState {
    /// Creates an empty, hidden state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips visibility, computing the grid on first use.
    pub fn toggle(&mut self, dataset: &Dataset) -> Result<&StreamlineGrid> {
        let grid = match self.cache.take() {
            Some(grid) => grid,
            None => compute_streamlines(dataset)?,
        };
        self.visible = !self.visible;
        Ok(self.cache.insert(grid))
    }

    /// The cached grid, if computed.
    pub fn grid(&self) -> Option<&StreamlineGrid> {
        self.cache.as_ref()
    }

    /// Current visibility.
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Drops the cached grid (dataset or field changed).
    pub fn invalidate(&mut self) {
        self.cache = None;
        self.visible = false;
    }
}
