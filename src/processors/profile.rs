//! Profile extraction: 1D slices of a 2D field along a row or column.

use thiserror::Error;

use crate::core::loaders::Dataset;

/// Default margin fraction applied on both sides of the value axis.
pub const AUTOSCALE_MARGIN: f64 = 0.2;

/// Errors that can occur while extracting a profile.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("no field selected")]
    NoFieldSelected,

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("slice index {index} out of range, {orientation} profiles accept 0..{limit}")]
    IndexOutOfRange {
        index: usize,
        limit: usize,
        orientation: &'static str,
    },
}

/// Result type for profile operations.
pub type Result<T> = std::result::Result<T, ProfileError>;

/// Slicing direction through the measurement grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Cut along a scan line: coordinates are the x axis, index picks a row.
    Horizontal,
    /// Cut across scan lines: coordinates are the y axis, index picks a column.
    Vertical,
}

impl Orientation {
    /// Short label used in exported file names.
    pub fn file_label(self) -> &'static str {
        match self {
            Orientation::Horizontal => "Hor",
            Orientation::Vertical => "Vert",
        }
    }

    /// Header of the coordinate column in exported tables.
    pub fn coord_header(self) -> &'static str {
        match self {
            Orientation::Horizontal => "x[mm]",
            Orientation::Vertical => "y[mm]",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        }
    }
}

/// One extracted slice: paired coordinate and value sequences.
///
/// Profiles are ephemeral, recomputed on every query and exported on demand.
#[derive(Debug, Clone)]
pub struct Profile {
    /// Field the slice was cut from.
    pub key: String,
    /// Direction of the cut.
    pub orientation: Orientation,
    /// Coordinates along the cut, same length as `values`.
    pub coords: Vec<f64>,
    /// Field values along the cut.
    pub values: Vec<f64>,
    /// Physical coordinate of the cut on the orthogonal axis.
    pub cursor: f64,
}

impl Profile {
    /// Number of samples in the slice.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for a zero-length slice.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// File name for exporting this profile:
    /// `{dataset}_{key}_{Hor|Vert}_profile.txt`, with the key truncated at
    /// the first `[` (unit suffix), `/` replaced by `_` and all whitespace
    /// stripped.
    pub fn file_name(&self, dataset_name: &str) -> String {
        let key = match self.key.find('[') {
            Some(pos) => &self.key[..pos],
            None => self.key.as_str(),
        };
        let key = key.replace('/', "_");

        format!(
            "{}_{}_{}_profile.txt",
            dataset_name,
            key,
            self.orientation.file_label()
        )
        .split_whitespace()
        .collect()
    }

    /// Coordinate and value columns in export order.
    pub fn columns(&self) -> Vec<(String, Vec<f64>)> {
        vec![
            (
                self.orientation.coord_header().to_string(),
                self.coords.clone(),
            ),
            (self.key.clone(), self.values.clone()),
        ]
    }
}

/// Stateful slicer bound to one field of the active dataset.
///
/// Holds the selected field key and the slicing orientation. Changing the
/// orientation marks any previously extracted slice stale so consumers
/// redraw from a fresh [`extract`](ProfileExtractor::extract) instead of
/// reusing a line cut along the other axis.
#[derive(Debug, Default)]
pub struct ProfileExtractor {
    key: Option<String>,
    orientation: Option<Orientation>,
    stale: bool,
}

impl ProfileExtractor {
    /// Creates an extractor with no field bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the field to slice. Nothing is computed until an index is given.
    pub fn select_field(&mut self, key: impl Into<String>) {
        self.key = Some(key.into());
    }

    /// Sets the slicing direction, invalidating any previous slice when the
    /// direction actually changes.
    pub fn set_orientation(&mut self, orientation: Orientation) {
        if self.orientation != Some(orientation) {
            self.orientation = Some(orientation);
            self.stale = true;
        }
    }

    /// True when the last extracted slice no longer matches the orientation.
    pub fn needs_redraw(&self) -> bool {
        self.stale
    }

    /// Currently selected field key.
    pub fn selected_field(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Cuts a 1D slice at `index` through the bound field.
    ///
    /// Horizontal slices pair the x-coordinate scan line with `field[index][..]`
    /// and accept `index < rows`; vertical slices pair the y-coordinate column
    /// with `field[..][index]` and accept `index < grid`. The returned
    /// sequences always have equal length.
    ///
    /// # Errors
    ///
    /// Fails when no field is selected, the key is unknown, or `index` is out
    /// of range; no extractor state changes in any error case.
    pub fn extract(&mut self, dataset: &Dataset, index: usize) -> Result<Profile> {
        let key = self.key.as_ref().ok_or(ProfileError::NoFieldSelected)?;
        let orientation = self.orientation.unwrap_or(Orientation::Horizontal);
        let store = dataset.store();
        let field = store
            .get(key)
            .ok_or_else(|| ProfileError::UnknownField(key.clone()))?;

        let profile = match orientation {
            Orientation::Horizontal => {
                let limit = field.rows();
                if index >= limit {
                    return Err(ProfileError::IndexOutOfRange {
                        index,
                        limit,
                        orientation: orientation.name(),
                    });
                }
                Profile {
                    key: key.clone(),
                    orientation,
                    coords: store.x_coord().row(0).to_vec(),
                    values: field.row(index).to_vec(),
                    cursor: store.y_coord().get(index, 0),
                }
            }
            Orientation::Vertical => {
                let limit = field.cols();
                if index >= limit {
                    return Err(ProfileError::IndexOutOfRange {
                        index,
                        limit,
                        orientation: orientation.name(),
                    });
                }
                Profile {
                    key: key.clone(),
                    orientation,
                    coords: store.y_coord().column(0),
                    values: field.column(index),
                    cursor: store.x_coord().get(0, index),
                }
            }
        };

        self.stale = false;
        Ok(profile)
    }
}

/// Value-axis bounds for the profiles visible in a coordinate window.
///
/// Restricts every profile to points whose coordinate lies strictly inside
/// `view`, takes the min/max of the visible values and expands both sides by
/// `margin` times the visible span. Returns `None` when no point is visible.
pub fn value_axis_bounds(
    profiles: &[Profile],
    view: (f64, f64),
    margin: f64,
) -> Option<(f64, f64)> {
    let (lo, hi) = view;
    let mut bottom = f64::INFINITY;
    let mut top = f64::NEG_INFINITY;

    for profile in profiles {
        let visible = profile
            .coords
            .iter()
            .zip(&profile.values)
            .filter(|(&c, _)| c > lo && c < hi)
            .map(|(_, &v)| v);

        let (min, max) = match visible.fold(None, |acc: Option<(f64, f64)>, v| {
            Some(match acc {
                Some((min, max)) => (min.min(v), max.max(v)),
                None => (v, v),
            })
        }) {
            Some(bounds) => bounds,
            None => continue,
        };

        let span = max - min;
        bottom = bottom.min(min - margin * span);
        top = top.max(max + margin * span);
    }

    (bottom.is_finite() && top.is_finite()).then_some((bottom, top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loaders::reshape_table;

    /// 3x4 dataset (rows x grid) with Vx = 10*r + c and Vy = -Vx.
    fn test_dataset() -> Dataset {
        let grid = 4;
        let rows = 3;
        let mut x = Vec::new();
        let mut y = Vec::new();
        let mut vx = Vec::new();
        let mut vy = Vec::new();
        for r in 0..rows {
            for c in 0..grid {
                x.push(c as f64 * 0.5);
                y.push(r as f64 * 2.0);
                vx.push((10 * r + c) as f64);
                vy.push(-((10 * r + c) as f64));
            }
        }
        let names = vec![
            "x[mm]".to_string(),
            "y[mm]".to_string(),
            "Vx[m/s]".to_string(),
            "Vy[m/s]".to_string(),
        ];
        let store = reshape_table(names, &[x, y, vx, vy], grid).unwrap();
        Dataset::from_parts("test_run".to_string(), store, grid, rows)
    }

    #[test]
    fn test_horizontal_slice_round_trip() {
        let dataset = test_dataset();
        let mut extractor = ProfileExtractor::new();
        extractor.select_field("Vx[m/s]");
        extractor.set_orientation(Orientation::Horizontal);

        for index in 0..dataset.rows() {
            let profile = extractor.extract(&dataset, index).unwrap();
            let expected = dataset.store().get("Vx[m/s]").unwrap().row(index);
            assert_eq!(profile.values, expected);
            assert_eq!(profile.coords.len(), profile.values.len());
            assert_eq!(profile.cursor, index as f64 * 2.0);
        }
    }

    #[test]
    fn test_vertical_slice_round_trip() {
        let dataset = test_dataset();
        let mut extractor = ProfileExtractor::new();
        extractor.select_field("Vx[m/s]");
        extractor.set_orientation(Orientation::Vertical);

        for index in 0..dataset.grid() {
            let profile = extractor.extract(&dataset, index).unwrap();
            let expected = dataset.store().get("Vx[m/s]").unwrap().column(index);
            assert_eq!(profile.values, expected);
            assert_eq!(profile.coords.len(), profile.values.len());
            assert_eq!(profile.cursor, index as f64 * 0.5);
        }
    }

    #[test]
    fn test_index_out_of_range() {
        let dataset = test_dataset();
        let mut extractor = ProfileExtractor::new();
        extractor.select_field("Vx[m/s]");
        extractor.set_orientation(Orientation::Horizontal);

        let result = extractor.extract(&dataset, dataset.rows());
        assert!(matches!(
            result,
            Err(ProfileError::IndexOutOfRange { index: 3, limit: 3, .. })
        ));
    }

    #[test]
    fn test_unknown_field() {
        let dataset = test_dataset();
        let mut extractor = ProfileExtractor::new();
        extractor.select_field("pressure");

        assert!(matches!(
            extractor.extract(&dataset, 0),
            Err(ProfileError::UnknownField(_))
        ));
    }

    #[test]
    fn test_no_field_selected() {
        let dataset = test_dataset();
        let mut extractor = ProfileExtractor::new();

        assert!(matches!(
            extractor.extract(&dataset, 0),
            Err(ProfileError::NoFieldSelected)
        ));
    }

    #[test]
    fn test_orientation_change_marks_stale() {
        let dataset = test_dataset();
        let mut extractor = ProfileExtractor::new();
        extractor.select_field("Vx[m/s]");
        extractor.set_orientation(Orientation::Horizontal);
        extractor.extract(&dataset, 0).unwrap();
        assert!(!extractor.needs_redraw());

        extractor.set_orientation(Orientation::Vertical);
        assert!(extractor.needs_redraw());

        // Same orientation again is not a change.
        extractor.extract(&dataset, 0).unwrap();
        extractor.set_orientation(Orientation::Vertical);
        assert!(!extractor.needs_redraw());
    }

    #[test]
    fn test_file_name_derivation() {
        let dataset = test_dataset();
        let mut extractor = ProfileExtractor::new();
        extractor.select_field("Vx[m/s]");
        extractor.set_orientation(Orientation::Horizontal);
        let profile = extractor.extract(&dataset, 1).unwrap();

        assert_eq!(
            profile.file_name(dataset.name()),
            "test_run_Vx_Hor_profile.txt"
        );
    }

    #[test]
    fn test_file_name_strips_whitespace_and_slashes() {
        let profile = Profile {
            key: "d Vx/d y".to_string(),
            orientation: Orientation::Vertical,
            coords: vec![],
            values: vec![],
            cursor: 0.0,
        };

        assert_eq!(profile.file_name("run 3"), "run3_dVx_dy_Vert_profile.txt");
    }

    #[test]
    fn test_export_columns_use_orientation_header() {
        let dataset = test_dataset();
        let mut extractor = ProfileExtractor::new();
        extractor.select_field("Vy[m/s]");
        extractor.set_orientation(Orientation::Vertical);
        let profile = extractor.extract(&dataset, 0).unwrap();

        let columns = profile.columns();
        assert_eq!(columns[0].0, "y[mm]");
        assert_eq!(columns[1].0, "Vy[m/s]");
        assert_eq!(columns[0].1.len(), columns[1].1.len());
    }

    #[test]
    fn test_value_axis_bounds_margin() {
        let profile = Profile {
            key: "Vx".to_string(),
            orientation: Orientation::Horizontal,
            coords: vec![0.0, 1.0, 2.0, 3.0],
            values: vec![10.0, 0.0, 20.0, 1000.0],
            cursor: 0.0,
        };

        // The window hides the 1000.0 sample at coord 3.0.
        let (bottom, top) =
            value_axis_bounds(&[profile], (-0.5, 2.5), AUTOSCALE_MARGIN).unwrap();

        assert!((bottom - (0.0 - 0.2 * 20.0)).abs() < 1e-12);
        assert!((top - (20.0 + 0.2 * 20.0)).abs() < 1e-12);
    }

    #[test]
    fn test_value_axis_bounds_empty_window() {
        let profile = Profile {
            key: "Vx".to_string(),
            orientation: Orientation::Horizontal,
            coords: vec![0.0, 1.0],
            values: vec![1.0, 2.0],
            cursor: 0.0,
        };

        assert!(value_axis_bounds(&[profile], (5.0, 6.0), AUTOSCALE_MARGIN).is_none());
    }
}
