//! Loading and reconstruction of PIV sample tables.
//!
//! A PIV export is a flat delimited table whose rows scan a rectangular
//! measurement grid in row-major order. The first two columns are the spatial
//! coordinates, every later column is a scalar or vector-component field.
//! This module parses the table (auto-detecting the delimiter), infers the
//! grid width from the first coordinate column and reshapes every column
//! into a 2D field.

use std::fs;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use log::{debug, info};
use thiserror::Error;

/// Errors that can occur while loading a dataset.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("empty table: {0}")]
    EmptyTable(PathBuf),

    #[error("cannot parse '{value}' in column '{column}' as a number")]
    Parse { column: String, value: String },

    #[error("table shape error: {0}")]
    DataShape(String),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// A 2D scalar field of shape `(rows, grid)`, one row per scan line.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    values: Vec<Vec<f64>>,
}

impl Field {
    /// Builds a field by splitting a flat column into rows of `grid` values.
    ///
    /// The flat data must tile evenly, callers check divisibility first.
    fn from_flat(flat: &[f64], grid: usize) -> Self {
        let values = flat.chunks(grid).map(|chunk| chunk.to_vec()).collect();
        Self { values }
    }

    /// Number of scan lines.
    #[inline]
    pub fn rows(&self) -> usize {
        self.values.len()
    }

    /// Number of samples per scan line (the grid size).
    #[inline]
    pub fn cols(&self) -> usize {
        self.values.first().map_or(0, |row| row.len())
    }

    /// Borrow one scan line.
    #[inline]
    pub fn row(&self, r: usize) -> &[f64] {
        &self.values[r]
    }

    /// Collect one column across all scan lines.
    pub fn column(&self, c: usize) -> Vec<f64> {
        self.values.iter().map(|row| row[c]).collect()
    }

    /// Value at `(row, col)`.
    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.values[r][c]
    }

    /// Iterate over every sample in row-major order.
    pub fn iter_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().flat_map(|row| row.iter().copied())
    }

    /// Largest absolute sample value, 0.0 for an empty field.
    pub fn peak_magnitude(&self) -> f64 {
        self.iter_values().fold(0.0, |acc: f64, v| acc.max(v.abs()))
    }

    /// True if every sample is finite.
    pub fn is_finite(&self) -> bool {
        self.iter_values().all(|v| v.is_finite())
    }
}

/// Ordered collection of named 2D fields reconstructed from one table.
///
/// Field order matches the source column order. The first two entries are
/// positionally the horizontal and vertical coordinate fields; they are
/// addressed through [`FieldStore::x_coord`] and [`FieldStore::y_coord`]
/// rather than by name, since PIV exports label them inconsistently.
#[derive(Debug, Clone)]
pub struct FieldStore {
    names: Vec<String>,
    fields: Vec<Field>,
}

impl FieldStore {
    /// All column names in source order, coordinates first.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Names of the data fields (everything after the two coordinate columns).
    pub fn data_names(&self) -> &[String] {
        &self.names[2..]
    }

    /// Look up a field by column name.
    pub fn get(&self, key: &str) -> Option<&Field> {
        self.names
            .iter()
            .position(|n| n == key)
            .map(|i| &self.fields[i])
    }

    /// Field at a source column position.
    pub fn by_position(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// The horizontal coordinate field (first column).
    #[inline]
    pub fn x_coord(&self) -> &Field {
        &self.fields[0]
    }

    /// The vertical coordinate field (second column).
    #[inline]
    pub fn y_coord(&self) -> &Field {
        &self.fields[1]
    }

    /// Number of fields, coordinates included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the store holds no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A fully reconstructed dataset: the field store plus its display name.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    store: FieldStore,
    grid: usize,
    rows: usize,
}

impl Dataset {
    /// Load a dataset from a delimited text file.
    ///
    /// Detects the delimiter, parses every cell as `f64`, infers the grid
    /// width from the first column and reshapes all columns into 2D fields.
    /// The display name is the file stem of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a cell fails to parse,
    /// the table is empty or its length does not tile the inferred grid.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let (names, columns) = parse_table(&text)?;

        if columns.first().map_or(true, |c| c.is_empty()) {
            return Err(LoaderError::EmptyTable(path.to_path_buf()));
        }

        let grid = infer_grid(&columns[0])?;
        let store = reshape_table(names, &columns, grid)?;
        let rows = columns[0].len() / grid;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        info!(
            "loaded '{}': {} fields on a {}x{} grid",
            name,
            store.len(),
            rows,
            grid
        );

        Ok(Self {
            name,
            store,
            grid,
            rows,
        })
    }

    /// Assembles a dataset from an already reshaped store.
    ///
    /// Used when the table comes from somewhere other than a file, e.g.
    /// synthetic grids in tests or embedding hosts with their own parsers.
    pub fn from_parts(name: String, store: FieldStore, grid: usize, rows: usize) -> Self {
        Self {
            name,
            store,
            grid,
            rows,
        }
    }

    /// Display name derived from the source file stem.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The reconstructed fields.
    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    /// Samples per scan line.
    pub fn grid(&self) -> usize {
        self.grid
    }

    /// Number of scan lines.
    pub fn rows(&self) -> usize {
        self.rows
    }
}

/// Process-wide handle to the currently loaded dataset.
///
/// A load either fully succeeds and replaces the previous dataset, or fails
/// and leaves it untouched. Readers never observe a half-built store.
#[derive(Debug, Default)]
pub struct ActiveDataset {
    current: Option<Dataset>,
}

impl ActiveDataset {
    /// Creates an empty handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `path` and swaps it in, all-or-nothing.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<&Dataset> {
        let dataset = Dataset::load(path)?;
        Ok(self.current.insert(dataset))
    }

    /// The current dataset, if any load has succeeded.
    pub fn get(&self) -> Option<&Dataset> {
        self.current.as_ref()
    }
}

/// Infers the grid width from the first coordinate column.
///
/// The grid width is the smallest index `i > 0` at which the column returns
/// to its initial value. A column that never repeats is a single scan line,
/// so the whole length is returned. The repeat check uses exact float
/// equality: exports write each scan line's coordinates bit-identically, a
/// tolerance here would mask genuinely broken tables.
pub fn infer_grid(values: &[f64]) -> Result<usize> {
    let first = *values.first().ok_or_else(|| {
        LoaderError::DataShape("cannot infer grid size from an empty table".to_string())
    })?;

    for (idx, &val) in values.iter().enumerate().skip(1) {
        if val == first {
            return Ok(idx);
        }
    }
    Ok(values.len())
}

/// Reshapes flat columns into 2D fields of shape `(len / grid, grid)`.
///
/// Element `[r][c]` of every field is the flat row `r * grid + c`. Column
/// order is preserved so the coordinate fields stay in front.
pub fn reshape_table(names: Vec<String>, columns: &[Vec<f64>], grid: usize) -> Result<FieldStore> {
    let len = columns.first().map_or(0, |c| c.len());

    if grid == 0 || len % grid != 0 {
        return Err(LoaderError::DataShape(format!(
            "table length {} is not a multiple of grid size {}",
            len, grid
        )));
    }
    if names.len() < 2 {
        return Err(LoaderError::DataShape(format!(
            "expected at least two coordinate columns, found {}",
            names.len()
        )));
    }

    let fields = columns
        .iter()
        .map(|col| Field::from_flat(col, grid))
        .collect();

    Ok(FieldStore { names, fields })
}

/// Picks the delimiter byte by counting candidates in the header line.
///
/// Comma, semicolon and tab are tried first; whitespace-separated tables
/// fall back to a single space (runs of spaces produce empty cells, which
/// the record parser drops).
fn detect_delimiter(header: &str) -> u8 {
    let candidates = [b',', b';', b'\t'];
    let counts: Vec<usize> = candidates
        .iter()
        .map(|&d| header.bytes().filter(|&b| b == d).count())
        .collect();

    match counts
        .iter()
        .enumerate()
        .max_by_key(|(_, &count)| count)
        .filter(|(_, &count)| count > 0)
    {
        Some((i, _)) => candidates[i],
        None => b' ',
    }
}

/// Parses a delimited table into column names and column-major values.
fn parse_table(text: &str) -> Result<(Vec<String>, Vec<Vec<f64>>)> {
    let header = text.lines().next().unwrap_or_default();
    let delimiter = detect_delimiter(header);
    debug!("detected delimiter {:?}", delimiter as char);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let names: Vec<String> = reader
        .headers()?
        .iter()
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .collect();

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];

    for result in reader.records() {
        let record = result?;
        let cells: Vec<&str> = record.iter().filter(|cell| !cell.is_empty()).collect();

        if cells.is_empty() {
            continue;
        }
        if cells.len() != names.len() {
            return Err(LoaderError::DataShape(format!(
                "row has {} values, expected {}",
                cells.len(),
                names.len()
            )));
        }

        for (i, cell) in cells.iter().enumerate() {
            let value: f64 = cell.parse().map_err(|_| LoaderError::Parse {
                column: names[i].clone(),
                value: cell.to_string(),
            })?;
            columns[i].push(value);
        }
    }

    Ok((names, columns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    /// Builds a flat column that tiles `grid` ascending x values `rows` times.
    fn tiled_column(grid: usize, rows: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(grid * rows);
        for _ in 0..rows {
            for c in 0..grid {
                out.push(c as f64 * 0.5);
            }
        }
        out
    }

    #[test]
    fn test_infer_grid_tiled_scan_lines() {
        for grid in 1..=50 {
            for rows in 1..=50 {
                let column = tiled_column(grid, rows);
                assert_eq!(
                    infer_grid(&column).unwrap(),
                    grid,
                    "grid={} rows={}",
                    grid,
                    rows
                );
            }
        }
    }

    #[test]
    fn test_infer_grid_no_repeat_is_full_length() {
        let column = vec![0.0, 1.0, 2.0, 3.0];
        assert_eq!(infer_grid(&column).unwrap(), 4);
    }

    #[test]
    fn test_infer_grid_empty_fails() {
        let result = infer_grid(&[]);
        assert!(matches!(result, Err(LoaderError::DataShape(_))));
    }

    #[test]
    fn test_reshape_index_identity() {
        let names = vec!["x".to_string(), "y".to_string(), "Vx".to_string()];
        let flat: Vec<f64> = (0..12).map(|i| i as f64).collect();
        let columns = vec![tiled_column(3, 4), flat.clone(), flat.clone()];

        let store = reshape_table(names, &columns, 3).unwrap();
        let field = store.get("Vx").unwrap();

        for r in 0..4 {
            for c in 0..3 {
                assert_eq!(field.get(r, c), flat[r * 3 + c]);
            }
        }
    }

    #[test]
    fn test_reshape_rejects_non_divisible_length() {
        let names = vec!["x".to_string(), "y".to_string()];
        let columns = vec![vec![0.0; 7], vec![0.0; 7]];

        let result = reshape_table(names, &columns, 3);
        assert!(matches!(result, Err(LoaderError::DataShape(_))));
    }

    #[test]
    fn test_detect_delimiter_all_separators() {
        assert_eq!(detect_delimiter("x, y, Vx"), b',');
        assert_eq!(detect_delimiter("x; y; Vx"), b';');
        assert_eq!(detect_delimiter("x\ty\tVx"), b'\t');
        assert_eq!(detect_delimiter("x  y  Vx"), b' ');
    }

    fn write_table(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_comma_separated() {
        let dir = tempdir().unwrap();
        let path = write_table(
            dir.path(),
            "run_01.txt",
            "x, y, Vx\n0.0, 0.0, 1.0\n1.0, 0.0, 2.0\n0.0, 1.0, 3.0\n1.0, 1.0, 4.0\n",
        );

        let dataset = Dataset::load(&path).unwrap();

        assert_eq!(dataset.name(), "run_01");
        assert_eq!(dataset.grid(), 2);
        assert_eq!(dataset.rows(), 2);
        assert_eq!(dataset.store().data_names(), &["Vx".to_string()]);
        assert_eq!(dataset.store().get("Vx").unwrap().row(1), &[3.0, 4.0]);
        assert_eq!(dataset.store().x_coord().row(0), &[0.0, 1.0]);
        assert_eq!(dataset.store().y_coord().column(0), vec![0.0, 1.0]);
    }

    #[test]
    fn test_load_whitespace_separated() {
        let dir = tempdir().unwrap();
        let path = write_table(
            dir.path(),
            "ws.txt",
            "x  y  Vx\n0.0  0.0  1.0\n1.0  0.0  2.0\n0.0  1.0  3.0\n1.0  1.0  4.0\n",
        );

        let dataset = Dataset::load(&path).unwrap();
        assert_eq!(dataset.grid(), 2);
        assert_eq!(dataset.store().get("Vx").unwrap().get(1, 0), 3.0);
    }

    #[test]
    fn test_load_rejects_non_numeric_cell() {
        let dir = tempdir().unwrap();
        let path = write_table(dir.path(), "bad.txt", "x, y, Vx\n0.0, 0.0, oops\n");

        let result = Dataset::load(&path);
        assert!(matches!(result, Err(LoaderError::Parse { .. })));
    }

    #[test]
    fn test_load_rejects_empty_table() {
        let dir = tempdir().unwrap();
        let path = write_table(dir.path(), "empty.txt", "x, y, Vx\n");

        let result = Dataset::load(&path);
        assert!(matches!(result, Err(LoaderError::EmptyTable(_))));
    }

    #[test]
    fn test_failed_reload_keeps_previous_dataset() {
        let dir = tempdir().unwrap();
        let good = write_table(
            dir.path(),
            "good.txt",
            "x, y, Vx\n0.0, 0.0, 1.0\n1.0, 0.0, 2.0\n",
        );
        let bad = write_table(dir.path(), "bad.txt", "x, y, Vx\n0.0, 0.0, oops\n");

        let mut active = ActiveDataset::new();
        active.load(&good).unwrap();
        assert!(active.load(&bad).is_err());

        let current = active.get().unwrap();
        assert_eq!(current.name(), "good");
        assert_eq!(current.grid(), 2);
    }

    #[test]
    fn test_peak_magnitude() {
        let field = Field::from_flat(&[1.0, -7.5, 3.0, 2.0], 2);
        assert_eq!(field.peak_magnitude(), 7.5);
    }
}
