//! Export of extracted profiles to delimited text files.
//!
//! Output files carry a plain header row (no comment marker) followed by one
//! line per sample with every value formatted as fixed-point with six
//! fractional digits. Existing files are never overwritten: a ` (1)`,
//! ` (2)`, ... suffix is probed until a free path is found. Writes go
//! through a temporary file in the target directory and are persisted only
//! on success, so a failed export leaves no partial file behind.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Separator used between exported values unless the caller overrides it.
pub const DEFAULT_SEPARATOR: &str = ", ";

/// Default output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "Out";

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create the output directory.
    #[error("failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create the temporary output file.
    #[error("failed to create file in '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write or persist the output file.
    #[error("failed to write '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Columns of different lengths cannot form a table.
    #[error("column '{column}' has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// There is nothing to write.
    #[error("no columns to export")]
    NoColumns,
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Returns `path` if free, otherwise the first ` (n)`-suffixed variant
/// that does not exist yet.
pub fn uniquify(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    let mut counter = 1;
    loop {
        let candidate = parent.join(format!("{} ({}){}", stem, counter, extension));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Writes named columns as delimited text under `dir`.
///
/// Creates `dir` if missing, picks a collision-free path for `name`, writes
/// the header row and every sample formatted as `%.6f`, and returns the
/// path actually written.
///
/// # Errors
///
/// Returns an error if the columns have unequal lengths, the directory
/// cannot be created, or the file cannot be written.
pub fn save_table(
    dir: &Path,
    name: &str,
    columns: &[(String, Vec<f64>)],
    separator: &str,
) -> Result<PathBuf> {
    let expected = match columns.first() {
        Some((_, values)) => values.len(),
        None => return Err(WriteError::NoColumns),
    };
    for (column, values) in columns {
        if values.len() != expected {
            return Err(WriteError::LengthMismatch {
                column: column.clone(),
                expected,
                actual: values.len(),
            });
        }
    }

    fs::create_dir_all(dir).map_err(|e| WriteError::CreateDirectory {
        path: dir.display().to_string(),
        source: e,
    })?;

    let path = uniquify(&dir.join(name));
    let path_str = path.display().to_string();

    let temp = NamedTempFile::new_in(dir).map_err(|e| WriteError::CreateFile {
        path: dir.display().to_string(),
        source: e,
    })?;
    let mut writer = BufWriter::new(temp);

    let header: Vec<&str> = columns.iter().map(|(name, _)| name.as_str()).collect();
    writeln!(writer, "{}", header.join(separator)).map_err(|e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    })?;

    for row in 0..expected {
        let line: Vec<String> = columns
            .iter()
            .map(|(_, values)| format!("{:.6}", values[row]))
            .collect();
        writeln!(writer, "{}", line.join(separator)).map_err(|e| WriteError::WriteFile {
            path: path_str.clone(),
            source: e,
        })?;
    }

    let temp = writer.into_inner().map_err(|e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e.into_error(),
    })?;
    temp.persist(&path).map_err(|e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e.error,
    })?;

    info!("wrote profile table to {}", path_str);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_columns() -> Vec<(String, Vec<f64>)> {
        vec![
            ("x[mm]".to_string(), vec![0.0, 1.0, 2.0]),
            ("Vx".to_string(), vec![3.14159265, -0.5, 10.0]),
        ]
    }

    #[test]
    fn test_save_table_header_and_formatting() {
        let dir = tempdir().unwrap();

        let path = save_table(dir.path(), "profile.txt", &sample_columns(), ", ").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], "x[mm], Vx");
        assert_eq!(lines[1], "0.000000, 3.141593");
        assert_eq!(lines[2], "1.000000, -0.500000");
        assert_eq!(lines[3], "2.000000, 10.000000");
        assert_eq!(lines.len(), 4);
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn test_save_table_creates_output_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("Out");

        let path = save_table(&nested, "profile.txt", &sample_columns(), ", ").unwrap();

        assert!(nested.is_dir());
        assert!(path.exists());
    }

    #[test]
    fn test_save_table_avoids_collisions() {
        let dir = tempdir().unwrap();
        let columns = sample_columns();

        let first = save_table(dir.path(), "profile.txt", &columns, ", ").unwrap();
        let second = save_table(dir.path(), "profile.txt", &columns, ", ").unwrap();
        let third = save_table(dir.path(), "profile.txt", &columns, ", ").unwrap();

        assert_eq!(first.file_name().unwrap(), "profile.txt");
        assert_eq!(second.file_name().unwrap(), "profile (1).txt");
        assert_eq!(third.file_name().unwrap(), "profile (2).txt");
    }

    #[test]
    fn test_save_table_custom_separator() {
        let dir = tempdir().unwrap();

        let path = save_table(dir.path(), "profile.txt", &sample_columns(), ";").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("x[mm];Vx\n"));
    }

    #[test]
    fn test_save_table_length_mismatch() {
        let dir = tempdir().unwrap();
        let columns = vec![
            ("x[mm]".to_string(), vec![0.0, 1.0]),
            ("Vx".to_string(), vec![3.0]),
        ];

        let result = save_table(dir.path(), "profile.txt", &columns, ", ");

        assert!(matches!(
            result,
            Err(WriteError::LengthMismatch {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_save_table_no_columns() {
        let dir = tempdir().unwrap();
        let result = save_table(dir.path(), "profile.txt", &[], ", ");
        assert!(matches!(result, Err(WriteError::NoColumns)));
    }

    #[test]
    fn test_uniquify_without_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes");
        fs::write(&path, "x").unwrap();

        let unique = uniquify(&path);
        assert_eq!(unique.file_name().unwrap(), "notes (1)");
    }
}
