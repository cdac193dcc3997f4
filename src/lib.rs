//! PIV measurement table reconstruction and query pipeline.
//!
//! This crate provides tools for:
//! - Loading flat PIV export tables with delimiter auto-detection
//! - Inferring the measurement grid and reshaping columns into 2D fields
//! - Slicing fields into 1D profiles along a row or column
//! - Mapping fields through an asymmetric color window for rendering
//! - Resampling velocity components onto a uniform grid for streamlines
//! - Exporting profiles to delimited text with collision-safe naming
//!
//! # Example
//!
//! ```no_run
//! use piv_pipeline::core::loaders::Dataset;
//! use piv_pipeline::processors::profile::{Orientation, ProfileExtractor};
//!
//! let dataset = Dataset::load("run_01.txt").unwrap();
//! let mut extractor = ProfileExtractor::new();
//! extractor.select_field("Vx[m/s]");
//! extractor.set_orientation(Orientation::Horizontal);
//! let profile = extractor.extract(&dataset, 0).unwrap();
//! assert_eq!(profile.coords.len(), profile.values.len());
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use config::{ExportConfig, PipelineConfig, RenderConfig};
pub use core::loaders::{ActiveDataset, Dataset};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
