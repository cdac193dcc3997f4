//! Core data types and I/O operations.

pub mod loaders;
pub mod writers;

pub use loaders::{ActiveDataset, Dataset, Field, FieldStore, LoaderError};
pub use writers::{save_table, uniquify, WriteError};
