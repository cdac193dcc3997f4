//! Numerical query components over the reconstructed fields.

pub mod colormap;
pub mod profile;
pub mod streamlines;

// Re-export key types for convenience
pub use colormap::{lower_fraction, upper_fraction, ColorWindow};
pub use profile::{value_axis_bounds, Orientation, Profile, ProfileError, ProfileExtractor};
pub use streamlines::{
    compute_streamlines, resample_velocity, InterpolationError, StreamlineGrid, StreamlineState,
};
