//! Color-window mapping for 2D field rendering.
//!
//! The window is the `(low, high)` value range mapped to the colormap's
//! extremes. Both bounds are fractions of the field's peak absolute
//! magnitude, driven by two independent sliders. Updates that would cross
//! the bounds are rejected outright instead of being clamped, so
//! `low < high` holds after every accepted call.

use crate::core::loaders::Field;

/// Number of discrete slider positions (`0..=SLIDER_STEPS`).
pub const SLIDER_STEPS: u32 = 2000;

/// Default position of the upper-bound slider (fraction 0.999).
pub const UPPER_SLIDER_DEFAULT: u32 = 1999;

/// Default position of the lower-bound slider (fraction 1.0).
pub const LOWER_SLIDER_DEFAULT: u32 = 0;

/// Maps an upper-slider position to a scale fraction in `[-1, 1]`.
pub fn upper_fraction(position: u32) -> f64 {
    (position as f64 - 1000.0) / 1000.0
}

/// Maps a lower-slider position to a scale fraction in `[-1, 1]`.
///
/// The lower slider runs the opposite way: position 0 is the full negative
/// range (fraction 1.0), position 2000 crosses to the positive side.
pub fn lower_fraction(position: u32) -> f64 {
    (1000.0 - position as f64) / 1000.0
}

/// Display bounds for rendering one field through a colormap.
#[derive(Debug, Clone)]
pub struct ColorWindow {
    peak: f64,
    pos_scale: f64,
    neg_scale: f64,
}

impl ColorWindow {
    /// Creates a full-range window for `field`.
    ///
    /// The peak magnitude is computed once here; switching fields means
    /// building a fresh window, which resets both scales to 1.0.
    pub fn for_field(field: &Field) -> Self {
        Self {
            peak: field.peak_magnitude(),
            pos_scale: 1.0,
            neg_scale: 1.0,
        }
    }

    /// Peak absolute magnitude of the wrapped field.
    pub fn peak(&self) -> f64 {
        self.peak
    }

    /// Lower display bound.
    pub fn low_bound(&self) -> f64 {
        -self.neg_scale * self.peak
    }

    /// Upper display bound.
    pub fn high_bound(&self) -> f64 {
        self.pos_scale * self.peak
    }

    /// Both display bounds, for the colormap renderer.
    pub fn bounds(&self) -> (f64, f64) {
        (self.low_bound(), self.high_bound())
    }

    /// Moves the upper bound to `fraction * peak`.
    ///
    /// Rejected (no state change, `None`) when the candidate would not stay
    /// strictly above the current lower bound; otherwise commits and returns
    /// the new upper bound.
    pub fn set_upper_scale(&mut self, fraction: f64) -> Option<f64> {
        let candidate = fraction * self.peak;
        if candidate <= self.low_bound() {
            return None;
        }
        self.pos_scale = fraction;
        Some(self.high_bound())
    }

    /// Moves the lower bound to `-fraction * peak`.
    ///
    /// Rejected (no state change, `None`) when the candidate would not stay
    /// strictly below the current upper bound; otherwise commits and returns
    /// the new lower bound.
    pub fn set_lower_scale(&mut self, fraction: f64) -> Option<f64> {
        let candidate = -fraction * self.peak;
        if candidate >= self.high_bound() {
            return None;
        }
        self.neg_scale = fraction;
        Some(self.low_bound())
    }
}
