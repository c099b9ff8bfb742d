//! Tolerance constants for audio testing.

/// Floating point rounding errors (passthrough, exact gain).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// dB to linear conversions through `powf`.
pub const GAIN_EPSILON: f32 = 1e-5;
