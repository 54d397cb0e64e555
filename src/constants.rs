//! Shared constants for the mixing engine.

/// Maximum number of operations a single chain can hold.
pub const MAX_MIXING: usize = 128;

/// Absolute ceiling for the channel count of any stream or mix step.
pub const MAX_CHANNELS: usize = 64;

/// Crossfade window used by the crosstrack macro (seconds).
pub const CROSSTRACK_FADE_SECONDS: f64 = 15.0;

/// Crossfade window used by the crosslayer macro (seconds).
pub const CROSSLAYER_FADE_SECONDS: f64 = 10.0;

/// Upper clamp for 16-bit output and the limiter.
pub const SAMPLE_MAX: f32 = 32767.0;

/// Lower clamp for 16-bit output and the limiter.
pub const SAMPLE_MIN: f32 = -32768.0;
