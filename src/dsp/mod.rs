//! DSP building blocks: fade envelopes and gain level helpers.

pub mod fade;
pub mod level;

pub use fade::{FadeEnvelope, FadeShape};
