//! # chainmix
//!
//! Decode-time mixing for game audio streams. Format decoders hand each
//! decoded PCM batch to a [`Mixer`], which replays a chain of channel
//! operations and fade envelopes configured before playback started.
//!
//! ```rust
//! use chainmix::dsp::FadeShape;
//! use chainmix::stream::{DecodePosition, StreamInfo};
//! use chainmix::{ChannelTarget, Mixer};
//!
//! let mut mixer = Mixer::new(StreamInfo::new(2, 44_100));
//! mixer.append_fade(ChannelTarget::All, 1.0, 0.0, FadeShape::Triangular, None, 1000, 2000, None);
//! mixer.activate(1);
//!
//! let mut frame = [1000_i16, 1000];
//! mixer.execute(&mut frame, 1, DecodePosition::new(1500, 0));
//! assert_eq!(frame, [500, 500]);
//! ```

pub mod constants;
pub mod dsp;
mod error;
pub mod mixing;
pub mod settings;
pub mod stream;

pub use error::MixError;
pub use mixing::{
    ChannelInfo, ChannelMask, ChannelTarget, LayerMode, MixOperation, Mixer, MixerState,
};
pub use settings::{MixCommand, MixSettings};
