//! Decode-time mixing engine.
//!
//! A [`Mixer`] is bound to one decoded stream. The host (or a format parser)
//! appends primitive operations and macros while the mixer is configuring,
//! then activates it once buffers are sized. Every decoded batch is passed
//! through [`Mixer::execute`], which replays the frozen chain one frame at a
//! time:
//! - `topology`: scratch/output channel widths tracked at append time.
//! - `chain`: validation, fade stitching and storage of operations.
//! - `executor`: per-frame replay and 16-bit output conversion.
//! - `macros`: volume masks, track selection, layer and loop crossfades.
//! - `debug`: chain dumps behind the `debug` feature.

mod chain;
#[cfg(feature = "debug")]
pub mod debug;
mod executor;
mod macros;
mod topology;
mod types;

use log::{debug, warn};

use crate::constants::{MAX_CHANNELS, MAX_MIXING};
use crate::error::MixError;
use crate::stream::StreamInfo;

pub use topology::Topology;
pub use types::{ChannelMask, ChannelTarget, LayerMode, MixOperation};

/// Configuration lifecycle of a [`Mixer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixerState {
    /// Accepting operations.
    Configuring,
    /// Chain frozen, scratch buffer allocated.
    Active,
    /// Torn down, or the stream is too wide to mix; nothing is accepted or
    /// applied.
    Closed,
}

/// Buffer sizing reported by [`Mixer::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Channels per frame the caller's buffer must hold.
    pub input_channels: usize,
    /// Channels per frame present after mixing.
    pub output_channels: usize,
}

/// Mixing state owned by a single decode stream.
#[derive(Debug)]
pub struct Mixer {
    stream: StreamInfo,
    topology: Topology,
    chain: Vec<MixOperation>,
    state: MixerState,
    mixbuf: Vec<f32>,
    max_batch_len: usize,
    required_loop_count: u32,
}

impl Mixer {
    /// Create an empty mixer for a stream.
    ///
    /// Streams wider than [`MAX_CHANNELS`] get a closed mixer that passes
    /// every batch through unchanged.
    pub fn new(stream: StreamInfo) -> Self {
        let state = if stream.channels > MAX_CHANNELS {
            debug!(
                "mixing disabled for {} channel stream: {}",
                stream.channels,
                MixError::ChannelLimit(MAX_CHANNELS)
            );
            MixerState::Closed
        } else {
            MixerState::Configuring
        };
        Self {
            topology: Topology::new(stream.channels),
            stream,
            chain: Vec::with_capacity(MAX_MIXING),
            state,
            mixbuf: Vec::new(),
            max_batch_len: 0,
            required_loop_count: 0,
        }
    }

    /// Freeze the chain and size the scratch buffer for batches of up to
    /// `max_batch_len` frames.
    ///
    /// A zero length only refreshes derived stream state (so callers can
    /// query channels) and leaves the mixer configuring.
    ///
    /// # Returns
    /// `true` once the mixer is active.
    pub fn activate(&mut self, max_batch_len: usize) -> bool {
        if self.state == MixerState::Closed {
            debug!("mixer activation ignored: {}", MixError::Closed);
            return false;
        }

        // the container's speaker layout no longer describes the output
        if self.stream.channel_layout.is_some()
            && self.stream.channels != self.topology.output_channels()
        {
            self.stream.channel_layout = None;
        }

        if max_batch_len == 0 {
            return false;
        }

        match self.allocate(max_batch_len) {
            Ok(()) => {
                self.state = MixerState::Active;
                self.max_batch_len = max_batch_len;
                #[cfg(feature = "debug")]
                debug!(
                    "mixer active, {} frames max:\n{}",
                    max_batch_len,
                    debug::describe_chain(&self.chain)
                );
                true
            }
            Err(err) => {
                warn!("mixer stays inactive: {}", err);
                false
            }
        }
    }

    fn allocate(&mut self, max_batch_len: usize) -> Result<(), MixError> {
        let channels = self.topology.mixing_channels();
        let samples = channels
            .checked_mul(max_batch_len)
            .ok_or(MixError::Allocation { bytes: usize::MAX })?;
        let bytes = samples.saturating_mul(std::mem::size_of::<f32>());

        let mut mixbuf = Vec::new();
        if mixbuf.try_reserve_exact(samples).is_err() {
            return Err(MixError::Allocation { bytes });
        }
        mixbuf.resize(samples, 0.0);
        self.mixbuf = mixbuf;
        Ok(())
    }

    /// Channels the caller must provide per frame, and channels produced.
    pub fn query(&self) -> ChannelInfo {
        ChannelInfo {
            input_channels: self.topology.input_channels(),
            output_channels: self.topology.output_channels(),
        }
    }

    /// Release the scratch buffer and chain. The mixer ignores further calls.
    pub fn teardown(&mut self) {
        self.mixbuf = Vec::new();
        self.chain = Vec::new();
        self.max_batch_len = 0;
        self.state = MixerState::Closed;
    }

    pub fn state(&self) -> MixerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == MixerState::Active
    }

    /// Number of stored operations.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn operations(&self) -> &[MixOperation] {
        &self.chain
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn mixing_channels(&self) -> usize {
        self.topology.mixing_channels()
    }

    pub fn output_channels(&self) -> usize {
        self.topology.output_channels()
    }

    /// Speaker layout, cleared on activation if mixing changed the channel count.
    pub fn channel_layout(&self) -> Option<u32> {
        self.stream.channel_layout
    }

    pub fn stream(&self) -> &StreamInfo {
        &self.stream
    }

    /// Loop iterations the decoder must play for loop-based macros to be heard.
    pub fn required_loop_count(&self) -> u32 {
        self.required_loop_count
    }

    pub fn max_batch_len(&self) -> usize {
        self.max_batch_len
    }

    fn check_configurable(&self) -> Result<(), MixError> {
        match self.state {
            MixerState::Configuring => Ok(()),
            MixerState::Active => Err(MixError::Active),
            MixerState::Closed => Err(MixError::Closed),
        }
    }
}
