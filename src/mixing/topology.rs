//! Channel topology tracking while the chain is configured.

use crate::constants::MAX_CHANNELS;
use crate::error::MixError;

/// Scratch width and visible width of the mix.
///
/// `mixing_channels` only grows: it is the widest any mix step can get.
/// `output_channels` follows upmix/downmix/truncate in append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    source_channels: usize,
    mixing_channels: usize,
    output_channels: usize,
}

impl Topology {
    pub fn new(source_channels: usize) -> Self {
        Self {
            source_channels,
            mixing_channels: source_channels,
            output_channels: source_channels,
        }
    }

    pub fn source_channels(&self) -> usize {
        self.source_channels
    }

    pub fn mixing_channels(&self) -> usize {
        self.mixing_channels
    }

    pub fn output_channels(&self) -> usize {
        self.output_channels
    }

    /// Channel count the caller's buffer must hold per frame.
    pub fn input_channels(&self) -> usize {
        self.source_channels.max(self.output_channels)
    }

    /// Fail unless `channel` is a valid index in the current output.
    pub fn check_channel(&self, channel: usize) -> Result<(), MixError> {
        if channel >= self.output_channels {
            return Err(MixError::InvalidChannel {
                channel,
                channels: self.output_channels,
            });
        }
        Ok(())
    }

    pub fn check_upmix(&self, dst: usize) -> Result<(), MixError> {
        // inserting at the very end is allowed
        if dst > self.output_channels {
            return Err(MixError::InvalidChannel {
                channel: dst,
                channels: self.output_channels,
            });
        }
        if self.output_channels + 1 > MAX_CHANNELS {
            return Err(MixError::ChannelLimit(MAX_CHANNELS));
        }
        Ok(())
    }

    pub fn check_downmix(&self, dst: usize) -> Result<(), MixError> {
        self.check_channel(dst)?;
        if self.output_channels <= 1 {
            return Err(MixError::ChannelLimit(MAX_CHANNELS));
        }
        Ok(())
    }

    pub fn check_truncate(&self, channels: usize) -> Result<(), MixError> {
        if channels == 0 {
            return Err(MixError::ChannelLimit(MAX_CHANNELS));
        }
        self.check_channel(channels)
    }

    /// Widen both scratch and output by `count` channels.
    pub fn widen(&mut self, count: usize) {
        self.output_channels += count;
        self.mixing_channels = self.mixing_channels.max(self.output_channels);
    }

    /// The decoder itself now produces one more channel per frame.
    pub fn add_source_channel(&mut self) {
        self.source_channels += 1;
        self.widen(1);
    }

    pub fn narrow(&mut self) {
        self.output_channels -= 1;
    }

    pub fn truncate(&mut self, channels: usize) {
        self.output_channels = channels;
    }
}
