//! Operation and selector types stored in the mixing chain.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_CHANNELS;
use crate::dsp::fade::FadeEnvelope;

/// Channel an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelTarget {
    All,
    Channel(usize),
}

impl From<usize> for ChannelTarget {
    fn from(value: usize) -> Self {
        ChannelTarget::Channel(value)
    }
}

impl From<Option<usize>> for ChannelTarget {
    fn from(value: Option<usize>) -> Self {
        value.map_or(ChannelTarget::All, ChannelTarget::Channel)
    }
}

/// Bitmask selecting channels; bit `n` selects channel `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelMask(pub u64);

impl ChannelMask {
    pub const NONE: ChannelMask = ChannelMask(0);

    /// Mask selecting every listed channel. Indices past the ceiling are ignored.
    pub fn from_channels(channels: &[usize]) -> Self {
        let bits = channels
            .iter()
            .filter(|&&ch| ch < MAX_CHANNELS)
            .fold(0_u64, |bits, &ch| bits | (1 << ch));
        ChannelMask(bits)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, channel: usize) -> bool {
        channel < MAX_CHANNELS && (self.0 >> channel) & 1 == 1
    }

    /// Number of selected channels below `channels`.
    pub fn count_below(self, channels: usize) -> usize {
        (0..channels).filter(|&ch| self.contains(ch)).count()
    }

    /// Return `true` when every channel below `channels` is selected.
    pub fn covers(self, channels: usize) -> bool {
        (0..channels).all(|ch| self.contains(ch))
    }
}

/// Gain weighting used when layers are summed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerMode {
    /// Same volume for every layer (layered vocals).
    #[serde(alias = "v")]
    Unity,
    /// Main layers keep more volume than the rest (layered bgm).
    #[serde(alias = "b")]
    Biased,
    /// Every layer attenuated the same (generic downmix).
    #[default]
    #[serde(alias = "e")]
    Equal,
}

/// A single primitive mixing step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MixOperation {
    /// Exchange two channels.
    Swap { a: usize, b: usize },
    /// `dst += src * gain`.
    Add {
        dst: usize,
        src: usize,
        gain: f32,
    },
    Volume {
        target: ChannelTarget,
        gain: f32,
    },
    /// Clamp to `[-32768 * gain, 32767 * gain]`.
    Limit {
        target: ChannelTarget,
        gain: f32,
    },
    /// Insert a silent channel at `dst`, pushing later channels up.
    Upmix { dst: usize },
    /// Drop channel `dst`, pulling later channels down.
    Downmix { dst: usize },
    /// Keep only the first `channels` channels.
    Truncate { channels: usize },
    Fade {
        target: ChannelTarget,
        envelope: FadeEnvelope,
    },
}
