//! Serializable mix descriptions.
//!
//! Playlist and header description parsers produce a [`MixSettings`] (or
//! deserialize one from JSON) and apply it to the stream's [`Mixer`] before
//! activation. Commands are applied in order, exactly as if the matching
//! `append_*` / `macro_*` calls had been made.

use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

use crate::dsp::fade::FadeShape;
use crate::dsp::level::deserialize_linear_gain;
use crate::mixing::{ChannelMask, ChannelTarget, LayerMode, Mixer};

fn unity_gain() -> f32 {
    1.0
}

/// Deserialize an optional fade boundary; negative values mean unbounded.
fn deserialize_time_bound<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<i64>::deserialize(deserializer)?;
    Ok(value.filter(|position| *position >= 0))
}

/// A single primitive or macro mixing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixCommand {
    Swap {
        a: usize,
        b: usize,
    },
    Add {
        dst: usize,
        src: usize,
        #[serde(default = "unity_gain", deserialize_with = "deserialize_linear_gain")]
        gain: f32,
    },
    Volume {
        /// `None` targets every channel.
        #[serde(default)]
        channel: Option<usize>,
        #[serde(deserialize_with = "deserialize_linear_gain")]
        gain: f32,
    },
    Limit {
        #[serde(default)]
        channel: Option<usize>,
        #[serde(deserialize_with = "deserialize_linear_gain")]
        gain: f32,
    },
    Upmix {
        channel: usize,
    },
    Downmix {
        channel: usize,
    },
    Truncate {
        channels: usize,
    },
    Fade {
        #[serde(default)]
        channel: Option<usize>,
        #[serde(deserialize_with = "deserialize_linear_gain")]
        vol_start: f32,
        #[serde(deserialize_with = "deserialize_linear_gain")]
        vol_end: f32,
        #[serde(default)]
        shape: FadeShape,
        #[serde(default, deserialize_with = "deserialize_time_bound")]
        pre: Option<i64>,
        start: i64,
        end: i64,
        #[serde(default, deserialize_with = "deserialize_time_bound")]
        post: Option<i64>,
    },
    MacroVolume {
        #[serde(default)]
        mask: ChannelMask,
        #[serde(deserialize_with = "deserialize_linear_gain")]
        gain: f32,
    },
    TrackSelect {
        mask: ChannelMask,
    },
    Layer {
        max: usize,
        #[serde(default)]
        mask: ChannelMask,
        #[serde(default)]
        mode: LayerMode,
    },
    Crosstrack {
        max: usize,
    },
    Crosslayer {
        max: usize,
        #[serde(default)]
        mode: LayerMode,
    },
}

impl MixCommand {
    /// Apply the command to a mixer.
    ///
    /// # Returns
    /// `true` if the mixer accepted it.
    pub fn apply(&self, mixer: &mut Mixer) -> bool {
        match *self {
            MixCommand::Swap { a, b } => mixer.append_swap(a, b),
            MixCommand::Add { dst, src, gain } => mixer.append_add(dst, src, gain),
            MixCommand::Volume { channel, gain } => {
                mixer.append_volume(ChannelTarget::from(channel), gain)
            }
            MixCommand::Limit { channel, gain } => {
                mixer.append_limit(ChannelTarget::from(channel), gain)
            }
            MixCommand::Upmix { channel } => mixer.append_upmix(channel),
            MixCommand::Downmix { channel } => mixer.append_downmix(channel),
            MixCommand::Truncate { channels } => mixer.append_truncate(channels),
            MixCommand::Fade {
                channel,
                vol_start,
                vol_end,
                shape,
                pre,
                start,
                end,
                post,
            } => mixer.append_fade(
                ChannelTarget::from(channel),
                vol_start,
                vol_end,
                shape,
                pre,
                start,
                end,
                post,
            ),
            MixCommand::MacroVolume { mask, gain } => mixer.macro_volume(mask, gain),
            MixCommand::TrackSelect { mask } => mixer.macro_track_select(mask),
            MixCommand::Layer { max, mask, mode } => mixer.macro_layer(max, mask, mode),
            MixCommand::Crosstrack { max } => mixer.macro_crosstrack(max),
            MixCommand::Crosslayer { max, mode } => mixer.macro_crosslayer(max, mode),
        }
    }
}

/// Ordered list of mixing commands for one stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixSettings {
    pub commands: Vec<MixCommand>,
}

impl MixSettings {
    pub fn new(commands: Vec<MixCommand>) -> Self {
        Self { commands }
    }

    /// Parse settings from JSON.
    ///
    /// Accepts either `{"commands": [...]}` or a bare command array.
    ///
    /// # Errors
    /// Returns the `serde_json` error for malformed input.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if value.is_array() {
            return serde_json::from_value(value).map(Self::new);
        }
        serde_json::from_value(value)
    }

    /// Apply every command in order.
    ///
    /// # Returns
    /// Number of commands the mixer accepted.
    pub fn apply(&self, mixer: &mut Mixer) -> usize {
        let mut accepted = 0;
        for command in &self.commands {
            if command.apply(mixer) {
                accepted += 1;
            } else {
                debug!("mix command {:?} not applied", command);
            }
        }
        accepted
    }
}
