//! High-level mixing intents expanded into primitive operations.
//!
//! Macros are expanded once at configuration time. Each returns `true` when
//! its preconditions held and it was expanded; individual operations it
//! emits may still be refused (and logged) by the chain builder.

use log::debug;

use crate::constants::{CROSSLAYER_FADE_SECONDS, CROSSTRACK_FADE_SECONDS, MAX_CHANNELS};
use crate::dsp::fade::FadeShape;
use crate::dsp::level::power_sum_gain;
use crate::error::MixError;
use crate::stream::LoopRegion;

use super::types::{ChannelMask, ChannelTarget, LayerMode};
use super::Mixer;

impl Mixer {
    /// Apply `gain` to the channels selected by `mask`.
    ///
    /// An empty mask, or one selecting every channel, emits a single
    /// all-channel volume.
    pub fn macro_volume(&mut self, mask: ChannelMask, gain: f32) -> bool {
        if !self.macro_allowed("volume") {
            return false;
        }
        let channels = self.output_channels();
        if mask.is_empty() || mask.covers(channels) {
            return self.append_volume(ChannelTarget::All, gain);
        }
        for ch in (0..channels).filter(|&ch| mask.contains(ch)) {
            self.append_volume(ChannelTarget::Channel(ch), gain);
        }
        true
    }

    /// Keep only the channels selected by `mask`, in their original order.
    pub fn macro_track_select(&mut self, mask: ChannelMask) -> bool {
        if !self.macro_allowed("track select") || mask.is_empty() {
            return false;
        }
        // highest first so lower indices stay put while channels are removed
        for ch in (0..self.output_channels()).rev() {
            if !mask.contains(ch) {
                self.append_downmix(ch);
            }
        }
        true
    }

    /// Mix the selected layers down to `max` channels.
    ///
    /// Layer `n` lands in output channel `n % max`, so with 8 selected
    /// channels and `max = 3`: ch0 = 0+3+6, ch1 = 1+4+7, ch2 = 2+5.
    pub fn macro_layer(&mut self, max: usize, mask: ChannelMask, mode: LayerMode) -> bool {
        if !self.macro_allowed("layer") {
            return false;
        }
        let channels = self.output_channels();
        if max == 0 || channels <= max || channels + max > MAX_CHANNELS {
            return false;
        }
        let mask = if mask.is_empty() {
            ChannelMask(u64::MAX)
        } else {
            mask
        };
        let selected = mask.count_below(channels);

        // silent mix targets at the front keep source indices simple
        for _ in 0..max {
            self.append_upmix(0);
        }

        let mut current = 0;
        for ch in (0..channels).filter(|&ch| mask.contains(ch)) {
            let gain = match mode {
                LayerMode::Unity => 1.0,
                LayerMode::Biased if ch < max => {
                    power_sum_gain(main_layer_mixes(selected, max, current))
                }
                LayerMode::Biased | LayerMode::Equal => {
                    power_sum_gain(layer_mixes(selected, max, current))
                }
            };
            self.append_add(current, max + ch, gain);
            current = (current + 1) % max;
        }

        self.append_truncate(max)
    }

    /// Play each group of `max` channels on its own loop iteration,
    /// crossfading between groups at every loop start.
    pub fn macro_crosstrack(&mut self, max: usize) -> bool {
        let Some((region, channels)) = self.loop_macro_setup("crosstrack", max) else {
            return false;
        };
        let tracks = channels / max;
        self.required_loop_count = self.required_loop_count.max(tracks as u32);
        let change_time = self.stream.seconds_to_samples(CROSSTRACK_FADE_SECONDS);

        for track in 0..tracks {
            let change_pos = region.start + region.len() * track as i64;
            let change_next = region.start + region.len() * (track as i64 + 1);
            let first = track * max;

            for ch in first..first + max {
                if track > 0 {
                    self.append_fade(
                        ChannelTarget::Channel(ch),
                        0.0,
                        1.0,
                        FadeShape::RaisedCosine,
                        None,
                        change_pos,
                        change_pos + change_time,
                        None,
                    );
                }
                if track + 1 < tracks {
                    self.append_fade(
                        ChannelTarget::Channel(ch),
                        1.0,
                        0.0,
                        FadeShape::RaisedCosine,
                        None,
                        change_next,
                        change_next + change_time,
                        None,
                    );
                }
            }
        }

        // tracks never play at the same time, so no gain correction
        self.fold_into_first(max, channels)
    }

    /// Add one more group of `max` channels on every loop iteration,
    /// rebalancing gains as layers stack up.
    ///
    /// With 3 layers, `max = 2` and [`LayerMode::Equal`]:
    /// - layer0 (ch0+1): loop1 1.0..0.7, loop2 0.7..0.5
    /// - layer1 (ch2+3): loop1 0.0..0.7, loop2 0.7..0.5
    /// - layer2 (ch4+5): loop2 0.0..0.5
    ///
    /// [`LayerMode::Biased`] delays the drop of layer0 by one loop.
    pub fn macro_crosslayer(&mut self, max: usize, mode: LayerMode) -> bool {
        let Some((region, channels)) = self.loop_macro_setup("crosslayer", max) else {
            return false;
        };
        let layers = channels / max;
        self.required_loop_count = self.required_loop_count.max(layers as u32);
        let change_time = self.stream.seconds_to_samples(CROSSLAYER_FADE_SECONDS);

        for lap in 1..layers {
            let change_pos = region.start + region.len() * lap as i64;

            // layers past `lap` stay silent from their first fade-in
            for layer in 0..=lap {
                let (from, to) = crosslayer_gains(mode, lap, layer);
                let first = layer * max;
                for ch in first..first + max {
                    self.append_fade(
                        ChannelTarget::Channel(ch),
                        from,
                        to,
                        FadeShape::RaisedCosine,
                        None,
                        change_pos,
                        change_pos + change_time,
                        None,
                    );
                }
            }
        }

        self.fold_into_first(max, channels)
    }

    fn macro_allowed(&self, name: &str) -> bool {
        match self.check_configurable() {
            Ok(()) => true,
            Err(err) => {
                debug!("{} macro ignored: {}", name, err);
                false
            }
        }
    }

    /// Shared preconditions of the loop based macros.
    ///
    /// Pads odd channel counts with one silent channel.
    fn loop_macro_setup(&mut self, name: &str, max: usize) -> Option<(LoopRegion, usize)> {
        if !self.macro_allowed(name) {
            return None;
        }
        let mut channels = self.output_channels();
        if max == 0 || channels <= max {
            return None;
        }
        let Some(region) = self.stream.loop_region else {
            debug!("{} macro ignored: {}", name, MixError::MissingLoop);
            return None;
        };

        if channels % 2 == 1 {
            if !self.append_upmix(channels) {
                return None;
            }
            channels += 1;
        }
        Some((region, channels))
    }

    /// Add every channel past `max` into the first `max`, then drop them.
    fn fold_into_first(&mut self, max: usize, channels: usize) -> bool {
        let mut current = 0;
        for ch in max..channels {
            self.append_add(current, ch, 1.0);
            current = (current + 1) % max;
        }
        self.append_truncate(max)
    }
}

/// Layers summed into output channel `current`, spreading the remainder
/// over the first channels.
fn layer_mixes(selected: usize, max: usize, current: usize) -> usize {
    let mut mixes = (selected / max).max(1);
    if current < selected % (mixes * max) {
        mixes += 1;
    }
    mixes
}

/// Like [`layer_mixes`], minus one, so main layers are reduced less.
fn main_layer_mixes(selected: usize, max: usize, current: usize) -> usize {
    let mut mixes = selected / max;
    if mixes > 0 && current < selected % (mixes * max) {
        mixes += 1;
    }
    mixes.saturating_sub(1).max(1)
}

/// Start/end gain of `layer` during the crossfade at loop `lap`.
fn crosslayer_gains(mode: LayerMode, lap: usize, layer: usize) -> (f32, f32) {
    let (from, to) = match mode {
        LayerMode::Unity => (1.0, 1.0),
        LayerMode::Biased if layer == 0 => {
            (power_sum_gain(lap.saturating_sub(1)), power_sum_gain(lap))
        }
        LayerMode::Biased | LayerMode::Equal => (power_sum_gain(lap), power_sum_gain(lap + 1)),
    };
    if layer == lap {
        (0.0, to)
    } else {
        (from, to)
    }
}
