//! Per-frame replay of the mixing chain.
//!
//! Operations apply in append order to one frame ("step") at a time. Since
//! some operations change the channel count, the meaning of a channel index
//! depends on everything before it, e.g. for 2ch input:
//! - `add 0+1, upmix 0` gives `[0, 0+1, 1]`
//! - `upmix 0, add 0+1` gives `[0, 0, 1]`
//! - `swap 0-1, downmix 0` gives `[0]`

use log::warn;

use crate::constants::{MAX_CHANNELS, SAMPLE_MAX, SAMPLE_MIN};
use crate::stream::DecodePosition;

use super::types::{ChannelTarget, MixOperation};
use super::Mixer;

impl Mixer {
    /// Mix a batch of decoded frames in place.
    ///
    /// # Arguments
    /// - `buffer`: Interleaved PCM with [`Mixer::query`]'s `input_channels`
    ///   of room per frame. Holds the source channel count on entry and the
    ///   output channel count on return.
    /// - `frames`: Frames in this batch, at most the activated batch length.
    /// - `position`: Decoder position of the first frame.
    ///
    /// An inactive mixer, an empty chain, or a batch no operation touches
    /// leaves the buffer untouched.
    pub fn execute(&mut self, buffer: &mut [i16], frames: usize, position: DecodePosition) {
        if !self.is_active() || self.chain.is_empty() || frames == 0 {
            return;
        }
        if frames > self.max_batch_len {
            warn!(
                "mix batch of {} frames exceeds activated maximum {}; skipping mix",
                frames, self.max_batch_len
            );
            return;
        }
        let source_channels = self.topology.source_channels();
        if source_channels == 0 {
            return;
        }
        let required = frames * self.topology.input_channels();
        if buffer.len() < required {
            warn!(
                "mix buffer holds {} samples, {} needed; skipping mix",
                buffer.len(),
                required
            );
            return;
        }

        let start = position.absolute(self.stream.loop_region);
        if !chain_applies(&self.chain, start, start + frames as i64) {
            return;
        }

        let mut step = [0.0_f32; MAX_CHANNELS];
        let mut cursor = 0;
        for (frame_index, frame) in buffer
            .chunks_exact(source_channels)
            .take(frames)
            .enumerate()
        {
            for (slot, &sample) in step.iter_mut().zip(frame) {
                *slot = sample as f32;
            }
            let width = apply_step(
                &self.chain,
                &mut step,
                source_channels,
                start + frame_index as i64,
            );
            self.mixbuf[cursor..cursor + width].copy_from_slice(&step[..width]);
            cursor += width;
        }

        let output_samples = frames * self.topology.output_channels();
        debug_assert_eq!(cursor, output_samples);
        for (out, &mixed) in buffer.iter_mut().zip(&self.mixbuf[..output_samples]) {
            *out = to_pcm16(mixed);
        }
    }
}

/// Return `true` unless the chain is only fades that all lie outside
/// `[from, to)`.
fn chain_applies(chain: &[MixOperation], from: i64, to: i64) -> bool {
    chain.iter().any(|op| match op {
        MixOperation::Fade { envelope, .. } => envelope.overlaps(from, to),
        _ => true,
    })
}

/// Run every operation over one frame and return the resulting width.
fn apply_step(
    chain: &[MixOperation],
    step: &mut [f32; MAX_CHANNELS],
    channels: usize,
    position: i64,
) -> usize {
    let mut width = channels;

    for op in chain {
        match *op {
            MixOperation::Swap { a, b } => step.swap(a, b),
            MixOperation::Add { dst, src, gain } => step[dst] += step[src] * gain,
            MixOperation::Volume { target, gain } => scale(&mut step[..width], target, gain),
            MixOperation::Limit { target, gain } => limit(
                &mut step[..width],
                target,
                SAMPLE_MIN * gain,
                SAMPLE_MAX * gain,
            ),
            MixOperation::Upmix { dst } => {
                width += 1;
                step.copy_within(dst..width - 1, dst + 1);
                step[dst] = 0.0;
            }
            MixOperation::Downmix { dst } => {
                step.copy_within(dst + 1..width, dst);
                width -= 1;
            }
            MixOperation::Truncate { channels } => width = channels,
            MixOperation::Fade { target, envelope } => {
                if let Some(gain) = envelope.gain_at(position) {
                    scale(&mut step[..width], target, gain);
                }
            }
        }
    }

    width
}

fn scale(step: &mut [f32], target: ChannelTarget, gain: f32) {
    match target {
        ChannelTarget::All => step.iter_mut().for_each(|sample| *sample *= gain),
        ChannelTarget::Channel(ch) => step[ch] *= gain,
    }
}

fn limit(step: &mut [f32], target: ChannelTarget, min: f32, max: f32) {
    match target {
        ChannelTarget::All => step
            .iter_mut()
            .for_each(|sample| *sample = sample.clamp(min, max)),
        ChannelTarget::Channel(ch) => step[ch] = step[ch].clamp(min, max),
    }
}

/// Truncate toward zero, then clamp to 16 bits.
fn to_pcm16(sample: f32) -> i16 {
    (sample as i32).clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
