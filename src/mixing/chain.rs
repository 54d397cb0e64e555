//! Chain building: validation, storage and fade stitching.

use log::debug;

use crate::constants::{MAX_CHANNELS, MAX_MIXING};
use crate::dsp::fade::{FadeEnvelope, FadeShape};
use crate::error::MixError;

use super::types::{ChannelTarget, MixOperation};
use super::Mixer;

impl Mixer {
    /// Validate and append an operation.
    ///
    /// Volume and limit operations with unity gain are accepted but not
    /// stored. Upmix, downmix and truncate update the topology immediately.
    ///
    /// # Errors
    /// Returns the reason the operation was refused; the chain and topology
    /// are left unchanged.
    pub fn try_append(&mut self, op: MixOperation) -> Result<(), MixError> {
        self.check_configurable()?;

        match op {
            MixOperation::Swap { a, b } => {
                if a == b {
                    return Err(MixError::SameChannel(a));
                }
                self.topology.check_channel(a)?;
                self.topology.check_channel(b)?;
                self.store(op)
            }
            MixOperation::Add { dst, src, gain } => {
                check_gain(gain)?;
                // a silent source adds nothing
                if gain == 0.0 {
                    return Err(MixError::InvalidGain(gain));
                }
                self.topology.check_channel(dst)?;
                self.topology.check_channel(src)?;
                self.store(op)
            }
            MixOperation::Volume { target, gain } => {
                check_gain(gain)?;
                self.check_target(target)?;
                if gain == 1.0 {
                    return Ok(());
                }
                self.store(op)
            }
            MixOperation::Limit { target, gain } => {
                check_gain(gain)?;
                if gain < 0.0 {
                    return Err(MixError::InvalidGain(gain));
                }
                self.check_target(target)?;
                if gain == 1.0 {
                    return Ok(());
                }
                self.store(op)
            }
            MixOperation::Upmix { dst } => {
                self.topology.check_upmix(dst)?;
                self.store(op)?;
                self.topology.widen(1);
                Ok(())
            }
            MixOperation::Downmix { dst } => {
                self.topology.check_downmix(dst)?;
                self.store(op)?;
                self.topology.narrow();
                Ok(())
            }
            MixOperation::Truncate { channels } => {
                self.topology.check_truncate(channels)?;
                self.store(op)?;
                self.topology.truncate(channels);
                Ok(())
            }
            MixOperation::Fade { target, envelope } => self.push_fade(target, envelope),
        }
    }

    /// Append an operation, logging and dropping it when refused.
    ///
    /// # Returns
    /// `true` if the operation was accepted.
    pub fn append(&mut self, op: MixOperation) -> bool {
        match self.try_append(op) {
            Ok(()) => true,
            Err(err) => {
                debug!("mix operation {:?} ignored: {}", op, err);
                false
            }
        }
    }

    pub fn append_swap(&mut self, a: usize, b: usize) -> bool {
        self.append(MixOperation::Swap { a, b })
    }

    pub fn append_add(&mut self, dst: usize, src: usize, gain: f32) -> bool {
        self.append(MixOperation::Add { dst, src, gain })
    }

    pub fn append_volume(&mut self, target: ChannelTarget, gain: f32) -> bool {
        self.append(MixOperation::Volume { target, gain })
    }

    pub fn append_limit(&mut self, target: ChannelTarget, gain: f32) -> bool {
        self.append(MixOperation::Limit { target, gain })
    }

    pub fn append_upmix(&mut self, dst: usize) -> bool {
        self.append(MixOperation::Upmix { dst })
    }

    pub fn append_downmix(&mut self, dst: usize) -> bool {
        self.append(MixOperation::Downmix { dst })
    }

    pub fn append_truncate(&mut self, channels: usize) -> bool {
        self.append(MixOperation::Truncate { channels })
    }

    /// Append a fade envelope.
    ///
    /// `pre`/`post` of `None` mean the start/end of the stream. Consecutive
    /// fades on the same target are stitched so that a fade-out followed by a
    /// fade-in hands over at a single position.
    #[allow(clippy::too_many_arguments)]
    pub fn append_fade(
        &mut self,
        target: ChannelTarget,
        vol_start: f32,
        vol_end: f32,
        shape: FadeShape,
        pre: Option<i64>,
        start: i64,
        end: i64,
        post: Option<i64>,
    ) -> bool {
        let envelope = FadeEnvelope {
            vol_start,
            vol_end,
            shape,
            pre,
            start,
            end,
            post,
        };
        self.append(MixOperation::Fade { target, envelope })
    }

    /// Widen the stream by one channel without storing an operation.
    ///
    /// Used by layouts that render an extra channel pair on their own.
    pub fn add_channel(&mut self) -> bool {
        if let Err(err) = self.check_configurable() {
            debug!("channel widening ignored: {}", err);
            return false;
        }
        if self.topology.output_channels() + 1 > MAX_CHANNELS {
            debug!(
                "channel widening ignored: {}",
                MixError::ChannelLimit(MAX_CHANNELS)
            );
            return false;
        }
        self.topology.add_source_channel();
        self.stream.channels += 1;
        true
    }

    fn push_fade(&mut self, target: ChannelTarget, envelope: FadeEnvelope) -> Result<(), MixError> {
        check_gain(envelope.vol_start)?;
        check_gain(envelope.vol_end)?;
        self.check_target(target)?;
        if !envelope.is_valid() {
            return Err(MixError::InvalidFadeWindow);
        }

        let prev_index = self.last_fade(target);
        let prev = prev_index.and_then(|index| match &self.chain[index] {
            MixOperation::Fade { envelope, .. } => Some(*envelope),
            _ => None,
        });
        let stitched = stitch(prev.as_ref(), envelope);

        self.store(MixOperation::Fade {
            target,
            envelope: stitched.next,
        })?;

        // only touch the earlier fade once the new one is stored
        if let (Some(index), Some(post)) = (prev_index, stitched.prev_post) {
            if let MixOperation::Fade { envelope, .. } = &mut self.chain[index] {
                envelope.post = Some(post);
            }
        }
        Ok(())
    }

    fn last_fade(&self, target: ChannelTarget) -> Option<usize> {
        self.chain.iter().rposition(|op| match op {
            MixOperation::Fade {
                target: fade_target,
                ..
            } => *fade_target == target,
            _ => false,
        })
    }

    fn check_target(&self, target: ChannelTarget) -> Result<(), MixError> {
        match target {
            ChannelTarget::All => Ok(()),
            ChannelTarget::Channel(ch) => self.topology.check_channel(ch),
        }
    }

    fn store(&mut self, op: MixOperation) -> Result<(), MixError> {
        if self.chain.len() >= MAX_MIXING {
            return Err(MixError::ChainFull(MAX_MIXING));
        }
        self.chain.push(op);
        Ok(())
    }
}

fn check_gain(gain: f32) -> Result<(), MixError> {
    if gain.is_finite() {
        Ok(())
    } else {
        Err(MixError::InvalidGain(gain))
    }
}

/// Result of stitching a new fade against the previous fade on its target.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Stitched {
    next: FadeEnvelope,
    /// New `post` boundary for the previous fade, if it changes.
    prev_post: Option<i64>,
}

/// Resolve unbounded boundaries between adjoining fades.
///
/// ```text
/// <-----|-----|-----> <-----|-----|----->
/// pre1  s1    e1  post1 pre2 s2   e2  post2
/// ```
///
/// When either `post1` or `pre2` is unbounded and the windows do not
/// overlap, the open side is closed against the other fade so the pair hands
/// over at one position. Fades without a predecessor that start (or end) at
/// unity gain drop their held region, since unity gain is a no-op there.
fn stitch(prev: Option<&FadeEnvelope>, mut next: FadeEnvelope) -> Stitched {
    let Some(prev) = prev else {
        if next.vol_start == 1.0 && next.pre.is_none() {
            next.pre = Some(next.start);
        }
        if next.vol_end == 1.0 && next.post.is_none() {
            next.post = Some(next.end);
        }
        return Stitched {
            next,
            prev_post: None,
        };
    };

    let unchanged = Stitched {
        next,
        prev_post: None,
    };
    if prev.post.is_some() && next.pre.is_some() {
        return unchanged;
    }

    let overlapping = prev.end > next.start
        || prev.post.map_or(false, |post| post > next.start)
        || next.pre.map_or(false, |pre| pre < prev.end);
    if overlapping {
        return unchanged;
    }

    match (prev.post, next.pre) {
        (None, None) => {
            next.pre = Some(prev.end);
            Stitched {
                next,
                prev_post: Some(prev.end),
            }
        }
        (Some(post), None) => {
            next.pre = Some(post);
            Stitched {
                next,
                prev_post: None,
            }
        }
        (None, Some(pre)) => Stitched {
            next,
            prev_post: Some(pre),
        },
        (Some(_), Some(_)) => unchanged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamInfo;

    fn mixer(channels: usize) -> Mixer {
        Mixer::new(StreamInfo::new(channels, 44_100))
    }

    fn envelope(
        vol_start: f32,
        vol_end: f32,
        pre: Option<i64>,
        start: i64,
        end: i64,
        post: Option<i64>,
    ) -> FadeEnvelope {
        FadeEnvelope {
            vol_start,
            vol_end,
            shape: FadeShape::Triangular,
            pre,
            start,
            end,
            post,
        }
    }

    fn fade_at(mixer: &Mixer, index: usize) -> FadeEnvelope {
        match mixer.operations()[index] {
            MixOperation::Fade { envelope, .. } => envelope,
            other => panic!("expected fade, got {:?}", other),
        }
    }

    #[test]
    fn identity_gains_are_elided() {
        let mut mixer = mixer(2);
        assert!(mixer.append_volume(ChannelTarget::All, 1.0));
        assert!(mixer.append_volume(ChannelTarget::Channel(1), 1.0));
        assert!(mixer.append_limit(ChannelTarget::All, 1.0));
        assert!(mixer.is_empty());
        assert!(mixer.append_volume(ChannelTarget::All, 0.5));
        assert_eq!(mixer.len(), 1);
    }

    #[test]
    fn out_of_range_channels_are_rejected() {
        let mut mixer = mixer(2);
        assert_eq!(
            mixer.try_append(MixOperation::Swap { a: 0, b: 2 }),
            Err(MixError::InvalidChannel {
                channel: 2,
                channels: 2
            })
        );
        assert!(!mixer.append_add(2, 0, 1.0));
        assert!(!mixer.append_volume(ChannelTarget::Channel(5), 0.5));
        assert!(!mixer.append_downmix(2));
        assert!(mixer.is_empty());
        assert_eq!(mixer.output_channels(), 2);
    }

    #[test]
    fn degenerate_operations_are_rejected() {
        let mut mixer = mixer(2);
        assert_eq!(
            mixer.try_append(MixOperation::Swap { a: 1, b: 1 }),
            Err(MixError::SameChannel(1))
        );
        assert!(!mixer.append_add(0, 1, 0.0));
        assert!(!mixer.append_limit(ChannelTarget::All, -0.5));
        assert!(!mixer.append_volume(ChannelTarget::All, f32::NAN));
        assert!(mixer.is_empty());
    }

    #[test]
    fn topology_follows_append_order() {
        let mut mixer = mixer(2);
        assert!(mixer.append_upmix(2));
        assert!(mixer.append_swap(0, 2));
        assert!(mixer.append_downmix(0));
        assert_eq!(mixer.output_channels(), 2);
        assert_eq!(mixer.mixing_channels(), 3);
        assert!(mixer.append_truncate(1));
        assert!(!mixer.append_swap(0, 1));
        assert_eq!(mixer.output_channels(), 1);
    }

    #[test]
    fn chain_capacity_is_bounded() {
        let mut mixer = mixer(2);
        for _ in 0..MAX_MIXING {
            assert!(mixer.append_swap(0, 1));
        }
        assert_eq!(
            mixer.try_append(MixOperation::Upmix { dst: 0 }),
            Err(MixError::ChainFull(MAX_MIXING))
        );
        assert_eq!(mixer.output_channels(), 2);
        assert_eq!(mixer.len(), MAX_MIXING);
    }

    #[test]
    fn malformed_fade_windows_are_rejected() {
        let mut mixer = mixer(2);
        assert_eq!(
            mixer.try_append(MixOperation::Fade {
                target: ChannelTarget::All,
                envelope: envelope(1.0, 0.0, Some(300), 200, 100, None),
            }),
            Err(MixError::InvalidFadeWindow)
        );
        assert!(!mixer.append_fade(
            ChannelTarget::All,
            1.0,
            0.0,
            FadeShape::Triangular,
            None,
            -5,
            100,
            None
        ));
    }

    #[test]
    fn lone_fade_out_collapses_held_region() {
        let mut mixer = mixer(2);
        assert!(mixer.append_fade(
            ChannelTarget::All,
            1.0,
            0.0,
            FadeShape::Triangular,
            None,
            1000,
            2000,
            None
        ));
        let fade = fade_at(&mixer, 0);
        assert_eq!(fade.pre, Some(1000));
        assert_eq!(fade.post, None);
    }

    #[test]
    fn lone_fade_in_collapses_trailing_region() {
        let mut mixer = mixer(2);
        assert!(mixer.append_fade(
            ChannelTarget::Channel(0),
            0.0,
            1.0,
            FadeShape::Triangular,
            None,
            1000,
            2000,
            None
        ));
        let fade = fade_at(&mixer, 0);
        assert_eq!(fade.pre, None);
        assert_eq!(fade.post, Some(2000));
    }

    #[test]
    fn adjoining_fades_are_stitched() {
        let mut mixer = mixer(2);
        assert!(mixer.append_fade(
            ChannelTarget::Channel(0),
            0.5,
            0.0,
            FadeShape::Triangular,
            None,
            100,
            200,
            None
        ));
        assert!(mixer.append_fade(
            ChannelTarget::Channel(0),
            0.0,
            0.5,
            FadeShape::Triangular,
            None,
            200,
            300,
            None
        ));
        assert_eq!(fade_at(&mixer, 0).post, Some(200));
        assert_eq!(fade_at(&mixer, 1).pre, Some(200));
    }

    #[test]
    fn stitch_uses_fixed_boundary_of_other_fade() {
        let prev = envelope(1.0, 0.0, None, 100, 200, Some(250));
        let next = envelope(0.0, 1.0, None, 300, 400, None);
        let stitched = stitch(Some(&prev), next);
        assert_eq!(stitched.next.pre, Some(250));
        assert_eq!(stitched.prev_post, None);

        let prev = envelope(1.0, 0.0, None, 100, 200, None);
        let next = envelope(0.0, 1.0, Some(260), 300, 400, None);
        let stitched = stitch(Some(&prev), next);
        assert_eq!(stitched.next.pre, Some(260));
        assert_eq!(stitched.prev_post, Some(260));
    }

    #[test]
    fn overlapping_fades_are_left_alone() {
        let prev = envelope(1.0, 0.0, None, 100, 300, None);
        let next = envelope(0.0, 1.0, None, 200, 400, None);
        let stitched = stitch(Some(&prev), next);
        assert_eq!(stitched.next, next);
        assert_eq!(stitched.prev_post, None);
    }

    #[test]
    fn fades_on_other_targets_do_not_stitch() {
        let mut mixer = mixer(2);
        assert!(mixer.append_fade(
            ChannelTarget::Channel(0),
            0.5,
            0.0,
            FadeShape::Triangular,
            None,
            100,
            200,
            None
        ));
        assert!(mixer.append_fade(
            ChannelTarget::All,
            0.0,
            0.5,
            FadeShape::Triangular,
            None,
            200,
            300,
            None
        ));
        assert_eq!(fade_at(&mixer, 0).post, None);
        assert_eq!(fade_at(&mixer, 1).pre, None);
    }

    #[test]
    fn rejected_fade_does_not_touch_previous() {
        let mut mixer = mixer(2);
        assert!(mixer.append_fade(
            ChannelTarget::Channel(1),
            0.5,
            0.0,
            FadeShape::Triangular,
            None,
            100,
            200,
            None
        ));
        while mixer.len() < MAX_MIXING {
            assert!(mixer.append_swap(0, 1));
        }
        assert!(!mixer.append_fade(
            ChannelTarget::Channel(1),
            0.0,
            0.5,
            FadeShape::Triangular,
            None,
            200,
            300,
            None
        ));
        assert_eq!(fade_at(&mixer, 0).post, None);
    }

    #[test]
    fn add_channel_widens_source_and_output() {
        let mut mixer = mixer(2);
        assert!(mixer.add_channel());
        assert_eq!(mixer.output_channels(), 3);
        assert_eq!(mixer.mixing_channels(), 3);
        assert_eq!(mixer.query().input_channels, 3);
        assert_eq!(mixer.stream().channels, 3);
        assert!(mixer.activate(4));
        assert!(!mixer.add_channel());
    }
}
