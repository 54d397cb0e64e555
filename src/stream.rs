//! Stream description handed to the mixer by the format decoders.

/// Loop region of a stream, in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopRegion {
    pub start: i64,
    pub end: i64,
}

impl LoopRegion {
    /// Create a loop region from start/end sample positions.
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Number of samples inside one loop iteration.
    pub fn len(&self) -> i64 {
        self.end - self.start
    }

    /// Return `true` when the loop region is empty.
    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }
}

/// Static properties of the decoded stream the mixer is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub channels: usize,
    pub sample_rate: u32,
    pub loop_region: Option<LoopRegion>,
    /// Speaker layout bitmask as reported by the container, if any.
    pub channel_layout: Option<u32>,
}

impl StreamInfo {
    /// Describe a non-looping stream.
    pub fn new(channels: usize, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
            loop_region: None,
            channel_layout: None,
        }
    }

    /// Attach a loop region.
    pub fn with_loop(mut self, start: i64, end: i64) -> Self {
        self.loop_region = Some(LoopRegion::new(start, end));
        self
    }

    /// Attach a speaker layout bitmask.
    pub fn with_channel_layout(mut self, layout: u32) -> Self {
        self.channel_layout = Some(layout);
        self
    }

    /// Convert a duration in seconds to a sample count at this stream's rate.
    pub fn seconds_to_samples(&self, seconds: f64) -> i64 {
        (seconds * self.sample_rate as f64) as i64
    }
}

/// Decoder position at the start of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodePosition {
    /// Current sample inside the stream (wraps back on every loop).
    pub current_sample: i64,
    /// Number of completed loop iterations.
    pub loop_count: u32,
}

impl DecodePosition {
    pub fn new(current_sample: i64, loop_count: u32) -> Self {
        Self {
            current_sample,
            loop_count,
        }
    }

    /// Absolute timeline position, counting every loop iteration played.
    pub fn absolute(&self, loop_region: Option<LoopRegion>) -> i64 {
        match loop_region {
            Some(region) if self.current_sample > region.start => {
                let into_loop = self.current_sample - region.start;
                region.start + into_loop + region.len() * self.loop_count as i64
            }
            _ => self.current_sample,
        }
    }
}
