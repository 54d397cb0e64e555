use thiserror::Error;

/// Reasons a mixing request was refused.
///
/// None of these are fatal for the stream: the requested effect is skipped
/// and decoding continues unmixed or partially mixed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MixError {
    #[error("mixer has been torn down")]
    Closed,
    #[error("mixer is active, chain is frozen")]
    Active,
    #[error("mixing chain is full ({0} operations)")]
    ChainFull(usize),
    #[error("channel {channel} out of range for {channels} channels")]
    InvalidChannel { channel: usize, channels: usize },
    #[error("operation uses channel {0} as both source and destination")]
    SameChannel(usize),
    #[error("channel count would leave the range 1..={0}")]
    ChannelLimit(usize),
    #[error("invalid gain {0}")]
    InvalidGain(f32),
    #[error("invalid fade window")]
    InvalidFadeWindow,
    #[error("stream has no loop region")]
    MissingLoop,
    #[error("could not allocate {bytes} bytes for the mix buffer")]
    Allocation { bytes: usize },
}
