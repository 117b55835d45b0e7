use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("unsupported sample rate: {0}")]
    UnsupportedSampleRate(i32),

    #[error("unsupported channel count: {0}")]
    UnsupportedChannelCount(i32),

    #[error("expected loss percent out of range: {0}")]
    InvalidLossPercent(i32),

    #[error("invalid frame size: {0}")]
    InvalidFrameSize(usize),

    #[error("failed within opus: {0}")]
    Opus(#[from] opus::Error),

    #[error("codec instance is not valid")]
    InvalidInstance,

    #[error("poisoned lock")]
    PoisonedLock,
}
