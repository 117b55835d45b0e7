use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub const SUPPORTED_SAMPLE_RATES: [i32; 5] = [8000, 12000, 16000, 24000, 48000];

/// Largest packet libopus will produce for a single frame.
pub const MAX_PACKET_SIZE: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum SampleRate {
    Hz8000,
    Hz12000,
    Hz16000,
    Hz24000,
    Hz48000,
}

impl SampleRate {
    pub fn hz(&self) -> u32 {
        match self {
            SampleRate::Hz8000 => 8000,
            SampleRate::Hz12000 => 12000,
            SampleRate::Hz16000 => 16000,
            SampleRate::Hz24000 => 24000,
            SampleRate::Hz48000 => 48000,
        }
    }
}

impl TryFrom<i32> for SampleRate {
    type Error = CodecError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            8000 => Ok(SampleRate::Hz8000),
            12000 => Ok(SampleRate::Hz12000),
            16000 => Ok(SampleRate::Hz16000),
            24000 => Ok(SampleRate::Hz24000),
            48000 => Ok(SampleRate::Hz48000),
            _ => Err(CodecError::UnsupportedSampleRate(value)),
        }
    }
}

impl From<SampleRate> for i32 {
    fn from(value: SampleRate) -> Self {
        value.hz() as i32
    }
}

impl Display for SampleRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Hz", self.hz())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Channels {
    Mono,
    Stereo,
}

impl Channels {
    pub fn count(&self) -> usize {
        match self {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        }
    }

    pub(crate) fn to_opus(self) -> opus::Channels {
        match self {
            Channels::Mono => opus::Channels::Mono,
            Channels::Stereo => opus::Channels::Stereo,
        }
    }
}

impl TryFrom<i32> for Channels {
    type Error = CodecError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Channels::Mono),
            2 => Ok(Channels::Stereo),
            _ => Err(CodecError::UnsupportedChannelCount(value)),
        }
    }
}

impl From<Channels> for i32 {
    fn from(value: Channels) -> Self {
        value.count() as i32
    }
}

impl Display for Channels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channels::Mono => write!(f, "Mono"),
            Channels::Stereo => write!(f, "Stereo"),
        }
    }
}

/// Coding mode the encoder is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Application {
    /// Speech, favours intelligibility.
    Voip,
    /// Music and mixed content.
    Audio,
    /// Lowest algorithmic delay, disables the speech-optimised modes.
    LowDelay,
}

impl Application {
    pub(crate) fn to_opus(self) -> opus::Application {
        match self {
            Application::Voip => opus::Application::Voip,
            Application::Audio => opus::Application::Audio,
            Application::LowDelay => opus::Application::LowDelay,
        }
    }
}

/// Validated sample rate and channel layout shared by encoders and decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodecConfig {
    sample_rate: SampleRate,
    channels: Channels,
}

impl CodecConfig {
    pub fn new(sample_rate: i32, channels: i32) -> Result<Self, CodecError> {
        Ok(CodecConfig {
            sample_rate: SampleRate::try_from(sample_rate)?,
            channels: Channels::try_from(channels)?,
        })
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// Number of interleaved samples in one frame of `frame_size` samples per channel.
    pub fn frame_len(&self, frame_size: usize) -> usize {
        frame_size * self.channels.count()
    }

    /// Samples per channel in a 20 ms frame.
    pub fn frame_size_20ms(&self) -> usize {
        self.sample_rate.hz() as usize / 1000 * 20
    }

    /// Samples per channel in a 120 ms frame, the longest libopus handles.
    pub fn max_frame_size(&self) -> usize {
        self.sample_rate.hz() as usize / 1000 * 120
    }

    pub fn check_frame_size(&self, frame_size: usize) -> Result<(), CodecError> {
        if frame_size == 0 || frame_size > self.max_frame_size() {
            return Err(CodecError::InvalidFrameSize(frame_size));
        }
        Ok(())
    }
}
