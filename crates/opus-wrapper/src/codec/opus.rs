use super::AudioCodec;
use crate::config::{Application, CodecConfig};
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::CodecError;
use std::sync::Mutex;
use tracing::info;

/// Encoder/decoder pair with 20 ms frames, each side behind its own lock.
#[derive(Debug)]
pub struct OpusAudioCodec {
    encoder: Mutex<Encoder>,
    decoder: Mutex<Decoder>,

    config: CodecConfig,
    frame_size: usize,
}

impl OpusAudioCodec {
    pub fn config(&self) -> CodecConfig {
        self.config
    }

    /// Samples per channel in one frame.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }
}

impl AudioCodec for OpusAudioCodec {
    fn new(sample_rate: i32, channels: i32) -> Result<Self, CodecError> {
        let config = CodecConfig::new(sample_rate, channels)?;
        let frame_size = config.frame_size_20ms();

        info!(
            sample_rate = %config.sample_rate(),
            channels = %config.channels(),
            frame_size,
            "creating opus codec"
        );

        Ok(OpusAudioCodec {
            encoder: Mutex::new(Encoder::try_new(
                sample_rate,
                channels,
                Application::Audio,
                0,
            )?),
            decoder: Mutex::new(Decoder::try_new(sample_rate, channels)?),
            config,
            frame_size,
        })
    }

    fn encode(&self, pcm: &[i16]) -> Result<Vec<u8>, CodecError> {
        if pcm.len() != self.config.frame_len(self.frame_size) {
            return Err(CodecError::InvalidFrameSize(pcm.len()));
        }

        self.encoder
            .lock()
            .map_err(|_| CodecError::PoisonedLock)?
            .encode_frame(pcm)
    }

    fn decode(&self, packet: &[u8]) -> Result<Vec<i16>, CodecError> {
        self.decoder
            .lock()
            .map_err(|_| CodecError::PoisonedLock)?
            .decode_packet(packet, self.frame_size, false)
    }

    fn conceal(&self) -> Result<Vec<i16>, CodecError> {
        self.decoder
            .lock()
            .map_err(|_| CodecError::PoisonedLock)?
            .decode_packet(&[], self.frame_size, true)
    }
}
