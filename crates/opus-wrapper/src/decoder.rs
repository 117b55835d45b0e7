use crate::config::CodecConfig;
use crate::error::CodecError;
use tracing::{debug, error, info};

#[derive(Debug)]
struct DecoderState {
    handle: opus::Decoder,
    config: CodecConfig,
}

/// Opus decoder with the same validate-then-inert contract as [`crate::Encoder`].
#[derive(Debug)]
pub struct Decoder {
    state: Option<DecoderState>,
}

impl Decoder {
    pub fn new(sample_rate: i32, channels: i32) -> Self {
        match Self::try_new(sample_rate, channels) {
            Ok(decoder) => decoder,
            Err(err) => {
                error!(sample_rate, channels, %err, "could not construct opus decoder");
                Decoder { state: None }
            }
        }
    }

    pub fn try_new(sample_rate: i32, channels: i32) -> Result<Self, CodecError> {
        let config = CodecConfig::new(sample_rate, channels)?;

        info!(
            sample_rate = %config.sample_rate(),
            channels = %config.channels(),
            "creating opus decoder"
        );

        let handle = opus::Decoder::new(config.sample_rate().hz(), config.channels().to_opus())?;
        Ok(Decoder {
            state: Some(DecoderState { handle, config }),
        })
    }

    pub fn valid(&self) -> bool {
        self.state.is_some()
    }

    pub fn config(&self) -> Option<CodecConfig> {
        self.state.as_ref().map(|state| state.config)
    }

    /// Decodes `packets` in order and concatenates the resulting frames.
    ///
    /// An empty packet marks a lost one. With `use_fec` set, a lost packet
    /// followed by a present one is rebuilt from the FEC data carried in that
    /// next packet; otherwise the gap is filled by loss concealment. Packets
    /// libopus rejects contribute no samples.
    pub fn decode<P: AsRef<[u8]>>(
        &mut self,
        packets: &[P],
        frame_size: usize,
        use_fec: bool,
    ) -> Vec<i16> {
        let Some(config) = self.config() else {
            return Vec::new();
        };

        if let Err(err) = config.check_frame_size(frame_size) {
            error!(%err, "refusing to decode");
            return Vec::new();
        }

        let mut decoded = Vec::new();
        for (index, packet) in packets.iter().enumerate() {
            let packet = packet.as_ref();
            let result = if !packet.is_empty() {
                self.decode_packet(packet, frame_size, false)
            } else {
                let next: Option<&[u8]> = packets.get(index + 1).map(|next| next.as_ref());
                match next {
                    Some(next) if use_fec && !next.is_empty() => {
                        debug!(index, "recovering lost packet from FEC");
                        self.decode_packet(next, frame_size, true)
                    }
                    _ => {
                        debug!(index, "concealing lost packet");
                        self.decode_packet(&[], frame_size, false)
                    }
                }
            };

            match result {
                Ok(pcm) => decoded.extend_from_slice(&pcm),
                Err(err) => error!(index, %err, "decode error"),
            }
        }
        decoded
    }

    /// Decodes a single packet into at most `frame_size` samples per channel.
    ///
    /// `decode_fec` is handed straight to libopus: with it set, the packet's
    /// FEC data is decoded, which describes the frame *before* this packet.
    pub fn decode_packet(
        &mut self,
        packet: &[u8],
        frame_size: usize,
        decode_fec: bool,
    ) -> Result<Vec<i16>, CodecError> {
        let state = self.state.as_mut().ok_or(CodecError::InvalidInstance)?;
        state.config.check_frame_size(frame_size)?;

        let channels = state.config.channels().count();
        let mut pcm = vec![0; frame_size * channels];
        let samples = state.handle.decode(packet, &mut pcm, decode_fec)?;
        pcm.truncate(samples * channels);
        Ok(pcm)
    }

    /// Synthesises a frame for a packet that is gone for good.
    pub fn decode_dummy(&mut self, frame_size: usize) -> Vec<i16> {
        if !self.valid() {
            return Vec::new();
        }

        self.decode_packet(&[], frame_size, true)
            .unwrap_or_else(|err| {
                error!(frame_size, %err, "dummy decode error");
                Vec::new()
            })
    }

    pub fn reset_state(&mut self) -> bool {
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        match state.handle.reset_state() {
            Ok(()) => true,
            Err(err) => {
                error!(%err, "failed to reset opus decoder");
                false
            }
        }
    }
}
