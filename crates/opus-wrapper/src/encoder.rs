use crate::config::{Application, CodecConfig, MAX_PACKET_SIZE};
use crate::error::CodecError;
use tracing::{debug, error, info, warn};

#[derive(Debug)]
struct EncoderState {
    handle: opus::Encoder,
    config: CodecConfig,
}

/// Opus encoder that validates its configuration up front.
///
/// Construction never fails outright: an unsupported sample rate or channel
/// count, or a libopus allocation failure, leaves an inert instance for which
/// [`Encoder::valid`] returns `false`. Every operation on such an instance is
/// a no-op returning an empty or `false` result.
#[derive(Debug)]
pub struct Encoder {
    state: Option<EncoderState>,
    expected_loss_percent: i32,
}

impl Encoder {
    pub fn new(sample_rate: i32, channels: i32, application: Application) -> Self {
        Self::with_expected_loss(sample_rate, channels, application, 0)
    }

    /// Like [`Encoder::new`], with a packet loss hint in percent (0-100).
    ///
    /// A non-zero hint enables in-band FEC so the decoder can rebuild a lost
    /// frame from the packet that follows it.
    pub fn with_expected_loss(
        sample_rate: i32,
        channels: i32,
        application: Application,
        expected_loss_percent: i32,
    ) -> Self {
        match Self::try_new(sample_rate, channels, application, expected_loss_percent) {
            Ok(encoder) => encoder,
            Err(err) => {
                error!(
                    sample_rate,
                    channels,
                    expected_loss_percent,
                    %err,
                    "could not construct opus encoder"
                );
                Encoder {
                    state: None,
                    expected_loss_percent,
                }
            }
        }
    }

    pub fn try_new(
        sample_rate: i32,
        channels: i32,
        application: Application,
        expected_loss_percent: i32,
    ) -> Result<Self, CodecError> {
        let config = CodecConfig::new(sample_rate, channels)?;
        if !(0..=100).contains(&expected_loss_percent) {
            return Err(CodecError::InvalidLossPercent(expected_loss_percent));
        }

        info!(
            sample_rate = %config.sample_rate(),
            channels = %config.channels(),
            ?application,
            "creating opus encoder"
        );

        let mut handle = opus::Encoder::new(
            config.sample_rate().hz(),
            config.channels().to_opus(),
            application.to_opus(),
        )?;

        if expected_loss_percent > 0 {
            info!(expected_loss_percent, "enabling in-band FEC in encoder");
            handle.set_inband_fec(true)?;
            handle.set_packet_loss_perc(expected_loss_percent)?;
        }

        Ok(Encoder {
            state: Some(EncoderState { handle, config }),
            expected_loss_percent,
        })
    }

    pub fn valid(&self) -> bool {
        self.state.is_some()
    }

    pub fn config(&self) -> Option<CodecConfig> {
        self.state.as_ref().map(|state| state.config)
    }

    pub fn expected_loss_percent(&self) -> i32 {
        self.expected_loss_percent
    }

    /// Sets a target bitrate in bits per second.
    ///
    /// This does not switch to constant bitrate on its own, see
    /// [`Encoder::set_variable_bitrate`].
    pub fn set_bitrate(&mut self, bits_per_second: i32) -> bool {
        self.apply("bitrate", |handle| {
            handle.set_bitrate(opus::Bitrate::Bits(bits_per_second))
        })
    }

    pub fn bitrate(&mut self) -> Option<i32> {
        match self.query("bitrate", |handle| handle.get_bitrate())? {
            opus::Bitrate::Bits(bits) => Some(bits),
            opus::Bitrate::Auto | opus::Bitrate::Max => None,
        }
    }

    /// `0` selects constant bitrate, any other value variable bitrate.
    pub fn set_variable_bitrate(&mut self, enabled: i32) -> bool {
        self.apply("vbr", |handle| handle.set_vbr(enabled != 0))
    }

    pub fn variable_bitrate(&mut self) -> Option<bool> {
        self.query("vbr", |handle| handle.get_vbr())
    }

    pub fn set_variable_bitrate_constraint(&mut self, constrained: bool) -> bool {
        self.apply("vbr constraint", |handle| handle.set_vbr_constraint(constrained))
    }

    pub fn set_inband_fec(&mut self, enabled: bool) -> bool {
        self.apply("inband fec", |handle| handle.set_inband_fec(enabled))
    }

    pub fn inband_fec(&mut self) -> Option<bool> {
        self.query("inband fec", |handle| handle.get_inband_fec())
    }

    pub fn set_packet_loss_percent(&mut self, percent: i32) -> bool {
        if !(0..=100).contains(&percent) {
            warn!(percent, "packet loss percent out of range");
            return false;
        }
        self.apply("packet loss", |handle| handle.set_packet_loss_perc(percent))
    }

    pub fn packet_loss_percent(&mut self) -> Option<i32> {
        self.query("packet loss", |handle| handle.get_packet_loss_perc())
    }

    pub fn reset_state(&mut self) -> bool {
        self.apply("reset", |handle| handle.reset_state())
    }

    /// Encodes `pcm` as consecutive frames of `frame_size` samples per channel.
    ///
    /// Returns one packet per complete frame. Samples left over after the last
    /// complete frame are dropped rather than padded, so callers streaming
    /// arbitrary buffer sizes must carry the remainder over themselves. A frame
    /// libopus rejects shows up as an empty packet in its slot.
    pub fn encode(&mut self, pcm: &[i16], frame_size: usize) -> Vec<Vec<u8>> {
        let Some(config) = self.config() else {
            return Vec::new();
        };

        if let Err(err) = config.check_frame_size(frame_size) {
            warn!(%err, "refusing to encode");
            return Vec::new();
        }

        let frame_len = config.frame_len(frame_size);

        let remainder = pcm.len() % frame_len;
        if remainder != 0 {
            warn!(
                dropped_samples = remainder,
                "PCM samples contained an incomplete final frame, ignoring it"
            );
        }

        pcm.chunks_exact(frame_len)
            .map(|frame| match self.encode_frame(frame) {
                Ok(packet) => packet,
                Err(err) => {
                    error!(%err, "encode error");
                    Vec::new()
                }
            })
            .collect()
    }

    /// Encodes a single frame of interleaved samples.
    pub fn encode_frame(&mut self, frame: &[i16]) -> Result<Vec<u8>, CodecError> {
        let state = self.state.as_mut().ok_or(CodecError::InvalidInstance)?;
        let channels = state.config.channels().count();
        if frame.len() % channels != 0 {
            return Err(CodecError::InvalidFrameSize(frame.len()));
        }
        state.config.check_frame_size(frame.len() / channels)?;

        let mut packet = vec![0; MAX_PACKET_SIZE];
        let len = state.handle.encode(frame, &mut packet)?;
        packet.truncate(len);
        debug!(samples = frame.len(), bytes = len, "encoded frame");
        Ok(packet)
    }

    fn apply<F>(&mut self, what: &'static str, ctl: F) -> bool
    where
        F: FnOnce(&mut opus::Encoder) -> opus::Result<()>,
    {
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        match ctl(&mut state.handle) {
            Ok(()) => true,
            Err(err) => {
                warn!(setting = what, %err, "failed to configure opus encoder");
                false
            }
        }
    }

    fn query<T, F>(&mut self, what: &'static str, ctl: F) -> Option<T>
    where
        F: FnOnce(&mut opus::Encoder) -> opus::Result<T>,
    {
        let state = self.state.as_mut()?;
        match ctl(&mut state.handle) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(setting = what, %err, "failed to query opus encoder");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SUPPORTED_SAMPLE_RATES;
    use crate::testing::{
        dummy_audio, FRAME_SIZE, INVALID_CHANNEL_COUNTS, INVALID_SAMPLE_RATES, NUM_CHANNELS,
        SAMPLE_RATE, SOME_VALID_LOSSES,
    };

    #[test]
    fn should_create_encoder_for_valid_configs() {
        for sample_rate in SUPPORTED_SAMPLE_RATES {
            for channels in [1, 2] {
                assert!(Encoder::new(sample_rate, channels, Application::Audio).valid());
                for loss in SOME_VALID_LOSSES {
                    assert!(
                        Encoder::with_expected_loss(sample_rate, channels, Application::Audio, loss)
                            .valid()
                    );
                }
            }
        }
    }

    #[test]
    fn should_reject_invalid_sample_rates() {
        for sample_rate in INVALID_SAMPLE_RATES {
            for channels in [1, 2] {
                assert!(!Encoder::new(sample_rate, channels, Application::Audio).valid());
                for loss in SOME_VALID_LOSSES {
                    assert!(
                        !Encoder::with_expected_loss(sample_rate, channels, Application::Audio, loss)
                            .valid()
                    );
                }
            }
        }
    }

    #[test]
    fn should_reject_invalid_channel_counts() {
        for sample_rate in SUPPORTED_SAMPLE_RATES {
            for channels in INVALID_CHANNEL_COUNTS {
                assert!(!Encoder::new(sample_rate, channels, Application::Audio).valid());
                for loss in SOME_VALID_LOSSES {
                    assert!(
                        !Encoder::with_expected_loss(sample_rate, channels, Application::Audio, loss)
                            .valid()
                    );
                }
            }
        }
    }

    #[test]
    fn should_reject_out_of_range_loss() {
        assert!(matches!(
            Encoder::try_new(SAMPLE_RATE, NUM_CHANNELS, Application::Audio, 101),
            Err(CodecError::InvalidLossPercent(101))
        ));
        assert!(!Encoder::with_expected_loss(SAMPLE_RATE, NUM_CHANNELS, Application::Audio, -1).valid());
    }

    #[test]
    fn should_report_configuration_error_from_try_new() {
        assert!(matches!(
            Encoder::try_new(44100, 2, Application::Voip, 0),
            Err(CodecError::UnsupportedSampleRate(44100))
        ));
        assert!(matches!(
            Encoder::try_new(48000, 3, Application::Voip, 0),
            Err(CodecError::UnsupportedChannelCount(3))
        ));
    }

    #[test]
    fn should_enable_fec_when_loss_expected() {
        let mut encoder =
            Encoder::with_expected_loss(SAMPLE_RATE, NUM_CHANNELS, Application::Voip, 10);
        assert_eq!(encoder.expected_loss_percent(), 10);
        assert_eq!(encoder.inband_fec(), Some(true));
        assert_eq!(encoder.packet_loss_percent(), Some(10));

        let mut encoder = Encoder::new(SAMPLE_RATE, NUM_CHANNELS, Application::Voip);
        assert_eq!(encoder.inband_fec(), Some(false));
        assert_eq!(encoder.packet_loss_percent(), Some(0));
    }

    #[test]
    fn should_encode_one_packet_per_frame() {
        let mut encoder = Encoder::new(SAMPLE_RATE, NUM_CHANNELS, Application::Audio);
        let mut pcm = dummy_audio();
        pcm.extend(dummy_audio());
        pcm.extend(dummy_audio());

        let encoded = encoder.encode(&pcm, FRAME_SIZE);
        assert_eq!(encoded.len(), 3);
        assert!(encoded.iter().all(|packet| !packet.is_empty()));
    }

    #[test]
    fn should_drop_incomplete_trailing_frame() {
        let mut encoder = Encoder::new(SAMPLE_RATE, NUM_CHANNELS, Application::Audio);
        let mut pcm = dummy_audio();
        pcm.push(0);

        assert_eq!(encoder.encode(&pcm, FRAME_SIZE).len(), 1);
        assert!(encoder.encode(&pcm[..100], FRAME_SIZE).is_empty());
    }

    #[test]
    fn should_encode_fixed_bitrate_packet_size() {
        let mut encoder = Encoder::new(SAMPLE_RATE, NUM_CHANNELS, Application::Voip);
        let bitrate = 24000;
        assert!(encoder.set_bitrate(bitrate));
        assert!(encoder.set_variable_bitrate(0));
        assert_eq!(encoder.variable_bitrate(), Some(false));
        assert_eq!(encoder.bitrate(), Some(bitrate));

        let encoded = encoder.encode(&dummy_audio(), FRAME_SIZE);
        assert_eq!(encoded.len(), 1);
        assert_eq!(
            encoded[0].len(),
            FRAME_SIZE * (bitrate as usize / 8) / SAMPLE_RATE as usize
        );
    }

    #[test]
    fn should_toggle_vbr_and_constraint() {
        let mut encoder = Encoder::new(SAMPLE_RATE, NUM_CHANNELS, Application::Audio);
        assert!(encoder.set_variable_bitrate(1));
        assert_eq!(encoder.variable_bitrate(), Some(true));
        assert!(encoder.set_variable_bitrate_constraint(true));
        assert!(encoder.set_inband_fec(true));
        assert_eq!(encoder.inband_fec(), Some(true));
        assert!(encoder.set_packet_loss_percent(20));
        assert!(!encoder.set_packet_loss_percent(120));
        assert_eq!(encoder.packet_loss_percent(), Some(20));
        assert!(encoder.reset_state());
    }

    #[test]
    fn should_emit_empty_packet_for_rejected_frame() {
        let mut encoder = Encoder::new(SAMPLE_RATE, NUM_CHANNELS, Application::Audio);
        // 100 samples per channel is not a legal opus frame duration at 48 kHz
        let encoded = encoder.encode(&vec![0; 100 * 2 * 2], 100);
        assert_eq!(encoded.len(), 2);
        assert!(encoded.iter().all(|packet| packet.is_empty()));
        assert!(encoder.valid());

        assert!(matches!(
            encoder.encode_frame(&vec![0; 200]),
            Err(CodecError::Opus(_))
        ));
        assert!(matches!(
            encoder.encode_frame(&[0; 3]),
            Err(CodecError::InvalidFrameSize(3))
        ));
        assert_eq!(encoder.encode(&dummy_audio(), FRAME_SIZE).len(), 1);
    }

    #[test]
    fn should_refuse_out_of_range_frame_size() {
        let mut encoder = Encoder::new(SAMPLE_RATE, NUM_CHANNELS, Application::Audio);
        assert!(encoder.encode(&dummy_audio(), 0).is_empty());
        assert!(encoder.encode(&dummy_audio(), usize::MAX).is_empty());
        assert!(encoder.encode(&dummy_audio(), 5761).is_empty());
        assert!(matches!(
            encoder.encode_frame(&vec![0; 5761 * 2]),
            Err(CodecError::InvalidFrameSize(5761))
        ));
        assert!(matches!(
            encoder.encode_frame(&[]),
            Err(CodecError::InvalidFrameSize(0))
        ));
        assert!(encoder.valid());
        assert_eq!(encoder.encode(&dummy_audio(), FRAME_SIZE).len(), 1);
    }

    #[test]
    fn should_stay_inert_when_invalid() {
        let mut encoder = Encoder::new(44100, NUM_CHANNELS, Application::Audio);
        assert!(!encoder.valid());
        assert!(encoder.config().is_none());
        assert!(encoder.encode(&dummy_audio(), FRAME_SIZE).is_empty());
        assert!(matches!(
            encoder.encode_frame(&dummy_audio()),
            Err(CodecError::InvalidInstance)
        ));
        assert!(!encoder.set_bitrate(24000));
        assert!(!encoder.set_variable_bitrate(0));
        assert!(!encoder.set_inband_fec(true));
        assert!(!encoder.reset_state());
        assert_eq!(encoder.bitrate(), None);
        assert_eq!(encoder.inband_fec(), None);
    }
}
