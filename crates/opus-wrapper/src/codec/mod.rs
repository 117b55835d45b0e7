use crate::error::CodecError;

pub mod opus;

/// Frame-at-a-time codec that can be shared between threads.
pub trait AudioCodec: Send + Sync {
    fn new(sample_rate: i32, channels: i32) -> Result<Self, CodecError>
    where
        Self: Sized;
    fn encode(&self, pcm: &[i16]) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, packet: &[u8]) -> Result<Vec<i16>, CodecError>;
    /// Produces a frame standing in for a packet that never arrived.
    fn conceal(&self) -> Result<Vec<i16>, CodecError>;
}
