//! Validating encoder/decoder facade over libopus.
//!
//! [`Encoder`] and [`Decoder`] check their configuration when constructed and
//! turn into inert instances instead of failing, so callers check
//! [`Encoder::valid`] / [`Decoder::valid`] once and can then drive them without
//! handling errors per call. The `try_*` constructors and the single
//! frame/packet methods expose the underlying [`CodecError`] for callers that
//! prefer `Result`s.
//!
//! Diagnostics are emitted through `tracing`; nothing is printed unless the
//! host installs a subscriber.

pub mod codec;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;

#[cfg(test)]
mod testing;

pub use codec::{opus::OpusAudioCodec, AudioCodec};
pub use config::{Application, Channels, CodecConfig, SampleRate};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::CodecError;
