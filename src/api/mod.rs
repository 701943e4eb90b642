pub mod client;
pub mod error;
pub mod logging;
pub mod mock_client;
pub mod stream;

#[cfg(test)]
mod proptests;

pub use client::{AgentClient, ByteStream, StreamProducer};
pub use error::{DecodeError, ProtocolError};
pub use stream::{decode_stream, DecodeSummary, NdjsonParser, Utf8Decoder};
