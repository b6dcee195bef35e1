//! Encodes application messages into the gRPC length-prefixed frame format:
//!
//! ```text
//! +---+----------------+--------------------------+
//! | C | L (4 bytes BE) | payload (L bytes)         |
//! +---+----------------+--------------------------+
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::Encoder;
use crate::compression::CompressionEncoding;
use crate::error::{Error, PolicyViolation};
use crate::status::{Code, Status};

pub const FRAME_HEADER_LEN: usize = 5;

/// Turns application messages into framed, optionally compressed payload
/// bytes ready to hand to the transport as HTTP/2 DATA frames.
pub struct Framer<E> {
    encoder: E,
    compression: CompressionEncoding,
    max_message_size: Option<usize>,
}

impl<E> Framer<E> {
    pub fn new(encoder: E, compression: CompressionEncoding, max_message_size: Option<usize>) -> Self {
        Self {
            encoder,
            compression,
            max_message_size,
        }
    }
}

impl<E: Encoder> Framer<E> {
    /// Serializes, optionally compresses, and frames `message`. Returns the
    /// bytes ready to be written as one or more DATA frame payloads (the
    /// transport may split this buffer across DATA frames; that does not
    /// affect this single prefix-plus-payload unit).
    pub fn frame(&mut self, message: &E::Item) -> Result<Bytes, Error> {
        let mut payload = BytesMut::new();
        self.encoder
            .encode(message, &mut payload)
            .map_err(Error::Status)?;

        let (flag, payload) = match self.compression {
            CompressionEncoding::Identity => (0u8, payload.freeze()),
            compression => {
                let compressed = compression
                    .compress(&payload)
                    .map_err(|err| Error::Transport(err.to_string()))?;
                // Only use the compressed form if it actually helps.
                if compressed.len() < payload.len() {
                    (1u8, compressed)
                } else {
                    (0u8, payload.freeze())
                }
            }
        };

        if let Some(max) = self.max_message_size {
            if payload.len() > max {
                return Err(Error::Policy(PolicyViolation::MessageTooLarge {
                    actual: payload.len(),
                    max,
                }));
            }
        }

        let mut framed = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
        framed.put_u8(flag);
        framed.put_u32(payload.len() as u32);
        framed.put_slice(&payload);
        Ok(framed.freeze())
    }
}

/// Encodes a `Status` into trailer-ready form is handled by
/// [`crate::status::Status::to_header_map`]; this helper exists only to
/// surface the one framing-level status error this module can itself
/// produce (oversize messages), wrapped as a `Status` for callers that
/// want to fail a call immediately without going through `Error`.
pub fn oversize_status(actual: usize, max: usize) -> Status {
    Status::new(
        Code::ResourceExhausted,
        format!("message of {actual} bytes exceeds max of {max} bytes"),
    )
}
