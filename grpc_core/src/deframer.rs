//! Decodes the gRPC length-prefixed frame format back into application
//! messages, tolerating arbitrary fragmentation across reads.

use bytes::{Buf, BytesMut};

use crate::codec::Decoder;
use crate::compression::CompressionEncoding;
use crate::error::{Error, PolicyViolation};
use crate::framer::FRAME_HEADER_LEN;

#[derive(Debug, Clone, Copy)]
enum State {
    ReadHeader,
    ReadBody { compressed: bool, len: usize },
}

/// A pure function of its accumulated buffer state. Restartable on a fresh
/// stream; never shared across streams.
pub struct Deframer<D> {
    decoder: D,
    buf: BytesMut,
    state: State,
    compression: CompressionEncoding,
    max_message_size: Option<usize>,
}

impl<D> Deframer<D> {
    pub fn new(decoder: D, compression: CompressionEncoding, max_message_size: Option<usize>) -> Self {
        Self {
            decoder,
            buf: BytesMut::new(),
            state: State::ReadHeader,
            compression,
            max_message_size,
        }
    }

    /// Appends newly received bytes to the accumulation buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// True if a frame header has been parsed but its body has not yet
    /// fully arrived -- i.e. the stream is "mid frame".
    pub fn is_mid_frame(&self) -> bool {
        matches!(self.state, State::ReadBody { .. }) || (matches!(self.state, State::ReadHeader) && !self.buf.is_empty())
    }

    /// Call when the peer signals end-of-stream. Ending mid-frame is a
    /// protocol error.
    pub fn finish(&self) -> Result<(), Error> {
        if self.is_mid_frame() {
            Err(Error::Protocol("unexpected end of stream".to_string()))
        } else {
            Ok(())
        }
    }
}

impl<D: Decoder> Deframer<D> {
    /// Attempts to decode the next complete message out of the
    /// accumulated buffer. Returns `Ok(None)` when more bytes are needed.
    pub fn try_next(&mut self) -> Result<Option<D::Item>, Error> {
        if let State::ReadHeader = self.state {
            if self.buf.len() < FRAME_HEADER_LEN {
                return Ok(None);
            }
            let flag = self.buf.get_u8();
            let len = self.buf.get_u32() as usize;
            let compressed = match flag {
                0 => false,
                1 => true,
                other => {
                    return Err(Error::Protocol(format!(
                        "invalid compression flag: {other} (valid flags are 0 and 1)"
                    )))
                }
            };
            if let Some(max) = self.max_message_size {
                if len > max {
                    return Err(Error::Policy(PolicyViolation::MessageTooLarge { actual: len, max }));
                }
            }
            self.state = State::ReadBody { compressed, len };
        }

        let State::ReadBody { compressed, len } = self.state else {
            unreachable!("state must be ReadBody after the ReadHeader branch");
        };

        if self.buf.len() < len {
            return Ok(None);
        }

        let mut payload = self.buf.split_to(len);
        if compressed {
            let decompressed = self
                .compression
                .decompress(&payload)
                .map_err(|err| Error::Protocol(format!("decompression failed: {err}")))?;
            payload = BytesMut::from(&decompressed[..]);
        }

        let item = self.decoder.decode(&mut payload).map_err(Error::Status)?;
        self.state = State::ReadHeader;
        Ok(Some(item))
    }
}
