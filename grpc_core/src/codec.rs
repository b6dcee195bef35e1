//! The user-supplied serializer/deserializer contract:
//! `Encoder<M>`/`Decoder<M>`, plus a default protobuf codec so the crate
//! is usable without a separate code generator.

use bytes::{Buf, BufMut, BytesMut};

use crate::status::{Code, Status};

/// Encodes a message into bytes.
pub trait Encoder {
    type Item;

    fn encode(&mut self, item: &Self::Item, buf: &mut BytesMut) -> Result<(), Status>;
}

/// Decodes a message from a complete, already-deframed payload.
pub trait Decoder {
    type Item;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Self::Item, Status>;
}

/// Combines [`Encoder`] and [`Decoder`] for one message type.
pub trait Codec: Encoder<Item = <Self as Codec>::Message> + Decoder<Item = <Self as Codec>::Message> {
    type Message;
}

impl<T> Codec for T
where
    T: Encoder + Decoder<Item = <T as Encoder>::Item>,
{
    type Message = <T as Encoder>::Item;
}

/// Default codec: protobuf via `prost`. Mirrors tonic's own default codec
/// so generated (or hand-written) `prost::Message` types work without a
/// custom `Codec` implementation.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProstCodec<T>(std::marker::PhantomData<T>);

impl<T> ProstCodec<T> {
    pub fn new() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<T> Encoder for ProstCodec<T>
where
    T: prost::Message,
{
    type Item = T;

    fn encode(&mut self, item: &T, buf: &mut BytesMut) -> Result<(), Status> {
        item.encode(buf)
            .map_err(|err| Status::new(Code::Internal, format!("failed to encode message: {err}")))
    }
}

impl<T> Decoder for ProstCodec<T>
where
    T: prost::Message + Default,
{
    type Item = T;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<T, Status> {
        let len = buf.remaining();
        T::decode(buf.copy_to_bytes(len))
            .map_err(|err| Status::new(Code::InvalidArgument, format!("failed to decode message: {err}")))
    }
}
