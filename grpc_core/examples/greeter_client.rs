//! Greeter client example.
//!
//! Mirrors `greeter_server.rs`: this crate produces and consumes framed
//! message bytes and `grpc-*` metadata, it does not dial a socket itself
//! (see `lib.rs`'s module docs). This example builds a request the way a
//! generated client stub would -- `CallOptions`, a `grpc-timeout` header,
//! a framed payload -- and decodes the response trailers back into a
//! `Status`.

use bytes::{Buf, BytesMut};

use grpc_core::call_options::CallOptions;
use grpc_core::codec::{Decoder, Encoder};
use grpc_core::compression::CompressionEncoding;
use grpc_core::deframer::Deframer;
use grpc_core::framer::Framer;
use grpc_core::grpc_timeout;
use grpc_core::metadata::MetadataMap;
use grpc_core::status::Status;

#[derive(Default)]
struct LineCodec;

impl Encoder for LineCodec {
    type Item = String;

    fn encode(&mut self, item: &String, buf: &mut BytesMut) -> Result<(), Status> {
        buf.extend_from_slice(item.as_bytes());
        Ok(())
    }
}

impl Decoder for LineCodec {
    type Item = String;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<String, Status> {
        let len = buf.remaining();
        let bytes = buf.copy_to_bytes(len);
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn main() {
    let options = CallOptions::new().with_timeout(std::time::Duration::from_secs(5));

    let mut request_metadata = MetadataMap::new();
    request_metadata.insert("x-client", "greeter_client example").unwrap();
    if let Some(remaining) = options.remaining() {
        println!("grpc-timeout: {}", grpc_timeout::encode(remaining));
    }

    let mut framer = Framer::new(LineCodec, CompressionEncoding::Identity, None);
    let request_frame = framer.frame(&"World".to_string()).unwrap();
    println!(
        "Sending SayHello request ({} bytes on the wire) with metadata {:?}",
        request_frame.len(),
        request_metadata.get("x-client").map(|v| v.to_string())
    );

    // Stand in for the bytes a real connection would read back off the
    // wire; `greeter_server.rs` shows how the server side produces this.
    let mut framer_for_demo_reply = Framer::new(LineCodec, CompressionEncoding::Identity, None);
    let response_frame = framer_for_demo_reply.frame(&"Hello, World!".to_string()).unwrap();
    let trailers = Status::ok().to_header_map();

    let mut deframer = Deframer::new(LineCodec, CompressionEncoding::Identity, None);
    deframer.push(&response_frame);
    let response = deframer.try_next().unwrap().expect("a single complete response message");

    let status = Status::from_header_map(&trailers).unwrap_or_else(|| {
        Status::new(grpc_core::status::Code::Unknown, "server sent no grpc-status trailer")
    });

    println!("RESPONSE = {response:?}, status = {status}");
}
