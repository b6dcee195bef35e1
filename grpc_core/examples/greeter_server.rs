//! Greeter server example.
//!
//! This crate stops at the [`transport::FrameSink`]/[`transport::FrameSource`]
//! boundary (see `lib.rs`): dialing sockets, HPACK, and TLS live one layer up.
//! So rather than bind a port, this example wires a `helloworld.Greeter`
//! service end to end the way a real server would: register a handler,
//! deframe an inbound request off the wire, run it through the call
//! orchestrator, and frame the response back.

use bytes::{Buf, BytesMut};

use grpc_core::call::{dispatch, InterceptorChain};
use grpc_core::codec::{Decoder, Encoder};
use grpc_core::compression::CompressionEncoding;
use grpc_core::context::{CallContext, CancellationSource};
use grpc_core::deframer::Deframer;
use grpc_core::framer::Framer;
use grpc_core::metadata::MetadataMap;
use grpc_core::method::MethodKind;
use grpc_core::service::{Handler, Service, ServiceRegistry};
use grpc_core::status::Status;

/// A plain-text stand-in for a protobuf-generated message type. Real
/// services use `grpc_core::codec::ProstCodec` over `prost::Message`
/// types instead; this keeps the example free of a build-time codegen
/// step.
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

struct Greeter;

#[async_trait::async_trait]
impl Handler<String, String> for Greeter {
    async fn unary(&self, ctx: &mut CallContext, request: String) -> Result<String, Status> {
        println!("Greeter: received SayHello({request}) on {}", ctx.method());
        Ok(format!("Hello, {request}!"))
    }
}

#[tokio::main]
async fn main() {
    let mut registry = ServiceRegistry::new();
    let mut service = Service::new("helloworld.Greeter");
    service.register("SayHello", MethodKind::Unary);
    registry.add(service);

    // A real transport hands this example a frame read off the wire; here
    // we build one locally with the same Framer the client example uses.
    let mut framer = Framer::new(LineCodec, CompressionEncoding::Identity, None);
    let request_frame = framer.frame(&"World".to_string()).unwrap();

    let entry = registry
        .resolve("/helloworld.Greeter/SayHello")
        .expect("SayHello is registered above");
    println!("Routed to {} ({:?})", entry.name, entry.kind);

    let mut deframer = Deframer::new(LineCodec, CompressionEncoding::Identity, None);
    deframer.push(&request_frame);
    let request = deframer
        .try_next()
        .unwrap()
        .expect("the frame built above is a single complete message");

    let (_source, token) = CancellationSource::new();
    let method = grpc_core::method::MethodDescriptor::new("helloworld.Greeter", "SayHello", MethodKind::Unary);

    // `dispatch` only needs a shared view of the call (for the interceptor
    // chain and the deadline race); the handler gets its own `&mut
    // CallContext` built from the same cancellation token and metadata, the
    // way a server loop hands each in-flight call a fresh context.
    let ctx = CallContext::new(method.clone(), None, token.clone(), MetadataMap::new());
    let mut handler_ctx = CallContext::new(method, None, token, MetadataMap::new());

    let chain = InterceptorChain::new();
    let greeter = Greeter;
    let (result, status) = dispatch(&chain, &ctx, async move { greeter.unary(&mut handler_ctx, request).await }).await;

    match result {
        Ok(reply) => {
            let response_frame = framer.frame(&reply).unwrap();
            println!("Replying with {} bytes, status {:?}", response_frame.len(), status.code());
        }
        Err(status) => println!("Call failed: {status}"),
    }
}
