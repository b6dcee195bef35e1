//! Component-level versions of end-to-end RPC scenarios. These exercise
//! the framer/deframer, stream state machine, status codec, and call
//! orchestrator together without a live `h2` transport, which is exactly
//! the boundary this crate draws around itself (it consumes frame
//! payloads, it does not dial sockets).

use bytes::{Buf, BytesMut};

use grpc_core::call::{dispatch, CallHandle, InterceptorChain};
use grpc_core::codec::{Decoder, Encoder};
use grpc_core::compression::CompressionEncoding;
use grpc_core::context::{CallContext, CancellationSource};
use grpc_core::deframer::Deframer;
use grpc_core::error::{Error, PolicyViolation};
use grpc_core::framer::Framer;
use grpc_core::metadata::MetadataMap;
use grpc_core::method::{MethodDescriptor, MethodKind};
use grpc_core::status::{Code, Status};
use grpc_core::stream_state::{Event, Side, StreamStateMachine};
use grpc_core::transport::backoff::{Backoff, BackoffConfig};

#[derive(Default)]
struct PlainTextCodec;

impl Encoder for PlainTextCodec {
    type Item = String;

    fn encode(&mut self, item: &String, buf: &mut BytesMut) -> Result<(), Status> {
        buf.extend_from_slice(item.as_bytes());
        Ok(())
    }
}

impl Decoder for PlainTextCodec {
    type Item = String;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<String, Status> {
        let len = buf.remaining();
        let bytes = buf.copy_to_bytes(len);
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn method(kind: MethodKind) -> MethodDescriptor {
    MethodDescriptor::new("hello.Greeter", "SayHello", kind)
}

/// Scenario A — unary success: client sends a request, server replies
/// with one message and `grpc-status: 0` in the trailers.
#[tokio::test]
async fn scenario_a_unary_success() {
    let mut client_state = StreamStateMachine::new(Side::Client);
    let mut server_state = StreamStateMachine::new(Side::Server);

    client_state.apply(Event::SendInitialMetadata).unwrap();
    server_state.apply(Event::RecvInitialMetadata).unwrap();

    let mut framer = Framer::new(PlainTextCodec, CompressionEncoding::Identity, None);
    let request_frame = framer.frame(&"World".to_string()).unwrap();
    client_state.apply(Event::SendMessage).unwrap();
    client_state.apply(Event::SendEndOfStream).unwrap();

    let mut server_deframer = Deframer::new(PlainTextCodec, CompressionEncoding::Identity, None);
    server_deframer.push(&request_frame);
    let request = server_deframer.try_next().unwrap().unwrap();
    server_state.apply(Event::RecvMessage).unwrap();
    server_state.apply(Event::RecvEndOfStream).unwrap();

    let (_source, token) = CancellationSource::new();
    let ctx = CallContext::new(method(MethodKind::Unary), None, token, MetadataMap::new());
    let chain = InterceptorChain::new();
    let (result, status) = dispatch(&chain, &ctx, async { Ok::<_, Status>(format!("Hello, {request}")) }).await;
    assert_eq!(result.unwrap(), "Hello, World");
    assert!(status.is_ok());

    server_state.apply(Event::SendInitialMetadata).unwrap();
    let response_frame = framer.frame(&"Hello, World".to_string()).unwrap();
    server_state.apply(Event::SendMessage).unwrap();
    server_state.apply(Event::SendTrailers).unwrap();

    let trailers = status.to_header_map();
    assert_eq!(trailers.get("grpc-status").unwrap().to_str().unwrap(), "0");

    let mut client_deframer = Deframer::new(PlainTextCodec, CompressionEncoding::Identity, None);
    client_deframer.push(&response_frame);
    let response = client_deframer.try_next().unwrap().unwrap();
    client_state.apply(Event::RecvInitialMetadata).unwrap();
    client_state.apply(Event::RecvMessage).unwrap();
    client_state.apply(Event::RecvTrailers).unwrap();

    assert_eq!(response, "Hello, World");
    let final_status = Status::from_header_map(&trailers).unwrap();
    assert!(final_status.is_ok());
}

/// Scenario C — bidi ping-pong: client sends `"a"`, `"b"`, `"c"` and the
/// server echoes each back in order as it arrives.
#[tokio::test]
async fn scenario_c_bidi_ping_pong() {
    let mut framer = Framer::new(PlainTextCodec, CompressionEncoding::Identity, None);
    let mut deframer = Deframer::new(PlainTextCodec, CompressionEncoding::Identity, None);

    let mut echoed = Vec::new();
    for message in ["a", "b", "c"] {
        let frame = framer.frame(&message.to_string()).unwrap();
        deframer.push(&frame);
        let received = deframer.try_next().unwrap().unwrap();
        echoed.push(received);
    }

    assert_eq!(echoed, vec!["a", "b", "c"]);
}

/// Scenario D — oversize message: the framer rejects locally with
/// `resourceExhausted`; nothing is produced to send.
#[tokio::test]
async fn scenario_d_oversize_message_rejected_locally() {
    let mut framer = Framer::new(PlainTextCodec, CompressionEncoding::Identity, Some(100));
    let oversize: String = "x".repeat(101);
    let err = framer.frame(&oversize).unwrap_err();
    assert!(matches!(
        err,
        Error::Policy(PolicyViolation::MessageTooLarge { actual: 101, max: 100 })
    ));
}

/// Scenario E — peer `RST_STREAM` with `CANCEL`: the client's call
/// terminates with `cancelled` and no further reads succeed.
#[tokio::test]
async fn scenario_e_peer_reset_with_cancel_surfaces_as_cancelled() {
    let mut client_state = StreamStateMachine::new(Side::Client);
    client_state.apply(Event::SendInitialMetadata).unwrap();
    client_state.apply(Event::RecvInitialMetadata).unwrap();

    // Server resets mid-response; the client synthesizes a status from
    // the HTTP/2 error code rather than waiting on trailers that will
    // never arrive.
    const CANCEL: u32 = 0x8;
    let synthesized = Status::from_reset(CANCEL);
    assert_eq!(synthesized.code(), Code::Cancelled);

    client_state.apply(Event::Reset).unwrap();
    assert_eq!(client_state.state(), grpc_core::stream_state::State::Reset);

    let (mut handle, completer) = CallHandle::new();
    completer.complete(synthesized);
    let final_status = handle.wait().await;
    assert_eq!(final_status.code(), Code::Cancelled);

    // Late frames after reset are ignored, not re-delivered as success.
    client_state.apply(Event::RecvMessage).unwrap();
    assert_eq!(client_state.state(), grpc_core::stream_state::State::Reset);
}

/// Scenario B — deadline fires: requires a live server that actually
/// sleeps past the client's deadline to observe end-to-end, which needs a
/// real socket this crate does not own (see `lib.rs`). The deadline math
/// itself is covered component-level by `tests/stream_state.rs`'s
/// `deadline_firing_is_monotonic_no_success_after`; this test documents
/// the full scenario and is skipped until a transport harness exists.
#[tokio::test]
#[ignore = "needs a live client/server pair over a real transport, out of this crate's scope"]
async fn scenario_b_deadline_fires_before_a_slow_server_replies() {
    unimplemented!("exercise a real ClientTransportManager/ServerTransportManager pair once one exists in this crate's test harness");
}

/// Scenario F — reconnect backoff: the escalating-wait sequence itself is
/// covered component-level by `transport::backoff`'s unit tests (delay
/// growth, cap, jitter bounds, reset-on-ready); this test documents the
/// full "server refuses connections" scenario, which needs a real
/// listener to refuse against.
#[test]
#[ignore = "needs a real listener refusing connections, out of this crate's scope"]
fn scenario_f_reconnect_backoff_escalates_until_a_successful_connect() {
    unimplemented!("dial a refusing listener through a real ClientTransportManager once one exists in this crate's test harness");
}

/// The escalating-wait sequence Scenario F expects, checked directly
/// against `Backoff` rather than through a live reconnect loop.
#[test]
fn scenario_f_math_matches_the_documented_wait_sequence() {
    let mut backoff = Backoff::new(BackoffConfig {
        initial: std::time::Duration::from_secs(1),
        max: std::time::Duration::from_secs(10),
        multiplier: 2.0,
        jitter: 0.0,
    });
    let expected = [1u64, 2, 4, 8, 10, 10];
    for secs in expected {
        assert_eq!(backoff.next_delay(), std::time::Duration::from_secs(secs));
    }
    backoff.reset();
    assert_eq!(backoff.next_delay(), std::time::Duration::from_secs(1));
}
