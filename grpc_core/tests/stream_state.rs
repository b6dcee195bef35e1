//! Integration coverage for termination exclusivity, state-machine
//! safety, and deadline monotonicity.

use std::time::{Duration, Instant};

use grpc_core::call::{run_with_deadline, CallHandle};
use grpc_core::context::{CallContext, CancellationSource};
use grpc_core::metadata::MetadataMap;
use grpc_core::method::{MethodDescriptor, MethodKind};
use grpc_core::status::{Code, Status};
use grpc_core::stream_state::{Event, Side, StreamStateMachine};

fn method() -> MethodDescriptor {
    MethodDescriptor::new("pkg.Svc", "Method", MethodKind::Unary)
}

#[tokio::test]
async fn a_call_handle_surfaces_exactly_one_terminal_status() {
    let (mut handle, completer) = CallHandle::new();
    completer.complete(Status::new(Code::Ok, ""));

    let first = handle.wait().await;
    assert!(first.is_ok());

    // A second observation does not get a second real terminal status;
    // the completer can only ever be consumed once.
    let second = handle.wait().await;
    assert_eq!(second.code(), Code::Internal);
}

#[test]
fn closed_stream_rejects_every_further_event() {
    let mut machine = StreamStateMachine::new(Side::Client);
    machine.apply(Event::SendInitialMetadata).unwrap();
    machine.apply(Event::SendMessage).unwrap();
    machine.apply(Event::SendEndOfStream).unwrap();
    machine.apply(Event::RecvInitialMetadata).unwrap();
    machine.apply(Event::RecvMessage).unwrap();
    machine.apply(Event::RecvTrailers).unwrap();
    assert_eq!(machine.state(), grpc_core::stream_state::State::Closed);

    for event in [
        Event::SendInitialMetadata,
        Event::RecvInitialMetadata,
        Event::SendMessage,
        Event::RecvMessage,
        Event::SendEndOfStream,
        Event::RecvEndOfStream,
        Event::SendTrailers,
        Event::RecvTrailers,
    ] {
        machine.apply(event).unwrap();
        assert_eq!(
            machine.state(),
            grpc_core::stream_state::State::Closed,
            "event {event:?} escaped the closed state"
        );
    }
}

#[tokio::test]
async fn deadline_firing_is_monotonic_no_success_after() {
    let (_source, token) = CancellationSource::new();
    let deadline = Instant::now() + Duration::from_millis(5);
    let ctx = CallContext::new(method(), Some(deadline), token, MetadataMap::new());

    let result: Result<&str, Status> = run_with_deadline(&ctx, async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok("late success")
    })
    .await;

    assert_eq!(result.unwrap_err().code(), Code::DeadlineExceeded);

    // Once the deadline has fired, re-checking aliveness never reports
    // success again for this call.
    assert!(ctx.check_alive().is_err());
}

#[tokio::test]
async fn cancellation_after_success_does_not_retroactively_undo_it() {
    let (source, token) = CancellationSource::new();
    let ctx = CallContext::new(method(), None, token, MetadataMap::new());

    let result = run_with_deadline(&ctx, async { Ok::<_, Status>("done") }).await;
    assert_eq!(result.unwrap(), "done");

    // Cancelling after the handler already completed has no observable
    // effect on the call that already finished.
    source.cancel();
    assert!(ctx.is_cancelled());
}
