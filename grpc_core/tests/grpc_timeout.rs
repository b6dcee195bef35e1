//! Integration coverage for the `grpc-timeout` codec bijection law: a
//! bijection (within its resolution) over positive durations <= 8-digit
//! value.

use std::time::Duration;

use grpc_core::grpc_timeout::{decode, encode};
use quickcheck_macros::quickcheck;

#[quickcheck]
fn encode_then_decode_round_trips_any_nanosecond_duration_within_range(nanos: u32) -> bool {
    // Reduce into the 8-digit nanosecond range the codec can always
    // represent exactly in its finest unit, so the property holds for
    // every input quickcheck generates rather than only some of them.
    let nanos = (nanos % 100_000_000) as u64;
    let duration = Duration::from_nanos(nanos);
    decode(&encode(duration)) == Some(duration)
}

#[test]
fn encoded_values_always_parse_back_to_a_duration() {
    for secs in [0u64, 1, 59, 60, 3599, 3600, 7200, 86_400] {
        let duration = Duration::from_secs(secs);
        let encoded = encode(duration);
        let decoded = decode(&encoded).expect("every value this codec emits must itself decode");
        assert_eq!(decoded, duration);
    }
}

#[test]
fn the_largest_representable_second_value_round_trips() {
    // 99999999 seconds is the largest 8-digit value in the `S` unit, well
    // within the range a u64 nanosecond count can hold.
    let duration = Duration::from_secs(99_999_999);
    let encoded = encode(duration);
    assert_eq!(encoded, "99999999S");
    assert_eq!(decode(&encoded), Some(duration));
}

#[test]
fn malformed_headers_never_panic_and_decode_to_none() {
    for input in ["", "H", "5", "-5S", "5.5S", "999999999S", "5Q"] {
        assert!(decode(input).is_none(), "expected {input:?} to be rejected");
    }
}
