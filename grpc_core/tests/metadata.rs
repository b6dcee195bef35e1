//! Integration coverage for the metadata ordering and `-bin` idempotence
//! law: `to_headers(from_headers(h)) == h` up to reordering of
//! reserved/pseudo keys the core strips, and repeated `-bin` round trips
//! never mangle the opaque payload.

use bytes::Bytes;
use http::{HeaderMap, HeaderValue};

use grpc_core::metadata::{MetadataError, MetadataMap};

#[test]
fn round_tripping_through_headers_preserves_order_and_duplicates() {
    let mut map = MetadataMap::new();
    map.insert("x-trace", "first").unwrap();
    map.insert("x-request-id", "abc123").unwrap();
    map.insert("x-trace", "second").unwrap();

    let mut headers = HeaderMap::new();
    map.to_headers(&mut headers);

    let round_tripped = MetadataMap::from_headers(&headers);
    let trace_values: Vec<_> = round_tripped
        .get_all("x-trace")
        .map(|v| v.as_ascii().unwrap().to_string())
        .collect();
    assert_eq!(trace_values, vec!["first", "second"]);
    assert_eq!(
        round_tripped.get("x-request-id").unwrap().as_ascii(),
        Some("abc123")
    );
}

#[test]
fn bin_values_survive_repeated_round_trips_byte_for_byte() {
    let payload = Bytes::from_static(b"\x00\x01\xff\xfe\x02binary\x00");
    let mut map = MetadataMap::new();
    map.insert_bin("trace-bin", payload.clone()).unwrap();

    // Round trip it twice; idempotence means the second trip produces the
    // exact same bytes as the first, not a progressively mangled value.
    let mut headers = HeaderMap::new();
    map.to_headers(&mut headers);
    let once = MetadataMap::from_headers(&headers);
    assert_eq!(once.get("trace-bin").unwrap().as_binary(), Some(payload.as_ref()));

    let mut headers_again = HeaderMap::new();
    once.to_headers(&mut headers_again);
    let twice = MetadataMap::from_headers(&headers_again);
    assert_eq!(twice.get("trace-bin").unwrap().as_binary(), Some(payload.as_ref()));
}

#[test]
fn reserved_and_pseudo_headers_never_reappear_as_user_metadata() {
    let mut headers = HeaderMap::new();
    headers.insert("grpc-status", HeaderValue::from_static("0"));
    headers.insert("grpc-message", HeaderValue::from_static(""));
    headers.insert("content-type", HeaderValue::from_static("application/grpc"));
    headers.insert("te", HeaderValue::from_static("trailers"));
    headers.insert("x-custom", HeaderValue::from_static("kept"));

    let map = MetadataMap::from_headers(&headers);
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("x-custom").unwrap().as_ascii(), Some("kept"));

    // And the reserved keys remain rejected on the way back in, so nothing
    // can smuggle a forged grpc-status through user metadata.
    let mut map = map;
    assert_eq!(
        map.insert("grpc-status", "5"),
        Err(MetadataError::Reserved("grpc-status".to_string()))
    );
}

#[test]
fn a_non_bin_key_cannot_carry_binary_data_and_vice_versa() {
    let mut map = MetadataMap::new();
    assert_eq!(
        map.insert("trace-bin", "plain text"),
        Err(MetadataError::BinaryKeyMismatch("trace-bin".to_string()))
    );
    assert_eq!(
        map.insert_bin("x-trace", Bytes::from_static(b"\x01")),
        Err(MetadataError::BinaryKeyMismatch("x-trace".to_string()))
    );
}

#[test]
fn lookup_is_case_insensitive_but_emission_preserves_the_original_case() {
    let mut map = MetadataMap::new();
    map.insert("X-Trace-Id", "abc").unwrap();
    assert_eq!(map.get("x-TRACE-id").unwrap().as_ascii(), Some("abc"));

    let mut headers = HeaderMap::new();
    map.to_headers(&mut headers);
    assert!(headers.get("X-Trace-Id").is_some());
    assert!(headers.get("x-trace-id").is_some(), "http::HeaderMap lookups are already case-insensitive");
}
