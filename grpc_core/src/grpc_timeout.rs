//! The `grpc-timeout` header codec: a positive integer followed by a
//! one-character unit (`H`, `M`, `S`, `m`, `u`, `n`).

use std::time::Duration;

const MAX_DIGITS: usize = 8;

/// Encodes a remaining duration as a `grpc-timeout` value, choosing the
/// coarsest unit that represents it exactly within the 8-digit limit.
pub fn encode(remaining: Duration) -> String {
    let nanos = remaining.as_nanos();

    // Try units from coarsest to finest so small deadlines don't need to be
    // expressed in nanoseconds unnecessarily, while still fitting 8 digits.
    const HOUR: u128 = 3_600_000_000_000;
    const MINUTE: u128 = 60_000_000_000;
    const SECOND: u128 = 1_000_000_000;
    const MILLI: u128 = 1_000_000;
    const MICRO: u128 = 1_000;

    let candidates: [(u128, char); 6] = [
        (HOUR, 'H'),
        (MINUTE, 'M'),
        (SECOND, 'S'),
        (MILLI, 'm'),
        (MICRO, 'u'),
        (1, 'n'),
    ];

    for (unit_nanos, suffix) in candidates {
        if nanos % unit_nanos == 0 {
            let value = nanos / unit_nanos;
            if fits_in_digits(value) {
                return format!("{value}{suffix}");
            }
        }
    }

    // Fall back to nanoseconds, clamped to the 8-digit ceiling.
    let clamped = nanos.min(10u128.pow(MAX_DIGITS as u32) - 1);
    format!("{clamped}n")
}

fn fits_in_digits(value: u128) -> bool {
    value < 10u128.pow(MAX_DIGITS as u32)
}

/// Decodes a `grpc-timeout` header value into a [`Duration`]. Returns
/// `None` for malformed input (not `<=8 digits><unit>`).
pub fn decode(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.is_empty() || digits.len() > MAX_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;
    let unit = unit.chars().next()?;
    let nanos_per_unit: u64 = match unit {
        'H' => 3_600_000_000_000,
        'M' => 60_000_000_000,
        'S' => 1_000_000_000,
        'm' => 1_000_000,
        'u' => 1_000,
        'n' => 1,
        _ => return None,
    };
    Some(Duration::from_nanos(amount.saturating_mul(nanos_per_unit)))
}
