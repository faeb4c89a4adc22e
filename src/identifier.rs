// identifier.rs - process-wide RADIUS packet identifier allocation
//
// The identifier field is one byte; RFC 2865 requires the client to vary it across
// outstanding requests so responses can be matched up. A single atomic counter shared
// by every client in the process is simpler than threading per-connection state through
// the packet factories, and wraps at 256 the same way the wire field does.

use std::sync::atomic::{AtomicU8, Ordering};

static NEXT: AtomicU8 = AtomicU8::new(0);

/// Returns the next identifier, wrapping from 255 back to 0.
pub fn next_identifier() -> u8 {
    NEXT.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn cycles_through_every_value_exactly_once_per_256_calls() {
        let mut seen = HashSet::new();
        for _ in 0..256u32 {
            seen.insert(next_identifier());
        }
        assert_eq!(seen.len(), 256);
    }

    #[test]
    fn wraps_around_without_panicking() {
        for _ in 0..512u32 {
            let _ = next_identifier();
        }
    }
}
