use std::sync::atomic::{AtomicU32, Ordering};

/// Process-wide request ID counter. Wraps around at `u32::MAX`.
static GLOBAL_ID_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Returns the next request correlation ID.
///
/// IDs are only used to pair a response with its request on a single
/// connection, so wrapping is harmless.
#[inline]
pub fn increment_u32_id() -> u32 {
    GLOBAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}
