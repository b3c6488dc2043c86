use crate::time::now_ms;
use std::sync::atomic::{AtomicU64, Ordering};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Time-derived message identifier with a process-local sequence tiebreak.
/// Uniqueness within the process is the invariant; strict ordering is not.
pub fn next_message_id() -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", now_ms(), seq)
}
