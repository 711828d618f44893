//! Monotonic clock and thread identity
//!
//! All measurements in the harness are taken against a process-local
//! monotonic epoch, so timestamps are comparable across threads and never
//! go backwards. Thread ids are handed out from a process-wide counter
//! starting at 1; id 0 is reserved by the phase tree as the "merged"
//! marker for nodes produced by cross-thread consolidation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// Nanoseconds elapsed since the process-local epoch. Monotonic.
pub fn timestamp() -> u64 {
    let epoch = EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_nanos() as u64
}

/// Process-unique identifier of the calling thread. Never zero.
pub fn current_thread_id() -> u64 {
    THREAD_ID.with(|id| *id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_monotonic() {
        let mut previous = timestamp();
        for _ in 0..1000 {
            let now = timestamp();
            assert!(now >= previous);
            previous = now;
        }
    }

    #[test]
    fn test_thread_ids_are_unique_and_nonzero() {
        let main_id = current_thread_id();
        assert_ne!(main_id, 0);
        assert_eq!(main_id, current_thread_id());

        let ids: Vec<u64> = (0..4)
            .map(|_| std::thread::spawn(current_thread_id))
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        for &id in &ids {
            assert_ne!(id, 0);
            assert_ne!(id, main_id);
        }
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), ids.len());
    }
}
