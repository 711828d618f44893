//! Cyclic thread barrier
//!
//! Reusable across generations: the generation counter guards against
//! spurious wakeups and lets the same barrier align the start of every
//! measured loop of a combination. Unlike `std::sync::Barrier`, `wait`
//! reports the "last arrival" signal as a plain bool.

use std::sync::{Condvar, Mutex};

pub struct Barrier {
    state: Mutex<BarrierState>,
    cond: Condvar,
    threads: usize,
}

struct BarrierState {
    count: usize,
    generation: u64,
}

impl Barrier {
    /// Creates a barrier for `threads` participants. At least one is
    /// required.
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        Self {
            state: Mutex::new(BarrierState {
                count: threads,
                generation: 0,
            }),
            cond: Condvar::new(),
            threads,
        }
    }

    /// Blocks until all participants of the current generation have
    /// arrived. Returns `true` for exactly one caller per generation, the
    /// last arrival.
    pub fn wait(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        let generation = state.generation;
        state.count -= 1;
        if state.count == 0 {
            state.generation = state.generation.wrapping_add(1);
            state.count = self.threads;
            self.cond.notify_all();
            return true;
        }
        while state.generation == generation {
            state = self.cond.wait(state).unwrap();
        }
        false
    }
}
