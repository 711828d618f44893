//! Benchmark run contexts
//!
//! A context is the handle user code receives while running: it carries
//! the swept (x, y, z) parameters, bridges phase and counter calls to the
//! owning arena node, and shares a cancellation flag across every clone
//! spawned from one logical run. The threaded and producer/consumer
//! variants wrap the base context and add their fan-out counts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::phase::{PhaseArena, PhaseId, PhaseScope};

/// Up to three optional integer parameters of one sweep combination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Params {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub z: Option<i32>,
}

impl Params {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(x: i32) -> Self {
        Self {
            x: Some(x),
            y: None,
            z: None,
        }
    }

    pub fn pair(x: i32, y: i32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: None,
        }
    }

    pub fn triple(x: i32, y: i32, z: i32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }

    /// "(x)", "(x,y)" or "(x,y,z)"; empty when no parameters are set.
    pub(crate) fn suffix(&self) -> String {
        match (self.x, self.y, self.z) {
            (None, ..) => String::new(),
            (Some(x), None, _) => format!("({x})"),
            (Some(x), Some(y), None) => format!("({x},{y})"),
            (Some(x), Some(y), Some(z)) => format!("({x},{y},{z})"),
        }
    }

    /// ",x", ",x,y" or ",x,y,z" — the tail appended inside the threaded
    /// and producer/consumer description parentheses.
    pub(crate) fn tail(&self) -> String {
        match (self.x, self.y, self.z) {
            (None, ..) => String::new(),
            (Some(x), None, _) => format!(",{x}"),
            (Some(x), Some(y), None) => format!(",{x},{y}"),
            (Some(x), Some(y), Some(z)) => format!(",{x},{y},{z}"),
        }
    }
}

/// Context of a sequential benchmark run.
#[derive(Clone)]
pub struct Context {
    params: Params,
    arena: Arc<PhaseArena>,
    current: PhaseId,
    canceled: Arc<AtomicBool>,
}

impl Context {
    pub(crate) fn new(params: Params, arena: Arc<PhaseArena>, current: PhaseId) -> Self {
        Self {
            params,
            arena,
            current,
            canceled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn x(&self) -> Option<i32> {
        self.params.x
    }

    pub fn y(&self) -> Option<i32> {
        self.params.y
    }

    pub fn z(&self) -> Option<i32> {
        self.params.z
    }

    pub fn description(&self) -> String {
        self.params.suffix()
    }

    /// Requests early termination of every loop sharing this run.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }

    pub fn canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }

    pub fn current_phase(&self) -> PhaseId {
        self.current
    }

    pub(crate) fn set_current(&mut self, id: PhaseId) {
        self.current = id;
    }

    pub(crate) fn arena(&self) -> &Arc<PhaseArena> {
        &self.arena
    }

    // ---------------------------------------------------------------------
    // Counter passthroughs to the current phase
    // ---------------------------------------------------------------------

    pub fn add_operations(&self, operations: i64) {
        self.arena
            .with_current(self.current, |metrics| metrics.add_operations(operations));
    }

    pub fn add_items(&self, items: i64) {
        self.arena
            .with_current(self.current, |metrics| metrics.add_items(items));
    }

    pub fn add_bytes(&self, bytes: i64) {
        self.arena
            .with_current(self.current, |metrics| metrics.add_bytes(bytes));
    }

    pub fn add_latency(&self, latency_ns: i64) {
        self.arena
            .with_current(self.current, |metrics| metrics.add_latency(latency_ns));
    }

    pub fn set_custom_int(&self, name: &str, value: i32) {
        self.arena
            .with_current(self.current, |metrics| metrics.set_custom_int(name, value));
    }

    pub fn set_custom_uint(&self, name: &str, value: u32) {
        self.arena
            .with_current(self.current, |metrics| metrics.set_custom_uint(name, value));
    }

    pub fn set_custom_int64(&self, name: &str, value: i64) {
        self.arena.with_current(self.current, |metrics| {
            metrics.set_custom_int64(name, value)
        });
    }

    pub fn set_custom_uint64(&self, name: &str, value: u64) {
        self.arena.with_current(self.current, |metrics| {
            metrics.set_custom_uint64(name, value)
        });
    }

    pub fn set_custom_flt(&self, name: &str, value: f32) {
        self.arena
            .with_current(self.current, |metrics| metrics.set_custom_flt(name, value));
    }

    pub fn set_custom_dbl(&self, name: &str, value: f64) {
        self.arena
            .with_current(self.current, |metrics| metrics.set_custom_dbl(name, value));
    }

    pub fn set_custom_str(&self, name: &str, value: &str) {
        self.arena
            .with_current(self.current, |metrics| metrics.set_custom_str(name, value));
    }

    // ---------------------------------------------------------------------
    // Phases
    // ---------------------------------------------------------------------

    pub fn start_phase(&self, name: &str) -> PhaseId {
        self.arena.start_phase(self.current, name)
    }

    pub fn start_phase_thread_safe(&self, name: &str) -> PhaseId {
        self.arena.start_phase_thread_safe(self.current, name)
    }

    pub fn stop_phase(&self, id: PhaseId) {
        self.arena.stop_phase(id);
    }

    pub fn scope_phase(&self, name: &str) -> PhaseScope<'_> {
        PhaseScope::new(&self.arena, self.start_phase(name))
    }

    pub fn scope_phase_thread_safe(&self, name: &str) -> PhaseScope<'_> {
        PhaseScope::new(&self.arena, self.start_phase_thread_safe(name))
    }
}

/// Context of a threaded benchmark run; clones are handed to each worker.
#[derive(Clone)]
pub struct ContextThreads {
    base: Context,
    threads: usize,
}

impl ContextThreads {
    pub(crate) fn new(
        threads: usize,
        params: Params,
        arena: Arc<PhaseArena>,
        current: PhaseId,
    ) -> Self {
        Self {
            base: Context::new(params, arena, current),
            threads,
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub(crate) fn describe(threads: usize, params: Params) -> String {
        format!("(threads:{}{})", threads, params.tail())
    }

    pub fn description(&self) -> String {
        Self::describe(self.threads, self.base.params)
    }
}

impl std::ops::Deref for ContextThreads {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.base
    }
}

impl std::ops::DerefMut for ContextThreads {
    fn deref_mut(&mut self) -> &mut Context {
        &mut self.base
    }
}

/// Context of a producer/consumer benchmark run. The produce/consume stop
/// flags are shared across clones independently of cancellation, so
/// producers can signal "no more work" without aborting consumers.
#[derive(Clone)]
pub struct ContextPc {
    base: Context,
    producers: usize,
    consumers: usize,
    produce_stopped: Arc<AtomicBool>,
    consume_stopped: Arc<AtomicBool>,
}

impl ContextPc {
    pub(crate) fn new(
        producers: usize,
        consumers: usize,
        params: Params,
        arena: Arc<PhaseArena>,
        current: PhaseId,
    ) -> Self {
        Self {
            base: Context::new(params, arena, current),
            producers,
            consumers,
            produce_stopped: Arc::new(AtomicBool::new(false)),
            consume_stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn producers(&self) -> usize {
        self.producers
    }

    pub fn consumers(&self) -> usize {
        self.consumers
    }

    pub fn produce_stopped(&self) -> bool {
        self.produce_stopped.load(Ordering::Relaxed)
    }

    pub fn consume_stopped(&self) -> bool {
        self.consume_stopped.load(Ordering::Relaxed)
    }

    pub fn stop_produce(&self) {
        self.produce_stopped.store(true, Ordering::Relaxed);
    }

    pub fn stop_consume(&self) {
        self.consume_stopped.store(true, Ordering::Relaxed);
    }

    pub(crate) fn describe(producers: usize, consumers: usize, params: Params) -> String {
        format!(
            "(producers:{},consumers:{}{})",
            producers,
            consumers,
            params.tail()
        )
    }

    pub fn description(&self) -> String {
        Self::describe(self.producers, self.consumers, self.base.params)
    }
}

impl std::ops::Deref for ContextPc {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.base
    }
}

impl std::ops::DerefMut for ContextPc {
    fn deref_mut(&mut self) -> &mut Context {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(params: Params) -> Context {
        let arena = Arc::new(PhaseArena::new());
        let root = arena.create_root("bench");
        Context::new(params, arena, root)
    }

    #[test]
    fn test_descriptions_render_set_parameters_only() {
        assert_eq!(context(Params::none()).description(), "");
        assert_eq!(context(Params::single(10)).description(), "(10)");
        assert_eq!(context(Params::pair(10, 20)).description(), "(10,20)");
        assert_eq!(context(Params::triple(1, 2, 3)).description(), "(1,2,3)");
    }

    #[test]
    fn test_threaded_description() {
        let arena = Arc::new(PhaseArena::new());
        let root = arena.create_root("bench");
        let plain = ContextThreads::new(4, Params::none(), Arc::clone(&arena), root);
        assert_eq!(plain.description(), "(threads:4)");
        let swept = ContextThreads::new(4, Params::pair(8, 64), arena, root);
        assert_eq!(swept.description(), "(threads:4,8,64)");
    }

    #[test]
    fn test_pc_description() {
        let arena = Arc::new(PhaseArena::new());
        let root = arena.create_root("bench");
        let plain = ContextPc::new(2, 3, Params::none(), Arc::clone(&arena), root);
        assert_eq!(plain.description(), "(producers:2,consumers:3)");
        let swept = ContextPc::new(2, 3, Params::single(1024), arena, root);
        assert_eq!(swept.description(), "(producers:2,consumers:3,1024)");
    }

    #[test]
    fn test_cancellation_is_shared_across_clones() {
        let original = context(Params::none());
        let clone = original.clone();
        assert!(!clone.canceled());
        original.cancel();
        assert!(clone.canceled());
    }

    #[test]
    fn test_pc_stop_flags_are_independent() {
        let arena = Arc::new(PhaseArena::new());
        let root = arena.create_root("bench");
        let original = ContextPc::new(1, 1, Params::none(), arena, root);
        let clone = original.clone();

        original.stop_produce();
        assert!(clone.produce_stopped());
        assert!(!clone.consume_stopped());
        assert!(!clone.canceled());

        clone.stop_consume();
        assert!(original.consume_stopped());
    }

    #[test]
    fn test_counters_reach_current_phase() {
        let ctx = context(Params::none());
        ctx.add_operations(3);
        ctx.add_items(2);
        ctx.add_bytes(1024);
        ctx.set_custom_str("codec", "lz4");
        let metrics = ctx.arena().with_current(ctx.current_phase(), |m| m.clone());
        assert_eq!(metrics.total_operations(), 3);
        assert_eq!(metrics.total_items(), 2);
        assert_eq!(metrics.total_bytes(), 1024);
        assert_eq!(metrics.custom_str()["codec"], "lz4");
    }
}
