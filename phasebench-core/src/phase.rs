//! Phase tree arena
//!
//! Phases live in an append-only arena addressed by integer handles, so
//! worker threads can hold on to `PhaseId`s without worrying about node
//! lifetime: nodes never move and are never freed while a benchmark runs.
//! Each node carries two accumulators — `current`, written by the single
//! thread that owns the subtree during a run, and `result`, the best
//! attempt merged so far. The children list is the only structure that is
//! mutated from several threads, and only through the thread-safe start
//! path, which keys the find-or-create lookup on (name, creating thread).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::metrics::PhaseMetrics;
use crate::time;

/// Handle of a phase node inside a [`PhaseArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhaseId(usize);

struct PhaseNode {
    /// Rewritten once at the end of a run to the dotted ancestor path.
    name: Mutex<String>,
    /// Id of the thread that created the node; 0 marks a node that was
    /// merged into a sibling during cross-thread consolidation.
    thread: AtomicU64,
    children: Mutex<Vec<PhaseId>>,
    current: Mutex<PhaseMetrics>,
    result: Mutex<PhaseMetrics>,
}

impl PhaseNode {
    fn new(name: &str) -> Self {
        Self {
            name: Mutex::new(name.to_string()),
            thread: AtomicU64::new(time::current_thread_id()),
            children: Mutex::new(Vec::new()),
            current: Mutex::new(PhaseMetrics::new()),
            result: Mutex::new(PhaseMetrics::worst()),
        }
    }
}

/// Append-only arena of phase nodes.
#[derive(Default)]
pub struct PhaseArena {
    nodes: RwLock<Vec<Arc<PhaseNode>>>,
}

impl PhaseArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&self, id: PhaseId) -> Arc<PhaseNode> {
        self.nodes.read().unwrap()[id.0].clone()
    }

    fn alloc(&self, name: &str) -> PhaseId {
        let mut nodes = self.nodes.write().unwrap();
        let id = PhaseId(nodes.len());
        nodes.push(Arc::new(PhaseNode::new(name)));
        id
    }

    /// Creates a parentless phase, the root of one benchmark combination.
    pub fn create_root(&self, name: &str) -> PhaseId {
        self.alloc(name)
    }

    pub fn name(&self, id: PhaseId) -> String {
        self.node(id).name.lock().unwrap().clone()
    }

    pub fn thread(&self, id: PhaseId) -> u64 {
        self.node(id).thread.load(Ordering::Relaxed)
    }

    pub fn children(&self, id: PhaseId) -> Vec<PhaseId> {
        self.node(id).children.lock().unwrap().clone()
    }

    /// Snapshot of the node's consolidated result metrics.
    pub fn result_metrics(&self, id: PhaseId) -> PhaseMetrics {
        self.node(id).result.lock().unwrap().clone()
    }

    /// Runs `f` against the node's live accumulator.
    pub fn with_current<R>(&self, id: PhaseId, f: impl FnOnce(&mut PhaseMetrics) -> R) -> R {
        let node = self.node(id);
        let mut current = node.current.lock().unwrap();
        f(&mut current)
    }

    // ---------------------------------------------------------------------
    // Phase start/stop
    // ---------------------------------------------------------------------

    /// Find-or-create a child by name, then begin its collection window and
    /// pre-count one operation. Single-threaded trees only; worker threads
    /// must go through [`PhaseArena::start_phase_thread_safe`].
    pub fn start_phase(&self, parent: PhaseId, name: &str) -> PhaseId {
        let found = {
            let parent_node = self.node(parent);
            let children = parent_node.children.lock().unwrap();
            children
                .iter()
                .copied()
                .find(|&child| *self.node(child).name.lock().unwrap() == name)
        };
        let id = match found {
            Some(id) => id,
            None => {
                let id = self.alloc(name);
                self.node(parent).children.lock().unwrap().push(id);
                id
            }
        };
        self.with_current(id, |metrics| {
            metrics.start_collecting();
            metrics.add_operations(1);
        });
        id
    }

    /// As [`PhaseArena::start_phase`], but the find-or-create key is
    /// (name, calling thread) so concurrent same-named starts from
    /// different threads get distinct nodes. The collection-window begin
    /// happens after the children lock is released.
    pub fn start_phase_thread_safe(&self, parent: PhaseId, name: &str) -> PhaseId {
        let thread = time::current_thread_id();
        let found = {
            let parent_node = self.node(parent);
            let children = parent_node.children.lock().unwrap();
            children.iter().copied().find(|&child| {
                let node = self.node(child);
                node.thread.load(Ordering::Relaxed) == thread
                    && *node.name.lock().unwrap() == name
            })
        };
        let id = match found {
            Some(id) => id,
            None => {
                let id = self.alloc(name);
                self.node(parent).children.lock().unwrap().push(id);
                id
            }
        };
        self.with_current(id, |metrics| {
            metrics.start_collecting();
            metrics.add_operations(1);
        });
        id
    }

    /// Freezes the node's open collection window. Does not recurse; nested
    /// phases follow strict LIFO discipline and are stopped by their own
    /// guards.
    pub fn stop_phase(&self, id: PhaseId) {
        self.with_current(id, |metrics| metrics.stop_collecting());
    }

    pub fn start_collecting(&self, id: PhaseId) {
        self.with_current(id, |metrics| metrics.start_collecting());
    }

    // ---------------------------------------------------------------------
    // Consolidation
    // ---------------------------------------------------------------------

    /// Folds `current` into `result` on this node only, then resets
    /// `current` for the next attempt.
    pub fn fold_current(&self, id: PhaseId) {
        let node = self.node(id);
        let mut result = node.result.lock().unwrap();
        let mut current = node.current.lock().unwrap();
        result.merge(&mut current);
        current.reset();
    }

    /// Post-order fold of every node in the given subtrees: children are
    /// consolidated before their parents.
    pub fn update_metrics(&self, phases: &[PhaseId]) {
        for &root in phases {
            self.update_metrics_subtree(root);
        }
    }

    pub fn update_metrics_subtree(&self, id: PhaseId) {
        for child in self.children(id) {
            self.update_metrics_subtree(child);
        }
        self.fold_current(id);
    }

    /// Merges `from`'s result metrics into `into`'s. Used when collapsing
    /// duplicate thread-created siblings.
    fn merge_results(&self, into: PhaseId, from: PhaseId) {
        let mut taken = {
            let from_node = self.node(from);
            let mut result = from_node.result.lock().unwrap();
            std::mem::take(&mut *result)
        };
        let into_node = self.node(into);
        into_node.result.lock().unwrap().merge(&mut taken);
    }

    /// Collapses same-named siblings created by different threads: the
    /// later sibling's result merges into the earlier one, its children are
    /// spliced onto the survivor, and it is removed from the tree. Merged
    /// survivors get the sentinel thread id 0. Runs after all worker
    /// threads have joined.
    pub fn update_threads(&self, phases: &[PhaseId]) {
        for &root in phases {
            self.update_threads_node(root);
        }
    }

    fn update_threads_node(&self, id: PhaseId) {
        let children = self.children(id);
        let names: Vec<String> = children.iter().map(|&child| self.name(child)).collect();
        let mut removed = vec![false; children.len()];

        for i in 0..children.len() {
            if removed[i] {
                continue;
            }
            for j in (i + 1)..children.len() {
                if removed[j] || names[i] != names[j] {
                    continue;
                }
                if self.thread(children[i]) == self.thread(children[j]) {
                    continue;
                }
                self.merge_results(children[i], children[j]);
                let orphans = std::mem::take(&mut *self.node(children[j]).children.lock().unwrap());
                self.node(children[i])
                    .children
                    .lock()
                    .unwrap()
                    .extend(orphans);
                self.node(children[i]).thread.store(0, Ordering::Relaxed);
                self.node(children[j]).thread.store(0, Ordering::Relaxed);
                removed[j] = true;
            }
        }

        let kept: Vec<PhaseId> = children
            .iter()
            .copied()
            .zip(removed.iter())
            .filter(|(_, &gone)| !gone)
            .map(|(child, _)| child)
            .collect();
        *self.node(id).children.lock().unwrap() = kept.clone();

        for child in kept {
            self.update_threads_node(child);
        }
    }

    /// Pre-order rewrite of every node's name to its dotted ancestor path,
    /// so flattened reports can disambiguate nested phases. Roots keep
    /// their own names.
    pub fn update_names(&self, phases: &[PhaseId]) {
        for &root in phases {
            let name = self.name(root);
            self.update_names_node(root, &name);
        }
    }

    fn update_names_node(&self, id: PhaseId, name: &str) {
        for child in self.children(id) {
            let child_name = format!("{}.{}", name, self.name(child));
            self.update_names_node(child, &child_name);
        }
        *self.node(id).name.lock().unwrap() = name.to_string();
    }
}

/// Scope guard over a started phase: stops it when dropped, on every exit
/// path including panic, or earlier via an explicit [`PhaseScope::stop`].
pub struct PhaseScope<'a> {
    arena: &'a PhaseArena,
    id: PhaseId,
    stopped: bool,
}

impl<'a> PhaseScope<'a> {
    pub(crate) fn new(arena: &'a PhaseArena, id: PhaseId) -> Self {
        Self {
            arena,
            id,
            stopped: false,
        }
    }

    pub fn id(&self) -> PhaseId {
        self.id
    }

    /// Starts a nested phase under this one.
    pub fn scope_phase(&self, name: &str) -> PhaseScope<'a> {
        PhaseScope::new(self.arena, self.arena.start_phase(self.id, name))
    }

    /// Starts a nested phase under this one, safe to call from worker
    /// threads.
    pub fn scope_phase_thread_safe(&self, name: &str) -> PhaseScope<'a> {
        PhaseScope::new(self.arena, self.arena.start_phase_thread_safe(self.id, name))
    }

    pub fn add_operations(&self, operations: i64) {
        self.arena
            .with_current(self.id, |metrics| metrics.add_operations(operations));
    }

    pub fn add_items(&self, items: i64) {
        self.arena
            .with_current(self.id, |metrics| metrics.add_items(items));
    }

    pub fn add_bytes(&self, bytes: i64) {
        self.arena
            .with_current(self.id, |metrics| metrics.add_bytes(bytes));
    }

    /// Stops the phase now instead of at end of scope.
    pub fn stop(mut self) {
        self.stopped = true;
        self.arena.stop_phase(self.id);
    }
}

impl Drop for PhaseScope<'_> {
    fn drop(&mut self) {
        if !self.stopped {
            self.arena.stop_phase(self.id);
        }
    }
}
