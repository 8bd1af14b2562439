//! Single-threaded cooperative scheduler for control-plane operations.
//!
//! Three logical queues, drained by one task: an interactive FIFO that runs
//! each op to completion before starting the next, a latest-wins keyed slot
//! map where enqueuing a key cancels whatever was pending or running under
//! that key, and a background FIFO that only makes progress while the
//! interactive queue is empty.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Handed to a latest-wins op so it can check for cancellation at its start
/// and at every suspension point.
#[derive(Clone)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    pub fn aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

struct KeyedSlot {
    token: CancellationToken,
    generation: u64,
}

/// Builds a latest-wins op body from an `AbortSignal`.
pub type KeyedOpFactory = Box<dyn FnOnce(AbortSignal) -> BoxFuture + Send>;

#[derive(Default)]
pub struct OpsQueue {
    interactive: VecDeque<BoxFuture>,
    background: VecDeque<BoxFuture>,
    keyed_slots: HashMap<String, KeyedSlot>,
    keyed_pending: VecDeque<(String, u64)>,
    keyed_factories: HashMap<u64, KeyedOpFactory>,
    next_generation: u64,
    drain_notify: Arc<Notify>,
    running_interactive: usize,
    running_background: usize,
}

impl OpsQueue {
    pub fn new() -> Self {
        Self {
            drain_notify: Arc::new(Notify::new()),
            ..Default::default()
        }
    }

    pub fn enqueue_interactive(&mut self, op: BoxFuture) {
        self.interactive.push_back(op);
    }

    pub fn enqueue_background(&mut self, op: BoxFuture) {
        self.background.push_back(op);
    }

    /// Enqueue a latest-wins op under `key`. Any previously pending-and-not-
    /// yet-started op for this key is dropped, and a currently running one
    /// is aborted via its `AbortSignal`.
    pub fn enqueue_keyed(&mut self, key: impl Into<String>, factory: KeyedOpFactory) {
        let key = key.into();
        if let Some(slot) = self.keyed_slots.get(&key) {
            slot.token.cancel();
        }
        let generation = self.next_generation;
        self.next_generation += 1;
        self.keyed_slots.insert(
            key.clone(),
            KeyedSlot {
                token: CancellationToken::new(),
                generation,
            },
        );
        self.keyed_factories.insert(generation, factory);
        self.keyed_pending.retain(|(k, _)| k != &key);
        self.keyed_pending.push_back((key, generation));
    }

    /// Run one tick: drains one interactive op if present, else one keyed
    /// op, else (only when both are empty) one background op.
    pub async fn tick(&mut self) {
        if let Some(op) = self.interactive.pop_front() {
            self.running_interactive += 1;
            op.await;
            self.running_interactive -= 1;
            self.drain_notify.notify_waiters();
            return;
        }

        while let Some((key, generation)) = self.keyed_pending.pop_front() {
            let Some(slot) = self.keyed_slots.get(&key) else {
                continue;
            };
            if slot.generation != generation {
                // Superseded before it ever ran.
                continue;
            }
            let token = slot.token.clone();
            let Some(factory) = self.keyed_factories.remove(&generation) else {
                continue;
            };
            let signal = AbortSignal { token: token.clone() };
            let fut = factory(signal);
            fut.await;
            if self.keyed_slots.get(&key).map(|s| s.generation) == Some(generation) {
                self.keyed_slots.remove(&key);
            }
            self.drain_notify.notify_waiters();
            return;
        }

        if let Some(op) = self.background.pop_front() {
            self.running_background += 1;
            op.await;
            self.running_background -= 1;
            self.drain_notify.notify_waiters();
        }
    }

    pub fn is_idle(&self) -> bool {
        self.interactive.is_empty()
            && self.keyed_pending.is_empty()
            && self.background.is_empty()
            && self.running_interactive == 0
            && self.running_background == 0
    }

    /// Resolves once the interactive and background queues have fully
    /// settled. Latest-wins ops that were pre-aborted before ever running
    /// are drained without running, so they don't block this.
    pub async fn wait_for_drain(&mut self) {
        while !self.is_idle() {
            self.tick().await;
        }
    }
}
