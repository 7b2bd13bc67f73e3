//! Thread-safe queue of deferred world mutations.
//!
//! Anything outside the simulation thread (timers, request handlers, the
//! autosave task) talks to the world only through this queue. The simulation
//! thread drains it once at the start of every tick, before any system runs.

use crate::error::SimError;
use bevy_ecs::world::World;
use log::{error, warn};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

/// A deferred operation on the world.
pub type WorldOp = Box<dyn FnOnce(&mut World) -> anyhow::Result<()> + Send + 'static>;

/// Error a queued operation returns to cancel the simulation loop.
///
/// Any other error only fails the operation that returned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("simulation interrupted")]
pub struct Interrupted;

struct QueuedOp {
    label: String,
    op: WorldOp,
}

/// Outcome of one [`WorldCommandQueue::process`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Operations that ran, including failed ones.
    pub executed: usize,
    /// Operations that returned an error or panicked.
    pub failed: usize,
}

/// FIFO of world operations, cheap to clone and share across threads.
#[derive(Clone, Default)]
pub struct WorldCommandQueue {
    pending: Arc<Mutex<VecDeque<QueuedOp>>>,
}

impl WorldCommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `op` for the next tick. `label` identifies it in failure logs.
    pub fn enqueue<F>(&self, label: impl Into<String>, op: F)
    where
        F: FnOnce(&mut World) -> anyhow::Result<()> + Send + 'static,
    {
        self.pending.lock().push_back(QueuedOp {
            label: label.into(),
            op: Box::new(op),
        });
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Run every operation queued before this call, in submission order.
    ///
    /// Operations queued while draining wait for the next call. A failing or
    /// panicking operation is logged and skipped. An operation returning
    /// [`Interrupted`] stops the drain: the rest go back to the front of the
    /// queue and `SimError::Interrupted` is returned.
    pub fn process(&self, world: &mut World) -> Result<DrainReport, SimError> {
        let mut batch = std::mem::take(&mut *self.pending.lock());
        let mut report = DrainReport::default();

        while let Some(QueuedOp { label, op }) = batch.pop_front() {
            report.executed += 1;
            match panic::catch_unwind(AssertUnwindSafe(|| op(world))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) if err.is::<Interrupted>() => {
                    warn!("command '{label}' interrupted the simulation");
                    self.requeue_front(batch);
                    return Err(SimError::Interrupted);
                }
                Ok(Err(err)) => {
                    report.failed += 1;
                    error!("command '{label}' failed: {err:#}");
                }
                Err(payload) => {
                    report.failed += 1;
                    error!("command '{label}' panicked: {}", panic_message(&*payload));
                }
            }
        }
        Ok(report)
    }

    fn requeue_front(&self, mut rest: VecDeque<QueuedOp>) {
        if rest.is_empty() {
            return;
        }
        let mut pending = self.pending.lock();
        rest.extend(pending.drain(..));
        *pending = rest;
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::Resource;

    #[derive(Resource, Default)]
    struct Log(Vec<&'static str>);

    fn world_with_log() -> World {
        let mut world = World::new();
        world.init_resource::<Log>();
        world
    }

    fn push(queue: &WorldCommandQueue, name: &'static str) {
        queue.enqueue(name, move |world: &mut World| {
            world.resource_mut::<Log>().0.push(name);
            Ok(())
        });
    }

    #[test]
    fn test_fifo_order() {
        let mut world = world_with_log();
        let queue = WorldCommandQueue::new();
        push(&queue, "a");
        push(&queue, "b");
        push(&queue, "c");

        let report = queue.process(&mut world).unwrap();

        assert_eq!(report, DrainReport { executed: 3, failed: 0 });
        assert_eq!(world.resource::<Log>().0, ["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_enqueued_during_drain_runs_next_tick() {
        let mut world = world_with_log();
        let queue = WorldCommandQueue::new();
        let inner = queue.clone();
        queue.enqueue("outer", move |world: &mut World| {
            world.resource_mut::<Log>().0.push("outer");
            push(&inner, "inner");
            Ok(())
        });

        queue.process(&mut world).unwrap();
        assert_eq!(world.resource::<Log>().0, ["outer"]);
        assert_eq!(queue.len(), 1);

        queue.process(&mut world).unwrap();
        assert_eq!(world.resource::<Log>().0, ["outer", "inner"]);
    }

    #[test]
    fn test_failure_and_panic_are_contained() {
        let mut world = world_with_log();
        let queue = WorldCommandQueue::new();
        push(&queue, "before");
        queue.enqueue("fails", |_: &mut World| Err(anyhow::anyhow!("disk full")));
        queue.enqueue("panics", |_: &mut World| panic!("boom"));
        push(&queue, "after");

        let report = queue.process(&mut world).unwrap();

        assert_eq!(report, DrainReport { executed: 4, failed: 2 });
        assert_eq!(world.resource::<Log>().0, ["before", "after"]);
    }

    #[test]
    fn test_interrupt_stops_drain_and_keeps_rest() {
        let mut world = world_with_log();
        let queue = WorldCommandQueue::new();
        push(&queue, "a");
        queue.enqueue("stop", |_: &mut World| Err(Interrupted.into()));
        push(&queue, "b");

        let result = queue.process(&mut world);

        assert!(matches!(result, Err(SimError::Interrupted)));
        assert_eq!(world.resource::<Log>().0, ["a"]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_enqueue_from_other_threads() {
        let mut world = world_with_log();
        let queue = WorldCommandQueue::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        push(&queue, "x");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let report = queue.process(&mut world).unwrap();
        assert_eq!(report.executed, 100);
        assert_eq!(world.resource::<Log>().0.len(), 100);
    }
}
