//! Real-time tick driver.
//!
//! The loop measures wall-clock time between ticks, clamps it to
//! `max_delta`, and ticks the [`SimWorld`]. It runs until a [`LoopHandle`]
//! stops it or a queued operation returns [`crate::Interrupted`].

use crate::api::SimWorld;
use crate::commands::panic_message;
use crate::error::SimError;
use log::{error, info};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Name of the thread started by [`GameLoop::spawn`].
pub const LOOP_THREAD_NAME: &str = "game-loop";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Cloneable, thread-safe stop switch for a [`GameLoop`].
#[derive(Debug, Clone)]
pub struct LoopHandle {
    running: Arc<AtomicBool>,
}

impl LoopHandle {
    /// Ask the loop to exit after its current iteration.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn state(&self) -> LoopState {
        if self.is_running() {
            LoopState::Running
        } else {
            LoopState::Stopped
        }
    }
}

/// Clamp a measured frame time to `max_delta` seconds.
pub fn clamp_delta(elapsed: Duration, max_delta: f32) -> f32 {
    elapsed.as_secs_f32().min(max_delta)
}

pub struct GameLoop {
    sim: SimWorld,
    running: Arc<AtomicBool>,
    max_delta: f32,
    idle_sleep: Duration,
}

impl GameLoop {
    /// Wrap `sim`, taking timing parameters from its config.
    ///
    /// The loop starts out in the running state, so a handle stopped before
    /// [`GameLoop::run`] makes it return immediately.
    pub fn new(sim: SimWorld) -> Self {
        let config = sim.config();
        let max_delta = config.max_delta;
        let idle_sleep = config.idle_sleep();
        Self {
            sim,
            running: Arc::new(AtomicBool::new(true)),
            max_delta,
            idle_sleep,
        }
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            running: Arc::clone(&self.running),
        }
    }

    pub fn sim(&self) -> &SimWorld {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut SimWorld {
        &mut self.sim
    }

    /// Run one tick for `elapsed` wall-clock time.
    pub fn step(&mut self, elapsed: Duration) -> Result<(), SimError> {
        self.sim.tick(clamp_delta(elapsed, self.max_delta))
    }

    /// Tick until stopped or interrupted, then hand the simulation back.
    ///
    /// Errors and panics from a tick are logged and the loop carries on.
    pub fn run(mut self) -> SimWorld {
        info!(
            "simulation loop started (max delta {}s, idle sleep {:?})",
            self.max_delta, self.idle_sleep
        );
        let mut last_tick = Instant::now();

        while self.running.load(Ordering::Acquire) {
            let now = Instant::now();
            let elapsed = now.duration_since(last_tick);
            last_tick = now;

            match panic::catch_unwind(AssertUnwindSafe(|| self.step(elapsed))) {
                Ok(Ok(())) => {}
                Ok(Err(SimError::Interrupted)) => {
                    info!("simulation loop interrupted");
                    break;
                }
                Ok(Err(err)) => error!("tick {} failed: {err}", self.sim.current_tick()),
                Err(payload) => error!(
                    "tick {} panicked: {}",
                    self.sim.current_tick(),
                    panic_message(&*payload)
                ),
            }

            if !self.idle_sleep.is_zero() {
                thread::sleep(self.idle_sleep);
            }
        }

        self.running.store(false, Ordering::Release);
        info!(
            "simulation loop stopped after {} ticks ({:.2}s simulated)",
            self.sim.current_tick(),
            self.sim.current_time()
        );
        self.sim
    }

    /// Run the loop on its own named thread.
    ///
    /// Joining the returned thread yields the simulation once the loop exits.
    pub fn spawn(self) -> Result<(LoopHandle, JoinHandle<SimWorld>), SimError> {
        let handle = self.handle();
        let thread = thread::Builder::new()
            .name(LOOP_THREAD_NAME.to_string())
            .spawn(move || self.run())
            .map_err(SimError::Spawn)?;
        Ok((handle, thread))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Interrupted;
    use crate::components::*;
    use bevy_ecs::world::World;

    #[test]
    fn test_clamp_delta() {
        assert_eq!(clamp_delta(Duration::from_secs(5), 0.25), 0.25);
        assert_eq!(clamp_delta(Duration::from_millis(100), 0.25), 0.1);
    }

    #[test]
    fn test_long_frame_is_clamped_for_movement() {
        let mut sim = SimWorld::new();
        let mover = sim
            .world_mut()
            .spawn(MobileBundle::moving(0.0, 0.0, 4.0, 0.0))
            .id();
        let mut game = GameLoop::new(sim);

        game.step(Duration::from_secs(5)).unwrap();

        let pos = game.sim().world().get::<Position>(mover).unwrap();
        assert_eq!(pos.x, 1.0);
        assert_eq!(game.sim().current_time(), 0.25);
    }

    #[test]
    fn test_stop_from_another_thread() {
        let game = GameLoop::new(SimWorld::new());
        let (handle, thread) = game.spawn().unwrap();
        assert_eq!(thread.thread().name(), Some(LOOP_THREAD_NAME));

        let remote = handle.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.stop();
        })
        .join()
        .unwrap();

        let sim = thread.join().unwrap();
        assert_eq!(handle.state(), LoopState::Stopped);
        assert!(sim.current_tick() > 0);
    }

    #[test]
    fn test_interrupt_ends_loop_after_failures() {
        let sim = SimWorld::new();
        let queue = sim.commands();
        queue.enqueue("fails", |_: &mut World| Err(anyhow::anyhow!("ignored")));
        queue.enqueue("panics", |_: &mut World| panic!("ignored"));
        queue.enqueue("stop", |_: &mut World| Err(Interrupted.into()));

        let (handle, thread) = GameLoop::new(sim).spawn().unwrap();
        let sim = thread.join().unwrap();

        assert!(!handle.is_running());
        assert_eq!(sim.current_tick(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_stopped_before_run_returns_immediately() {
        let game = GameLoop::new(SimWorld::new());
        game.handle().stop();
        let sim = game.run();
        assert_eq!(sim.current_tick(), 0);
    }
}
