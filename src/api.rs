//! Public API for the simulation.
//!
//! [`SimWorld`] owns the ECS world, the per-tick schedule, the command queue
//! and the template registry. It is driven either directly with
//! [`SimWorld::tick`] or by a [`crate::GameLoop`] on its own thread.
//!
//! ## Tick
//!
//! One tick is, in order:
//! 1. drain the command queue (external mutations land here and only here)
//! 2. publish the delta time
//! 3. run Movement, SpatialSync, AI, BasicAttack and Death once each
//!
//! Entities killed during a tick are gone before the next tick starts.

use crate::commands::WorldCommandQueue;
use crate::config::SimConfig;
use crate::error::SimError;
use crate::spatial::SpatialHashGrid;
use crate::systems::*;
use crate::templates::TemplateRegistry;
use crate::world::Snapshot;
use bevy_ecs::prelude::*;
use log::warn;

/// The main simulation world container.
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    commands: WorldCommandQueue,
    templates: TemplateRegistry,
    tick: u64,
    time: f32,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    /// Create an empty simulation with the default configuration.
    pub fn new() -> Self {
        Self::build(SimConfig::default())
    }

    /// Create a simulation from `config`, loading templates from its
    /// `prefab_dir` when set.
    pub fn with_config(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let prefab_dir = config.prefab_dir.clone();
        let mut sim = Self::build(config);
        if let Some(dir) = prefab_dir {
            sim.templates.load_dir(dir)?;
        }
        Ok(sim)
    }

    fn build(config: SimConfig) -> Self {
        let mut world = World::new();

        world.insert_resource(DeltaTime::default());
        world.insert_resource(SpatialHashGrid::new(config.cell_size));
        world.insert_resource(AiFaults::default());
        world.insert_resource(config);

        Self {
            world,
            schedule: simulation_schedule(),
            commands: WorldCommandQueue::new(),
            templates: TemplateRegistry::new(),
            tick: 0,
            time: 0.0,
        }
    }

    /// Advance the simulation by one tick of `dt` seconds.
    ///
    /// Returns `SimError::Interrupted` if a queued operation interrupted the
    /// drain; in that case no system ran. Behavior faults are reported after
    /// the whole tick has run.
    pub fn tick(&mut self, dt: f32) -> Result<(), SimError> {
        let report = self.commands.process(&mut self.world)?;
        if report.failed > 0 {
            warn!(
                "tick {}: {} of {} queued commands failed",
                self.tick, report.failed, report.executed
            );
        }

        self.world.resource_mut::<DeltaTime>().0 = dt;
        self.schedule.run(&mut self.world);

        self.tick += 1;
        self.time += dt;

        let faults = self.world.resource_mut::<AiFaults>().take();
        if faults.is_empty() {
            Ok(())
        } else {
            Err(SimError::Behavior(faults))
        }
    }

    /// Handle for queueing world mutations from any thread.
    pub fn commands(&self) -> WorldCommandQueue {
        self.commands.clone()
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    pub fn templates_mut(&mut self) -> &mut TemplateRegistry {
        &mut self.templates
    }

    pub(crate) fn spawn_parts(&mut self) -> (&mut World, &TemplateRegistry) {
        (&mut self.world, &self.templates)
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Elapsed simulation time in seconds.
    pub fn current_time(&self) -> f32 {
        self.time
    }

    pub fn config(&self) -> &SimConfig {
        self.world.resource::<SimConfig>()
    }

    pub fn spatial_grid(&self) -> &SpatialHashGrid {
        self.world.resource::<SpatialHashGrid>()
    }

    /// Direct world access for setup and inspection between ticks.
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn entity_count(&self) -> usize {
        self.world.entities().len() as usize
    }

    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world, self.tick, self.time)
    }

    /// Snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> Result<String, serde_json::Error> {
        self.snapshot().to_json()
    }
}
