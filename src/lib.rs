//! Skirmish - Simulation Core
//!
//! A real-time entity simulation: movement, spatial hashing, behavior-tree AI
//! and melee combat, advanced in discrete ticks over a `bevy_ecs` world.
//! External threads mutate the world only through the [`WorldCommandQueue`],
//! which is drained at the start of every tick.

pub mod api;
pub mod behavior;
pub mod commands;
pub mod components;
pub mod config;
pub mod error;
pub mod game_loop;
pub mod logging;
pub mod persistence;
pub mod spatial;
pub mod systems;
pub mod templates;
pub mod world;

pub use api::SimWorld;
pub use behavior::{Action, BehaviorError, BehaviorNode, BehaviorSpec, Status, Target};
pub use commands::{DrainReport, Interrupted, WorldCommandQueue};
pub use components::*;
pub use config::SimConfig;
pub use error::{ConfigError, PersistenceError, SimError, TemplateError};
pub use game_loop::{GameLoop, LoopHandle, LoopState};
pub use persistence::{schedule_save, AutoSave};
pub use spatial::{SpatialHashGrid, DEFAULT_CELL_SIZE};
pub use systems::*;
pub use templates::{ComponentBlueprint, ComponentRegistry, EntityBuilder, TemplateRegistry};
pub use world::{EntitySnapshot, Snapshot};
