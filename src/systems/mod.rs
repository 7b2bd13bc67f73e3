//! ECS Systems for the Skirmish simulation.
//!
//! Systems contain the game logic that operates on components. They run
//! strictly in this order, once per tick, on a single thread:
//!
//! 1. `movement_system` - applies velocity to position
//! 2. `spatial_sync_system` - moves entities between grid cells
//! 3. `ai_system` - executes behavior trees (exclusive, reads the grid)
//! 4. `basic_attack_system` - ticks cooldowns, resolves attack intents
//! 5. `death_system` - despawns entities with no health left
//!
//! The order is declared once in [`simulation_schedule`].

pub mod ai;
pub mod combat;
pub mod death;
pub mod movement;

pub use crate::spatial::spatial_sync_system;
pub use ai::*;
pub use combat::*;
pub use death::*;
pub use movement::*;

use bevy_ecs::schedule::ExecutorKind;
use bevy_ecs::prelude::*;

/// Build the per-tick schedule with the fixed system order.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            movement_system,
            spatial_sync_system,
            ai_system,
            basic_attack_system,
            death_system,
        )
            .chain(),
    );
    schedule
}
