//! Death system - removes entities whose health is exhausted.

use crate::components::Stats;
use bevy_ecs::prelude::*;
use log::debug;

/// System that despawns every entity at or below zero health.
///
/// Despawns are applied at the sync point after this system, before the next
/// tick's AI and attack passes can reference the entity. Despawning fires the
/// spatial hooks, so the grid is cleaned up as well.
pub fn death_system(mut commands: Commands, query: Query<(Entity, &Stats)>) {
    for (entity, stats) in query.iter() {
        if stats.health <= 0.0 {
            debug!("entity {entity:?} died (health {})", stats.health);
            commands.entity(entity).despawn();
        }
    }
}
