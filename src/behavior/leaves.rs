//! Built-in leaf nodes: target acquisition, pursuit, and engagement.

use super::{BehaviorError, Status};
use crate::components::*;
use crate::spatial::SpatialHashGrid;
use bevy_ecs::prelude::*;

/// Distance below which a chaser counts as having arrived.
pub const ARRIVAL_DISTANCE: f32 = 0.1;

/// Which entity a chase or combat node acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A fixed entity chosen when the tree was built.
    Entity(Entity),
    /// Whatever the entity's last find-target pass chose ([`AcquiredTarget`]).
    Acquired,
}

impl Target {
    fn resolve(self, world: &World, entity: Entity) -> Option<Entity> {
        match self {
            Target::Entity(target) => Some(target),
            Target::Acquired => world.get::<AcquiredTarget>(entity).map(|t| t.0),
        }
    }
}

// ============================================================================
// FIND TARGET
// ============================================================================

/// Picks the nearest other entity in the surrounding grid cells.
///
/// Candidates without a [`Position`] are skipped. Equal distances resolve to
/// the lowest entity id so the choice does not depend on bucket order.
#[derive(Debug, Default)]
pub struct FindTarget {
    last_found: Option<Entity>,
}

impl FindTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target chosen by the most recent successful execution.
    pub fn last_found(&self) -> Option<Entity> {
        self.last_found
    }

    #[cfg(test)]
    pub(crate) fn set_last_found(&mut self, target: Entity) {
        self.last_found = Some(target);
    }

    pub fn execute(&mut self, world: &mut World, entity: Entity) -> Result<Status, BehaviorError> {
        let Some(origin) = world.get::<Position>(entity).copied() else {
            return Ok(Status::Failure);
        };
        let grid = world
            .get_resource::<SpatialHashGrid>()
            .ok_or(BehaviorError::MissingResource {
                node: "find_target",
                resource: "SpatialHashGrid",
            })?;

        let mut best: Option<(f32, Entity)> = None;
        for candidate in grid.get_nearby(origin.x, origin.y) {
            if candidate == entity {
                continue;
            }
            let Some(pos) = world.get::<Position>(candidate) else {
                continue;
            };
            let dist_sq = origin.distance_sq_to(pos);
            let closer = match best {
                None => true,
                Some((best_sq, best_entity)) => {
                    dist_sq < best_sq || (dist_sq == best_sq && candidate < best_entity)
                }
            };
            if closer {
                best = Some((dist_sq, candidate));
            }
        }

        match best {
            Some((_, target)) => {
                self.last_found = Some(target);
                world.entity_mut(entity).insert(AcquiredTarget(target));
                Ok(Status::Success)
            }
            None => Ok(Status::Failure),
        }
    }
}

// ============================================================================
// CHASE
// ============================================================================

/// Steers toward a target at a fixed speed.
///
/// Returns `Running` while closing in and `Success` (with velocity zeroed)
/// once within [`ARRIVAL_DISTANCE`] of the target's center.
#[derive(Debug, Clone, PartialEq)]
pub struct Chase {
    target: Target,
    speed: f32,
}

impl Chase {
    pub fn new(target: Target, speed: f32) -> Result<Self, BehaviorError> {
        if !speed.is_finite() || speed < 0.0 {
            return Err(BehaviorError::InvalidConfig {
                node: "chase",
                reason: format!("speed must be a finite, non-negative number, got {speed}"),
            });
        }
        Ok(Self { target, speed })
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn execute(&self, world: &mut World, entity: Entity) -> Status {
        let Some(target) = self.target.resolve(world, entity) else {
            return Status::Failure;
        };
        let (Some(me), Some(there)) = (
            world.get::<Position>(entity).copied(),
            world.get::<Position>(target).copied(),
        ) else {
            return Status::Failure;
        };
        let Some(mut vel) = world.get_mut::<Velocity>(entity) else {
            return Status::Failure;
        };

        let dx = there.x - me.x;
        let dy = there.y - me.y;
        let distance = (dx * dx + dy * dy).sqrt();
        if distance < ARRIVAL_DISTANCE {
            vel.stop();
            return Status::Success;
        }

        vel.dx = dx / distance * self.speed;
        vel.dy = dy / distance * self.speed;
        Status::Running
    }
}

// ============================================================================
// COMBAT
// ============================================================================

/// Declares an attack on the target when it is within weapon range.
///
/// Writes (or overwrites) an [`AttackIntent`]; damage is resolved later by the
/// basic attack pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Combat {
    target: Target,
}

impl Combat {
    pub fn new(target: Target) -> Self {
        Self { target }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn execute(&self, world: &mut World, entity: Entity) -> Status {
        let Some(target) = self.target.resolve(world, entity) else {
            return Status::Failure;
        };
        let (Some(me), Some(there), Some(stats)) = (
            world.get::<Position>(entity),
            world.get::<Position>(target),
            world.get::<CombatStats>(entity),
        ) else {
            return Status::Failure;
        };

        let distance = surface_distance(
            me,
            world.get::<Body>(entity),
            there,
            world.get::<Body>(target),
        );
        if distance > stats.range {
            return Status::Failure;
        }

        world.entity_mut(entity).insert(AttackIntent::new(target));
        Status::Success
    }
}
