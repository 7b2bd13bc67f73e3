//! AI system - runs each entity's behavior tree once per tick.
//!
//! Trees need the whole `World` (leaves read other entities and write
//! components), so this is an exclusive system. Each root is taken out of its
//! [`AiBehavior`] for the duration of the call and put back afterwards.

use crate::behavior::BehaviorError;
use crate::commands::panic_message;
use crate::components::AiBehavior;
use bevy_ecs::prelude::*;
use log::error;
use std::panic::{self, AssertUnwindSafe};

/// A behavior tree that faulted this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct AiFault {
    pub entity: Entity,
    pub error: BehaviorError,
}

/// Faults collected by [`ai_system`] during the current tick.
///
/// The tick driver drains this after the schedule runs and reports it.
#[derive(Resource, Debug, Default)]
pub struct AiFaults(pub Vec<AiFault>);

impl AiFaults {
    pub fn take(&mut self) -> Vec<AiFault> {
        std::mem::take(&mut self.0)
    }
}

/// System that executes every behavior tree.
///
/// A fault in one tree is logged and recorded; the remaining entities are still
/// processed. A panicking node counts as a fault and its tree is put back, so
/// the rest of the tick's systems still run.
pub fn ai_system(world: &mut World) {
    let entities: Vec<Entity> = world
        .query_filtered::<Entity, With<AiBehavior>>()
        .iter(world)
        .collect();

    for entity in entities {
        let root = match world.get_mut::<AiBehavior>(entity) {
            Some(mut behavior) => behavior.take_root(),
            None => continue,
        };
        let Some(mut root) = root else {
            record_fault(world, entity, BehaviorError::MissingTree);
            continue;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| root.execute(world, entity)))
            .unwrap_or_else(|payload| {
                Err(BehaviorError::Panicked {
                    node: root.kind().to_string(),
                    message: panic_message(&*payload).to_string(),
                })
            });

        if let Some(mut behavior) = world.get_mut::<AiBehavior>(entity) {
            behavior.restore_root(root);
        }

        if let Err(err) = outcome {
            record_fault(world, entity, err);
        }
    }
}

fn record_fault(world: &mut World, entity: Entity, error: BehaviorError) {
    error!("behavior tree fault on entity {entity:?}: {error}");
    world
        .get_resource_or_insert_with(AiFaults::default)
        .0
        .push(AiFault { entity, error });
}
