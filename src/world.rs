//! Serializable per-tick view of the simulation.
//!
//! The `Snapshot` struct lists every positioned entity so clients (renderers,
//! replays, debugging tools) can consume the state without touching the ECS.

use crate::components::*;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// State of a single positioned entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// `Entity::to_bits`, stable for the entity's lifetime.
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_max: Option<f32>,
}

/// Complete simulation state snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of ticks completed.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    /// All entities with a position, ordered by id.
    pub entities: Vec<EntitySnapshot>,
}

impl Snapshot {
    /// Create a snapshot from the ECS world.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let mut query = world.query::<(
            Entity,
            &Position,
            Option<&Velocity>,
            Option<&Stats>,
            Option<&Identity>,
        )>();

        let mut entities: Vec<EntitySnapshot> = query
            .iter(world)
            .map(|(entity, pos, vel, stats, identity)| {
                let vel = vel.copied().unwrap_or_default();
                EntitySnapshot {
                    id: entity.to_bits(),
                    identity: identity.map(|i| i.id.clone()),
                    x: pos.x,
                    y: pos.y,
                    vx: vel.dx,
                    vy: vel.dy,
                    health: stats.map(|s| s.health),
                    health_max: stats.map(|s| s.max_health),
                }
            })
            .collect();
        entities.sort_by_key(|e| e.id);

        Self {
            tick,
            time,
            entities,
        }
    }

    pub fn find(&self, identity: &str) -> Option<&EntitySnapshot> {
        self.entities
            .iter()
            .find(|e| e.identity.as_deref() == Some(identity))
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
