//! ECS Components for the Skirmish simulation.
//!
//! Components are pure data containers attached to entities.
//! All game logic lives in systems and behavior nodes that read these components.
//!
//! Components marked *transient* carry per-tick working state and are never
//! written by the persistence layer.

use crate::behavior::BehaviorNode;
use crate::spatial::{track_on_insert, untrack_on_replace};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// 2D position in world units.
///
/// Inserting or replacing a `Position` on an entity that also has a
/// [`SpatialNode`] keeps the [`crate::SpatialHashGrid`] in step.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[component(on_insert = track_on_insert, on_replace = untrack_on_replace)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        self.distance_sq_to(other).sqrt()
    }

    pub fn distance_sq_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Movement delta applied per second.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

impl Velocity {
    pub fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }

    pub fn magnitude(&self) -> f32 {
        (self.dx * self.dx + self.dy * self.dy).sqrt()
    }

    pub fn stop(&mut self) {
        self.dx = 0.0;
        self.dy = 0.0;
    }
}

/// Physical extent of an entity. Ranges are measured surface to surface.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub radius: f32,
}

impl Body {
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }
}

/// Last position recorded in the spatial grid (transient).
///
/// After the spatial sync pass this always equals the entity's [`Position`].
/// Grid removals use these coordinates, never the current position.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
#[component(on_insert = track_on_insert, on_replace = untrack_on_replace)]
pub struct SpatialNode {
    pub last_x: f32,
    pub last_y: f32,
}

impl SpatialNode {
    pub fn new(last_x: f32, last_y: f32) -> Self {
        Self { last_x, last_y }
    }

    #[inline]
    #[allow(clippy::float_cmp)]
    pub fn matches(&self, pos: &Position) -> bool {
        self.last_x == pos.x && self.last_y == pos.y
    }
}

/// Distance between two entities' surfaces.
///
/// Radii are subtracted only when both sides have a [`Body`]; the result can be
/// negative for overlapping bodies.
pub fn surface_distance(
    a: &Position,
    a_body: Option<&Body>,
    b: &Position,
    b_body: Option<&Body>,
) -> f32 {
    let center = a.distance_to(b);
    match (a_body, b_body) {
        (Some(a_body), Some(b_body)) => center - (a_body.radius + b_body.radius),
        _ => center,
    }
}

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Human-readable identifier for a named entity.
#[derive(Component, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Marker: entities carrying this are written to disk by the persistence layer.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persistent;

// ============================================================================
// COMBAT COMPONENTS
// ============================================================================

/// Health pool. An entity at or below zero health is removed by the death pass.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub health: f32,
    pub max_health: f32,
}

impl Stats {
    pub fn new(max_health: f32) -> Self {
        Self {
            health: max_health,
            max_health,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn fraction(&self) -> f32 {
        if self.max_health <= 0.0 {
            0.0
        } else {
            (self.health / self.max_health).clamp(0.0, 1.0)
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(100.0)
    }
}

/// Melee/ranged attack profile.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombatStats {
    /// Damage per successful swing.
    pub damage: f32,
    /// Maximum surface distance at which a swing connects.
    pub range: f32,
    /// Swings per second.
    pub attack_speed: f32,
}

impl CombatStats {
    pub fn new(damage: f32, range: f32, attack_speed: f32) -> Self {
        Self {
            damage,
            range,
            attack_speed,
        }
    }

    /// Cooldown installed after every swing. A non-positive attack speed
    /// yields an infinite cooldown, so the entity swings at most once.
    pub fn swing_cooldown(&self) -> f32 {
        if self.attack_speed > 0.0 {
            1.0 / self.attack_speed
        } else {
            f32::INFINITY
        }
    }
}

impl Default for CombatStats {
    fn default() -> Self {
        Self::new(10.0, 2.0, 1.0)
    }
}

/// Request to swing at `target` this tick (transient).
///
/// Written by the combat behavior node, consumed by the basic attack pass.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackIntent {
    pub target: Entity,
}

impl AttackIntent {
    pub fn new(target: Entity) -> Self {
        Self { target }
    }
}

/// Attack cooldown in seconds (transient). Removed once it reaches zero.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct SwingTimer {
    pub cooldown: f32,
}

impl SwingTimer {
    pub fn new(cooldown: f32) -> Self {
        Self { cooldown }
    }
}

// ============================================================================
// AI COMPONENTS
// ============================================================================

/// Owns the behavior tree driving one entity.
///
/// Trees hold per-entity progress (sequence cursors, target caches), so every
/// entity must own its own instance; use [`BehaviorNode::deep_copy`] to
/// instantiate a shared prototype.
#[derive(Component, Debug)]
pub struct AiBehavior {
    // `None` only while the AI pass is executing the tree.
    root: Option<BehaviorNode>,
}

impl AiBehavior {
    pub fn new(root: BehaviorNode) -> Self {
        Self { root: Some(root) }
    }

    pub fn root(&self) -> Option<&BehaviorNode> {
        self.root.as_ref()
    }

    pub fn root_mut(&mut self) -> Option<&mut BehaviorNode> {
        self.root.as_mut()
    }

    pub(crate) fn take_root(&mut self) -> Option<BehaviorNode> {
        self.root.take()
    }

    /// Puts a tree back after execution unless a node installed a new one.
    pub(crate) fn restore_root(&mut self, root: BehaviorNode) {
        if self.root.is_none() {
            self.root = Some(root);
        }
    }
}

/// Target most recently chosen by a find-target node (transient).
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredTarget(pub Entity);

// ============================================================================
// BUNDLES
// ============================================================================

/// Bundle for a mobile entity tracked by the spatial grid.
#[derive(Bundle, Default)]
pub struct MobileBundle {
    pub position: Position,
    pub velocity: Velocity,
    pub node: SpatialNode,
}

impl MobileBundle {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            position: Position::new(x, y),
            velocity: Velocity::default(),
            node: SpatialNode::new(x, y),
        }
    }

    /// Mobile entity at `(x, y)` already moving at `(dx, dy)` units per second.
    pub fn moving(x: f32, y: f32, dx: f32, dy: f32) -> Self {
        Self {
            velocity: Velocity::new(dx, dy),
            ..Self::at(x, y)
        }
    }
}

/// Bundle for an entity that can fight and be killed.
#[derive(Bundle, Default)]
pub struct CombatantBundle {
    pub mobile: MobileBundle,
    pub body: Body,
    pub stats: Stats,
    pub combat: CombatStats,
}

impl CombatantBundle {
    pub fn new(x: f32, y: f32, radius: f32, max_health: f32, combat: CombatStats) -> Self {
        Self {
            mobile: MobileBundle::at(x, y),
            body: Body::new(radius),
            stats: Stats::new(max_health),
            combat,
        }
    }
}
