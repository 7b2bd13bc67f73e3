//! Behavior tree engine.
//!
//! A tree is an owned value of [`BehaviorNode`]. Nodes carry per-entity
//! execution state (the sequence cursor, the find-target cache), so the type
//! deliberately has no `Clone` impl: the only way to duplicate a tree is
//! [`BehaviorNode::deep_copy`], which rebuilds the same configuration with
//! fresh state. Each [`crate::AiBehavior`] therefore owns a tree no other
//! entity can reach.
//!
//! Nodes run against the whole `World` for one entity at a time. A missing
//! component is an ordinary [`Status::Failure`]; a [`BehaviorError`] means the
//! tree itself is misconfigured.

mod leaves;
mod sequence;
mod spec;

pub use leaves::{Chase, Combat, FindTarget, Target, ARRIVAL_DISTANCE};
pub use sequence::Sequence;
pub use spec::BehaviorSpec;

use bevy_ecs::prelude::*;
use std::fmt;
use thiserror::Error;

/// Outcome of executing a node for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    Failure,
    Running,
}

/// Configuration faults raised while building or executing a tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BehaviorError {
    #[error("invalid {node} configuration: {reason}")]
    InvalidConfig { node: &'static str, reason: String },
    #[error("{node} requires the {resource} resource")]
    MissingResource {
        node: &'static str,
        resource: &'static str,
    },
    #[error("action '{action}' failed: {reason}")]
    ActionFailed { action: String, reason: String },
    #[error("{node} panicked: {message}")]
    Panicked { node: String, message: String },
    #[error("behavior tree is missing")]
    MissingTree,
}

/// A user-defined leaf.
///
/// Implementors keep any per-entity state in `self`; `copy_action` must return
/// an instance with the same configuration and fresh state.
pub trait Action: Send + Sync {
    /// Name used in logs and fault reports.
    fn name(&self) -> &str;

    fn execute(&mut self, world: &mut World, entity: Entity) -> Result<Status, BehaviorError>;

    fn copy_action(&self) -> Box<dyn Action>;
}

/// A node in an entity's behavior tree.
pub enum BehaviorNode {
    Sequence(Sequence),
    FindTarget(FindTarget),
    Chase(Chase),
    Combat(Combat),
    Action(Box<dyn Action>),
}

impl BehaviorNode {
    /// Sequence over `children`, starting at the first child.
    pub fn sequence(children: Vec<BehaviorNode>) -> Self {
        Self::Sequence(Sequence::new(children))
    }

    pub fn find_target() -> Self {
        Self::FindTarget(FindTarget::new())
    }

    /// Chase node; fails on a negative or non-finite speed.
    pub fn chase(target: Target, speed: f32) -> Result<Self, BehaviorError> {
        Chase::new(target, speed).map(Self::Chase)
    }

    pub fn combat(target: Target) -> Self {
        Self::Combat(Combat::new(target))
    }

    pub fn action(action: impl Action + 'static) -> Self {
        Self::Action(Box::new(action))
    }

    /// Run this node for `entity`.
    pub fn execute(&mut self, world: &mut World, entity: Entity) -> Result<Status, BehaviorError> {
        match self {
            Self::Sequence(node) => node.execute(world, entity),
            Self::FindTarget(node) => node.execute(world, entity),
            Self::Chase(node) => Ok(node.execute(world, entity)),
            Self::Combat(node) => Ok(node.execute(world, entity)),
            Self::Action(action) => action.execute(world, entity),
        }
    }

    /// Independent copy of this tree with all execution state reset.
    pub fn deep_copy(&self) -> Self {
        match self {
            Self::Sequence(node) => Self::Sequence(node.deep_copy()),
            Self::FindTarget(_) => Self::FindTarget(FindTarget::new()),
            Self::Chase(node) => Self::Chase(node.clone()),
            Self::Combat(node) => Self::Combat(node.clone()),
            Self::Action(action) => Self::Action(action.copy_action()),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Sequence(_) => "sequence",
            Self::FindTarget(_) => "find_target",
            Self::Chase(_) => "chase",
            Self::Combat(_) => "combat",
            Self::Action(action) => action.name(),
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Self::Sequence(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_find_target(&self) -> Option<&FindTarget> {
        match self {
            Self::FindTarget(node) => Some(node),
            _ => None,
        }
    }
}

impl fmt::Debug for BehaviorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence(node) => fmt::Debug::fmt(node, f),
            Self::FindTarget(node) => fmt::Debug::fmt(node, f),
            Self::Chase(node) => fmt::Debug::fmt(node, f),
            Self::Combat(node) => fmt::Debug::fmt(node, f),
            Self::Action(action) => f.debug_tuple("Action").field(&action.name()).finish(),
        }
    }
}
