use super::{BehaviorError, BehaviorNode, Status};
use bevy_ecs::prelude::*;

/// Runs children in order, resuming where the previous tick stopped.
///
/// - `Failure` from a child resets the cursor and fails the sequence.
/// - `Running` returns immediately; the same child resumes next tick.
/// - `Success` advances to the next child within the same tick.
///
/// Once every child has succeeded the cursor resets and the sequence succeeds.
/// An empty sequence always succeeds.
#[derive(Debug)]
pub struct Sequence {
    children: Vec<BehaviorNode>,
    cursor: usize,
}

impl Sequence {
    pub fn new(children: Vec<BehaviorNode>) -> Self {
        Self {
            children,
            cursor: 0,
        }
    }

    /// Index of the child that runs next.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn children(&self) -> &[BehaviorNode] {
        &self.children
    }

    pub fn execute(&mut self, world: &mut World, entity: Entity) -> Result<Status, BehaviorError> {
        while let Some(child) = self.children.get_mut(self.cursor) {
            match child.execute(world, entity) {
                Ok(Status::Success) => self.cursor += 1,
                Ok(Status::Running) => return Ok(Status::Running),
                Ok(Status::Failure) => {
                    self.cursor = 0;
                    return Ok(Status::Failure);
                }
                Err(err) => {
                    self.cursor = 0;
                    return Err(err);
                }
            }
        }
        self.cursor = 0;
        Ok(Status::Success)
    }

    pub fn deep_copy(&self) -> Self {
        Self::new(self.children.iter().map(BehaviorNode::deep_copy).collect())
    }
}
