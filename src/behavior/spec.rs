use super::{BehaviorError, BehaviorNode, Target};
use serde::{Deserialize, Serialize};

/// Declarative tree description, as written in entity templates.
///
/// Template trees cannot name concrete entities, so chase and combat nodes
/// built from a spec act on the entity's acquired target.
///
/// ```json
/// { "kind": "sequence", "children": [
///     { "kind": "find_target" },
///     { "kind": "chase", "speed": 4.0 },
///     { "kind": "combat" }
/// ] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BehaviorSpec {
    Sequence { children: Vec<BehaviorSpec> },
    FindTarget,
    Chase { speed: f32 },
    Combat,
}

impl BehaviorSpec {
    /// Build and validate the tree.
    pub fn build(&self) -> Result<BehaviorNode, BehaviorError> {
        Ok(match self {
            BehaviorSpec::Sequence { children } => BehaviorNode::sequence(
                children
                    .iter()
                    .map(BehaviorSpec::build)
                    .collect::<Result<_, _>>()?,
            ),
            BehaviorSpec::FindTarget => BehaviorNode::find_target(),
            BehaviorSpec::Chase { speed } => BehaviorNode::chase(Target::Acquired, *speed)?,
            BehaviorSpec::Combat => BehaviorNode::combat(Target::Acquired),
        })
    }
}
