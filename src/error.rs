//! Error types for the simulation core.

use crate::systems::AiFault;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error returned by the tick driver and the spawn/persistence API.
#[derive(Debug, Error)]
pub enum SimError {
    /// A queued operation asked the simulation loop to stop.
    #[error("simulation interrupted")]
    Interrupted,
    /// One or more behavior trees reported a configuration fault this tick.
    #[error("{} behavior tree fault(s), first on entity {:?}: {}", .0.len(), first_entity(.0), first_reason(.0))]
    Behavior(Vec<AiFault>),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The OS refused to start a worker thread.
    #[error("failed to spawn thread: {0}")]
    Spawn(#[source] std::io::Error),
}

fn first_entity(faults: &[AiFault]) -> Option<bevy_ecs::entity::Entity> {
    faults.first().map(|f| f.entity)
}

fn first_reason(faults: &[AiFault]) -> String {
    faults
        .first()
        .map(|f| f.error.to_string())
        .unwrap_or_default()
}

/// Failure to parse, resolve or instantiate an entity template.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),
    #[error("template '{template}': unknown component type '{tag}'")]
    UnknownComponent { template: String, tag: String },
    #[error("template '{template}': invalid fields for '{tag}': {source}")]
    InvalidFields {
        template: String,
        tag: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("template '{template}': {source}")]
    Malformed {
        template: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("template '{template}': invalid behavior tree: {source}")]
    Behavior {
        template: String,
        #[source]
        source: crate::behavior::BehaviorError,
    },
    #[error("failed to read templates from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to write or read a save file.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("save file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("save file {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Invalid or unreadable [`crate::SimConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}
