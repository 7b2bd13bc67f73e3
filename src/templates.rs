//! Entity templates (prefabs) and the entity factory.
//!
//! A template is a named list of component blueprints loaded from JSON:
//!
//! ```json
//! { "components": [
//!     { "type": "position", "fields": { "x": 0.0, "y": 0.0 } },
//!     { "type": "stats", "fields": { "max_health": 80.0 } },
//!     { "type": "ai_behavior", "fields": { "kind": "find_target" } }
//! ] }
//! ```
//!
//! Each `type` tag is resolved through a [`ComponentRegistry`]. Spawning copies
//! the blueprints, so entities built from one template never share state.

use crate::api::SimWorld;
use crate::behavior::{BehaviorError, BehaviorNode, BehaviorSpec};
use crate::components::*;
use crate::error::{SimError, TemplateError};
use bevy_ecs::prelude::*;
use bevy_ecs::world::EntityWorldMut;
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

// ============================================================================
// BLUEPRINTS
// ============================================================================

/// One component value waiting to be inserted into a new entity.
pub enum ComponentBlueprint {
    Position(Position),
    Velocity(Velocity),
    Body(Body),
    Stats(Stats),
    CombatStats(CombatStats),
    Identity(Identity),
    Persistent,
    SpatialNode,
    AiBehavior(BehaviorNode),
}

impl ComponentBlueprint {
    /// Registry tag this blueprint was parsed from.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Position(_) => "position",
            Self::Velocity(_) => "velocity",
            Self::Body(_) => "body",
            Self::Stats(_) => "stats",
            Self::CombatStats(_) => "combat_stats",
            Self::Identity(_) => "identity",
            Self::Persistent => "persistent",
            Self::SpatialNode => "spatial_node",
            Self::AiBehavior(_) => "ai_behavior",
        }
    }

    /// Per-spawn copy. Behavior trees go through `deep_copy`.
    pub fn copy(&self) -> Self {
        match self {
            Self::Position(c) => Self::Position(*c),
            Self::Velocity(c) => Self::Velocity(*c),
            Self::Body(c) => Self::Body(*c),
            Self::Stats(c) => Self::Stats(*c),
            Self::CombatStats(c) => Self::CombatStats(*c),
            Self::Identity(c) => Self::Identity(c.clone()),
            Self::Persistent => Self::Persistent,
            Self::SpatialNode => Self::SpatialNode,
            Self::AiBehavior(tree) => Self::AiBehavior(tree.deep_copy()),
        }
    }

    pub fn insert_into(self, entity: &mut EntityWorldMut) {
        match self {
            Self::Position(c) => entity.insert(c),
            Self::Velocity(c) => entity.insert(c),
            Self::Body(c) => entity.insert(c),
            Self::Stats(c) => entity.insert(c),
            Self::CombatStats(c) => entity.insert(c),
            Self::Identity(c) => entity.insert(c),
            Self::Persistent => entity.insert(Persistent),
            // The insert hook records the current position.
            Self::SpatialNode => entity.insert(SpatialNode::default()),
            Self::AiBehavior(tree) => entity.insert(AiBehavior::new(tree)),
        };
    }
}

impl fmt::Debug for ComponentBlueprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(c) => fmt::Debug::fmt(c, f),
            Self::Velocity(c) => fmt::Debug::fmt(c, f),
            Self::Body(c) => fmt::Debug::fmt(c, f),
            Self::Stats(c) => fmt::Debug::fmt(c, f),
            Self::CombatStats(c) => fmt::Debug::fmt(c, f),
            Self::Identity(c) => fmt::Debug::fmt(c, f),
            Self::Persistent => f.write_str("Persistent"),
            Self::SpatialNode => f.write_str("SpatialNode"),
            Self::AiBehavior(tree) => f.debug_tuple("AiBehavior").field(tree).finish(),
        }
    }
}

// ============================================================================
// COMPONENT REGISTRY
// ============================================================================

/// Why a single component's `fields` could not be turned into a blueprint.
#[derive(Debug)]
pub enum FieldError {
    Json(serde_json::Error),
    Behavior(BehaviorError),
}

impl From<serde_json::Error> for FieldError {
    fn from(err: serde_json::Error) -> Self {
        FieldError::Json(err)
    }
}

/// Parses the `fields` object of one component entry.
pub type ParseFn = fn(Value) -> Result<ComponentBlueprint, FieldError>;

/// Maps component type tags to parse functions.
pub struct ComponentRegistry {
    parsers: HashMap<String, ParseFn>,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("position", |v| Ok(ComponentBlueprint::Position(from_fields(v)?)));
        registry.register("velocity", |v| Ok(ComponentBlueprint::Velocity(from_fields(v)?)));
        registry.register("body", |v| Ok(ComponentBlueprint::Body(from_fields(v)?)));
        registry.register("combat_stats", |v| {
            Ok(ComponentBlueprint::CombatStats(from_fields(v)?))
        });
        registry.register("stats", parse_stats);
        registry.register("identity", |v| Ok(ComponentBlueprint::Identity(from_fields(v)?)));
        registry.register("persistent", |_| Ok(ComponentBlueprint::Persistent));
        registry.register("spatial_node", |_| Ok(ComponentBlueprint::SpatialNode));
        registry.register("ai_behavior", parse_behavior);
        registry
    }
}

impl ComponentRegistry {
    /// Registry with no tags at all.
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Add or replace the parser for `tag`.
    pub fn register(&mut self, tag: impl Into<String>, parse: ParseFn) {
        self.parsers.insert(tag.into(), parse);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.parsers.contains_key(tag)
    }

    pub fn parse(
        &self,
        template: &str,
        tag: &str,
        fields: Value,
    ) -> Result<ComponentBlueprint, TemplateError> {
        let parse = self
            .parsers
            .get(tag)
            .ok_or_else(|| TemplateError::UnknownComponent {
                template: template.to_string(),
                tag: tag.to_string(),
            })?;
        parse(fields).map_err(|err| match err {
            FieldError::Json(source) => TemplateError::InvalidFields {
                template: template.to_string(),
                tag: tag.to_string(),
                source,
            },
            FieldError::Behavior(source) => TemplateError::Behavior {
                template: template.to_string(),
                source,
            },
        })
    }
}

fn from_fields<T: for<'de> Deserialize<'de>>(fields: Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(fields)
}

/// `health` defaults to `max_health`.
fn parse_stats(fields: Value) -> Result<ComponentBlueprint, FieldError> {
    #[derive(Deserialize)]
    struct StatsFields {
        max_health: f32,
        health: Option<f32>,
    }
    let raw: StatsFields = from_fields(fields)?;
    Ok(ComponentBlueprint::Stats(Stats {
        health: raw.health.unwrap_or(raw.max_health),
        max_health: raw.max_health,
    }))
}

fn parse_behavior(fields: Value) -> Result<ComponentBlueprint, FieldError> {
    let spec: BehaviorSpec = from_fields(fields)?;
    let tree = spec.build().map_err(FieldError::Behavior)?;
    Ok(ComponentBlueprint::AiBehavior(tree))
}

// ============================================================================
// TEMPLATE REGISTRY
// ============================================================================

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateFile {
    components: Vec<ComponentEntry>,
}

#[derive(Deserialize)]
struct ComponentEntry {
    #[serde(rename = "type")]
    tag: String,
    #[serde(default)]
    fields: Value,
}

/// Named entity templates.
#[derive(Default)]
pub struct TemplateRegistry {
    components: ComponentRegistry,
    templates: HashMap<String, Vec<ComponentBlueprint>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry resolving tags through a custom component registry.
    pub fn with_components(components: ComponentRegistry) -> Self {
        Self {
            components,
            templates: HashMap::new(),
        }
    }

    pub fn components_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.components
    }

    pub fn get_template(&self, name: &str) -> Option<&[ComponentBlueprint]> {
        self.templates.get(name).map(Vec::as_slice)
    }

    /// Add or replace a template.
    pub fn register_template(&mut self, name: impl Into<String>, components: Vec<ComponentBlueprint>) {
        self.templates.insert(name.into(), components);
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Parse one template from JSON and register it under `name`.
    ///
    /// The whole template is rejected if any component fails to parse.
    pub fn load_str(&mut self, name: &str, json: &str) -> Result<(), TemplateError> {
        let file: TemplateFile =
            serde_json::from_str(json).map_err(|source| TemplateError::Malformed {
                template: name.to_string(),
                source,
            })?;
        let components = file
            .components
            .into_iter()
            .map(|entry| self.components.parse(name, &entry.tag, entry.fields))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("loaded template '{name}' with {} components", components.len());
        self.register_template(name, components);
        Ok(())
    }

    /// Load every `*.json` file in `dir`; the file stem names the template.
    /// Returns the number of templates loaded.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize, TemplateError> {
        let dir = dir.as_ref();
        let io_err = |source| TemplateError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let json = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
                path: path.clone(),
                source,
            })?;
            self.load_str(name, &json)?;
        }
        info!("loaded {} templates from {}", paths.len(), dir.display());
        Ok(paths.len())
    }
}

// ============================================================================
// ENTITY FACTORY
// ============================================================================

/// Builds one entity from an optional template plus extra components.
///
/// Insertion order: template components, then extras, then the position
/// override.
#[derive(Debug, Default)]
pub struct EntityBuilder {
    template: Option<String>,
    extras: Vec<ComponentBlueprint>,
    position: Option<Position>,
}

impl EntityBuilder {
    pub fn from_template(name: impl Into<String>) -> Self {
        Self {
            template: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }

    pub fn with(mut self, component: ComponentBlueprint) -> Self {
        self.extras.push(component);
        self
    }

    /// Spawn into a running simulation using its template registry.
    pub fn spawn(self, sim: &mut SimWorld) -> Result<Entity, SimError> {
        let (world, templates) = sim.spawn_parts();
        self.spawn_in(world, templates)
    }

    /// Spawn directly into `world`. Nothing is spawned if the template is
    /// unknown.
    pub fn spawn_in(self, world: &mut World, templates: &TemplateRegistry) -> Result<Entity, SimError> {
        let mut components: Vec<ComponentBlueprint> = match &self.template {
            Some(name) => templates
                .get_template(name)
                .ok_or_else(|| TemplateError::UnknownTemplate(name.clone()))?
                .iter()
                .map(ComponentBlueprint::copy)
                .collect(),
            None => Vec::new(),
        };
        components.extend(self.extras);
        if let Some(position) = self.position {
            components.push(ComponentBlueprint::Position(position));
        }

        let mut entity = world.spawn_empty();
        for component in components {
            component.insert_into(&mut entity);
        }
        Ok(entity.id())
    }
}
