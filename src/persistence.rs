//! Saving and restoring persistent entities.
//!
//! Only entities marked [`Persistent`] are written, and only their durable
//! components: identity, position, velocity, body, health and combat profile.
//! Behavior trees, grid bookkeeping, attack intents and swing timers are
//! transient and never reach disk.
//!
//! Saves touch the whole world, so outside the simulation thread they must go
//! through the command queue ([`schedule_save`], [`AutoSave`]).

use crate::commands::WorldCommandQueue;
use crate::components::*;
use crate::error::{PersistenceError, SimError};
use bevy_ecs::prelude::*;
use log::{error, info};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Save file format version.
pub const SAVE_VERSION: u32 = 1;

/// Durable components of one persistent entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<Velocity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combat_stats: Option<CombatStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveFile {
    pub version: u32,
    pub entities: Vec<SavedEntity>,
}

impl SaveFile {
    /// Collect every persistent entity, in entity order.
    pub fn capture(world: &mut World) -> Self {
        let mut query = world.query_filtered::<(
            Entity,
            Option<&Identity>,
            Option<&Position>,
            Option<&Velocity>,
            Option<&Body>,
            Option<&Stats>,
            Option<&CombatStats>,
        ), With<Persistent>>();

        let mut rows: Vec<(Entity, SavedEntity)> = query
            .iter(world)
            .map(|(entity, identity, position, velocity, body, stats, combat)| {
                (
                    entity,
                    SavedEntity {
                        identity: identity.cloned(),
                        position: position.copied(),
                        velocity: velocity.copied(),
                        body: body.copied(),
                        stats: stats.copied(),
                        combat_stats: combat.copied(),
                    },
                )
            })
            .collect();
        rows.sort_by_key(|(entity, _)| *entity);

        Self {
            version: SAVE_VERSION,
            entities: rows.into_iter().map(|(_, saved)| saved).collect(),
        }
    }
}

/// Write all persistent entities to `path` as pretty JSON.
///
/// Returns the number of entities written.
pub fn save(world: &mut World, path: impl AsRef<Path>) -> Result<usize, PersistenceError> {
    let path = path.as_ref();
    let file = SaveFile::capture(world);
    let json = serde_json::to_string_pretty(&file).map_err(|source| PersistenceError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.entities.len())
}

/// Spawn every entity stored in `path`.
///
/// Restored entities are marked [`Persistent`]; those with a position are
/// also tracked by the spatial grid.
pub fn load(world: &mut World, path: impl AsRef<Path>) -> Result<Vec<Entity>, PersistenceError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: SaveFile = serde_json::from_str(&text).map_err(|source| PersistenceError::Format {
        path: path.to_path_buf(),
        source,
    })?;

    let spawned = file
        .entities
        .into_iter()
        .map(|saved| spawn_saved(world, saved))
        .collect::<Vec<_>>();
    info!("restored {} entities from {}", spawned.len(), path.display());
    Ok(spawned)
}

fn spawn_saved(world: &mut World, saved: SavedEntity) -> Entity {
    let mut entity = world.spawn(Persistent);
    if let Some(identity) = saved.identity {
        entity.insert(identity);
    }
    if let Some(velocity) = saved.velocity {
        entity.insert(velocity);
    }
    if let Some(body) = saved.body {
        entity.insert(body);
    }
    if let Some(stats) = saved.stats {
        entity.insert(stats);
    }
    if let Some(combat) = saved.combat_stats {
        entity.insert(combat);
    }
    if let Some(position) = saved.position {
        entity.insert((position, SpatialNode::default()));
    }
    entity.id()
}

/// Queue a save of the world to `path` for the next tick boundary.
pub fn schedule_save(queue: &WorldCommandQueue, path: impl Into<PathBuf>) {
    let path = path.into();
    queue.enqueue(format!("save {}", path.display()), move |world: &mut World| {
        let count = save(world, &path)?;
        info!("saved {count} entities to {}", path.display());
        Ok(())
    });
}

// ============================================================================
// AUTOSAVE
// ============================================================================

/// Background timer that queues a save every interval.
///
/// Stops when [`AutoSave::stop`] is called or the value is dropped.
pub struct AutoSave {
    stop: Arc<(Mutex<bool>, Condvar)>,
    thread: Option<JoinHandle<()>>,
}

impl AutoSave {
    pub fn spawn(
        queue: WorldCommandQueue,
        path: impl Into<PathBuf>,
        interval: Duration,
    ) -> Result<Self, SimError> {
        let path = path.into();
        let stop = Arc::new((Mutex::new(false), Condvar::new()));
        let signal = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name("autosave".to_string())
            .spawn(move || {
                let (stopped, wake) = &*signal;
                let mut next = Instant::now() + interval;
                let mut stopped = stopped.lock();
                while !*stopped {
                    if wake.wait_until(&mut stopped, next).timed_out() {
                        schedule_save(&queue, path.clone());
                        next += interval;
                    }
                }
            })
            .map_err(SimError::Spawn)?;

        info!("autosave every {interval:?}");
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Stop the timer and wait for its thread to exit.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        let (stopped, wake) = &*self.stop;
        *stopped.lock() = true;
        wake.notify_all();
        if thread.join().is_err() {
            error!("autosave thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }
}

impl Drop for AutoSave {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::BehaviorNode;
    use crate::spatial::SpatialHashGrid;

    fn world_with_grid() -> World {
        let mut world = World::new();
        world.insert_resource(SpatialHashGrid::default());
        world
    }

    #[test]
    fn test_save_and_load_keeps_durable_components_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");

        let mut world = world_with_grid();
        let hero = world
            .spawn((
                Persistent,
                Identity::new("hero"),
                CombatantBundle::new(10.0, 20.0, 0.5, 120.0, CombatStats::default()),
                AiBehavior::new(BehaviorNode::find_target()),
                SwingTimer::new(0.5),
            ))
            .id();
        world.entity_mut(hero).insert(AttackIntent::new(hero));
        world.spawn((Identity::new("scenery"), Position::new(1.0, 1.0)));

        assert_eq!(save(&mut world, &path).unwrap(), 1);

        let mut restored = world_with_grid();
        let loaded = load(&mut restored, &path).unwrap();
        assert_eq!(loaded.len(), 1);

        let e = restored.entity(loaded[0]);
        assert_eq!(e.get::<Identity>(), Some(&Identity::new("hero")));
        assert_eq!(e.get::<Position>(), Some(&Position::new(10.0, 20.0)));
        assert_eq!(e.get::<Stats>().map(|s| s.max_health), Some(120.0));
        assert!(e.contains::<Persistent>());
        assert!(!e.contains::<AiBehavior>());
        assert!(!e.contains::<SwingTimer>());
        assert!(!e.contains::<AttackIntent>());
        assert!(restored
            .resource::<SpatialHashGrid>()
            .contains(loaded[0], 10.0, 20.0));
    }

    #[test]
    fn test_save_file_is_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        let mut world = world_with_grid();
        world.spawn((Persistent, Identity::new("a")));

        save(&mut world, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains('\n'));
        let file: SaveFile = serde_json::from_str(&text).unwrap();
        assert_eq!(file.version, SAVE_VERSION);
        assert_eq!(file.entities[0].position, None);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut world = world_with_grid();

        let missing = load(&mut world, dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, PersistenceError::Io { .. }));

        let garbled = dir.path().join("bad.json");
        std::fs::write(&garbled, "not json").unwrap();
        let err = load(&mut world, &garbled).unwrap_err();
        assert!(matches!(err, PersistenceError::Format { .. }));
    }

    #[test]
    fn test_schedule_save_runs_on_drain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queued.json");
        let mut world = world_with_grid();
        world.spawn((Persistent, Identity::new("a")));
        let queue = WorldCommandQueue::new();

        schedule_save(&queue, &path);
        assert!(!path.exists());

        queue.process(&mut world).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_autosave_queues_until_stopped() {
        let queue = WorldCommandQueue::new();
        let mut autosave =
            AutoSave::spawn(queue.clone(), "unused.json", Duration::from_millis(10)).unwrap();

        thread::sleep(Duration::from_millis(100));
        autosave.stop();
        assert!(!autosave.is_running());

        let queued = queue.len();
        assert!(queued >= 1);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(queue.len(), queued);
    }
}
