//! Spatial hashing for proximity queries.
//!
//! Entities are bucketed into fixed-size square cells. A proximity query scans
//! the 3x3 block of cells around the query point, so its cost is proportional
//! to the local population rather than the whole world.
//!
//! The grid does not remember where an entity is. Callers pass the coordinates
//! used for the matching insert when removing; [`SpatialNode`] stores those
//! coordinates per entity and the hooks and sync system below keep it honest.

use crate::components::{Position, SpatialNode};
use bevy_ecs::component::ComponentId;
use bevy_ecs::prelude::*;
use bevy_ecs::world::DeferredWorld;
use std::collections::{HashMap, HashSet};

/// Default edge length of a grid cell in world units.
pub const DEFAULT_CELL_SIZE: f32 = 100.0;

/// Packed integer cell coordinates.
pub type CellKey = i64;

/// Grid-based spatial hash keyed by packed cell coordinates.
#[derive(Resource, Debug)]
pub struct SpatialHashGrid {
    cell_size: f32,
    cells: HashMap<CellKey, HashSet<Entity>>,
}

impl Default for SpatialHashGrid {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl SpatialHashGrid {
    /// Create an empty grid. `cell_size` must be positive.
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Convert world coordinates to cell coordinates.
    #[inline]
    pub fn cell_of(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    /// Pack cell coordinates into a single key: x in the high half, y in the low.
    #[inline]
    pub fn key(cell_x: i32, cell_y: i32) -> CellKey {
        ((cell_x as i64) << 32) | (cell_y as u32 as i64)
    }

    #[inline]
    fn key_at(&self, x: f32, y: f32) -> CellKey {
        let (cx, cy) = self.cell_of(x, y);
        Self::key(cx, cy)
    }

    /// Add `entity` to the cell containing `(x, y)`.
    pub fn insert(&mut self, entity: Entity, x: f32, y: f32) {
        let key = self.key_at(x, y);
        self.cells.entry(key).or_default().insert(entity);
    }

    /// Remove `entity` from the cell containing `(x, y)`.
    ///
    /// `(x, y)` must be the coordinates used when it was inserted. Removing
    /// from an empty or unknown cell is a no-op; emptied cells are dropped.
    pub fn remove(&mut self, entity: Entity, x: f32, y: f32) {
        let key = self.key_at(x, y);
        if let Some(bucket) = self.cells.get_mut(&key) {
            bucket.remove(&entity);
            if bucket.is_empty() {
                self.cells.remove(&key);
            }
        }
    }

    /// Move `entity` between the cells of two positions.
    pub fn relocate(&mut self, entity: Entity, from: (f32, f32), to: (f32, f32)) {
        self.remove(entity, from.0, from.1);
        self.insert(entity, to.0, to.1);
    }

    /// All entities in the 3x3 block of cells around `(x, y)`.
    ///
    /// The querying entity is included when it is tracked; callers filter it.
    pub fn get_nearby(&self, x: f32, y: f32) -> HashSet<Entity> {
        let (cx, cy) = self.cell_of(x, y);
        let mut result = HashSet::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                let key = Self::key(cx.wrapping_add(dx), cy.wrapping_add(dy));
                if let Some(bucket) = self.cells.get(&key) {
                    result.extend(bucket.iter().copied());
                }
            }
        }
        result
    }

    /// Whether `entity` is tracked in the cell containing `(x, y)`.
    pub fn contains(&self, entity: Entity, x: f32, y: f32) -> bool {
        self.cells
            .get(&self.key_at(x, y))
            .is_some_and(|bucket| bucket.contains(&entity))
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Number of tracked entities.
    pub fn len(&self) -> usize {
        self.cells.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

// ============================================================================
// REACTIVE HOOKS
// ============================================================================

/// Component hook: starts tracking an entity once it holds both a
/// [`Position`] and a [`SpatialNode`].
///
/// Runs on insert and on overwrite of either component. The node is reset to
/// the current position before the grid insert.
pub fn track_on_insert(mut world: DeferredWorld, entity: Entity, _id: ComponentId) {
    let Some(pos) = world.get::<Position>(entity).copied() else {
        return;
    };
    {
        let Some(mut node) = world.get_mut::<SpatialNode>(entity) else {
            return;
        };
        node.last_x = pos.x;
        node.last_y = pos.y;
    }
    if let Some(mut grid) = world.get_resource_mut::<SpatialHashGrid>() {
        grid.insert(entity, pos.x, pos.y);
    }
}

/// Component hook: stops tracking an entity when either component is removed,
/// overwritten, or the entity is despawned.
///
/// Uses the node's recorded position; the live position may already differ.
pub fn untrack_on_replace(mut world: DeferredWorld, entity: Entity, _id: ComponentId) {
    if world.get::<Position>(entity).is_none() {
        return;
    }
    let Some(node) = world.get::<SpatialNode>(entity).copied() else {
        return;
    };
    if let Some(mut grid) = world.get_resource_mut::<SpatialHashGrid>() {
        grid.remove(entity, node.last_x, node.last_y);
    }
}

// ============================================================================
// SPATIAL SYNC SYSTEM
// ============================================================================

/// System that moves entities between grid cells after movement.
///
/// Any change in position, however small, triggers a remove/insert pair; when
/// both land in the same cell the pair is two hash operations.
///
/// ## Data Access
/// - Reads: Position
/// - Writes: SpatialNode, SpatialHashGrid
pub fn spatial_sync_system(
    mut grid: ResMut<SpatialHashGrid>,
    mut query: Query<(Entity, &Position, &mut SpatialNode)>,
) {
    for (entity, pos, mut node) in query.iter_mut() {
        if node.matches(pos) {
            continue;
        }
        grid.relocate(entity, (node.last_x, node.last_y), (pos.x, pos.y));
        node.last_x = pos.x;
        node.last_y = pos.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sync_world() -> (World, Schedule) {
        let mut world = World::new();
        world.insert_resource(SpatialHashGrid::new(100.0));
        let mut schedule = Schedule::default();
        schedule.add_systems(spatial_sync_system);
        (world, schedule)
    }

    #[test]
    fn test_insert_query_remove() {
        let mut grid = SpatialHashGrid::new(10.0);
        let e1 = Entity::from_raw(1);
        let e2 = Entity::from_raw(2);
        let e3 = Entity::from_raw(3);

        grid.insert(e1, 5.0, 5.0);
        grid.insert(e2, 15.0, 5.0);
        grid.insert(e3, 100.0, 100.0);

        let nearby = grid.get_nearby(5.0, 5.0);
        assert_eq!(nearby.len(), 2);
        assert!(nearby.contains(&e1) && nearby.contains(&e2));

        grid.remove(e2, 15.0, 5.0);
        assert_eq!(grid.get_nearby(5.0, 5.0).len(), 1);
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn test_nearby_is_three_by_three() {
        let mut grid = SpatialHashGrid::new(100.0);
        let e = Entity::from_raw(7);
        grid.insert(e, 150.0, 150.0); // cell (1, 1)

        assert!(grid.get_nearby(0.0, 0.0).contains(&e)); // cell (0, 0)
        assert!(grid.get_nearby(299.0, 250.0).contains(&e)); // cell (2, 2)
        assert!(!grid.get_nearby(300.0, 150.0).contains(&e)); // cell (3, 1)
        assert!(!grid.get_nearby(-1.0, 150.0).contains(&e)); // cell (-1, 1)
    }

    #[test]
    fn test_negative_coordinates_floor() {
        let grid = SpatialHashGrid::new(100.0);
        assert_eq!(grid.cell_of(-0.5, -100.0), (-1, -1));
        assert_eq!(grid.cell_of(-100.5, 99.9), (-2, 0));
        assert_ne!(SpatialHashGrid::key(-1, 0), SpatialHashGrid::key(0, -1));
    }

    #[test]
    fn test_remove_missing_is_noop_and_prunes() {
        let mut grid = SpatialHashGrid::new(10.0);
        let e = Entity::from_raw(1);
        grid.remove(e, 0.0, 0.0);
        grid.insert(e, 0.0, 0.0);
        grid.remove(Entity::from_raw(2), 0.0, 0.0);
        assert_eq!(grid.cell_count(), 1);
        grid.remove(e, 0.0, 0.0);
        assert_eq!(grid.cell_count(), 0);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_remove_uses_insert_coordinates() {
        let mut grid = SpatialHashGrid::new(10.0);
        let e = Entity::from_raw(1);
        grid.insert(e, 0.0, 0.0);
        // Removing at a different cell leaves the original entry in place.
        grid.remove(e, 55.0, 55.0);
        assert!(grid.contains(e, 0.0, 0.0));
    }

    #[test]
    fn test_hook_tracks_on_spawn() {
        let (mut world, _) = sync_world();
        let e = world
            .spawn((Position::new(40.0, 60.0), SpatialNode::default()))
            .id();

        let node = world.get::<SpatialNode>(e).unwrap();
        assert_eq!((node.last_x, node.last_y), (40.0, 60.0));
        assert!(world.resource::<SpatialHashGrid>().contains(e, 40.0, 60.0));
    }

    #[test]
    fn test_hook_ignores_entity_without_node() {
        let (mut world, _) = sync_world();
        world.spawn(Position::new(1.0, 1.0));
        assert!(world.resource::<SpatialHashGrid>().is_empty());
    }

    #[test]
    fn test_entity_moves_across_buckets() {
        let (mut world, mut schedule) = sync_world();
        let e = world
            .spawn((Position::new(0.0, 0.0), SpatialNode::default()))
            .id();
        schedule.run(&mut world);
        assert!(world.resource::<SpatialHashGrid>().get_nearby(0.0, 0.0).contains(&e));

        *world.get_mut::<Position>(e).unwrap() = Position::new(500.0, 500.0);
        schedule.run(&mut world);

        let grid = world.resource::<SpatialHashGrid>();
        assert!(!grid.get_nearby(0.0, 0.0).contains(&e));
        assert!(grid.get_nearby(500.0, 500.0).contains(&e));
        assert_eq!(grid.len(), 1);
        let node = world.get::<SpatialNode>(e).unwrap();
        assert_eq!((node.last_x, node.last_y), (500.0, 500.0));
    }

    #[test]
    fn test_independent_entities() {
        let (mut world, mut schedule) = sync_world();
        let a = world.spawn((Position::new(0.0, 0.0), SpatialNode::default())).id();
        let b = world
            .spawn((Position::new(200.0, 200.0), SpatialNode::default()))
            .id();
        schedule.run(&mut world);

        world.get_mut::<Position>(a).unwrap().x = 50.0;
        world.get_mut::<Position>(a).unwrap().y = 50.0;
        schedule.run(&mut world);

        let grid = world.resource::<SpatialHashGrid>();
        let near_a = grid.get_nearby(50.0, 50.0);
        assert!(near_a.contains(&a));
        assert!(!near_a.contains(&b));
        let near_b = grid.get_nearby(250.0, 250.0);
        assert!(near_b.contains(&b));
        assert!(!near_b.contains(&a));
    }

    #[test]
    fn test_despawn_uses_recorded_position() {
        let (mut world, mut schedule) = sync_world();
        let e = world
            .spawn((Position::new(0.0, 0.0), SpatialNode::default()))
            .id();
        schedule.run(&mut world);

        // Moved but not yet synced: the grid still has the old cell.
        world.get_mut::<Position>(e).unwrap().x = 900.0;
        world.despawn(e);

        assert!(world.resource::<SpatialHashGrid>().is_empty());
    }

    #[test]
    fn test_removing_node_untracks() {
        let (mut world, _) = sync_world();
        let e = world
            .spawn((Position::new(10.0, 10.0), SpatialNode::default()))
            .id();
        world.entity_mut(e).remove::<SpatialNode>();
        assert!(world.resource::<SpatialHashGrid>().is_empty());

        world.entity_mut(e).insert(SpatialNode::default());
        assert!(world.resource::<SpatialHashGrid>().contains(e, 10.0, 10.0));
    }

    #[test]
    fn test_position_overwrite_retracks() {
        let (mut world, _) = sync_world();
        let e = world
            .spawn((Position::new(10.0, 10.0), SpatialNode::default()))
            .id();
        world.entity_mut(e).insert(Position::new(310.0, 10.0));

        let grid = world.resource::<SpatialHashGrid>();
        assert!(grid.contains(e, 310.0, 10.0));
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_sub_cell_move_keeps_single_entry() {
        let (mut world, mut schedule) = sync_world();
        let e = world
            .spawn((Position::new(10.0, 10.0), SpatialNode::default()))
            .id();
        world.get_mut::<Position>(e).unwrap().x = 10.5;
        schedule.run(&mut world);

        let grid = world.resource::<SpatialHashGrid>();
        assert_eq!(grid.len(), 1);
        assert_eq!(world.get::<SpatialNode>(e).unwrap().last_x, 10.5);
    }
}
