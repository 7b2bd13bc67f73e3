//! Movement system - integrates velocity into position.

use crate::components::*;
use bevy_ecs::prelude::*;

/// Resource containing the delta time for the current tick, in seconds.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct DeltaTime(pub f32);

/// System that applies velocity to position.
pub fn movement_system(dt: Res<DeltaTime>, mut query: Query<(&mut Position, &Velocity)>) {
    let delta = dt.0;
    for (mut pos, vel) in query.iter_mut() {
        if vel.dx == 0.0 && vel.dy == 0.0 {
            continue;
        }
        pos.x += vel.dx * delta;
        pos.y += vel.dy * delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_applies_velocity() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(1.0));

        world.spawn((Position::new(0.0, 0.0), Velocity::new(5.0, 3.0)));

        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);
        schedule.run(&mut world);

        let mut query = world.query::<&Position>();
        let pos = query.single(&world);
        assert!((pos.x - 5.0).abs() < 0.001);
        assert!((pos.y - 3.0).abs() < 0.001);
    }

    #[test]
    fn test_movement_scales_with_delta() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.25));
        let e = world
            .spawn((Position::new(1.0, 1.0), Velocity::new(-4.0, 8.0)))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(movement_system);
        schedule.run(&mut world);

        assert_eq!(world.get::<Position>(e), Some(&Position::new(0.0, 3.0)));
    }
}
