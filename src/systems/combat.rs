//! Basic attack system - resolves attack intents into damage.
//!
//! Each entity with [`CombatStats`] swings at most once per cooldown. A swing
//! re-checks range at resolution time: the target may have moved since the
//! intent was written. A swing that misses still costs the full cooldown.

use crate::components::*;
use crate::systems::movement::DeltaTime;
use bevy_ecs::prelude::*;
use log::debug;

/// System that ticks swing timers and resolves pending attack intents.
///
/// ## Data Access
/// - Reads: DeltaTime, CombatStats, AttackIntent, Position, Body
/// - Writes: SwingTimer, Stats (of targets)
pub fn basic_attack_system(
    mut commands: Commands,
    dt: Res<DeltaTime>,
    mut attackers: Query<(
        Entity,
        &CombatStats,
        Option<&mut SwingTimer>,
        Option<&AttackIntent>,
    )>,
    placement: Query<(&Position, Option<&Body>)>,
    mut health: Query<&mut Stats>,
) {
    let delta = dt.0;

    for (entity, combat, timer, intent) in attackers.iter_mut() {
        let mut cooling_down = false;
        if let Some(mut timer) = timer {
            timer.cooldown -= delta;
            if timer.cooldown <= 0.0 {
                commands.entity(entity).remove::<SwingTimer>();
            } else {
                cooling_down = true;
            }
        }

        let Some(intent) = intent else {
            continue;
        };
        if cooling_down {
            continue;
        }

        resolve_swing(entity, intent.target, combat, &placement, &mut health);

        commands
            .entity(entity)
            .insert(SwingTimer::new(combat.swing_cooldown()))
            .remove::<AttackIntent>();
    }
}

/// Apply one swing if the target is still in range.
fn resolve_swing(
    attacker: Entity,
    target: Entity,
    combat: &CombatStats,
    placement: &Query<(&Position, Option<&Body>)>,
    health: &mut Query<&mut Stats>,
) {
    let (Ok((attacker_pos, attacker_body)), Ok((target_pos, target_body))) =
        (placement.get(attacker), placement.get(target))
    else {
        return;
    };
    let Ok(mut stats) = health.get_mut(target) else {
        return;
    };

    let distance = surface_distance(attacker_pos, attacker_body, target_pos, target_body);
    if distance > combat.range {
        debug!("entity {attacker:?} swung at {target:?} and missed ({distance:.2} > {:.2})", combat.range);
        return;
    }

    stats.health -= combat.damage;
    debug!(
        "entity {attacker:?} hit {target:?} for {} damage, health now {}",
        combat.damage, stats.health
    );
}
