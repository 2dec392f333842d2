//! Damage pipeline and asteroid fragmentation
//!
//! Damage never removes anything directly. Lethal results are picked up by
//! the end-of-tick sweep, and a split schedules its children as pending
//! spawns and the parent for destruction.

use std::f32::consts::PI;

use glam::Vec2;

use super::Level;
use super::entity::{
    Asteroid, Destructible, DestructibleKind, EntityId, Health, Kind, Life, Prefab, Spawn,
};
use crate::rotate_deg;

/// What a single damage instance did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Target missing, not damageable, or already destroyed
    Ignored,
    /// Armor took all of it
    Absorbed,
    Damaged { effective: f32, lethal: bool },
    /// Lethal asteroid hit; removed without splitting
    Destroyed,
    Fragmented { pieces: u32 },
}

/// Result of the piece-count search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentPlan {
    pub pieces: u32,
    pub child_scale: f32,
}

impl FragmentPlan {
    pub fn splits(&self) -> bool {
        self.pieces > 1
    }
}

/// Number of pieces an asteroid of `scale` breaks into for `damage` against
/// its pre-damage `health`. Pieces share the parent's area evenly, and the
/// count drops until each piece is at least `min_size` across. Stops at one
/// piece, which means no split.
pub fn plan_fragments(scale: f32, min_size: f32, damage: f32, health: f32) -> FragmentPlan {
    let no_split = FragmentPlan {
        pieces: 1,
        child_scale: scale,
    };
    if health <= 0.0 || scale <= 0.0 {
        return no_split;
    }

    let mut pieces = ((damage * 8.0 / health).floor() as u32).saturating_add(1);
    // Any count above this fails the size floor, so skip straight past them
    if min_size > 0.0 {
        let ceiling = ((scale / min_size).powi(2).ceil() as u32).saturating_add(2);
        pieces = pieces.min(ceiling);
    }

    let area = scale * scale / 4.0 * PI;
    loop {
        pieces = pieces.saturating_sub(1);
        if pieces <= 1 {
            return no_split;
        }
        let child_scale = (area / pieces as f32 / PI * 4.0).sqrt();
        if child_scale >= min_size {
            return FragmentPlan {
                pieces,
                child_scale,
            };
        }
    }
}

impl Level {
    /// Run `amount` of damage through the target's pipeline
    pub fn apply_damage(&mut self, target: EntityId, amount: f32) -> DamageOutcome {
        let Some(entity) = self.arena.get(target) else {
            return DamageOutcome::Ignored;
        };
        // Destroyed is terminal, even before the sweep removes it
        if entity.life == Life::Destroyed {
            return DamageOutcome::Ignored;
        }
        let Some(health) = entity.health().copied() else {
            return DamageOutcome::Ignored;
        };
        let effective = amount - health.armor;
        if effective <= 0.0 {
            return DamageOutcome::Absorbed;
        }

        if let Some(asteroid) = entity.as_asteroid().copied() {
            let scale = entity.body.scale;
            if effective > health.health {
                self.schedule_destroy(target);
                return DamageOutcome::Destroyed;
            }
            if scale > asteroid.min_size {
                if asteroid.broken {
                    return DamageOutcome::Ignored;
                }
                let plan = plan_fragments(scale, asteroid.min_size, amount, health.health);
                let outcome = self.apply_generic_damage(target, amount);
                if plan.splits() {
                    self.fragment(target, plan);
                    return DamageOutcome::Fragmented {
                        pieces: plan.pieces,
                    };
                }
                return outcome;
            }
        }

        self.apply_generic_damage(target, amount)
    }

    fn apply_generic_damage(&mut self, target: EntityId, amount: f32) -> DamageOutcome {
        let Some(entity) = self.arena.get_mut(target) else {
            return DamageOutcome::Ignored;
        };
        let team = entity.team;
        let Some(health) = entity.health_mut() else {
            return DamageOutcome::Ignored;
        };
        match health.apply(amount) {
            Some(effective) => {
                let lethal = health.is_depleted();
                if team <= 0 {
                    self.score += effective;
                }
                DamageOutcome::Damaged { effective, lethal }
            }
            None => DamageOutcome::Absorbed,
        }
    }

    /// Replace the asteroid with `plan.pieces` children spread around it
    fn fragment(&mut self, target: EntityId, plan: FragmentPlan) {
        let Some(parent) = self.arena.get_mut(target) else {
            return;
        };
        let Kind::Destructible(Destructible {
            health,
            kind: DestructibleKind::Asteroid(asteroid),
        }) = &mut parent.kind
        else {
            return;
        };
        asteroid.broken = true;
        let template = Asteroid {
            broken: false,
            ..*asteroid
        };
        let health = *health;
        let body = parent.body;
        let team = parent.team;
        let color = parent.color;

        let count = plan.pieces as f32;
        for i in 0..plan.pieces {
            let theta = i as f32 * 360.0 / count + body.angle;
            let mut child = Spawn::from_prefab(
                Prefab::Asteroid,
                body.position + rotate_deg(Vec2::new(body.scale / count, 0.0), theta),
                body.angle,
                body.velocity + rotate_deg(Vec2::new(count, 0.0), theta),
                body.angular_velocity + count,
                Some(plan.child_scale),
            );
            child.body.mass = body.mass / count;
            child.team = team;
            child.color = color;
            child.kind = Kind::Destructible(Destructible {
                health: Health::new(health.health / count, health.armor),
                kind: DestructibleKind::Asteroid(template),
            });
            self.pending_spawns.push(child);
        }

        log::debug!("Asteroid {target} split into {} pieces", plan.pieces);
        self.schedule_destroy(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Collaborators;

    fn empty_level() -> Level {
        Level::empty(1, 1, 2, 7, Collaborators::default())
    }

    fn spawn_asteroid(level: &mut Level, scale: f32, team: i32) -> EntityId {
        let mut spawn = Spawn::from_prefab(
            Prefab::Asteroid,
            Vec2::new(10.0, 10.0),
            30.0,
            Vec2::new(1.0, 0.0),
            5.0,
            Some(scale),
        );
        spawn.team = team;
        level.initialize_spawn(spawn).unwrap()
    }

    #[test]
    fn test_plan_reduces_pieces_to_size_floor() {
        // 40 damage on 50 health would ask for 7 pieces; 1.0 / sqrt(p) >= 0.3
        // allows up to 11, so the first decrement already fits
        let plan = plan_fragments(1.0, 0.3, 40.0, 50.0);
        assert_eq!(plan.pieces, 6);
        assert!(plan.child_scale >= 0.3);

        // Small parent: only two pieces fit
        let plan = plan_fragments(0.5, 0.3, 40.0, 50.0);
        assert_eq!(plan.pieces, 2);
    }

    #[test]
    fn test_plan_stops_at_one_piece() {
        let plan = plan_fragments(0.31, 0.3, 40.0, 50.0);
        assert_eq!(plan.pieces, 1);
        assert!(!plan.splits());

        // Huge floor relative to scale terminates too
        let plan = plan_fragments(1.0, 100.0, 1.0e6, 1.0);
        assert!(!plan.splits());
    }

    #[test]
    fn test_absorbed_damage_changes_nothing() {
        let mut level = empty_level();
        let id = spawn_asteroid(&mut level, 1.0, 0);
        assert_eq!(level.apply_damage(id, 1.0), DamageOutcome::Absorbed);
        assert_eq!(level.score(), 0.0);
        assert!(level.pending_spawns.is_empty());
    }

    #[test]
    fn test_lethal_hit_destroys_without_split_or_score() {
        let mut level = empty_level();
        let id = spawn_asteroid(&mut level, 1.0, 0);
        assert_eq!(level.apply_damage(id, 60.0), DamageOutcome::Destroyed);
        assert_eq!(level.score(), 0.0);
        assert!(level.pending_spawns.is_empty());
        assert_eq!(level.entity(id).map(|e| e.life), Some(Life::Destroyed));
    }

    #[test]
    fn test_split_conserves_mass_and_health() {
        let mut level = empty_level();
        let id = spawn_asteroid(&mut level, 2.0, 0);
        let (mass, health) = {
            let e = level.entity(id).unwrap();
            (e.body.mass, e.health().unwrap().health)
        };

        let outcome = level.apply_damage(id, 51.0);
        let DamageOutcome::Fragmented { pieces } = outcome else {
            panic!("expected a split, got {outcome:?}");
        };
        assert_eq!(level.pending_spawns.len(), pieces as usize);
        assert_eq!(level.score(), 50.0);

        let after_damage = health - 50.0;
        let child_mass: f32 = level.pending_spawns.iter().map(|s| s.body.mass).sum();
        let child_health: f32 = level
            .pending_spawns
            .iter()
            .map(|s| match &s.kind {
                Kind::Destructible(d) => d.health.health,
                _ => 0.0,
            })
            .sum();
        assert!((child_mass - mass).abs() < 1e-3);
        assert!((child_health - after_damage).abs() < 1e-2);
        assert!(level.pending_spawns.iter().all(|s| s.body.scale >= 0.3));
    }

    #[test]
    fn test_broken_asteroid_does_not_split_twice() {
        let mut level = empty_level();
        let id = spawn_asteroid(&mut level, 2.0, 0);
        assert!(matches!(
            level.apply_damage(id, 51.0),
            DamageOutcome::Fragmented { .. }
        ));
        let queued = level.pending_spawns.len();
        assert_eq!(level.apply_damage(id, 51.0), DamageOutcome::Ignored);
        assert_eq!(level.pending_spawns.len(), queued);
    }

    #[test]
    fn test_destroyed_asteroid_ignores_later_hits() {
        let mut level = empty_level();
        let id = spawn_asteroid(&mut level, 2.0, 0);
        assert_eq!(level.apply_damage(id, 1000.0), DamageOutcome::Destroyed);
        assert_eq!(level.apply_damage(id, 51.0), DamageOutcome::Ignored);
        assert!(level.pending_spawns.is_empty());
        assert_eq!(level.score(), 0.0);
        assert_eq!(level.entity(id).unwrap().health().unwrap().health, 200.0);
    }

    #[test]
    fn test_destroyed_mine_takes_no_more_damage() {
        let mut level = empty_level();
        let id = level
            .create_object(Prefab::Mine, Vec2::new(4.0, 4.0), 0.0, Vec2::ZERO, 0.0, None)
            .unwrap();
        level.schedule_destroy(id);
        assert_eq!(level.apply_damage(id, 5.0), DamageOutcome::Ignored);
        assert_eq!(level.score(), 0.0);
    }

    #[test]
    fn test_small_asteroid_takes_plain_damage() {
        let mut level = empty_level();
        let id = spawn_asteroid(&mut level, 0.3, 1);
        let outcome = level.apply_damage(id, 3.0);
        assert_eq!(
            outcome,
            DamageOutcome::Damaged {
                effective: 2.0,
                lethal: false
            }
        );
        // Team above zero never scores
        assert_eq!(level.score(), 0.0);
    }
}
