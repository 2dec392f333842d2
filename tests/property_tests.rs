//! Property-based tests for the damage pipeline and asteroid fragmentation

use glam::Vec2;
use proptest::prelude::*;

use nebula_arena::sim::entity::{Destructible, DestructibleKind};
use nebula_arena::sim::{DamageOutcome, EntityId, Kind, Level, Prefab, Spawn, plan_fragments};

fn level(seed: u64) -> Level {
    Level::create(1, 1, 1, seed).unwrap()
}

fn spawn_with_armor(level: &mut Level, prefab: Prefab, scale: Option<f32>, armor: f32) -> EntityId {
    let mut spawn = Spawn::from_prefab(prefab, Vec2::new(3.0, 3.0), 0.0, Vec2::ZERO, 0.0, scale);
    if let Kind::Destructible(Destructible { health, .. }) = &mut spawn.kind {
        health.armor = armor;
    }
    level.initialize_spawn(spawn).unwrap()
}

fn health_of(level: &Level, id: EntityId) -> f32 {
    level.entity(id).unwrap().health().unwrap().health
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Damage at or below armor changes nothing
    #[test]
    fn prop_armor_absorbs_small_hits(
        seed in any::<u64>(),
        armor in 0.0f32..10.0,
        fraction in 0.0f32..=1.0,
        asteroid in any::<bool>(),
    ) {
        let mut level = level(seed);
        let prefab = if asteroid { Prefab::Asteroid } else { Prefab::Mine };
        let id = spawn_with_armor(&mut level, prefab, None, armor);
        let before = health_of(&level, id);

        let outcome = level.apply_damage(id, armor * fraction);
        prop_assert_eq!(outcome, DamageOutcome::Absorbed);
        prop_assert_eq!(health_of(&level, id), before);
        prop_assert_eq!(level.score(), 0.0);
        prop_assert!(level.pending_spawns().is_empty());
    }

    /// A hostile mine loses exactly what got past its armor, and the level
    /// scores the same amount
    #[test]
    fn prop_mine_damage_is_scored(
        seed in any::<u64>(),
        armor in 0.0f32..5.0,
        excess in 0.01f32..40.0,
    ) {
        let mut level = level(seed);
        let id = spawn_with_armor(&mut level, Prefab::Mine, None, armor);
        let amount = armor + excess;
        let effective = amount - armor;

        let outcome = level.apply_damage(id, amount);
        let expected_health = 20.0 - effective;
        prop_assert_eq!(
            outcome,
            DamageOutcome::Damaged { effective, lethal: expected_health <= 0.0 }
        );
        prop_assert_eq!(health_of(&level, id), expected_health);
        prop_assert_eq!(level.score(), effective);
    }

    /// Splitting conserves the parent's mass and post-hit health, and no
    /// child falls below the minimum size
    #[test]
    fn prop_fragments_conserve_mass_and_health(
        seed in any::<u64>(),
        scale in 1.0f32..3.0,
        fraction in 0.05f32..1.0,
    ) {
        let mut level = level(seed);
        let id = spawn_with_armor(&mut level, Prefab::Asteroid, Some(scale), 1.0);
        let entity = level.entity(id).unwrap();
        let mass = entity.body.mass;
        let min_size = match &entity.kind {
            Kind::Destructible(Destructible {
                kind: DestructibleKind::Asteroid(a),
                ..
            }) => a.min_size,
            _ => unreachable!(),
        };
        let health = health_of(&level, id);
        // Never lethal: the effective hit stays within remaining health
        let amount = 1.0 + health * fraction;

        match level.apply_damage(id, amount) {
            DamageOutcome::Fragmented { pieces } => {
                let children = level.pending_spawns();
                prop_assert_eq!(children.len(), pieces as usize);
                prop_assert!(pieces > 1);

                let total_mass: f32 = children.iter().map(|c| c.body.mass).sum();
                prop_assert!((total_mass - mass).abs() <= mass * 1e-4);

                let remaining = health - (amount - 1.0);
                let total_health: f32 = children
                    .iter()
                    .map(|c| match &c.kind {
                        Kind::Destructible(d) => d.health.health,
                        _ => 0.0,
                    })
                    .sum();
                prop_assert!((total_health - remaining).abs() <= health * 1e-4 + 1e-4);

                for child in children {
                    prop_assert!(child.body.scale >= min_size);
                }
            }
            DamageOutcome::Damaged { lethal, .. } => {
                prop_assert!(!lethal || health_of(&level, id) <= 0.0);
                prop_assert!(level.pending_spawns().is_empty());
            }
            other => prop_assert!(false, "unexpected outcome {:?}", other),
        }
    }

    /// Nothing reaches an asteroid after a lethal hit in the same tick
    #[test]
    fn prop_destroyed_asteroid_is_terminal(
        seed in any::<u64>(),
        scale in 1.0f32..3.0,
        follow_up in 0.0f32..200.0,
    ) {
        let mut level = level(seed);
        let id = spawn_with_armor(&mut level, Prefab::Asteroid, Some(scale), 1.0);
        let health = health_of(&level, id);

        prop_assert_eq!(level.apply_damage(id, health + 2.0), DamageOutcome::Destroyed);
        prop_assert_eq!(level.apply_damage(id, follow_up), DamageOutcome::Ignored);
        prop_assert!(level.pending_spawns().is_empty());
        prop_assert_eq!(health_of(&level, id), health);
        prop_assert_eq!(level.score(), 0.0);
    }

    /// The piece search always lands on a usable plan
    #[test]
    fn prop_plan_respects_min_size(
        scale in 0.1f32..10.0,
        min_size in 0.05f32..2.0,
        damage in 0.0f32..500.0,
        health in 0.1f32..500.0,
    ) {
        let plan = plan_fragments(scale, min_size, damage, health);
        prop_assert!(plan.pieces >= 1);
        if plan.splits() {
            prop_assert!(plan.child_scale >= min_size);
            prop_assert!(plan.child_scale < scale);
        } else {
            prop_assert_eq!(plan.pieces, 1);
            prop_assert_eq!(plan.child_scale, scale);
        }
    }
}
