//! Per-ordinal level layouts
//!
//! Every random placement draws from the level RNG in a fixed order, so a
//! seed fully determines the starting arena.

use glam::Vec2;

use super::Level;
use super::entity::Prefab;
use crate::consts::LAST_LEVEL;
use crate::items::{Accelerant, Armor, Item};

/// Keep spawns this far from player start positions
const PLAYER_CLEARANCE: f32 = 3.0;
const PLACEMENT_ATTEMPTS: u32 = 8;

const ASTEROID_MAX_SPEED: f32 = 2.0;
const ASTEROID_MAX_SPIN: f32 = 45.0;
const ASTEROID_MIN_SCALE: f32 = 1.0;
const ASTEROID_MAX_SCALE: f32 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub asteroids: u32,
    pub mines: u32,
    pub barriers: u32,
    pub gravity_wells: u32,
    pub item_pickup: bool,
}

/// Layout for a campaign ordinal, `None` outside the campaign
pub fn layout_for(ordinal: u32) -> Option<Layout> {
    if !(1..=LAST_LEVEL).contains(&ordinal) {
        return None;
    }
    Some(Layout {
        asteroids: 2 + ordinal,
        mines: ordinal.saturating_sub(2),
        barriers: ordinal / 2,
        gravity_wells: if ordinal >= 5 { (ordinal - 3) / 2 } else { 0 },
        item_pickup: ordinal % 2 == 0,
    })
}

impl Layout {
    pub fn populate(&self, level: &mut Level) {
        for _ in 0..self.asteroids {
            let position = clear_position(level);
            let angle = level.rng.angle();
            let velocity = level.rng.velocity(ASTEROID_MAX_SPEED);
            let spin = level
                .rng
                .value_between(-ASTEROID_MAX_SPIN, ASTEROID_MAX_SPIN);
            let scale = level
                .rng
                .value_between(ASTEROID_MIN_SCALE, ASTEROID_MAX_SCALE);
            level.create_object(Prefab::Asteroid, position, angle, velocity, spin, Some(scale));
        }

        for _ in 0..self.mines {
            let position = clear_position(level);
            level.create_object(Prefab::Mine, position, 0.0, Vec2::ZERO, 0.0, None);
        }

        for _ in 0..self.barriers {
            let position = clear_position(level);
            let angle = level.rng.angle();
            level.create_object(Prefab::Barrier, position, angle, Vec2::ZERO, 0.0, None);
        }

        for _ in 0..self.gravity_wells {
            let position = clear_position(level);
            level.create_object(Prefab::GravityWell, position, 0.0, Vec2::ZERO, 0.0, None);
        }

        if self.item_pickup {
            let position = clear_position(level);
            let item: Box<dyn Item> = if (level.ordinal() / 2) % 2 == 1 {
                Box::new(Armor::default())
            } else {
                Box::new(Accelerant::default())
            };
            level.create_object(Prefab::ItemPickup(item), position, 0.0, Vec2::ZERO, 0.0, None);
        }
    }
}

/// Random position away from the players, giving up after a few tries
fn clear_position(level: &mut Level) -> Vec2 {
    let starts = level.player_positions();
    let mut position = level.rng.position();
    for _ in 1..PLACEMENT_ATTEMPTS {
        if starts
            .iter()
            .all(|p| p.distance(position) >= PLAYER_CLEARANCE)
        {
            break;
        }
        position = level.rng.position();
    }
    position
}
