//! Entity types
//!
//! Every simulated object is an [`Entity`] owned by the level's arena and
//! addressed through a generational [`EntityId`]. The categorical kind is a
//! closed enum; collision dispatch only ever looks at its [`KindTag`].

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::ITEM_SLOTS;
use crate::items::Item;

/// Generational handle into the level arena. A handle whose entity has been
/// destroyed never resolves again, even if its slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Physical state handed to the physics step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub position: Vec2,
    /// Degrees
    pub angle: f32,
    pub velocity: Vec2,
    /// Degrees per second
    pub angular_velocity: f32,
    /// Diameter in world units
    pub scale: f32,
    pub mass: f32,
    /// Solid bodies bounce off each other
    pub solid: bool,
    /// Fixed bodies never move
    pub fixed: bool,
}

impl Body {
    pub fn radius(&self) -> f32 {
        self.scale / 2.0
    }
}

impl Default for Body {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            angle: 0.0,
            velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            scale: 1.0,
            mass: 1.0,
            solid: true,
            fixed: false,
        }
    }
}

/// Health bookkeeping shared by players and destructibles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub health: f32,
    /// Captured when the entity is initialized
    pub max_health: f32,
    pub armor: f32,
}

impl Health {
    pub fn new(health: f32, armor: f32) -> Self {
        Self {
            health,
            max_health: health,
            armor,
        }
    }

    /// Generic damage pipeline. Returns the damage that got past armor, or
    /// `None` when armor absorbed all of it.
    pub fn apply(&mut self, amount: f32) -> Option<f32> {
        let effective = amount - self.armor;
        if effective <= 0.0 {
            return None;
        }
        self.health -= effective;
        Some(effective)
    }

    pub fn is_depleted(&self) -> bool {
        self.health <= 0.0
    }

    pub fn fraction(&self) -> f32 {
        if self.max_health > 0.0 {
            (self.health / self.max_health).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Where an entity is in its health/death state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Life {
    Alive,
    /// Terminal; removed at the next sweep (non-players only)
    Destroyed,
    /// Player only; stays resident until restarted
    Deactivated,
}

/// Breaks into smaller asteroids when damaged
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Asteroid {
    /// Scale at or below which the asteroid no longer splits
    pub min_size: f32,
    pub damage_multiply: f32,
    /// Set once a split has begun
    pub broken: bool,
}

impl Default for Asteroid {
    fn default() -> Self {
        Self {
            min_size: 0.3,
            damage_multiply: 5.0,
            broken: false,
        }
    }
}

/// Homes on nearby players and explodes on contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mine {
    pub damage: f32,
    /// Units per second squared
    pub acceleration: f32,
    pub max_speed: f32,
    pub find_radius: f32,
    pub lose_radius: f32,
    pub target: Option<EntityId>,
}

impl Default for Mine {
    fn default() -> Self {
        Self {
            damage: 25.0,
            acceleration: 6.0,
            max_speed: 6.0,
            find_radius: 5.0,
            lose_radius: 10.0,
            target: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DestructibleKind {
    Asteroid(Asteroid),
    Mine(Mine),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Destructible {
    pub health: Health,
    pub kind: DestructibleKind,
}

pub type Loadout = [Option<Box<dyn Item>>; ITEM_SLOTS];

#[derive(Debug, Clone)]
pub struct Player {
    pub index: usize,
    pub health: Health,
    pub items: Loadout,
    pub acceleration_per_sec: f32,
    pub in_play: bool,
}

impl Player {
    pub const HEALTH: f32 = 100.0;
    pub const ARMOR: f32 = 1.0;
    pub const ACCELERATION: f32 = 10.0;

    pub fn new(index: usize) -> Self {
        Self {
            index,
            health: Health::new(Self::HEALTH, Self::ARMOR),
            items: Default::default(),
            acceleration_per_sec: Self::ACCELERATION,
            in_play: true,
        }
    }

    pub fn first_free_slot(&self) -> Option<usize> {
        self.items.iter().position(Option::is_none)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Indestructible {
    Barrier,
    /// Pulls other bodies within `radius`
    GravityWell { strength: f32, radius: f32 },
}

#[derive(Debug, Clone)]
pub enum NonInteractive {
    /// An item lying in the arena, waiting to be picked up
    Item(Box<dyn Item>),
    /// Short-lived marker (explosions)
    Effect { ttl_ticks: u32 },
}

#[derive(Debug, Clone)]
pub enum Kind {
    Player(Player),
    Destructible(Destructible),
    Indestructible(Indestructible),
    NonInteractive(NonInteractive),
}

/// Fixed kind tag used by collision dispatch and the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindTag {
    Player,
    Destructible,
    Indestructible,
    NonInteractive,
}

impl Kind {
    pub fn tag(&self) -> KindTag {
        match self {
            Kind::Player(_) => KindTag::Player,
            Kind::Destructible(_) => KindTag::Destructible,
            Kind::Indestructible(_) => KindTag::Indestructible,
            Kind::NonInteractive(_) => KindTag::NonInteractive,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Kind::Player(_) => "Player",
            Kind::Destructible(d) => match d.kind {
                DestructibleKind::Asteroid(_) => "Asteroid",
                DestructibleKind::Mine(_) => "Mine",
            },
            Kind::Indestructible(Indestructible::Barrier) => "Barrier",
            Kind::Indestructible(Indestructible::GravityWell { .. }) => "GravityWell",
            Kind::NonInteractive(NonInteractive::Item(_)) => "ItemPickup",
            Kind::NonInteractive(NonInteractive::Effect { .. }) => "Effect",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub body: Body,
    /// Damage to entities with team <= 0 scores
    pub team: i32,
    /// RGBA
    pub color: u32,
    pub active: bool,
    pub life: Life,
    pub kind: Kind,
}

impl Entity {
    pub fn tag(&self) -> KindTag {
        self.kind.tag()
    }

    pub fn health(&self) -> Option<&Health> {
        match &self.kind {
            Kind::Player(p) => Some(&p.health),
            Kind::Destructible(d) => Some(&d.health),
            _ => None,
        }
    }

    pub fn health_mut(&mut self) -> Option<&mut Health> {
        match &mut self.kind {
            Kind::Player(p) => Some(&mut p.health),
            Kind::Destructible(d) => Some(&mut d.health),
            _ => None,
        }
    }

    pub fn as_player(&self) -> Option<&Player> {
        match &self.kind {
            Kind::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_player_mut(&mut self) -> Option<&mut Player> {
        match &mut self.kind {
            Kind::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_asteroid(&self) -> Option<&Asteroid> {
        match &self.kind {
            Kind::Destructible(Destructible {
                kind: DestructibleKind::Asteroid(a),
                ..
            }) => Some(a),
            _ => None,
        }
    }

    /// Resident and taking part in gameplay
    pub fn is_live(&self) -> bool {
        self.active && self.life == Life::Alive
    }
}

/// What the entity factory can build
#[derive(Debug, Clone)]
pub enum Prefab {
    Asteroid,
    Mine,
    Barrier,
    GravityWell,
    ItemPickup(Box<dyn Item>),
    Effect,
}

pub const ASTEROID_COLOR: u32 = 0x8a7f70ff;
pub const MINE_COLOR: u32 = 0xd03030ff;
pub const BARRIER_COLOR: u32 = 0x6090e0ff;
pub const WELL_COLOR: u32 = 0x7030a0ff;
pub const ITEM_COLOR: u32 = 0xf0d040ff;
pub const EFFECT_COLOR: u32 = 0xffa020ff;
pub const PLAYER_COLORS: [u32; 4] = [0x40c0ffff, 0xff6060ff, 0x60ff80ff, 0xffe060ff];

/// A built entity that has not been initialized into a level yet
#[derive(Debug, Clone)]
pub struct Spawn {
    pub body: Body,
    pub team: i32,
    pub color: u32,
    pub kind: Kind,
}

impl Spawn {
    /// Build a prefab with its default stats at the given placement
    pub fn from_prefab(
        prefab: Prefab,
        position: Vec2,
        angle: f32,
        velocity: Vec2,
        angular_velocity: f32,
        scale: Option<f32>,
    ) -> Self {
        let (kind, default_scale, solid, fixed, color) = match prefab {
            Prefab::Asteroid => (
                Kind::Destructible(Destructible {
                    health: Health::new(50.0, 1.0),
                    kind: DestructibleKind::Asteroid(Asteroid::default()),
                }),
                1.0,
                true,
                false,
                ASTEROID_COLOR,
            ),
            Prefab::Mine => (
                Kind::Destructible(Destructible {
                    health: Health::new(20.0, 0.0),
                    kind: DestructibleKind::Mine(Mine::default()),
                }),
                0.5,
                true,
                false,
                MINE_COLOR,
            ),
            Prefab::Barrier => (
                Kind::Indestructible(Indestructible::Barrier),
                2.0,
                true,
                true,
                BARRIER_COLOR,
            ),
            Prefab::GravityWell => (
                Kind::Indestructible(Indestructible::GravityWell {
                    strength: 4.0,
                    radius: 6.0,
                }),
                1.0,
                false,
                true,
                WELL_COLOR,
            ),
            Prefab::ItemPickup(item) => (
                Kind::NonInteractive(NonInteractive::Item(item)),
                0.6,
                false,
                false,
                ITEM_COLOR,
            ),
            Prefab::Effect => (
                Kind::NonInteractive(NonInteractive::Effect { ttl_ticks: 30 }),
                1.0,
                false,
                true,
                EFFECT_COLOR,
            ),
        };

        let scale = scale.unwrap_or(default_scale);
        let mut kind = kind;
        // Asteroid toughness grows with its area
        if let Kind::Destructible(Destructible {
            health,
            kind: DestructibleKind::Asteroid(_),
        }) = &mut kind
        {
            *health = Health::new(health.health * scale * scale, health.armor);
        }

        Self {
            body: Body {
                position,
                angle,
                velocity,
                angular_velocity,
                scale,
                mass: scale * scale,
                solid,
                fixed,
            },
            team: 0,
            color,
            kind,
        }
    }

    /// A player at its start position
    pub fn player(index: usize, position: Vec2) -> Self {
        Self {
            body: Body {
                position,
                ..Default::default()
            },
            team: 1,
            color: PLAYER_COLORS[index % PLAYER_COLORS.len()],
            kind: Kind::Player(Player::new(index)),
        }
    }

    /// Initialize into the owning level. Without a level the entity cannot
    /// exist: it is dropped on the spot and the error is logged.
    pub fn initialize(self, level: Option<&mut super::Level>) -> Option<EntityId> {
        match level {
            Some(level) => level.initialize_spawn(self),
            None => {
                log::error!(
                    "Destroying {} since its level is missing while it is being created",
                    self.kind.name()
                );
                None
            }
        }
    }
}
