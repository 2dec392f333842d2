//! Nebula Arena - a deterministic 2D arena-combat simulation kernel
//!
//! Core modules:
//! - `sim`: Deterministic simulation (entities, collisions, damage, level lifecycle)
//! - `input`: Per-tick player controls, recording and replay
//! - `items`: Pluggable held-item behaviors
//! - `persistence`: Save, autosave rotation and replay files
//! - `session`: Fixed-rate driver that chains levels together

pub mod input;
pub mod items;
pub mod persistence;
pub mod session;
pub mod settings;
pub mod sim;

pub use session::Session;
pub use settings::Settings;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    use glam::Vec2;

    /// Fixed simulation rate
    pub const UPDATES_PER_SEC: u32 = 60;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / UPDATES_PER_SEC as f32;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Integer steps per unit for every quantized random or input value
    pub const PRECISION: f32 = 1024.0;

    /// Arena dimensions (world units, wraps at the edges)
    pub const GAME_SIZE: Vec2 = Vec2::new(26.6666, 20.0);

    /// Player limits
    pub const MAX_PLAYERS: usize = 4;
    pub const ITEM_SLOTS: usize = 4;

    /// Seconds a level must run before it can complete
    pub const COMPLETION_GRACE_SECS: f32 = 2.0;

    /// Last level of the campaign
    pub const LAST_LEVEL: u32 = 9;

    /// Save files
    pub const SAVE_DIR: &str = "saves";
    pub const AUTOSAVE_EXTENSION: &str = "NEBULA";
    pub const SAVE_EXTENSION: &str = "nebula";
    pub const REPLAY_EXTENSION: &str = "replay";
    pub const MAX_AUTOSAVES: usize = 20;
}

/// Rotate a vector counter-clockwise by an angle in degrees
#[inline]
pub fn rotate_deg(v: Vec2, degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians()).rotate(v)
}

/// Wrap a position back into the arena
#[inline]
pub fn wrap_position(pos: Vec2) -> Vec2 {
    Vec2::new(
        pos.x.rem_euclid(consts::GAME_SIZE.x),
        pos.y.rem_euclid(consts::GAME_SIZE.y),
    )
}

/// Quantize a value to the fixed precision grid
#[inline]
pub fn quantize(value: f32) -> i32 {
    (value * consts::PRECISION).round() as i32
}

/// Convert a quantized value back to a float
#[inline]
pub fn dequantize(steps: i32) -> f32 {
    steps as f32 / consts::PRECISION
}
