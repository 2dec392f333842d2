//! Held items
//!
//! Every item is a pluggable behavior that reads one slot's controls each tick
//! and mutates its holder's stats through [`Holder`]. Items persist as a type
//! identifier plus an item-defined value string.

use std::fmt;

use crate::input::ItemControl;
use crate::sim::entity::Health;

/// Score cost per tick while a toggle item is running
pub const USE_POINTS: f32 = -0.001;

/// Item value-string errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ItemError {
    #[error("{item}: expected {expected} values in {values:?}")]
    WrongArity {
        item: &'static str,
        expected: usize,
        values: String,
    },

    #[error("{item}: invalid number {value:?}")]
    BadNumber { item: &'static str, value: String },
}

/// The parts of a player an item may change
pub struct Holder<'a> {
    pub health: &'a mut Health,
    pub acceleration_per_sec: &'a mut f32,
}

/// A pluggable held-item behavior
pub trait Item: fmt::Debug {
    /// Type identifier written to save files
    fn identifier(&self) -> &'static str;

    /// Run one tick while held. Returns the score delta.
    fn update(&mut self, control: ItemControl, holder: &mut Holder<'_>, dt: f32) -> f32;

    /// Undo any holder changes before the item leaves the holder
    fn on_drop(&mut self, holder: &mut Holder<'_>);

    /// Extra state written after the identifier
    fn values(&self) -> String {
        String::new()
    }

    fn load_values(&mut self, values: &str) -> Result<(), ItemError>;

    fn clone_box(&self) -> Box<dyn Item>;
}

impl Clone for Box<dyn Item> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Resolve a saved type identifier to a fresh item
pub fn item_from_identifier(identifier: &str) -> Option<Box<dyn Item>> {
    match identifier {
        Armor::IDENTIFIER => Some(Box::new(Armor::default())),
        Accelerant::IDENTIFIER => Some(Box::new(Accelerant::default())),
        _ => None,
    }
}

fn parse_pair(item: &'static str, values: &str) -> Result<Option<(f32, f32)>, ItemError> {
    if values.trim().is_empty() {
        return Ok(None);
    }
    let parts: Vec<&str> = values.split(';').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(ItemError::WrongArity {
            item,
            expected: 2,
            values: values.to_string(),
        });
    }
    let parse = |s: &str| {
        s.parse::<f32>().map_err(|_| ItemError::BadNumber {
            item,
            value: s.to_string(),
        })
    };
    Ok(Some((parse(parts[0])?, parse(parts[1])?)))
}

/// Toggle item: more armor, slow health drain while active
#[derive(Debug, Clone, PartialEq)]
pub struct Armor {
    pub armor_gain: f32,
    pub health_loss_per_sec: f32,
    activated: bool,
}

impl Default for Armor {
    fn default() -> Self {
        Self {
            armor_gain: 3.0,
            health_loss_per_sec: 0.5,
            activated: false,
        }
    }
}

impl Armor {
    pub const IDENTIFIER: &'static str = "Armor";

    pub fn is_active(&self) -> bool {
        self.activated
    }
}

impl Item for Armor {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn update(&mut self, control: ItemControl, holder: &mut Holder<'_>, dt: f32) -> f32 {
        if control.start_use {
            self.activated = !self.activated;
            if self.activated {
                holder.health.armor += self.armor_gain;
            } else {
                holder.health.armor -= self.armor_gain;
            }
        }

        if !self.activated {
            return 0.0;
        }

        let drain = self.health_loss_per_sec * dt;
        if holder.health.health > drain {
            holder.health.health -= drain;
            USE_POINTS
        } else {
            log::info!("Armor deactivated, not enough health remaining");
            self.activated = false;
            holder.health.armor -= self.armor_gain;
            0.0
        }
    }

    fn on_drop(&mut self, holder: &mut Holder<'_>) {
        if self.activated {
            holder.health.armor -= self.armor_gain;
            self.activated = false;
        }
    }

    fn values(&self) -> String {
        format!("{};{}", self.armor_gain, self.health_loss_per_sec)
    }

    fn load_values(&mut self, values: &str) -> Result<(), ItemError> {
        if let Some((gain, loss)) = parse_pair(Self::IDENTIFIER, values)? {
            self.armor_gain = gain;
            self.health_loss_per_sec = loss;
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Item> {
        Box::new(self.clone())
    }
}

/// Toggle item: more acceleration, less armor while active
#[derive(Debug, Clone, PartialEq)]
pub struct Accelerant {
    pub acceleration_gain: f32,
    pub armor_loss: f32,
    activated: bool,
}

impl Default for Accelerant {
    fn default() -> Self {
        Self {
            acceleration_gain: 15.0,
            armor_loss: 2.0,
            activated: false,
        }
    }
}

impl Accelerant {
    pub const IDENTIFIER: &'static str = "Accelerant";

    pub fn is_active(&self) -> bool {
        self.activated
    }
}

impl Item for Accelerant {
    fn identifier(&self) -> &'static str {
        Self::IDENTIFIER
    }

    fn update(&mut self, control: ItemControl, holder: &mut Holder<'_>, _dt: f32) -> f32 {
        if control.start_use {
            self.activated = !self.activated;
            if self.activated {
                *holder.acceleration_per_sec += self.acceleration_gain;
                holder.health.armor -= self.armor_loss;
            } else {
                *holder.acceleration_per_sec -= self.acceleration_gain;
                holder.health.armor += self.armor_loss;
            }
        }

        if self.activated { USE_POINTS } else { 0.0 }
    }

    fn on_drop(&mut self, holder: &mut Holder<'_>) {
        if self.activated {
            *holder.acceleration_per_sec -= self.acceleration_gain;
            holder.health.armor += self.armor_loss;
            self.activated = false;
        }
    }

    fn values(&self) -> String {
        format!("{};{}", self.acceleration_gain, self.armor_loss)
    }

    fn load_values(&mut self, values: &str) -> Result<(), ItemError> {
        if let Some((gain, loss)) = parse_pair(Self::IDENTIFIER, values)? {
            self.acceleration_gain = gain;
            self.armor_loss = loss;
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn Item> {
        Box::new(self.clone())
    }
}
