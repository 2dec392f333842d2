//! Auxiliary companions bound 1:1 to damageable entities
//!
//! The level tells the companion collaborator when an owner appears, changes
//! health, is switched on or off and goes away. [`HealthBars`] is the
//! built-in implementation and just tracks one indicator per owner.

use std::collections::BTreeMap;

use super::entity::EntityId;

pub trait CompanionHooks {
    /// Owner finished initializing
    fn attach(&mut self, owner: EntityId, fraction: f32);

    fn set_active(&mut self, owner: EntityId, active: bool);

    /// Owner health changed; called once per tick after the sweep
    fn sync(&mut self, owner: EntityId, fraction: f32);

    /// Owner is being torn down
    fn detach(&mut self, owner: EntityId);

    fn attached_count(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthBar {
    pub fraction: f32,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct HealthBars {
    bars: BTreeMap<EntityId, HealthBar>,
}

impl HealthBars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, owner: EntityId) -> Option<&HealthBar> {
        self.bars.get(&owner)
    }
}

impl CompanionHooks for HealthBars {
    fn attach(&mut self, owner: EntityId, fraction: f32) {
        // Created on first activation only
        self.bars.entry(owner).or_insert(HealthBar {
            fraction,
            active: true,
        });
    }

    fn set_active(&mut self, owner: EntityId, active: bool) {
        if let Some(bar) = self.bars.get_mut(&owner) {
            bar.active = active;
        }
    }

    fn sync(&mut self, owner: EntityId, fraction: f32) {
        if let Some(bar) = self.bars.get_mut(&owner) {
            bar.fraction = fraction;
        }
    }

    fn detach(&mut self, owner: EntityId) {
        self.bars.remove(&owner);
    }

    fn attached_count(&self) -> usize {
        self.bars.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_lifecycle() {
        let owner = EntityId {
            index: 3,
            generation: 1,
        };
        let mut bars = HealthBars::new();
        bars.attach(owner, 1.0);
        bars.attach(owner, 0.2);
        assert_eq!(bars.attached_count(), 1);
        assert_eq!(bars.get(owner).map(|b| b.fraction), Some(1.0));

        bars.sync(owner, 0.5);
        bars.set_active(owner, false);
        assert_eq!(
            bars.get(owner),
            Some(&HealthBar {
                fraction: 0.5,
                active: false
            })
        );

        bars.detach(owner);
        assert_eq!(bars.attached_count(), 0);
        bars.detach(owner);
    }
}
