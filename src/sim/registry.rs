//! Entity storage
//!
//! [`Arena`] owns every live entity behind generational handles. [`Registry`]
//! keeps the four ordered per-kind collections the level iterates. Removal is
//! only ever applied during the end-of-tick sweep, so a traversal in progress
//! never sees its collection change underneath it.

use super::entity::{Entity, EntityId, KindTag};
use crate::consts::MAX_PLAYERS;

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

/// Generational slot storage for entities
#[derive(Debug, Clone, Default)]
pub struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entity built for the id it is about to receive
    pub fn insert_with(&mut self, build: impl FnOnce(EntityId) -> Entity) -> EntityId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = EntityId {
            index,
            generation: slot.generation,
        };
        slot.entity = Some(build(id));
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entity.as_ref())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entity.as_mut())
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Take the entity out and expire every handle to it
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let entity = slot.entity.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(entity)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entity.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entities in slot order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().filter_map(|s| s.entity.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.slots.iter_mut().filter_map(|s| s.entity.as_mut())
    }

    /// Drop every entity, expiring all handles. Slots are handed out again
    /// lowest index first, the same order a new arena would use.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            if slot.entity.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.free = (0..self.slots.len() as u32).rev().collect();
    }
}

/// The four ordered per-kind collections
#[derive(Debug, Clone, Default)]
pub struct Registry {
    destructibles: Vec<EntityId>,
    indestructibles: Vec<EntityId>,
    non_interactives: Vec<EntityId>,
    players: Vec<EntityId>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            players: Vec::with_capacity(MAX_PLAYERS),
            ..Default::default()
        }
    }

    fn list_mut(&mut self, tag: KindTag) -> Option<&mut Vec<EntityId>> {
        match tag {
            KindTag::Destructible => Some(&mut self.destructibles),
            KindTag::Indestructible => Some(&mut self.indestructibles),
            KindTag::NonInteractive => Some(&mut self.non_interactives),
            KindTag::Player => None,
        }
    }

    /// Track a newly initialized entity. Players are not tracked here.
    pub fn add(&mut self, id: EntityId, tag: KindTag) -> bool {
        let Some(list) = self.list_mut(tag) else {
            return false;
        };
        if list.contains(&id) {
            log::warn!("Entity {id} registered twice");
            return false;
        }
        list.push(id);
        true
    }

    /// Stop tracking an entity. Removing twice is a no-op.
    pub fn remove(&mut self, id: EntityId, tag: KindTag) -> bool {
        let Some(list) = self.list_mut(tag) else {
            return false;
        };
        let before = list.len();
        list.retain(|&other| other != id);
        list.len() != before
    }

    pub fn add_player(&mut self, id: EntityId) -> bool {
        if self.players.len() >= MAX_PLAYERS || self.players.contains(&id) {
            return false;
        }
        self.players.push(id);
        true
    }

    pub fn destructibles(&self) -> &[EntityId] {
        &self.destructibles
    }

    pub fn indestructibles(&self) -> &[EntityId] {
        &self.indestructibles
    }

    pub fn non_interactives(&self) -> &[EntityId] {
        &self.non_interactives
    }

    pub fn players(&self) -> &[EntityId] {
        &self.players
    }

    pub fn total(&self) -> usize {
        self.destructibles.len()
            + self.indestructibles.len()
            + self.non_interactives.len()
            + self.players.len()
    }

    pub fn clear(&mut self) {
        self.destructibles.clear();
        self.indestructibles.clear();
        self.non_interactives.clear();
        self.players.clear();
    }
}
