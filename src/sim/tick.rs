//! Fixed timestep simulation tick
//!
//! Phases run strictly in order: input, update hooks, physics, contact
//! dispatch, sweep. Nothing is removed from or added to the registries
//! before the sweep.

use glam::Vec2;

use super::Level;
use super::collision::{ContactHandler, ContactInfo, Dispatch, Reaction, dispatch};
use super::entity::{
    Destructible, DestructibleKind, Entity, EntityId, Indestructible, Kind, Life, NonInteractive,
    Prefab, Spawn,
};
use super::physics::{BodyMut, Contact};
use super::state::Mode;
use crate::consts::{COMPLETION_GRACE_SECS, MAX_SUBSTEPS, SIM_DT};
use crate::input::{InputSource, TickInput};
use crate::items::Holder;

/// Longest frame the clock will account for
const MAX_FRAME_DT: f32 = 0.1;

/// Player speed cap in units per second
const PLAYER_MAX_SPEED: f32 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    /// Live level cleared; the caller should transition between ticks
    LevelComplete,
    /// Every recorded tick has been played back
    ReplayFinished,
}

/// Turns variable frame times into whole simulation ticks
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedClock {
    accumulator: f32,
}

impl FixedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a frame's worth of time and return how many ticks to run
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.clamp(0.0, MAX_FRAME_DT);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        substeps
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

impl Level {
    /// Advance the level by one fixed timestep. `live` is only consulted in
    /// Live mode.
    pub fn tick(&mut self, live: &mut dyn InputSource) -> TickOutcome {
        if self.mode == Mode::Replay
            && self
                .replay
                .as_ref()
                .is_none_or(|replay| replay.is_finished(self.ticks))
        {
            return TickOutcome::ReplayFinished;
        }

        let dt = SIM_DT;
        let inputs = self.gather_input(live);
        self.update_players(&inputs, dt);
        self.update_mines(dt);
        self.update_gravity_wells(dt);
        self.update_effects();

        let contacts = self.step_physics(dt);
        self.dispatch_contacts(&contacts);
        self.sweep();

        self.ticks += 1;
        if self.is_complete() {
            log::info!(
                "Level {} complete after {:.1}s, score {:.2}",
                self.ordinal,
                self.elapsed_secs(),
                self.score
            );
            TickOutcome::LevelComplete
        } else {
            TickOutcome::Running
        }
    }

    /// Completion only counts in Live mode, after the grace period, once no
    /// destructibles remain
    pub fn is_complete(&self) -> bool {
        self.mode == Mode::Live
            && self.elapsed_secs() > COMPLETION_GRACE_SECS
            && self.registry.destructibles().is_empty()
    }

    fn gather_input(&mut self, live: &mut dyn InputSource) -> Vec<TickInput> {
        let tick = self.ticks;
        let source: &mut dyn InputSource = match self.replay.as_mut() {
            Some(replay) => replay,
            None => live,
        };
        source.begin_tick(tick);

        let mut inputs = Vec::with_capacity(self.players);
        for player in 0..self.players {
            let raw = source.next_tick_input(player);
            if self.mode == Mode::Live {
                self.recorder.record(tick, player, &raw);
            }
            inputs.push(self.controls[player].update(tick, &raw));
        }
        inputs
    }

    fn update_players(&mut self, inputs: &[TickInput], dt: f32) {
        for (&id, input) in self.registry.players().iter().zip(inputs) {
            let Some(entity) = self.arena.get_mut(id) else {
                continue;
            };
            if !entity.is_live() {
                continue;
            }
            let Kind::Player(player) = &mut entity.kind else {
                continue;
            };

            for (slot, control) in player.items.iter_mut().zip(input.items) {
                if let Some(item) = slot {
                    self.score += item.update(
                        control,
                        &mut Holder {
                            health: &mut player.health,
                            acceleration_per_sec: &mut player.acceleration_per_sec,
                        },
                        dt,
                    );
                }
            }

            let body = &mut entity.body;
            body.velocity += input.movement * player.acceleration_per_sec * dt;
            body.velocity = body.velocity.clamp_length_max(PLAYER_MAX_SPEED);
        }
    }

    fn live_players(&self) -> Vec<(EntityId, Vec2)> {
        self.registry
            .players()
            .iter()
            .filter_map(|&id| self.arena.get(id))
            .filter(|e| e.is_live())
            .map(|e| (e.id, e.body.position))
            .collect()
    }

    /// Mines lock on to the nearest player in range and chase it
    fn update_mines(&mut self, dt: f32) {
        let players = self.live_players();
        for &id in self.registry.destructibles() {
            let Some(entity) = self.arena.get_mut(id) else {
                continue;
            };
            if !entity.is_live() {
                continue;
            }
            let position = entity.body.position;
            let Kind::Destructible(Destructible {
                kind: DestructibleKind::Mine(mine),
                ..
            }) = &mut entity.kind
            else {
                continue;
            };

            let tracked = mine.target.and_then(|target| {
                players
                    .iter()
                    .find(|(id, pos)| *id == target && pos.distance(position) <= mine.lose_radius)
            });
            let target = match tracked {
                Some(&found) => Some(found),
                None => players
                    .iter()
                    .filter(|(_, pos)| pos.distance(position) <= mine.find_radius)
                    .min_by(|a, b| a.1.distance(position).total_cmp(&b.1.distance(position)))
                    .copied(),
            };
            mine.target = target.map(|(id, _)| id);

            if let Some((_, target_pos)) = target {
                let heading = (target_pos - position).normalize_or_zero();
                let velocity = entity.body.velocity + heading * mine.acceleration * dt;
                entity.body.velocity = velocity.clamp_length_max(mine.max_speed);
            }
        }
    }

    /// Wells pull every other moving live body within their radius
    fn update_gravity_wells(&mut self, dt: f32) {
        let wells: Vec<(EntityId, Vec2, f32, f32)> = self
            .registry
            .indestructibles()
            .iter()
            .filter_map(|&id| self.arena.get(id))
            .filter(|e| e.is_live())
            .filter_map(|e| match e.kind {
                Kind::Indestructible(Indestructible::GravityWell { strength, radius }) => {
                    Some((e.id, e.body.position, strength, radius))
                }
                _ => None,
            })
            .collect();
        if wells.is_empty() {
            return;
        }

        for entity in self.arena.iter_mut() {
            if !entity.is_live() || entity.body.fixed {
                continue;
            }
            for &(well, center, strength, radius) in &wells {
                if well == entity.id {
                    continue;
                }
                let offset = center - entity.body.position;
                if offset.length_squared() <= radius * radius {
                    entity.body.velocity += offset.normalize_or_zero() * strength * dt;
                }
            }
        }
    }

    fn update_effects(&mut self) {
        let mut expired = Vec::new();
        for &id in self.registry.non_interactives() {
            let Some(entity) = self.arena.get_mut(id) else {
                continue;
            };
            if let Kind::NonInteractive(NonInteractive::Effect { ttl_ticks }) = &mut entity.kind {
                *ttl_ticks = ttl_ticks.saturating_sub(1);
                if *ttl_ticks == 0 {
                    expired.push(id);
                }
            }
        }
        for id in expired {
            self.schedule_destroy(id);
        }
    }

    fn step_physics(&mut self, dt: f32) -> Vec<Contact> {
        let mut bodies: Vec<BodyMut<'_>> = self
            .arena
            .iter_mut()
            .filter(|e| e.is_live())
            .map(|e| BodyMut {
                id: e.id,
                body: &mut e.body,
            })
            .collect();
        self.physics.step(&mut bodies, dt)
    }

    /// Each contact is seen once from each side
    fn dispatch_contacts(&mut self, contacts: &[Contact]) {
        let difficulty_modifier = self.difficulty_modifier();
        for contact in contacts {
            for (this, other) in [(contact.a, contact.b), (contact.b, contact.a)] {
                let Some(receiver) = self.arena.get(this) else {
                    continue;
                };
                let other_tag = self.arena.get(other).map(Entity::tag);
                let class = match dispatch(receiver.tag(), other_tag) {
                    Dispatch::Passive => continue,
                    Dispatch::Unclassified => {
                        log::warn!(
                            "{} {this} touched unresolvable entity {other}; contact ignored",
                            receiver.kind.name()
                        );
                        continue;
                    }
                    Dispatch::Handle(class) => class,
                };

                let info = ContactInfo {
                    this,
                    other,
                    mass: receiver.body.mass,
                    difficulty_modifier,
                };
                let reactions = match &receiver.kind {
                    Kind::Player(player) => player.handle(class, &info),
                    Kind::Destructible(Destructible {
                        kind: DestructibleKind::Asteroid(asteroid),
                        ..
                    }) => asteroid.handle(class, &info),
                    Kind::Destructible(Destructible {
                        kind: DestructibleKind::Mine(mine),
                        ..
                    }) => mine.handle(class, &info),
                    _ => Vec::new(),
                };

                for reaction in reactions {
                    self.apply_reaction(reaction);
                }
            }
        }
    }

    fn apply_reaction(&mut self, reaction: Reaction) {
        match reaction {
            Reaction::Damage { target, amount } => {
                self.apply_damage(target, amount);
            }
            Reaction::Destroy(id) => self.schedule_destroy(id),
            Reaction::PickUp { player, pickup } => self.pick_up(player, pickup),
        }
    }

    /// Move a lying item into the player's first free slot
    fn pick_up(&mut self, player: EntityId, pickup: EntityId) {
        let item = match self.arena.get(pickup) {
            Some(Entity {
                life: Life::Alive,
                kind: Kind::NonInteractive(NonInteractive::Item(item)),
                ..
            }) => item.clone(),
            _ => return,
        };
        let Some(holder) = self.arena.get_mut(player).and_then(Entity::as_player_mut) else {
            return;
        };
        let Some(slot) = holder.first_free_slot() else {
            return;
        };
        log::info!(
            "Player {} picked up {} into slot {slot}",
            holder.index,
            item.identifier()
        );
        holder.items[slot] = Some(item);
        self.schedule_destroy(pickup);
    }

    /// End-of-tick sweep: deaths, removals, then pending spawns
    fn sweep(&mut self) {
        let depleted: Vec<EntityId> = self
            .registry
            .destructibles()
            .iter()
            .filter_map(|&id| self.arena.get(id))
            .filter(|e| e.life == Life::Alive && e.health().is_some_and(|h| h.is_depleted()))
            .map(|e| e.id)
            .collect();
        for id in depleted {
            self.schedule_destroy(id);
        }

        for &id in self.registry.players() {
            let Some(entity) = self.arena.get_mut(id) else {
                continue;
            };
            if !entity.is_live() || !entity.health().is_some_and(|h| h.is_depleted()) {
                continue;
            }
            entity.active = false;
            entity.life = Life::Deactivated;
            if let Some(player) = entity.as_player_mut() {
                player.in_play = false;
                log::info!("Player {} is out", player.index);
            }
            self.companions.set_active(id, false);
        }

        for id in std::mem::take(&mut self.doomed) {
            self.destroy(id);
        }

        for spawn in std::mem::take(&mut self.pending_spawns) {
            spawn.initialize(Some(self));
        }

        for entity in self.arena.iter() {
            if let Some(health) = entity.health() {
                self.companions.sync(entity.id, health.fraction());
            }
        }
    }

    /// Teardown of one entity: registry, companion, kind-specific hook
    fn destroy(&mut self, id: EntityId) {
        let Some(entity) = self.arena.remove(id) else {
            return;
        };
        self.registry.remove(id, entity.tag());
        if entity.health().is_some() {
            self.companions.detach(id);
        }

        if let Kind::Destructible(Destructible {
            kind: DestructibleKind::Mine(_),
            ..
        }) = entity.kind
        {
            self.pending_spawns.push(Spawn::from_prefab(
                Prefab::Effect,
                entity.body.position,
                0.0,
                Vec2::ZERO,
                0.0,
                None,
            ));
        }
        log::debug!("{} {id} destroyed", entity.kind.name());
    }
}
