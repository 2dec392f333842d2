//! Level state and lifecycle
//!
//! A [`Level`] is the simulation context: it owns the RNG, the entity arena,
//! the registries and the mode, and is passed explicitly to everything that
//! needs simulation state. Built on level start, torn down on drop.

use std::path::PathBuf;

use glam::Vec2;

use super::companion::{CompanionHooks, HealthBars};
use super::entity::{Entity, EntityId, Health, KindTag, Life, Loadout, Prefab, Spawn};
use super::layout::{Layout, layout_for};
use super::physics::{BasicPhysics, PhysicsStep};
use super::registry::{Arena, Registry};
use super::rng::SimRng;
use crate::consts::{GAME_SIZE, MAX_PLAYERS, UPDATES_PER_SEC};
use crate::input::{ControlTracker, InputRecorder, InputStream, ReplaySource};
use crate::items::Holder;
use crate::persistence::{PersistenceError, ReplayData, SaveData, SaveStore};

/// Where tick input comes from; fixed for the lifetime of a level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Live,
    Replay,
}

/// External collaborators and tuning handed to a level on construction
pub struct Collaborators {
    pub physics: Box<dyn PhysicsStep>,
    pub companions: Box<dyn CompanionHooks>,
    pub double_use_ticks: u32,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            physics: Box::new(BasicPhysics::new()),
            companions: Box::new(HealthBars::new()),
            double_use_ticks: 15,
        }
    }
}

/// Result of finishing a level
pub enum Transition {
    /// The following level, already autosaved
    Next(Box<Level>),
    /// No level follows; the current one was restarted in place
    Restarted,
}

pub struct Level {
    pub(crate) ordinal: u32,
    pub(crate) layout: Layout,
    pub(crate) players: usize,
    pub(crate) difficulty: u32,
    pub(crate) seed: u64,
    pub(crate) rng: SimRng,
    pub(crate) ticks: u64,
    pub(crate) score: f32,
    pub(crate) mode: Mode,
    pub(crate) arena: Arena,
    pub(crate) registry: Registry,
    /// Loadout frozen when the level was entered; restored on restart
    pub(crate) initial_players: Option<Vec<Loadout>>,
    /// Spawns requested mid-tick, initialized by the sweep
    pub(crate) pending_spawns: Vec<Spawn>,
    /// Entities scheduled for destruction at the sweep
    pub(crate) doomed: Vec<EntityId>,
    pub(crate) controls: Vec<ControlTracker>,
    pub(crate) recorder: InputRecorder,
    pub(crate) replay: Option<ReplaySource>,
    pub(crate) physics: Box<dyn PhysicsStep>,
    pub(crate) companions: Box<dyn CompanionHooks>,
    pub(crate) double_use_ticks: u32,
    /// Seed for whatever follows this level, drawn once on first use
    pub(crate) next_seed: Option<u64>,
}

impl std::fmt::Debug for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Level")
            .field("ordinal", &self.ordinal)
            .field("players", &self.players)
            .field("difficulty", &self.difficulty)
            .field("seed", &self.seed)
            .field("ticks", &self.ticks)
            .field("score", &self.score)
            .field("mode", &self.mode)
            .field("entities", &self.arena.len())
            .finish()
    }
}

/// Clone a loadout with every item switched off, ready for a fresh holder
pub(crate) fn stowed(loadout: &Loadout) -> Loadout {
    let mut health = Health::new(0.0, 0.0);
    let mut acceleration = 0.0;
    std::array::from_fn(|slot| {
        loadout[slot].clone().map(|mut item| {
            item.on_drop(&mut Holder {
                health: &mut health,
                acceleration_per_sec: &mut acceleration,
            });
            item
        })
    })
}

impl Level {
    /// Build and populate campaign level `ordinal`, or `None` if there is no
    /// such level
    pub fn create(ordinal: u32, players: usize, difficulty: u32, seed: u64) -> Option<Self> {
        Self::create_with(ordinal, players, difficulty, seed, Collaborators::default())
    }

    pub fn create_with(
        ordinal: u32,
        players: usize,
        difficulty: u32,
        seed: u64,
        collaborators: Collaborators,
    ) -> Option<Self> {
        let layout = layout_for(ordinal)?;
        let mut level =
            Self::empty_with_layout(ordinal, layout, players, difficulty, seed, collaborators);
        level.populate();
        log::info!(
            "Level {ordinal} started: {} players, difficulty {difficulty}, seed {seed}",
            level.players
        );
        Some(level)
    }

    /// A level with no entities at all
    #[cfg(test)]
    pub(crate) fn empty(
        ordinal: u32,
        players: usize,
        difficulty: u32,
        seed: u64,
        collaborators: Collaborators,
    ) -> Self {
        let layout = layout_for(ordinal).unwrap_or(Layout {
            asteroids: 0,
            mines: 0,
            barriers: 0,
            gravity_wells: 0,
            item_pickup: false,
        });
        Self::empty_with_layout(ordinal, layout, players, difficulty, seed, collaborators)
    }

    fn empty_with_layout(
        ordinal: u32,
        layout: Layout,
        players: usize,
        difficulty: u32,
        seed: u64,
        collaborators: Collaborators,
    ) -> Self {
        let players = players.min(MAX_PLAYERS);
        let Collaborators {
            physics,
            companions,
            double_use_ticks,
        } = collaborators;
        Self {
            ordinal,
            layout,
            players,
            difficulty,
            seed,
            rng: SimRng::new(seed),
            ticks: 0,
            score: 0.0,
            mode: Mode::Live,
            arena: Arena::new(),
            registry: Registry::new(),
            initial_players: None,
            pending_spawns: Vec::new(),
            doomed: Vec::new(),
            controls: vec![ControlTracker::new(double_use_ticks); players],
            recorder: InputRecorder::new(players),
            replay: None,
            physics,
            companions,
            double_use_ticks,
            next_seed: None,
        }
    }

    /// Players first, then the layout
    fn populate(&mut self) {
        let n = self.players as f32;
        for i in 0..self.players {
            let x = GAME_SIZE.x / 2.0 - (n - 1.0) * 2.0 + i as f32 * 4.0;
            Spawn::player(i, Vec2::new(x, GAME_SIZE.y / 2.0)).initialize(Some(self));
        }
        let layout = self.layout;
        layout.populate(self);
    }

    /// Finish initializing a spawn: store it, register it, capture its max
    /// health and attach its companion
    pub fn initialize_spawn(&mut self, spawn: Spawn) -> Option<EntityId> {
        let Spawn {
            body,
            team,
            color,
            kind,
        } = spawn;
        let tag = kind.tag();
        let id = self.arena.insert_with(|id| Entity {
            id,
            body,
            team,
            color,
            active: true,
            life: Life::Alive,
            kind,
        });

        let registered = match tag {
            KindTag::Player => self.registry.add_player(id),
            _ => self.registry.add(id, tag),
        };
        if !registered {
            log::error!("Could not register entity {id}; dropping it");
            self.arena.remove(id);
            return None;
        }

        if let Some(health) = self.arena.get_mut(id).and_then(Entity::health_mut) {
            health.max_health = health.health;
            self.companions.attach(id, health.fraction());
        }
        Some(id)
    }

    /// Entity factory
    pub fn create_object(
        &mut self,
        prefab: Prefab,
        position: Vec2,
        angle: f32,
        velocity: Vec2,
        angular_velocity: f32,
        scale: Option<f32>,
    ) -> Option<EntityId> {
        Spawn::from_prefab(prefab, position, angle, velocity, angular_velocity, scale)
            .initialize(Some(self))
    }

    /// Mark a non-player for removal at the next sweep
    pub(crate) fn schedule_destroy(&mut self, id: EntityId) {
        let Some(entity) = self.arena.get_mut(id) else {
            return;
        };
        if entity.tag() == KindTag::Player {
            return;
        }
        entity.life = Life::Destroyed;
        if !self.doomed.contains(&id) {
            self.doomed.push(id);
        }
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn player_count(&self) -> usize {
        self.players
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Damage scale: 1.0 easy, 1.5 normal, 2.0 hard
    pub fn difficulty_modifier(&self) -> f32 {
        0.5 + 0.5 * self.difficulty as f32
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.ticks as f32 / UPDATES_PER_SEC as f32
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn companions(&self) -> &dyn CompanionHooks {
        self.companions.as_ref()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.arena.get(id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.arena.iter()
    }

    /// Player `index` in player order
    pub fn player(&self, index: usize) -> Option<&Entity> {
        let id = *self.registry.players().get(index)?;
        self.arena.get(id)
    }

    pub fn player_mut(&mut self, index: usize) -> Option<&mut Entity> {
        let id = *self.registry.players().get(index)?;
        self.arena.get_mut(id)
    }

    pub(crate) fn player_positions(&self) -> Vec<Vec2> {
        self.registry
            .players()
            .iter()
            .filter_map(|&id| self.arena.get(id))
            .map(|e| e.body.position)
            .collect()
    }

    /// Every player's items, switched off
    pub fn loadouts(&self) -> Vec<Loadout> {
        (0..self.players)
            .filter_map(|i| self.player(i))
            .filter_map(Entity::as_player)
            .map(|p| stowed(&p.items))
            .collect()
    }

    pub fn initial_players(&self) -> Option<&[Loadout]> {
        self.initial_players.as_deref()
    }

    /// Give each player a copy of its loadout
    pub(crate) fn equip(&mut self, loadouts: &[Loadout]) {
        for (index, loadout) in loadouts.iter().enumerate() {
            if let Some(player) = self.player_mut(index).and_then(Entity::as_player_mut) {
                player.items = stowed(loadout);
            }
        }
    }

    /// Spawns waiting for the next sweep
    pub fn pending_spawns(&self) -> &[Spawn] {
        &self.pending_spawns
    }

    pub fn recorded_inputs(&self) -> &InputStream {
        self.recorder.stream()
    }

    /// Seed the next level is built with; drawn once
    pub(crate) fn next_seed(&mut self) -> u64 {
        match self.next_seed {
            Some(seed) => seed,
            None => {
                let seed = self.rng.next_seed();
                self.next_seed = Some(seed);
                seed
            }
        }
    }

    /// Save data describing the level that follows this one
    pub fn next_level_data(&mut self) -> SaveData {
        let seed = self.next_seed();
        SaveData {
            level: self.ordinal + 1,
            players: self.players,
            difficulty: self.difficulty,
            seed,
            items: SaveData::records_for(&self.loadouts()),
        }
    }

    /// Replay header plus everything recorded so far
    pub fn replay_data(&self) -> ReplayData {
        // A level entered without a frozen loadout started empty-handed
        let loadouts = match &self.initial_players {
            Some(initial) => initial.clone(),
            None => vec![Loadout::default(); self.players],
        };
        ReplayData {
            save: SaveData {
                level: self.ordinal,
                players: self.players,
                difficulty: self.difficulty,
                seed: self.seed,
                items: SaveData::records_for(&loadouts),
            },
            stream: self.recorder.stream().clone(),
        }
    }

    /// Rebuild this level from its seed and put the entry loadout back
    pub fn restart(&mut self) {
        self.teardown();
        self.rng = SimRng::new(self.seed);
        self.ticks = 0;
        self.score = 0.0;
        self.next_seed = None;
        self.controls = vec![ControlTracker::new(self.double_use_ticks); self.players];
        self.recorder = InputRecorder::new(self.players);
        let players = self.players;
        self.replay = self
            .replay
            .take()
            .map(|replay| ReplaySource::new(replay.stream().clone(), players));
        self.physics.reset();

        self.populate();
        if let Some(initial) = self.initial_players.take() {
            self.equip(&initial);
            self.initial_players = Some(initial);
        }
        log::info!("Level {} restarted", self.ordinal);
    }

    /// Autosave and build the following level. With no following level the
    /// campaign is over and this level restarts instead.
    pub fn next_level(&mut self, store: &SaveStore) -> Result<Transition, PersistenceError> {
        let collaborators = Collaborators {
            double_use_ticks: self.double_use_ticks,
            ..Default::default()
        };
        self.next_level_with(store, collaborators)
    }

    pub fn next_level_with(
        &mut self,
        store: &SaveStore,
        collaborators: Collaborators,
    ) -> Result<Transition, PersistenceError> {
        if layout_for(self.ordinal + 1).is_none() {
            log::info!("Campaign complete after level {}", self.ordinal);
            self.restart();
            return Ok(Transition::Restarted);
        }

        let data = self.next_level_data();
        store.autosave_now(&data)?;

        let mut next = Self::create_with(
            data.level,
            self.players,
            self.difficulty,
            data.seed,
            collaborators,
        )
        .ok_or(PersistenceError::UnknownLevel(data.level))?;
        let loadouts = self.loadouts();
        next.equip(&loadouts);
        next.initial_players = Some(loadouts);
        Ok(Transition::Next(Box::new(next)))
    }

    /// Named save describing the next level
    pub fn save_named(
        &mut self,
        store: &SaveStore,
        name: &str,
    ) -> Result<PathBuf, PersistenceError> {
        let data = self.next_level_data();
        store.save(name, &data)
    }

    pub fn save_replay(&self, store: &SaveStore, name: &str) -> Result<PathBuf, PersistenceError> {
        store.save_replay(name, &self.replay_data())
    }

    /// Build a live level from save data
    pub fn from_save(
        data: &SaveData,
        collaborators: Collaborators,
    ) -> Result<Self, PersistenceError> {
        if data.players > MAX_PLAYERS {
            return Err(PersistenceError::PlayerCount(data.players));
        }
        let loadouts = data.loadouts()?;
        let mut level = Self::create_with(
            data.level,
            data.players,
            data.difficulty,
            data.seed,
            collaborators,
        )
        .ok_or(PersistenceError::UnknownLevel(data.level))?;
        level.equip(&loadouts);
        level.initial_players = Some(loadouts);
        Ok(level)
    }

    /// Build a level exactly like [`Level::from_save`], then drive it from
    /// the embedded input stream
    pub fn from_replay(
        data: ReplayData,
        collaborators: Collaborators,
    ) -> Result<Self, PersistenceError> {
        let mut level = Self::from_save(&data.save, collaborators)?;
        level.mode = Mode::Replay;
        level.replay = Some(ReplaySource::new(data.stream, level.players));
        Ok(level)
    }

    /// Destroy every owned entity and release companions
    fn teardown(&mut self) {
        let owners: Vec<EntityId> = self
            .arena
            .iter()
            .filter(|e| e.health().is_some())
            .map(|e| e.id)
            .collect();
        for id in owners {
            self.companions.detach(id);
        }
        self.arena.clear();
        self.registry.clear();
        self.pending_spawns.clear();
        self.doomed.clear();
    }
}

impl Drop for Level {
    fn drop(&mut self) {
        self.teardown();
    }
}
