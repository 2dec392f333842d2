//! Session driver
//!
//! Owns the current level and the save store, turns frame time into fixed
//! ticks and performs level transitions between ticks.

use std::path::{Path, PathBuf};

use crate::input::InputSource;
use crate::persistence::{PersistenceError, SaveStore};
use crate::settings::Settings;
use crate::sim::{Collaborators, FixedClock, Level, TickOutcome, Transition};

pub struct Session {
    level: Level,
    store: SaveStore,
    clock: FixedClock,
    double_use_ticks: u32,
    /// Score from levels already finished
    banked_score: f32,
    levels_cleared: u32,
}

impl Session {
    fn collaborators(double_use_ticks: u32) -> Collaborators {
        Collaborators {
            double_use_ticks,
            ..Default::default()
        }
    }

    fn with_level(level: Level, settings: &Settings) -> Self {
        Self {
            level,
            store: SaveStore::from_settings(settings),
            clock: FixedClock::new(),
            double_use_ticks: settings.double_use_ticks,
            banked_score: 0.0,
            levels_cleared: 0,
        }
    }

    /// Start the campaign at level 1
    pub fn new_game(settings: &Settings, seed: u64) -> Result<Self, PersistenceError> {
        let level = Level::create_with(
            1,
            settings.effective_players(),
            settings.difficulty.level(),
            seed,
            Self::collaborators(settings.double_use_ticks),
        )
        .ok_or(PersistenceError::UnknownLevel(1))?;
        Ok(Self::with_level(level, settings))
    }

    /// Continue from a save or autosave file
    pub fn load(settings: &Settings, path: &Path) -> Result<Self, PersistenceError> {
        let store = SaveStore::from_settings(settings);
        let data = store.load(path)?;
        let level = Level::from_save(&data, Self::collaborators(settings.double_use_ticks))?;
        log::info!("Loaded level {} from {}", data.level, path.display());
        Ok(Self::with_level(level, settings))
    }

    /// Watch a replay file
    pub fn load_replay(settings: &Settings, path: &Path) -> Result<Self, PersistenceError> {
        let store = SaveStore::from_settings(settings);
        let data = store.load_replay(path)?;
        let level = Level::from_replay(data, Self::collaborators(settings.double_use_ticks))?;
        log::info!("Replaying level {} from {}", level.ordinal(), path.display());
        Ok(Self::with_level(level, settings))
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn store(&self) -> &SaveStore {
        &self.store
    }

    pub fn levels_cleared(&self) -> u32 {
        self.levels_cleared
    }

    /// Finished levels plus the current one
    pub fn total_score(&self) -> f32 {
        self.banked_score + self.level.score()
    }

    /// Run one tick, transitioning to the next level if it completed. If the
    /// transition fails the completed level stays current and nothing is
    /// banked, so the next call retries it.
    pub fn step(&mut self, input: &mut dyn InputSource) -> Result<TickOutcome, PersistenceError> {
        let outcome = if self.level.is_complete() {
            TickOutcome::LevelComplete
        } else {
            self.level.tick(input)
        };
        if outcome == TickOutcome::LevelComplete {
            let cleared_score = self.level.score();
            let collaborators = Self::collaborators(self.double_use_ticks);
            match self.level.next_level_with(&self.store, collaborators)? {
                Transition::Next(next) => {
                    log::info!("Advancing to level {}", next.ordinal());
                    self.level = *next;
                }
                Transition::Restarted => {
                    log::info!("Campaign beaten; replaying level {}", self.level.ordinal());
                }
            }
            self.banked_score += cleared_score;
            self.levels_cleared += 1;
            self.clock.reset();
        }
        Ok(outcome)
    }

    /// Feed one presentation frame; runs however many ticks fit. Returns the
    /// last tick's outcome, or `None` if no tick ran.
    pub fn frame(
        &mut self,
        frame_dt: f32,
        input: &mut dyn InputSource,
    ) -> Result<Option<TickOutcome>, PersistenceError> {
        let mut last = None;
        for _ in 0..self.clock.advance(frame_dt) {
            let outcome = self.step(input)?;
            last = Some(outcome);
            if outcome != TickOutcome::Running {
                break;
            }
        }
        Ok(last)
    }

    /// Run up to `ticks` ticks, stopping early when a replay runs out
    pub fn run_ticks(
        &mut self,
        ticks: u64,
        input: &mut dyn InputSource,
    ) -> Result<TickOutcome, PersistenceError> {
        let mut last = TickOutcome::Running;
        for _ in 0..ticks {
            last = self.step(input)?;
            if last == TickOutcome::ReplayFinished {
                break;
            }
        }
        Ok(last)
    }

    /// Named save of the next level
    pub fn save(&mut self, name: &str) -> Result<PathBuf, PersistenceError> {
        self.level.save_named(&self.store, name)
    }

    pub fn save_replay(&self, name: &str) -> Result<PathBuf, PersistenceError> {
        self.level.save_replay(&self.store, name)
    }
}
