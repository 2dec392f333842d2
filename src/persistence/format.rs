//! Text format for saves and replays
//!
//! ```text
//! <level ordinal>
//! <player count>
//! <difficulty>
//! <seed>
//! <item identifier>     \ two lines per slot, slots in order,
//! <item values>         / players in order; both empty for an empty slot
//! #inputs <ticks>       replays only, followed by one record per line:
//! <tick> <player> <control> <value>
//! ```

use super::PersistenceError;
use crate::consts::{ITEM_SLOTS, MAX_PLAYERS};
use crate::input::{InputRecord, InputStream};
use crate::items::{Item, item_from_identifier};
use crate::sim::entity::Loadout;

const INPUTS_MARKER: &str = "#inputs";

/// One saved item slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub identifier: String,
    pub values: String,
}

impl ItemRecord {
    pub fn from_item(item: &dyn Item) -> Self {
        Self {
            identifier: item.identifier().to_string(),
            values: item.values(),
        }
    }

    /// Rebuild the item this record describes
    pub fn to_item(&self) -> Result<Box<dyn Item>, PersistenceError> {
        let mut item = item_from_identifier(&self.identifier)
            .ok_or_else(|| PersistenceError::UnknownItem(self.identifier.clone()))?;
        item.load_values(&self.values)?;
        Ok(item)
    }
}

pub type SlotRecords = [Option<ItemRecord>; ITEM_SLOTS];

/// Contents of a save or autosave file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveData {
    /// Ordinal of the level to build on load
    pub level: u32,
    pub players: usize,
    pub difficulty: u32,
    pub seed: u64,
    /// One entry per player, in player order
    pub items: Vec<SlotRecords>,
}

impl SaveData {
    pub fn records_for(loadouts: &[Loadout]) -> Vec<SlotRecords> {
        loadouts
            .iter()
            .map(|loadout| {
                std::array::from_fn(|slot| {
                    loadout[slot].as_deref().map(ItemRecord::from_item)
                })
            })
            .collect()
    }

    /// Rebuild every player's items
    pub fn loadouts(&self) -> Result<Vec<Loadout>, PersistenceError> {
        self.items
            .iter()
            .map(|slots| {
                let mut loadout: Loadout = Default::default();
                for (slot, record) in slots.iter().enumerate() {
                    if let Some(record) = record {
                        loadout[slot] = Some(record.to_item()?);
                    }
                }
                Ok(loadout)
            })
            .collect()
    }

    pub fn to_text(&self) -> String {
        let mut out = format!(
            "{}\n{}\n{}\n{}\n",
            self.level, self.players, self.difficulty, self.seed
        );
        for slots in &self.items {
            for record in slots {
                match record {
                    Some(record) => {
                        out.push_str(&format!("{}\n{}\n", record.identifier, record.values));
                    }
                    None => out.push_str("\n\n"),
                }
            }
        }
        out
    }

    pub fn parse(text: &str) -> Result<Self, PersistenceError> {
        let mut lines = LineReader::new(text);
        Self::read(&mut lines)
    }

    fn read(lines: &mut LineReader<'_>) -> Result<Self, PersistenceError> {
        let level = lines.number("level ordinal")?;
        let players: usize = lines.number("player count")?;
        if players > MAX_PLAYERS {
            return Err(PersistenceError::PlayerCount(players));
        }
        let difficulty = lines.number("difficulty")?;
        let seed = lines.number("seed")?;

        let mut items = Vec::with_capacity(players);
        for _ in 0..players {
            let mut slots: SlotRecords = Default::default();
            for slot in slots.iter_mut() {
                let identifier = lines.next("item identifier")?.trim();
                let values = lines.next("item values")?.trim();
                if !identifier.is_empty() {
                    *slot = Some(ItemRecord {
                        identifier: identifier.to_string(),
                        values: values.to_string(),
                    });
                }
            }
            items.push(slots);
        }

        Ok(Self {
            level,
            players,
            difficulty,
            seed,
            items,
        })
    }
}

/// Contents of a replay file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayData {
    /// Header describes the level as it started, with the initial loadout
    pub save: SaveData,
    pub stream: InputStream,
}

impl ReplayData {
    pub fn to_text(&self) -> String {
        let mut out = self.save.to_text();
        out.push_str(&format!("{INPUTS_MARKER} {}\n", self.stream.ticks));
        for record in &self.stream.records {
            out.push_str(&format!("{record}\n"));
        }
        out
    }

    pub fn parse(text: &str) -> Result<Self, PersistenceError> {
        let mut lines = LineReader::new(text);
        let save = SaveData::read(&mut lines)?;

        let marker = lines.next("input stream marker")?;
        let ticks = marker
            .strip_prefix(INPUTS_MARKER)
            .and_then(|rest| rest.trim().parse().ok())
            .ok_or_else(|| PersistenceError::InvalidValue {
                line: lines.line,
                what: "input stream marker",
                value: marker.to_string(),
            })?;

        let mut records = Vec::new();
        while let Some(line) = lines.try_next() {
            if line.trim().is_empty() {
                continue;
            }
            let record = InputRecord::parse(line).ok_or_else(|| PersistenceError::InvalidRecord {
                line: lines.line,
                value: line.to_string(),
            })?;
            records.push(record);
        }

        Ok(Self {
            save,
            stream: InputStream { ticks, records },
        })
    }
}

/// Line iterator that remembers the 1-based number of the last line read
struct LineReader<'a> {
    lines: std::str::Lines<'a>,
    line: usize,
}

impl<'a> LineReader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            line: 0,
        }
    }

    fn try_next(&mut self) -> Option<&'a str> {
        let line = self.lines.next()?;
        self.line += 1;
        Some(line)
    }

    fn next(&mut self, what: &'static str) -> Result<&'a str, PersistenceError> {
        self.try_next().ok_or(PersistenceError::MissingLine {
            line: self.line + 1,
            what,
        })
    }

    fn number<T: std::str::FromStr>(&mut self, what: &'static str) -> Result<T, PersistenceError> {
        let raw = self.next(what)?;
        raw.trim().parse().map_err(|_| PersistenceError::InvalidValue {
            line: self.line,
            what,
            value: raw.to_string(),
        })
    }
}
