//! Whole-level determinism, replay and save round trips

use glam::Vec2;

use nebula_arena::consts::ITEM_SLOTS;
use nebula_arena::input::{RawControls, ScriptedInput};
use nebula_arena::items::{Accelerant, Armor, Item};
use nebula_arena::persistence::{ReplayData, SaveStore};
use nebula_arena::sim::{Body, Collaborators, Level, Loadout, Mode, TickOutcome, Transition};

fn scripted(tick: u64, player: usize) -> RawControls {
    let t = tick as f32 / 60.0;
    let movement = Vec2::from_angle(t * 1.3 + player as f32);
    let mut buttons = [false; ITEM_SLOTS];
    buttons[0] = tick % 90 < 3;
    buttons[1] = (tick + 45 * player as u64) % 200 < 10;
    RawControls::new(movement, buttons)
}

#[derive(Debug, PartialEq)]
struct Snapshot {
    score_bits: u32,
    bodies: Vec<Body>,
    health: Vec<Option<u32>>,
    ids: usize,
}

fn snapshot(level: &Level) -> Snapshot {
    Snapshot {
        score_bits: level.score().to_bits(),
        bodies: level.entities().map(|e| e.body).collect(),
        health: level
            .entities()
            .map(|e| e.health().map(|h| h.health.to_bits()))
            .collect(),
        ids: level.registry().total(),
    }
}

fn give_items(level: &Level) -> Vec<Loadout> {
    let mut loadout: Loadout = Default::default();
    loadout[0] = Some(Box::new(Armor::default()));
    loadout[1] = Some(Box::new(Accelerant::default()));
    vec![loadout; level.player_count()]
}

#[test]
fn test_same_seed_same_run() {
    let run = || {
        let mut level = Level::create(1, 3, 1, 42).unwrap();
        let mut input = ScriptedInput::new(scripted);
        for _ in 0..600 {
            level.tick(&mut input);
        }
        snapshot(&level)
    };
    let first = run();
    let second = run();
    assert_eq!(first.score_bits, second.score_bits);
    assert_eq!(first, second);
}

#[test]
fn test_replay_reproduces_live_run() {
    let mut live = Level::create(4, 2, 2, 2024).unwrap();
    let mut input = ScriptedInput::new(scripted);
    for _ in 0..600 {
        live.tick(&mut input);
    }
    let expected = snapshot(&live);

    // Through the text format, like a file on disk
    let text = live.replay_data().to_text();
    let data = ReplayData::parse(&text).unwrap();
    assert_eq!(data.stream.ticks, 600);
    let mut replay = Level::from_replay(data, Collaborators::default()).unwrap();
    assert_eq!(replay.mode(), Mode::Replay);

    // Live input is ignored while replaying
    let mut noise = ScriptedInput::new(|_, _| RawControls::new(Vec2::Y, [true; ITEM_SLOTS]));
    let mut ticks = 0;
    while replay.tick(&mut noise) != TickOutcome::ReplayFinished {
        ticks += 1;
    }
    assert_eq!(ticks, 600);
    assert_eq!(snapshot(&replay), expected);
}

#[test]
fn test_save_then_load_restores_loadout() {
    let dir = tempfile::tempdir().unwrap();
    let store = SaveStore::new(dir.path(), 20);

    let mut level = Level::create(2, 2, 3, 99).unwrap();
    let mut loadouts = give_items(&level);
    let mut tuned = Armor::default();
    tuned.armor_gain = 4.5;
    loadouts[1][3] = Some(Box::new(tuned));
    let data_before = {
        let mut data = level.next_level_data();
        data.items = nebula_arena::persistence::SaveData::records_for(&loadouts);
        data
    };
    let path = store.save("round_trip", &data_before).unwrap();

    let data = store.load(&path).unwrap();
    assert_eq!(data, data_before);
    let loaded = Level::from_save(&data, Collaborators::default()).unwrap();
    assert_eq!(loaded.ordinal(), 3);
    assert_eq!(loaded.difficulty(), 3);
    assert_eq!(loaded.seed(), data_before.seed);

    for (index, expected) in loadouts.iter().enumerate() {
        let items = &loaded.player(index).unwrap().as_player().unwrap().items;
        for slot in 0..ITEM_SLOTS {
            let describe = |item: &Option<Box<dyn Item>>| {
                item.as_ref().map(|i| (i.identifier(), i.values()))
            };
            assert_eq!(describe(&items[slot]), describe(&expected[slot]));
        }
    }
}

#[test]
fn test_named_save_describes_next_level() {
    let dir = tempfile::tempdir().unwrap();
    let store = SaveStore::new(dir.path(), 20);
    let mut level = Level::create(5, 1, 2, 7).unwrap();
    let path = level.save_named(&store, "slot1").unwrap();
    assert_eq!(path, dir.path().join("slot1.nebula"));

    let data = store.load(&path).unwrap();
    assert_eq!(data.level, 6);
    assert_eq!(data.players, 1);
    assert_eq!(data.difficulty, 2);
    assert_eq!(data.items.len(), 1);
}

#[test]
fn test_next_level_autosave_rebuilds_the_same_level() {
    let dir = tempfile::tempdir().unwrap();
    let store = SaveStore::new(dir.path(), 20);
    let mut level = Level::create(1, 2, 1, 31337).unwrap();

    let Transition::Next(next) = level.next_level(&store).unwrap() else {
        panic!("level 1 has a successor");
    };
    assert_eq!(next.ordinal(), 2);
    assert!(next.initial_players().is_some());

    let autosave = store.latest_autosave().unwrap().unwrap();
    let data = store.load(&autosave).unwrap();
    assert_eq!(data.level, 2);
    assert_eq!(data.seed, next.seed());
    let reloaded = Level::from_save(&data, Collaborators::default()).unwrap();
    assert_eq!(snapshot(&reloaded), snapshot(&next));
}

#[test]
fn test_last_level_restarts_instead_of_advancing() {
    let dir = tempfile::tempdir().unwrap();
    let store = SaveStore::new(dir.path(), 20);
    let mut level = Level::create(nebula_arena::consts::LAST_LEVEL, 1, 1, 3).unwrap();
    let fresh = snapshot(&level);

    let mut input = ScriptedInput::new(scripted);
    for _ in 0..30 {
        level.tick(&mut input);
    }
    assert!(matches!(
        level.next_level(&store).unwrap(),
        Transition::Restarted
    ));
    assert_eq!(level.ticks(), 0);
    assert_eq!(snapshot(&level), fresh);
    // Beating the campaign writes no autosave
    assert!(store.autosaves().unwrap().is_empty());
}
