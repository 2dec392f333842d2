//! Player input for the simulation.
//!
//! Each tick every player contributes a [`RawControls`] frame: a quantized
//! movement vector plus one button per item slot. Edges (start/end/double use)
//! are derived by [`ControlTracker`] the same way for live and replayed input,
//! so a recorded stream only has to store raw transitions.

use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::ITEM_SLOTS;
use crate::{dequantize, quantize};

/// Raw controls for one player for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawControls {
    /// Movement in 1/1024 steps, each axis in [-1024, 1024]
    pub movement: [i32; 2],
    /// One button per item slot
    pub buttons: [bool; ITEM_SLOTS],
}

impl RawControls {
    /// Build from a movement vector (clamped to unit length and quantized)
    pub fn new(movement: Vec2, buttons: [bool; ITEM_SLOTS]) -> Self {
        let movement = movement.clamp_length_max(1.0);
        Self {
            movement: [quantize(movement.x), quantize(movement.y)],
            buttons,
        }
    }

    pub fn movement(&self) -> Vec2 {
        Vec2::new(dequantize(self.movement[0]), dequantize(self.movement[1]))
    }

    fn value_of(&self, control: Control) -> i32 {
        match control {
            Control::X => self.movement[0],
            Control::Y => self.movement[1],
            Control::Button(slot) => i32::from(self.buttons[slot]),
        }
    }

    fn apply(&mut self, control: Control, value: i32) {
        match control {
            Control::X => self.movement[0] = value,
            Control::Y => self.movement[1] = value,
            Control::Button(slot) => self.buttons[slot] = value != 0,
        }
    }
}

/// Derived per-slot item controls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemControl {
    /// Button is down this tick
    pub held: bool,
    /// Button went down this tick
    pub start_use: bool,
    /// Button went up this tick
    pub end_use: bool,
    /// Button went down again within the double-use window
    pub double_use: bool,
}

/// Everything a player reads for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    pub movement: Vec2,
    pub items: [ItemControl; ITEM_SLOTS],
}

/// Turns raw button levels into edges
#[derive(Debug, Clone)]
pub struct ControlTracker {
    previous: [bool; ITEM_SLOTS],
    last_press: [Option<u64>; ITEM_SLOTS],
    double_use_ticks: u32,
}

impl ControlTracker {
    pub fn new(double_use_ticks: u32) -> Self {
        Self {
            previous: [false; ITEM_SLOTS],
            last_press: [None; ITEM_SLOTS],
            double_use_ticks,
        }
    }

    pub fn update(&mut self, tick: u64, raw: &RawControls) -> TickInput {
        let mut items = [ItemControl::default(); ITEM_SLOTS];

        for (slot, control) in items.iter_mut().enumerate() {
            let down = raw.buttons[slot];
            let was_down = self.previous[slot];
            control.held = down;
            control.start_use = down && !was_down;
            control.end_use = !down && was_down;

            if control.start_use {
                match self.last_press[slot] {
                    Some(last) if tick - last <= u64::from(self.double_use_ticks) => {
                        control.double_use = true;
                        self.last_press[slot] = None;
                    }
                    _ => self.last_press[slot] = Some(tick),
                }
            }
            self.previous[slot] = down;
        }

        TickInput {
            movement: raw.movement(),
            items,
        }
    }
}

/// Where a level pulls its per-tick controls from
pub trait InputSource {
    /// Called once at the start of every tick, before any player is polled
    fn begin_tick(&mut self, _tick: u64) {}

    fn next_tick_input(&mut self, player: usize) -> RawControls;
}

/// No input at all
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleInput;

impl InputSource for IdleInput {
    fn next_tick_input(&mut self, _player: usize) -> RawControls {
        RawControls::default()
    }
}

/// Input produced by a closure of (tick, player)
pub struct ScriptedInput<F> {
    script: F,
    tick: u64,
}

impl<F> ScriptedInput<F>
where
    F: FnMut(u64, usize) -> RawControls,
{
    pub fn new(script: F) -> Self {
        Self { script, tick: 0 }
    }
}

impl<F> InputSource for ScriptedInput<F>
where
    F: FnMut(u64, usize) -> RawControls,
{
    fn begin_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    fn next_tick_input(&mut self, player: usize) -> RawControls {
        (self.script)(self.tick, player)
    }
}

/// A single recorded control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    X,
    Y,
    Button(usize),
}

impl Control {
    const ALL: [Control; 2 + ITEM_SLOTS] = {
        let mut all = [Control::X; 2 + ITEM_SLOTS];
        all[1] = Control::Y;
        let mut slot = 0;
        while slot < ITEM_SLOTS {
            all[2 + slot] = Control::Button(slot);
            slot += 1;
        }
        all
    };
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Control::X => write!(f, "x"),
            Control::Y => write!(f, "y"),
            Control::Button(slot) => write!(f, "b{slot}"),
        }
    }
}

impl FromStr for Control {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x" => Ok(Control::X),
            "y" => Ok(Control::Y),
            _ => {
                let slot: usize = s.strip_prefix('b').ok_or(())?.parse().map_err(|_| ())?;
                if slot < ITEM_SLOTS {
                    Ok(Control::Button(slot))
                } else {
                    Err(())
                }
            }
        }
    }
}

/// One control transition: `<tick> <player> <control> <value>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputRecord {
    pub tick: u64,
    pub player: usize,
    pub control: Control,
    pub value: i32,
}

impl InputRecord {
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let record = Self {
            tick: parts.next()?.parse().ok()?,
            player: parts.next()?.parse().ok()?,
            control: parts.next()?.parse().ok()?,
            value: parts.next()?.parse().ok()?,
        };
        parts.next().is_none().then_some(record)
    }
}

impl fmt::Display for InputRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.tick, self.player, self.control, self.value)
    }
}

/// A recorded run: transitions in tick order plus the number of ticks covered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputStream {
    pub ticks: u64,
    pub records: Vec<InputRecord>,
}

/// Records live controls as transitions
#[derive(Debug, Clone)]
pub struct InputRecorder {
    last: Vec<RawControls>,
    stream: InputStream,
}

impl InputRecorder {
    pub fn new(players: usize) -> Self {
        Self {
            last: vec![RawControls::default(); players],
            stream: InputStream::default(),
        }
    }

    pub fn record(&mut self, tick: u64, player: usize, controls: &RawControls) {
        let Some(last) = self.last.get_mut(player) else {
            return;
        };
        for control in Control::ALL {
            let value = controls.value_of(control);
            if value != last.value_of(control) {
                self.stream.records.push(InputRecord {
                    tick,
                    player,
                    control,
                    value,
                });
            }
        }
        *last = *controls;
        self.stream.ticks = self.stream.ticks.max(tick + 1);
    }

    pub fn stream(&self) -> &InputStream {
        &self.stream
    }
}

/// Plays back a recorded stream in exact tick order
#[derive(Debug, Clone)]
pub struct ReplaySource {
    stream: InputStream,
    next: usize,
    state: Vec<RawControls>,
}

impl ReplaySource {
    pub fn new(stream: InputStream, players: usize) -> Self {
        Self {
            stream,
            next: 0,
            state: vec![RawControls::default(); players],
        }
    }

    /// True once every recorded tick has been consumed
    pub fn is_finished(&self, tick: u64) -> bool {
        tick >= self.stream.ticks
    }

    pub fn stream(&self) -> &InputStream {
        &self.stream
    }
}

impl InputSource for ReplaySource {
    fn begin_tick(&mut self, tick: u64) {
        while let Some(record) = self.stream.records.get(self.next) {
            if record.tick > tick {
                break;
            }
            if let Some(state) = self.state.get_mut(record.player) {
                state.apply(record.control, record.value);
            }
            self.next += 1;
        }
    }

    fn next_tick_input(&mut self, player: usize) -> RawControls {
        self.state.get(player).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buttons(slot0: bool) -> [bool; ITEM_SLOTS] {
        let mut b = [false; ITEM_SLOTS];
        b[0] = slot0;
        b
    }

    #[test]
    fn test_tracker_edges() {
        let mut tracker = ControlTracker::new(15);
        let down = RawControls::new(Vec2::ZERO, buttons(true));
        let up = RawControls::default();

        let t0 = tracker.update(0, &down);
        assert!(t0.items[0].start_use && t0.items[0].held && !t0.items[0].double_use);

        let t1 = tracker.update(1, &down);
        assert!(!t1.items[0].start_use && t1.items[0].held);

        let t2 = tracker.update(2, &up);
        assert!(t2.items[0].end_use && !t2.items[0].held);

        let t3 = tracker.update(5, &down);
        assert!(t3.items[0].start_use && t3.items[0].double_use);
    }

    #[test]
    fn test_double_use_window_expires() {
        let mut tracker = ControlTracker::new(5);
        let down = RawControls::new(Vec2::ZERO, buttons(true));
        let up = RawControls::default();

        tracker.update(0, &down);
        tracker.update(1, &up);
        let late = tracker.update(10, &down);
        assert!(late.items[0].start_use);
        assert!(!late.items[0].double_use);
    }

    #[test]
    fn test_movement_is_quantized_and_clamped() {
        let raw = RawControls::new(Vec2::new(3.0, 4.0), [false; ITEM_SLOTS]);
        assert_eq!(raw.movement, [614, 819]);
        assert!(raw.movement().length() <= 1.0);
    }

    #[test]
    fn test_recorder_only_stores_transitions() {
        let mut recorder = InputRecorder::new(1);
        let moving = RawControls::new(Vec2::new(1.0, 0.0), buttons(false));
        recorder.record(0, 0, &moving);
        recorder.record(1, 0, &moving);
        recorder.record(2, 0, &RawControls::default());

        let stream = recorder.stream();
        assert_eq!(stream.ticks, 3);
        assert_eq!(
            stream.records,
            vec![
                InputRecord {
                    tick: 0,
                    player: 0,
                    control: Control::X,
                    value: 1024
                },
                InputRecord {
                    tick: 2,
                    player: 0,
                    control: Control::X,
                    value: 0
                },
            ]
        );
    }

    #[test]
    fn test_replay_reproduces_recorded_frames() {
        let frames: Vec<RawControls> = (0..20)
            .map(|i| {
                RawControls::new(
                    Vec2::new((i as f32 * 0.3).sin(), 0.5),
                    buttons(i % 4 == 0),
                )
            })
            .collect();

        let mut recorder = InputRecorder::new(2);
        for (tick, frame) in frames.iter().enumerate() {
            recorder.record(tick as u64, 1, frame);
        }

        let mut replay = ReplaySource::new(recorder.stream().clone(), 2);
        for (tick, frame) in frames.iter().enumerate() {
            replay.begin_tick(tick as u64);
            assert_eq!(replay.next_tick_input(1), *frame);
            assert_eq!(replay.next_tick_input(0), RawControls::default());
        }
        assert!(replay.is_finished(20));
    }

    #[test]
    fn test_record_line_format() {
        let record = InputRecord {
            tick: 42,
            player: 3,
            control: Control::Button(2),
            value: 1,
        };
        let line = record.to_string();
        assert_eq!(line, "42 3 b2 1");
        assert_eq!(InputRecord::parse(&line), Some(record));
        assert_eq!(InputRecord::parse("42 3 b9 1"), None);
        assert_eq!(InputRecord::parse("42 3 x 1 extra"), None);
    }
}
