//! Nebula Arena - headless runner
//!
//! Usage:
//!   nebula-arena [--settings FILE] [--difficulty LEVEL] [--seed N] [--ticks N]
//!                [--load FILE] [--replay FILE] [--record NAME]

use std::error::Error;
use std::path::{Path, PathBuf};

use glam::Vec2;

use nebula_arena::consts::{ITEM_SLOTS, UPDATES_PER_SEC};
use nebula_arena::input::{IdleInput, InputSource, RawControls, ScriptedInput};
use nebula_arena::sim::TickOutcome;
use nebula_arena::settings::Difficulty;
use nebula_arena::{Session, Settings};

const DEFAULT_SETTINGS: &str = "nebula-arena.json";

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .skip_while(|a| a.as_str() != flag)
        .nth(1)
        .map(String::as_str)
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<Option<T>, String> {
    match arg_value(args, flag) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| format!("invalid value for {flag}: {raw:?}")),
        None => Ok(None),
    }
}

/// Each player circles the arena at its own phase and taps its first item
/// every two seconds
fn demo_controls(tick: u64, player: usize) -> RawControls {
    let t = tick as f32 / UPDATES_PER_SEC as f32;
    let phase = player as f32 * std::f32::consts::FRAC_PI_2;
    let movement = Vec2::from_angle(t * 0.8 + phase);
    let mut buttons = [false; ITEM_SLOTS];
    buttons[0] = tick % 120 < 5;
    RawControls::new(movement, buttons)
}

fn run() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();

    let settings_path = arg_value(&args, "--settings")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS));
    let mut settings = Settings::load(&settings_path);
    if let Some(raw) = arg_value(&args, "--difficulty") {
        settings.difficulty =
            Difficulty::from_str(raw).ok_or_else(|| format!("unknown difficulty: {raw:?}"))?;
    }
    let ticks = parse_arg(&args, "--ticks")?.unwrap_or(settings.demo_ticks);

    let (mut session, replaying) = if let Some(path) = arg_value(&args, "--replay") {
        (Session::load_replay(&settings, Path::new(path))?, true)
    } else if let Some(path) = arg_value(&args, "--load") {
        (Session::load(&settings, Path::new(path))?, false)
    } else {
        let seed = parse_arg(&args, "--seed")?
            .unwrap_or_else(|| chrono::Local::now().timestamp_millis().unsigned_abs());
        (Session::new_game(&settings, seed)?, false)
    };

    log::info!(
        "Running level {} (seed {}, {} players) for up to {ticks} ticks",
        session.level().ordinal(),
        session.level().seed(),
        session.level().player_count()
    );

    let mut idle = IdleInput;
    let mut demo = ScriptedInput::new(demo_controls);
    let input: &mut dyn InputSource = if replaying { &mut idle } else { &mut demo };
    let outcome = session.run_ticks(ticks, input)?;
    if outcome == TickOutcome::ReplayFinished {
        log::info!("Replay finished after {} ticks", session.level().ticks());
    }

    if let Some(name) = arg_value(&args, "--record") {
        let path = session.save_replay(name)?;
        log::info!("Replay written to {}", path.display());
    }

    log::info!(
        "Finished on level {} after clearing {}; score {:.3}",
        session.level().ordinal(),
        session.levels_cleared(),
        session.total_score()
    );
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Nebula Arena starting...");

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
