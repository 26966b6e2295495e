/// Entry point and frame loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::File;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::{GameConfig, LogConfig};
use domain::entity::MoveDir;
use sim::event::GameEvent;
use error::LevelError;
use sim::level::Catalog;
use sim::step;
use sim::world::{GameState, Phase};
use ui::gamepad::GamepadState;
use ui::input::{self, InputState};
use ui::renderer::{Overlay, Renderer};
use ui::sound::SoundEngine;

const MESSAGE_DURATION: Duration = Duration::from_millis(1500);

fn main() -> ExitCode {
    let config = GameConfig::load();
    init_logging(&config.log);

    let catalog = Catalog::from_config(&config);
    let mut state = match step::initialize(&catalog) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "could not start game");
            eprintln!("Could not start game: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut renderer = Renderer::new();
    let enhanced_keys = match renderer.init() {
        Ok(enhanced) => enhanced,
        Err(e) => {
            // Raw mode may already be on
            let _ = renderer.cleanup();
            eprintln!("Terminal init failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let sound = SoundEngine::new(&config.sound);

    let result = game_loop(&mut state, &catalog, &mut renderer, sound.as_ref(), &config, enhanced_keys);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!(error = %e, "game aborted");
        eprintln!("Game error: {e}");
        return ExitCode::FAILURE;
    }

    println!();
    if state.phase() == Phase::GameComplete {
        println!("You escaped all {} levels. Congratulations!", state.total_levels());
    } else {
        println!("Thanks for playing Maze Escape!");
        println!("Reached level {} of {}.", state.current_level() + 1, state.total_levels());
    }
    info!("exit");
    ExitCode::SUCCESS
}

/// Route `tracing` output to the configured log file.
///
/// The terminal belongs to the renderer, so nothing is ever logged to
/// stdout or stderr. If the file cannot be created, logging stays off.
fn init_logging(cfg: &LogConfig) {
    let log_file = match File::create(&cfg.file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: could not create log file {}: {e}", cfg.file.display());
            return;
        }
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.level)),
        )
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .try_init();
    if let Err(e) = installed {
        eprintln!("Warning: could not install log subscriber: {e}");
    }
}

fn game_loop(
    state: &mut GameState,
    catalog: &Catalog,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
    enhanced_keys: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new(Duration::from_millis(config.timing.key_hold_timeout_ms));
    kb.honor_release = input::releases_reported(enhanced_keys);
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);

    let frame = Duration::from_millis(config.timing.frame_ms);
    let mut session = Session::new(Duration::from_millis(config.timing.celebrate_ms));

    loop {
        kb.drain_events()?;
        gp.update();

        if kb.ctrl_c_pressed() || kb.any_pressed(KEYS_QUIT) || gp.cancel_pressed() {
            info!(level = state.current_level(), moves = state.moves(), "quit requested");
            break;
        }

        let intents = FrameInput {
            restart: kb.any_pressed(KEYS_RESTART) || gp.restart_pressed(),
            moves: collect_moves(&kb, &gp),
        };
        let flow = session.advance(state, catalog, sound, &intents, Instant::now())?;
        if flow == Flow::Finished {
            break;
        }

        renderer.render(state, &session.overlay, &session.message)?;
        std::thread::sleep(frame);
    }

    Ok(())
}

// ── Frame session: presentation state between frames ──

/// Intents gathered from keyboard and pad for one frame.
struct FrameInput {
    restart: bool,
    moves: Vec<MoveDir>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Flow {
    Continue,
    Finished,
}

/// Non-blocking banner pause after a level (or the game) is cleared.
struct Celebration {
    duration: Duration,
    until: Option<Instant>,
}

impl Celebration {
    fn new(duration: Duration) -> Self {
        Celebration { duration, until: None }
    }

    fn start(&mut self, now: Instant) {
        self.until = Some(now + self.duration);
    }

    /// True while the pause runs. Clears itself once it has run out.
    fn active(&mut self, now: Instant) -> bool {
        match self.until {
            Some(until) if now < until => true,
            _ => {
                self.until = None;
                false
            }
        }
    }
}

struct Session {
    overlay: Overlay,
    celebration: Celebration,
    message: String,
    message_until: Option<Instant>,
}

impl Session {
    fn new(celebrate: Duration) -> Self {
        Session {
            overlay: Overlay::None,
            celebration: Celebration::new(celebrate),
            message: String::new(),
            message_until: None,
        }
    }

    /// Apply one frame of input. Presses during a celebration are dropped;
    /// the game ends when the pause after `GameComplete` runs out.
    fn advance(
        &mut self,
        state: &mut GameState,
        catalog: &Catalog,
        sound: Option<&SoundEngine>,
        input: &FrameInput,
        now: Instant,
    ) -> Result<Flow, LevelError> {
        let was_celebrating = self.celebration.until.is_some();
        if self.celebration.active(now) {
            return Ok(Flow::Continue);
        }
        if was_celebrating {
            self.overlay = Overlay::None;
        }
        if state.phase() == Phase::GameComplete {
            return Ok(Flow::Finished);
        }

        if self.message_until.map_or(false, |t| now >= t) {
            self.message.clear();
            self.message_until = None;
        }

        if input.restart {
            step::restart_level(state, catalog)?;
            self.message = "Level restarted".into();
            self.message_until = Some(now + MESSAGE_DURATION);
            return Ok(Flow::Continue);
        }

        for &dir in &input.moves {
            let moves_before = state.moves();
            let events = step::apply_move(state, catalog, dir)?;
            if let Some(o) = process_events(sound, &events, moves_before) {
                self.overlay = o;
                self.celebration.start(now);
                self.message.clear();
                self.message_until = None;
                // Remaining presses of this frame fall into the pause
                break;
            }
        }
        Ok(Flow::Continue)
    }
}

/// Play cues for `events` and return the overlay to celebrate with, if any.
fn process_events(
    sound: Option<&SoundEngine>,
    events: &[GameEvent],
    moves_before: u32,
) -> Option<Overlay> {
    let mut overlay = None;
    let mut finished = false;

    for event in events {
        match *event {
            GameEvent::PlayerMoved { .. } => {
                if let Some(sfx) = sound { sfx.play_step(); }
            }
            GameEvent::LevelComplete { level } => {
                overlay = Some(Overlay::LevelCleared { level, moves: moves_before + 1 });
            }
            GameEvent::GameComplete => finished = true,
            GameEvent::LevelStarted { .. } => {}
        }
    }

    if let (Some(sfx), Some(_)) = (sound, &overlay) {
        if finished { sfx.play_victory(); } else { sfx.play_level_clear(); }
    }
    overlay
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc];

fn key_to_move(code: KeyCode) -> Option<MoveDir> {
    if KEYS_UP.contains(&code) {
        Some(MoveDir::Up)
    } else if KEYS_DOWN.contains(&code) {
        Some(MoveDir::Down)
    } else if KEYS_LEFT.contains(&code) {
        Some(MoveDir::Left)
    } else if KEYS_RIGHT.contains(&code) {
        Some(MoveDir::Right)
    } else {
        None
    }
}

/// Moves for this frame: keyboard presses in arrival order, then the pad.
fn collect_moves(kb: &InputState, gp: &GamepadState) -> Vec<MoveDir> {
    kb.fresh_presses()
        .iter()
        .filter_map(|&code| key_to_move(code))
        .chain(gp.fresh_moves())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::sim::level::LevelDef;

    const PAUSE: Duration = Duration::from_millis(1000);

    fn catalog(levels: &[&[&str]]) -> Catalog {
        Catalog::new(
            levels.iter()
                .enumerate()
                .map(|(i, rows)| LevelDef {
                    name: format!("L{}", i + 1),
                    rows: rows.iter().map(|r| r.to_string()).collect(),
                })
                .collect(),
        )
    }

    fn moves(dirs: &[MoveDir]) -> FrameInput {
        FrameInput { restart: false, moves: dirs.to_vec() }
    }

    #[test]
    fn celebration_runs_out() {
        let t0 = Instant::now();
        let mut c = Celebration::new(PAUSE);
        assert!(!c.active(t0));
        c.start(t0);
        assert!(c.active(t0 + Duration::from_millis(999)));
        assert!(!c.active(t0 + PAUSE));
        assert!(c.until.is_none());
    }

    #[test]
    fn presses_during_celebration_are_dropped() {
        let cat = catalog(&[&["SE"], &["S  E"]]);
        let mut state = step::initialize(&cat).unwrap();
        let mut session = Session::new(PAUSE);
        let t0 = Instant::now();

        let flow = session.advance(&mut state, &cat, None, &moves(&[MoveDir::Right, MoveDir::Right]), t0).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(session.overlay, Overlay::LevelCleared { level: 0, moves: 1 });
        // Second press of the same frame fell into the pause
        assert_eq!((state.current_level(), state.moves()), (1, 0));

        let mid = t0 + Duration::from_millis(500);
        session.advance(&mut state, &cat, None, &moves(&[MoveDir::Right]), mid).unwrap();
        assert_eq!(state.moves(), 0);
        assert_ne!(session.overlay, Overlay::None);

        session.advance(&mut state, &cat, None, &moves(&[MoveDir::Right]), t0 + PAUSE).unwrap();
        assert_eq!(session.overlay, Overlay::None);
        assert_eq!(state.moves(), 1);
    }

    #[test]
    fn game_complete_ends_after_pause() {
        let cat = catalog(&[&["SE"]]);
        let mut state = step::initialize(&cat).unwrap();
        let mut session = Session::new(PAUSE);
        let t0 = Instant::now();

        let flow = session.advance(&mut state, &cat, None, &moves(&[MoveDir::Right]), t0).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(state.phase(), Phase::GameComplete);

        let held = session.advance(&mut state, &cat, None, &moves(&[]), t0 + Duration::from_millis(999)).unwrap();
        assert_eq!(held, Flow::Continue);

        let done = session.advance(&mut state, &cat, None, &moves(&[]), t0 + PAUSE).unwrap();
        assert_eq!(done, Flow::Finished);
    }

    #[test]
    fn restart_shows_message_then_clears() {
        let cat = catalog(&[&["S  E"]]);
        let mut state = step::initialize(&cat).unwrap();
        let mut session = Session::new(PAUSE);
        let t0 = Instant::now();

        session.advance(&mut state, &cat, None, &moves(&[MoveDir::Right]), t0).unwrap();
        let restart = FrameInput { restart: true, moves: vec![MoveDir::Right] };
        session.advance(&mut state, &cat, None, &restart, t0).unwrap();
        assert_eq!(state.moves(), 0);
        assert_eq!(session.message, "Level restarted");

        session.advance(&mut state, &cat, None, &moves(&[]), t0 + MESSAGE_DURATION).unwrap();
        assert!(session.message.is_empty());
    }

    #[test]
    fn repeated_logger_install_is_not_fatal() {
        let cfg = LogConfig {
            file: std::env::temp_dir().join(format!("maze-escape-test-{}.log", std::process::id())),
            level: "debug".into(),
        };
        init_logging(&cfg);
        // A subscriber is already global now; the second install only warns
        init_logging(&cfg);
        let _ = std::fs::remove_file(&cfg.file);
    }

    #[test]
    fn arrows_and_wasd_map_to_moves() {
        assert_eq!(key_to_move(KeyCode::Up), Some(MoveDir::Up));
        assert_eq!(key_to_move(KeyCode::Char('s')), Some(MoveDir::Down));
        assert_eq!(key_to_move(KeyCode::Char('A')), Some(MoveDir::Left));
        assert_eq!(key_to_move(KeyCode::Char('d')), Some(MoveDir::Right));
        assert_eq!(key_to_move(KeyCode::Char('r')), None);
    }

    #[test]
    fn plain_move_needs_no_pause() {
        let events = [GameEvent::PlayerMoved { to: domain::entity::Position::new(1, 0) }];
        assert_eq!(process_events(None, &events, 3), None);
    }

    #[test]
    fn level_clear_reports_final_move_count() {
        let events = [
            GameEvent::PlayerMoved { to: domain::entity::Position::new(2, 0) },
            GameEvent::LevelComplete { level: 0 },
            GameEvent::LevelStarted { level: 1 },
        ];
        assert_eq!(
            process_events(None, &events, 1),
            Some(Overlay::LevelCleared { level: 0, moves: 2 }),
        );
    }
}
