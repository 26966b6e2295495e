/// Gamepad input tracker using gilrs.
///
/// Button mapping is loaded from config.toml via `load_button_config()`.
/// Default mapping:
///   D-pad / Left Stick    →  Movement (one step per press)
///   Start                 →  Restart level
///   Select                →  Quit
///
/// Directions are edge-triggered like the keyboard: only the
/// not-pressed → pressed transition of a d-pad button or a stick
/// crossing the deadzone produces a move.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};
#[cfg(feature = "gamepad")]
use tracing::{info, warn};

use crate::config::GamepadConfig;
use crate::domain::entity::MoveDir;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.5;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    Start,
    Select,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South     => Some(Btn::A),
            Button::East      => Some(Btn::B),
            Button::West      => Some(Btn::X),
            Button::North     => Some(Btn::Y),
            Button::LeftTrigger  => Some(Btn::L1),
            Button::RightTrigger => Some(Btn::R1),
            Button::Start     => Some(Btn::Start),
            Button::Select    => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Per-button state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

impl BtnState {
    /// Update `held`, raising `just_pressed` on the rising edge only.
    fn set_held(&mut self, held: bool) {
        if held && !self.held {
            self.just_pressed = true;
        }
        self.held = held;
    }
}

/// Action-to-button mapping (loaded from config).
struct ActionMap {
    cancel: Vec<Btn>,
    restart: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            cancel:  vec![Btn::Select],
            restart: vec![Btn::Start],
        }
    }
}

/// Directional inputs in the order moves are reported within a frame.
const DIRS: [MoveDir; 4] = [MoveDir::Up, MoveDir::Down, MoveDir::Left, MoveDir::Right];

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    // All tracked buttons (indexed by Btn)
    buttons: [BtnState; 8],

    // D-pad and stick, indexed like DIRS
    dpad: [BtnState; 4],
    stick: [BtnState; 4],
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_x: f32,
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    stick_y: f32,

    action_map: ActionMap,
}

fn btn_index(btn: Btn) -> usize {
    btn as usize
}

fn dir_index(dir: MoveDir) -> usize {
    match dir {
        MoveDir::Up => 0,
        MoveDir::Down => 1,
        MoveDir::Left => 2,
        MoveDir::Right => 3,
    }
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let gilrs_opt = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                info!(connected = has_pad, "gamepad support initialised");
                Some(g)
            }
            Err(e) => {
                warn!(error = %e, "gamepad support unavailable");
                None
            }
        };

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); 8],
            dpad: [BtnState::default(); 4],
            stick: [BtnState::default(); 4],
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
        }
    }

    /// Load button mapping from config.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        fn parse_list(names: &[String]) -> Vec<Btn> {
            names.iter().filter_map(|s| Btn::from_name(s)).collect()
        }
        let map = &mut self.action_map;
        let ca = parse_list(&cfg.cancel);
        if !ca.is_empty() { map.cancel = ca; }
        let rs = parse_list(&cfg.restart);
        if !rs.is_empty() { map.restart = rs; }
    }

    pub fn update(&mut self) {
        self.clear_just_pressed();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => self.set_button(btn, true),
                EventType::ButtonReleased(btn, _) => self.set_button(btn, false),
                EventType::AxisChanged(axis, value, _) => self.update_axis(axis, value),
                EventType::Connected => info!("gamepad connected"),
                EventType::Disconnected => {
                    info!("gamepad disconnected");
                    self.release_all();
                }
                _ => {}
            }
        }

        self.apply_stick();
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        // D-pad handled separately (not in Btn enum)
        let dir = match gilrs_btn {
            Button::DPadUp    => Some(MoveDir::Up),
            Button::DPadDown  => Some(MoveDir::Down),
            Button::DPadLeft  => Some(MoveDir::Left),
            Button::DPadRight => Some(MoveDir::Right),
            _ => None,
        };
        if let Some(dir) = dir {
            self.dpad[dir_index(dir)].set_held(held);
            return;
        }

        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.buttons[btn_index(btn)].set_held(held);
        }
    }

    #[cfg(feature = "gamepad")]
    fn update_axis(&mut self, axis: Axis, value: f32) {
        match axis {
            Axis::LeftStickX => self.stick_x = value,
            Axis::LeftStickY => self.stick_y = value,
            _ => {}
        }
    }

    /// Derive stick digital states from the current axis values.
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn apply_stick(&mut self) {
        let (x, y) = (self.stick_x, self.stick_y);
        self.stick[dir_index(MoveDir::Up)].set_held(y > STICK_DEADZONE);
        self.stick[dir_index(MoveDir::Down)].set_held(y < -STICK_DEADZONE);
        self.stick[dir_index(MoveDir::Left)].set_held(x < -STICK_DEADZONE);
        self.stick[dir_index(MoveDir::Right)].set_held(x > STICK_DEADZONE);
    }

    // ── Action queries (config-driven) ──

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[btn_index(b)].just_pressed)
    }

    pub fn cancel_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.cancel)
    }

    pub fn restart_pressed(&self) -> bool {
        self.any_just_pressed(&self.action_map.restart)
    }

    /// Directions freshly pressed this frame (d-pad or stick).
    pub fn fresh_moves(&self) -> Vec<MoveDir> {
        DIRS.iter()
            .copied()
            .filter(|&d| {
                let i = dir_index(d);
                self.dpad[i].just_pressed || self.stick[i].just_pressed
            })
            .collect()
    }

    // ── Internal ──

    fn clear_just_pressed(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            b.just_pressed = false;
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            *b = BtnState::default();
        }
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_edge_only() {
        let mut b = BtnState::default();
        b.set_held(true);
        assert!(b.just_pressed);
        b.just_pressed = false;
        b.set_held(true);
        assert!(!b.just_pressed);
        b.set_held(false);
        b.set_held(true);
        assert!(b.just_pressed);
    }

    #[test]
    fn stick_held_past_deadzone_moves_once() {
        let mut gp = GamepadState::new();
        gp.stick_x = 0.9;
        gp.apply_stick();
        assert_eq!(gp.fresh_moves(), vec![MoveDir::Right]);

        gp.clear_just_pressed();
        gp.stick_x = 0.95;
        gp.apply_stick();
        assert!(gp.fresh_moves().is_empty());

        gp.clear_just_pressed();
        gp.stick_x = 0.0;
        gp.apply_stick();
        gp.stick_x = 0.9;
        gp.apply_stick();
        assert_eq!(gp.fresh_moves(), vec![MoveDir::Right]);
    }

    #[test]
    fn button_names_parse() {
        assert_eq!(Btn::from_name("select"), Some(Btn::Select));
        assert_eq!(Btn::from_name("Back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("LB"), Some(Btn::L1));
        assert_eq!(Btn::from_name("turbo"), None);
    }

    #[test]
    fn config_overrides_mapping() {
        let mut gp = GamepadState::new();
        gp.load_button_config(&GamepadConfig {
            cancel: vec!["B".into()],
            restart: vec!["nonsense".into()],
        });
        assert_eq!(gp.action_map.cancel, vec![Btn::B]);
        // Unparseable lists keep the default
        assert_eq!(gp.action_map.restart, vec![Btn::Start]);
    }
}
