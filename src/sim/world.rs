/// GameState: the complete snapshot of a running game.
///
/// Owned by the frame loop and mutated only through `sim::step`.
/// While `phase == Playing` the player is inside the grid and never on
/// a blocking tile.

use crate::domain::entity::Position;
use crate::domain::grid::Grid;
use super::level::LoadedLevel;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    /// Transient: the exit was reached and the next level is being loaded.
    LevelComplete,
    /// Terminal: every level in the catalog is done.
    GameComplete,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GameState {
    // ── Level ──
    pub(super) current_level: usize,
    pub(super) total_levels: usize,
    pub(super) level_name: String,
    pub(super) grid: Grid,
    pub(super) start: Position,
    pub(super) exit: Position,

    // ── Player ──
    pub(super) player: Position,
    pub(super) moves: u32,

    // ── Meta ──
    pub(super) phase: Phase,
}

impl GameState {
    pub(super) fn new(index: usize, total: usize, name: &str, level: LoadedLevel) -> Self {
        GameState {
            current_level: index,
            total_levels: total,
            level_name: name.to_string(),
            grid: level.grid,
            start: level.start,
            exit: level.exit,
            player: level.start,
            moves: 0,
            phase: Phase::Playing,
        }
    }

    /// Swap in a freshly loaded level, keeping nothing from the old one.
    pub(super) fn replace_level(&mut self, index: usize, name: &str, level: LoadedLevel) {
        let total = self.total_levels;
        *self = GameState::new(index, total, name, level);
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn player(&self) -> Position {
        self.player
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn exit(&self) -> Position {
        self.exit
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_level(&self) -> usize {
        self.current_level
    }

    pub fn total_levels(&self) -> usize {
        self.total_levels
    }

    pub fn level_name(&self) -> &str {
        &self.level_name
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }
}
