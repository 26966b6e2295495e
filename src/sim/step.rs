/// The state machine: level start, moves, and level progression.
///
/// Processing order for one move:
///   1. Phase gate (only Playing accepts moves)
///   2. Candidate = player shifted by the direction
///   3. Movement rule (`rules::can_move`)
///   4. Commit position
///   5. Exit check → next level or game complete
///
/// A rejected move changes nothing and emits nothing. It is normal
/// input, not an error. Errors only come from loading level data.

use tracing::{debug, info};

use crate::domain::entity::MoveDir;
use crate::domain::rules;
use crate::error::LevelError;
use super::event::GameEvent;
use super::level::{self, Catalog};
use super::world::{GameState, Phase};

// ══════════════════════════════════════════════════════════════
// Main entry points
// ══════════════════════════════════════════════════════════════

/// Load the first catalog entry and start playing.
pub fn initialize(catalog: &Catalog) -> Result<GameState, LevelError> {
    if catalog.is_empty() {
        return Err(LevelError::EmptyCatalog);
    }
    let def = catalog.get(0)?;
    let loaded = level::load(def)?;
    info!(level = 0, name = %def.name, total = catalog.len(), "game started");
    Ok(GameState::new(0, catalog.len(), &def.name, loaded))
}

pub fn apply_move(
    state: &mut GameState,
    catalog: &Catalog,
    dir: MoveDir,
) -> Result<Vec<GameEvent>, LevelError> {
    if state.phase != Phase::Playing { return Ok(vec![]); }

    let candidate = state.player.step(dir);
    if !rules::can_move(&state.grid, candidate) {
        debug!(?dir, from = %state.player, to = %candidate, "move blocked");
        return Ok(vec![]);
    }

    let mut events = Vec::new();
    state.player = candidate;
    state.moves += 1;
    events.push(GameEvent::PlayerMoved { to: candidate });
    debug!(?dir, to = %candidate, "moved");

    resolve_exit(state, catalog, &mut events)?;
    Ok(events)
}

/// Put the player back at the start of the current level.
pub fn restart_level(state: &mut GameState, catalog: &Catalog) -> Result<(), LevelError> {
    if state.phase != Phase::Playing { return Ok(()); }
    let index = state.current_level;
    let def = catalog.get(index)?;
    let loaded = level::load(def)?;
    state.replace_level(index, &def.name, loaded);
    info!(level = index, "level restarted");
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Exit / progression
// ══════════════════════════════════════════════════════════════

/// If the player stands on the exit, finish the level.
///
/// The next level is loaded into a local value before anything is
/// replaced. On a load error the state stays on the finished level in
/// `LevelComplete`, which accepts no further moves.
fn resolve_exit(
    state: &mut GameState,
    catalog: &Catalog,
    events: &mut Vec<GameEvent>,
) -> Result<(), LevelError> {
    if state.player != state.exit { return Ok(()); }

    let finished = state.current_level;
    state.phase = Phase::LevelComplete;
    events.push(GameEvent::LevelComplete { level: finished });
    info!(level = finished, moves = state.moves, "level complete");

    let next = finished + 1;
    if next < catalog.len() {
        let def = catalog.get(next)?;
        let loaded = level::load(def)?;
        state.replace_level(next, &def.name, loaded);
        events.push(GameEvent::LevelStarted { level: next });
        info!(level = next, name = %def.name, "level started");
    } else {
        state.phase = Phase::GameComplete;
        events.push(GameEvent::GameComplete);
        info!(levels = catalog.len(), "game complete");
    }
    Ok(())
}
