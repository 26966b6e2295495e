/// Movement rule: truth-table driven.
///
/// Pure function of grid + candidate. No knowledge of who is moving,
/// no side effects. Encodes "what is legal" without performing the move.
///
/// ## Movement Truth Table
///
/// Rows are evaluated top to bottom; the first match decides.
/// ┌──────────────────────────┬────────┬──────────────────────────┐
/// │ Condition                 │ Allow? │ Notes                    │
/// ├──────────────────────────┼────────┼──────────────────────────┤
/// │ x < 0 or y < 0            │ DENY   │ before any tile lookup   │
/// │ x >= width or y >= height │ DENY   │ map edge                 │
/// │ tile is Wall              │ DENY   │                          │
/// │ tile is Obstacle          │ DENY   │                          │
/// │ Empty / Start / Exit      │ ALLOW  │                          │
/// └──────────────────────────┴────────┴──────────────────────────┘

use super::entity::Position;
use super::grid::Grid;

/// May the player occupy `candidate`? See truth table above.
pub fn can_move(grid: &Grid, candidate: Position) -> bool {
    if candidate.x < 0 || candidate.y < 0 {
        return false;
    }
    // tile_at re-checks the upper bounds and yields None past them
    match grid.tile_at(candidate) {
        Some(tile) => tile.is_walkable(),
        None => false,
    }
}
