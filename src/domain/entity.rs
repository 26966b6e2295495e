/// Entities: the player position and the move intents that drive it.

/// A grid coordinate. Signed so that a candidate one step past an edge
/// is representable and can be rejected by the bounds check.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    /// The neighbouring cell in `dir`. Never fails; legality is the
    /// movement validator's job.
    pub fn step(self, dir: MoveDir) -> Position {
        let (dx, dy) = dir.delta();
        Position { x: self.x + dx, y: self.y + dy }
    }

    /// Convert to `(col, row)` indices if inside a `width × height` grid.
    pub fn to_cell(self, width: usize, height: usize) -> Option<(usize, usize)> {
        let x = usize::try_from(self.x).ok()?;
        let y = usize::try_from(self.y).ok()?;
        (x < width && y < height).then_some((x, y))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Movement direction: one discrete request per key press.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MoveDir {
    Up,
    Down,
    Left,
    Right,
}

impl MoveDir {
    /// `(dx, dy)` with y growing downward.
    pub fn delta(self) -> (i32, i32) {
        match self {
            MoveDir::Left  => (-1, 0),
            MoveDir::Right => (1, 0),
            MoveDir::Up    => (0, -1),
            MoveDir::Down  => (0, 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_follows_screen_axes() {
        let p = Position::new(3, 3);
        assert_eq!(p.step(MoveDir::Left), Position::new(2, 3));
        assert_eq!(p.step(MoveDir::Right), Position::new(4, 3));
        assert_eq!(p.step(MoveDir::Up), Position::new(3, 2));
        assert_eq!(p.step(MoveDir::Down), Position::new(3, 4));
    }

    #[test]
    fn to_cell_rejects_negative_and_overflow() {
        assert_eq!(Position::new(-1, 0).to_cell(3, 3), None);
        assert_eq!(Position::new(0, -1).to_cell(3, 3), None);
        assert_eq!(Position::new(3, 0).to_cell(3, 3), None);
        assert_eq!(Position::new(0, 3).to_cell(3, 3), None);
        assert_eq!(Position::new(2, 2).to_cell(3, 3), Some((2, 2)));
    }
}
