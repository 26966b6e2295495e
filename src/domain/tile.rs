/// Tile types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tile {
    Wall,     // '#'
    Empty,    // ' '
    Start,    // 'S', only seen while parsing, stored as Empty
    Exit,     // 'E'
    Obstacle, // 'O'
}

impl Tile {
    /// Classify a level symbol. `None` for characters outside the alphabet.
    pub fn from_symbol(c: char) -> Option<Tile> {
        match c {
            '#' => Some(Tile::Wall),
            ' ' => Some(Tile::Empty),
            'S' => Some(Tile::Start),
            'E' => Some(Tile::Exit),
            'O' => Some(Tile::Obstacle),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Tile::Wall => '#',
            Tile::Empty => ' ',
            Tile::Start => 'S',
            Tile::Exit => 'E',
            Tile::Obstacle => 'O',
        }
    }

    /// Does this tile stop the player from entering?
    pub fn is_blocking(self) -> bool {
        matches!(self, Tile::Wall | Tile::Obstacle)
    }

    /// Can the player occupy this cell?
    pub fn is_walkable(self) -> bool {
        !self.is_blocking()
    }
}
