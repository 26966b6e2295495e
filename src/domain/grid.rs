/// The loaded, queryable form of a level.
///
/// Built once by the level loader and replaced wholesale on level
/// transition. Rows are always `width` tiles long, even when the source
/// level was ragged.

use super::entity::Position;
use super::tile::Tile;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Grid {
    tiles: Vec<Vec<Tile>>,
    width: usize,
    height: usize,
}

impl Grid {
    /// Build from rectangular rows. Short rows are padded with `Wall`.
    pub fn from_tiles(mut tiles: Vec<Vec<Tile>>) -> Self {
        let width = tiles.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut tiles {
            row.resize(width, Tile::Wall);
        }
        let height = tiles.len();
        Grid { tiles, width, height }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Tile at `pos`, or `None` outside the grid.
    pub fn tile_at(&self, pos: Position) -> Option<Tile> {
        let (x, y) = pos.to_cell(self.width, self.height)?;
        self.tiles.get(y).and_then(|row| row.get(x)).copied()
    }

    /// Row-major access for renderers.
    pub fn rows(&self) -> impl Iterator<Item = &[Tile]> {
        self.tiles.iter().map(Vec::as_slice)
    }

    /// Serialize back to level text, writing `S` at `start`.
    pub fn to_rows(&self, start: Position) -> Vec<String> {
        let start_cell = start.to_cell(self.width, self.height);
        self.tiles
            .iter()
            .enumerate()
            .map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .map(|(x, t)| {
                        if start_cell == Some((x, y)) { 'S' } else { t.symbol() }
                    })
                    .collect::<String>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_rows_padded_with_wall() {
        let g = Grid::from_tiles(vec![
            vec![Tile::Empty, Tile::Empty, Tile::Empty],
            vec![Tile::Empty],
        ]);
        assert_eq!(g.width(), 3);
        assert_eq!(g.height(), 2);
        assert_eq!(g.tile_at(Position::new(0, 1)), Some(Tile::Empty));
        assert_eq!(g.tile_at(Position::new(1, 1)), Some(Tile::Wall));
        assert_eq!(g.tile_at(Position::new(2, 1)), Some(Tile::Wall));
    }

    #[test]
    fn tile_at_outside_is_none() {
        let g = Grid::from_tiles(vec![vec![Tile::Empty]]);
        assert_eq!(g.tile_at(Position::new(1, 0)), None);
        assert_eq!(g.tile_at(Position::new(0, -1)), None);
    }

    #[test]
    fn empty_grid_has_no_cells() {
        let g = Grid::from_tiles(vec![]);
        assert_eq!((g.width(), g.height()), (0, 0));
        assert_eq!(g.tile_at(Position::new(0, 0)), None);
    }

    #[test]
    fn to_rows_marks_start() {
        let g = Grid::from_tiles(vec![vec![Tile::Empty, Tile::Obstacle, Tile::Exit]]);
        assert_eq!(g.to_rows(Position::new(0, 0)), vec!["SOE".to_string()]);
    }
}
