/// Level catalog and loader.
///
/// ## Sources (priority order):
///   1. `levels/` directory (individual `.txt` files, sorted by filename)
///   2. Built-in embedded levels
///
/// ## Single-level format (`.txt`):
///   Optional line 1: `# Level Name`
///   Remaining lines: map rows
///
/// ## Tile legend:
///   '#' = Wall        'O' = Obstacle
///   'S' = Start       'E' = Exit
///   ' ' = Empty
///
/// ## Loader policy:
///   - Width is the longest row; cells missing from shorter rows are Wall.
///   - Duplicate `S` / `E`: the last one in row-major order wins, the
///     others are erased to Empty.
///   - Characters outside the legend load as Empty.

use std::path::Path;

use tracing::{debug, info, trace, warn};

use crate::config::GameConfig;
use crate::domain::entity::Position;
use crate::domain::grid::Grid;
use crate::domain::tile::Tile;
use crate::error::LevelError;

/// Level definition as authored: a name and its text rows.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<String>,
}

/// Result of loading a definition.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LoadedLevel {
    pub grid: Grid,
    pub start: Position,
    pub exit: Position,
}

// ══════════════════════════════════════════════════════════════
// Catalog
// ══════════════════════════════════════════════════════════════

/// Ordered, immutable sequence of levels.
#[derive(Clone, Debug)]
pub struct Catalog {
    levels: Vec<LevelDef>,
}

impl Catalog {
    pub fn new(levels: Vec<LevelDef>) -> Self {
        Catalog { levels }
    }

    pub fn embedded() -> Self {
        Catalog::new(embedded_levels())
    }

    /// All `.txt` levels in `dir`, sorted by filename.
    /// Unreadable or empty files are skipped.
    pub fn from_dir(dir: &Path) -> Self {
        let mut levels = load_from_directory(dir);
        levels.sort_by(|a, b| a.0.cmp(&b.0));
        Catalog::new(levels.into_iter().map(|(_, def)| def).collect())
    }

    /// The configured levels directory when it holds any level,
    /// otherwise the embedded levels.
    pub fn from_config(config: &GameConfig) -> Self {
        let dir = &config.levels_dir;
        if dir.is_dir() {
            let catalog = Catalog::from_dir(dir);
            if !catalog.is_empty() {
                info!(dir = %dir.display(), levels = ?catalog.names().collect::<Vec<_>>(), "using level directory");
                return catalog;
            }
            warn!(dir = %dir.display(), "level directory has no levels, using built-in set");
        }
        let catalog = Catalog::embedded();
        info!(levels = catalog.len(), "using built-in levels");
        catalog
    }

    pub fn get(&self, index: usize) -> Result<&LevelDef, LevelError> {
        self.levels.get(index).ok_or(LevelError::IndexOutOfRange {
            index,
            len: self.levels.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.levels.iter().map(|l| l.name.as_str())
    }
}

// ══════════════════════════════════════════════════════════════
// Loader
// ══════════════════════════════════════════════════════════════

/// Parse a definition into a grid plus start/exit coordinates.
pub fn load(def: &LevelDef) -> Result<LoadedLevel, LevelError> {
    let mut tiles: Vec<Vec<Tile>> = Vec::with_capacity(def.rows.len());
    let mut starts: Vec<Position> = vec![];
    let mut exits: Vec<Position> = vec![];

    for (y, row) in def.rows.iter().enumerate() {
        let mut line = Vec::with_capacity(row.len());
        for (x, ch) in row.chars().enumerate() {
            let pos = Position::new(x as i32, y as i32);
            let tile = match Tile::from_symbol(ch) {
                Some(Tile::Start) => {
                    starts.push(pos);
                    Tile::Empty
                }
                Some(Tile::Exit) => {
                    exits.push(pos);
                    Tile::Exit
                }
                Some(t) => t,
                None => {
                    warn!(level = %def.name, %pos, symbol = ?ch, "unknown tile symbol, treating as empty");
                    Tile::Empty
                }
            };
            line.push(tile);
        }
        tiles.push(line);
    }

    let start = *starts.last().ok_or_else(|| LevelError::MissingStart {
        level: def.name.clone(),
    })?;
    let exit = *exits.last().ok_or_else(|| LevelError::MissingExit {
        level: def.name.clone(),
    })?;

    if starts.len() > 1 {
        warn!(level = %def.name, count = starts.len(), chosen = %start, "duplicate start markers");
    }
    if exits.len() > 1 {
        warn!(level = %def.name, count = exits.len(), chosen = %exit, "duplicate exit markers");
        for stale in &exits[..exits.len() - 1] {
            if let Some(cell) = tiles
                .get_mut(stale.y as usize)
                .and_then(|row| row.get_mut(stale.x as usize))
            {
                *cell = Tile::Empty;
            }
        }
    }

    let grid = Grid::from_tiles(tiles);
    debug!(level = %def.name, width = grid.width(), height = grid.height(), %start, %exit, "level parsed");
    trace!(level = %def.name, rows = ?grid.to_rows(start), "layout");
    Ok(LoadedLevel { grid, start, exit })
}

// ══════════════════════════════════════════════════════════════
// Single-level file parsing
// ══════════════════════════════════════════════════════════════

/// Parse a single level from text content. `None` if it has no rows.
fn parse_level_file(content: &str, fallback_name: &str) -> Option<LevelDef> {
    let mut lines = content.lines().peekable();
    let mut name = String::new();

    if let Some(first) = lines.peek() {
        if is_name_line(first) {
            name = first[1..].trim().to_string();
            lines.next();
        }
    }

    let mut rows: Vec<String> = lines.map(str::to_string).collect();
    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }

    if rows.is_empty() {
        return None;
    }

    if name.is_empty() {
        name = fallback_name.to_string();
    }

    Some(LevelDef { name, rows })
}

/// Distinguish `# Level Name` from `#S    #    E#` (level data).
/// A name line starts with `#` and contains a character outside the
/// tile legend.
fn is_name_line(line: &str) -> bool {
    line.starts_with('#') && line.chars().any(|c| Tile::from_symbol(c).is_none())
}

// ══════════════════════════════════════════════════════════════
// Directory loading (individual .txt files)
// ══════════════════════════════════════════════════════════════

fn load_from_directory(dir: &Path) -> Vec<(String, LevelDef)> {
    let mut results = vec![];

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "could not read level directory");
            return results;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().map_or(false, |e| e == "txt") {
            let filename = path.file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            let stem = path.file_stem()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();
            match std::fs::read_to_string(&path) {
                Ok(content) => match parse_level_file(&content, &stem) {
                    Some(def) => results.push((filename, def)),
                    None => warn!(file = %path.display(), "level file has no rows, skipped"),
                },
                Err(e) => warn!(file = %path.display(), error = %e, "could not read level file"),
            }
        }
    }

    results
}

// ══════════════════════════════════════════════════════════════
// Embedded levels
// ══════════════════════════════════════════════════════════════

fn embedded_levels() -> Vec<LevelDef> {
    vec![
        make_embedded("Level 1 - Hawkins Lab", &[
            "#################",
            "#S     #      E#",
            "# ####  # O ## #",
            "# O     #      #",
            "### ######## # #",
            "#   # O   #    #",
            "## ## ### # ####",
            "#              #",
            "### ### ##### ###",
            "#     O   #    #",
            "#################",
        ]),
        make_embedded("Level 2 - Mirkwood", &[
            "#################",
            "#S #       #   E#",
            "# ## ### O### # #",
            "#   O      #    #",
            "### ######## ## #",
            "#   #   O       #",
            "## ## ### O######",
            "#       O      #",
            "###O### ##### ###",
            "#               #",
            "#################",
        ]),
        make_embedded("Level 3 - The Upside Down", &[
            "#################",
            "#S    #   O    #",
            "## # ## O ###  #",
            "#        #  # O#",
            "#### ###O####  #",
            "#       O      #",
            "# O### ### ######",
            "#   #  O     E #",
            "## ##  ### ### #",
            "#              #",
            "#################",
        ]),
        make_embedded("Level 4 - Starcourt Mall", &[
            "################",
            "#S     #     O #",
            "# ###  # ##  ###",
            "# # O  #   ##  #",
            "# # ### ########",
            "#     O       E#",
            "# ###O##### ####",
            "#        O   # #",
            "## # ### ### ## #",
            "#     O        #",
            "################",
        ]),
        make_embedded("Level 5 - The Gate", &[
            "################",
            "#S    #O     # #",
            "# ## ### ### # #",
            "#        O      #",
            "##O### ### # # #",
            "#   O       #  #",
            "## #######O###E#",
            "#      O   #   #",
            "# ## ###   ## ##",
            "# O      O     #",
            "################",
        ]),
    ]
}

fn make_embedded(name: &str, map: &[&str]) -> LevelDef {
    LevelDef {
        name: name.to_string(),
        rows: map.iter().map(|s| s.to_string()).collect(),
    }
}
