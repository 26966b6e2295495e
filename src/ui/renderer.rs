/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// This eliminates flicker caused by full-screen redraws.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use tracing::{debug, info};

use crate::domain::entity::Position;
use crate::domain::tile::Tile;
use crate::sim::world::{GameState, Phase};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the
    /// gap between rows matches the cell color on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 18, g: 14, b: 24 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn invalidate(&mut self) {
        self.cells.fill(Cell::INVALID);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y) with given colors. Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (cx, ch) in (x..self.width).zip(s.chars()) {
            self.set(cx, y, Cell::new(ch, fg, bg));
        }
    }

    /// Fill a whole row with `bg`, then write `s` from column 0.
    fn put_bar(&mut self, y: usize, s: &str, fg: Color, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', fg, bg));
        }
        self.put_str(0, y, s, fg, bg);
    }
}

// ── Overlay: presentation-only state drawn over the maze ──

/// What the frame loop wants shown on top of the current level.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Overlay {
    None,
    /// Shown for the celebration pause after finishing `level`.
    LevelCleared { level: usize, moves: u32 },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Screen {
    Game,
    Cleared,
    Complete,
    TooSmall,
}

// ── Renderer ──

/// Each grid cell is drawn two terminal columns wide so tiles look square.
const CELL_W: usize = 2;

/// Vertical offsets
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 60, g: 10, b: 20 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const TITLE_RED: Color = Color::Rgb { r: 230, g: 40, b: 40 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_screen: Option<Screen>,
    enhanced_keys: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_screen: None,
            enhanced_keys: false,
        }
    }

    /// Enter raw mode and the alternate screen.
    ///
    /// Returns whether the terminal will report key Release events.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        self.enhanced_keys = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if self.enhanced_keys {
            execute!(self.writer, PushKeyboardEnhancementFlags(key_flags()))?;
        }
        info!(enhanced_keys = self.enhanced_keys, "terminal initialised");

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame: back ≠ front for every cell.
        self.back.invalidate();

        Ok(self.enhanced_keys)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced_keys {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, state: &GameState, overlay: &Overlay, message: &str) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.invalidate();
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            debug!(width = self.term_w, height = self.term_h, "terminal resized");
        }

        let screen = self.pick_screen(state, overlay);

        // Detect screen change → clear for clean transition
        if self.last_screen != Some(screen) {
            self.back.invalidate();
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_screen = Some(screen);
        }

        self.front.clear();
        match screen {
            Screen::Game => self.compose_game(state, message),
            Screen::Cleared => {
                self.compose_game(state, message);
                if let Overlay::LevelCleared { level, moves } = overlay {
                    self.compose_cleared_banner(state, *level, *moves);
                }
            }
            Screen::Complete => self.compose_game_complete(state),
            Screen::TooSmall => self.compose_too_small(state),
        }

        self.flush_diff()?;

        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);

        Ok(())
    }

    fn required_size(state: &GameState) -> (usize, usize) {
        let grid = state.grid();
        (grid.width() * CELL_W, MAP_ROW + grid.height() + 4)
    }

    fn pick_screen(&self, state: &GameState, overlay: &Overlay) -> Screen {
        if state.phase() == Phase::GameComplete {
            return Screen::Complete;
        }
        let (need_w, need_h) = Self::required_size(state);
        if self.term_w < need_w || self.term_h < need_h {
            return Screen::TooSmall;
        }
        match overlay {
            Overlay::None => Screen::Game,
            Overlay::LevelCleared { .. } => Screen::Cleared,
        }
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Set explicit base colors at start of frame.
        // Do NOT use ResetColor here: it resets to the terminal's native
        // default, which may differ from BASE_BG.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }

                // Position cursor unless the previous print left it here
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }

                // Set colors only if changed
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, state: &GameState, message: &str) {
        let grid = state.grid();

        // ── HUD row ──
        let hud = format!(
            " Level {}/{}  {}   Moves: {} ",
            state.current_level() + 1,
            state.total_levels(),
            state.level_name(),
            state.moves(),
        );
        self.front.put_bar(HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Map ──
        for (gy, row) in grid.rows().enumerate() {
            for (gx, &tile) in row.iter().enumerate() {
                let here = Position::new(gx as i32, gy as i32);
                let [left, right] = if here == state.player() {
                    player_cells()
                } else if here == state.exit() {
                    tile_cells(Tile::Exit)
                } else if here == state.start() {
                    start_cells()
                } else {
                    tile_cells(tile)
                };
                let col = gx * CELL_W;
                self.front.set(col, MAP_ROW + gy, left);
                self.front.set(col + 1, MAP_ROW + gy, right);
            }
        }

        // ── Message bar ──
        let msg_row = MAP_ROW + grid.height() + 1;
        if !message.is_empty() {
            self.front.put_bar(msg_row, &format!(" {message} "), Color::Black, MSG_BG);
        }

        // ── Help bar ──
        let help_row = MAP_ROW + grid.height() + 3;
        let help = " Arrows/WASD:Move  R:Restart  Q/Esc:Quit  │  Pad: D-pad  Start:Restart  Select:Quit";
        self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
    }

    fn compose_cleared_banner(&mut self, state: &GameState, level: usize, moves: u32) {
        let title = format!("  LEVEL {} ESCAPED  ", level + 1);
        let detail = format!("  {} moves  ", moves);
        let next = format!("  Next: {}  ", state.level_name());
        let box_w = banner_width(&[&title, &detail, &next]);

        let map_w = state.grid().width() * CELL_W;
        let x = map_w.saturating_sub(box_w) / 2;
        let y = MAP_ROW + state.grid().height().saturating_sub(3) / 2;

        for (i, line) in [&title, &detail, &next].iter().enumerate() {
            let padded = format!("{:^width$}", line, width = box_w);
            let fg = if i == 0 { Color::Rgb { r: 255, g: 220, b: 50 } } else { Color::White };
            self.front.put_str(x, y + i, &padded, fg, HUD_BG);
        }
    }

    fn compose_game_complete(&mut self, state: &GameState) {
        let box_art = [
            "╔══════════════════════════════════════╗",
            "║   ★  YOU ESCAPED THE UPSIDE DOWN  ★  ║",
            "╚══════════════════════════════════════╝",
        ];
        for (i, l) in box_art.iter().enumerate() {
            self.front.put_str(4, 4 + i, l, TITLE_RED, Color::Reset);
        }
        let levels = format!("◈ All {} levels cleared!", state.total_levels());
        self.front.put_str(6, 9, &levels, Color::Rgb { r: 80, g: 255, b: 80 }, Color::Reset);
    }

    fn compose_too_small(&mut self, state: &GameState) {
        let (need_w, need_h) = Self::required_size(state);
        let msg = format!("Terminal too small: need {}x{}, have {}x{}", need_w, need_h, self.term_w, self.term_h);
        self.front.put_str(0, 0, &msg, Color::Yellow, Color::Reset);
        self.front.put_str(0, 1, "Resize the window or press Q to quit.", Color::DarkGrey, Color::Reset);
    }
}

/// Widest line in terminal columns (one per char).
fn banner_width(lines: &[&str]) -> usize {
    lines.iter().map(|l| l.chars().count()).max().unwrap_or(0)
}

/// Keyboard protocol flags. Text keys (WASD) only report Release when
/// they are sent as escape codes too.
fn key_flags() -> KeyboardEnhancementFlags {
    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
        | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
}

/// Two terminal cells for one maze tile.
fn tile_cells(tile: Tile) -> [Cell; 2] {
    let (ch, fg, bg) = match tile {
        Tile::Wall => ('█', Color::Rgb { r: 90, g: 80, b: 110 }, Color::Reset),
        Tile::Obstacle => ('▒', Color::Rgb { r: 200, g: 40, b: 40 }, Color::Reset),
        Tile::Exit => ('▞', Color::Rgb { r: 80, g: 255, b: 120 }, Color::Rgb { r: 10, g: 60, b: 30 }),
        Tile::Empty | Tile::Start => (' ', Color::White, Color::Reset),
    };
    [Cell::new(ch, fg, bg), Cell::new(ch, fg, bg)]
}

fn start_cells() -> [Cell; 2] {
    let fg = Color::Rgb { r: 70, g: 60, b: 90 };
    [Cell::new('·', fg, Color::Reset), Cell::new(' ', fg, Color::Reset)]
}

fn player_cells() -> [Cell; 2] {
    let fg = Color::Rgb { r: 255, g: 220, b: 50 };
    [Cell::new('(', fg, Color::Reset), Cell::new(')', fg, Color::Reset)]
}
