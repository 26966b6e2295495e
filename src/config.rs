/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub log: LogConfig,
    pub gamepad: GamepadConfig,
    pub sound: SoundConfig,
    pub levels_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub frame_ms: u64,
    pub celebrate_ms: u64,          // banner pause after a level / the game
    pub key_hold_timeout_ms: u64,   // release fallback for terminals without key-up
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    pub file: PathBuf,
    pub level: String,
}

#[derive(Clone, Debug)]
pub struct SoundConfig {
    pub music: bool,
    pub music_volume: f32,  // 0.0 ..= 1.0
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub cancel: Vec<String>,
    pub restart: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    log: TomlLog,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    sound: TomlSound,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
    #[serde(default = "default_celebrate_ms")]
    celebrate_ms: u64,
    #[serde(default = "default_key_hold_timeout")]
    key_hold_timeout_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlLog {
    #[serde(default = "default_log_file")]
    file: String,
    #[serde(default = "default_log_level")]
    level: String,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlSound {
    #[serde(default = "default_music")]
    music: bool,
    #[serde(default = "default_music_volume")]
    music_volume: f32,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
}

// ── Defaults ──

fn default_frame_ms() -> u64 { 16 }
fn default_celebrate_ms() -> u64 { 1000 }
fn default_key_hold_timeout() -> u64 { 700 }
fn default_log_file() -> String { "maze-escape.log".into() }
fn default_log_level() -> String { "info".into() }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_restart() -> Vec<String> { vec!["Start".into()] }
fn default_music() -> bool { true }
fn default_music_volume() -> f32 { 0.25 }
fn default_levels_dir() -> String { "levels".into() }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            frame_ms: default_frame_ms(),
            celebrate_ms: default_celebrate_ms(),
            key_hold_timeout_ms: default_key_hold_timeout(),
        }
    }
}

impl Default for TomlLog {
    fn default() -> Self {
        TomlLog {
            file: default_log_file(),
            level: default_log_level(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            cancel: default_cancel(),
            restart: default_restart(),
        }
    }
}

impl Default for TomlSound {
    fn default() -> Self {
        TomlSound {
            music: default_music(),
            music_volume: default_music_volume(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs)
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Resolve levels directory
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if PathBuf::from(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            // Search candidate dirs for the levels folder
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| {
                    // Default: relative to CWD
                    PathBuf::from(levels_dir_str)
                })
        };

        GameConfig {
            timing: TimingConfig {
                frame_ms: toml_cfg.timing.frame_ms.max(1),
                celebrate_ms: toml_cfg.timing.celebrate_ms,
                key_hold_timeout_ms: toml_cfg.timing.key_hold_timeout_ms,
            },
            log: LogConfig {
                file: PathBuf::from(toml_cfg.log.file),
                level: toml_cfg.log.level,
            },
            gamepad: GamepadConfig {
                cancel: toml_cfg.gamepad.cancel,
                restart: toml_cfg.gamepad.restart,
            },
            sound: SoundConfig {
                music: toml_cfg.sound.music,
                music_volume: toml_cfg.sound.music_volume.clamp(0.0, 1.0),
            },
            levels_dir,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::resolve(TomlConfig::default(), &[])
    }
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so an installed link still finds data
        // relative to the real binary.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/maze-escape)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/maze-escape");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory (/usr/share/maze-escape)
    let sys = PathBuf::from("/usr/share/maze-escape");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    // 5. Fallback
    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
///
/// Runs before the log subscriber exists, so problems go to stderr.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => return parse_toml(&text),
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

fn parse_toml(text: &str) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Warning: config.toml parse error: {e}");
            eprintln!("Using default settings.");
            TomlConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.timing.frame_ms, 16);
        assert_eq!(cfg.timing.celebrate_ms, 1000);
        assert_eq!(cfg.timing.key_hold_timeout_ms, 700);
        assert!(cfg.sound.music);
        assert_eq!(cfg.levels_dir, PathBuf::from("levels"));
        assert_eq!(cfg.log.level, "info");
        assert_eq!(cfg.gamepad.cancel, vec!["Select".to_string()]);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let toml_cfg = parse_toml("[timing]\ncelebrate_ms = 250\n");
        let cfg = GameConfig::resolve(toml_cfg, &[]);
        assert_eq!(cfg.timing.celebrate_ms, 250);
        assert_eq!(cfg.timing.frame_ms, 16);
        assert_eq!(cfg.log.file, PathBuf::from("maze-escape.log"));
    }

    #[test]
    fn parse_error_falls_back_to_defaults() {
        let toml_cfg = parse_toml("[timing\nframe_ms = ");
        let cfg = GameConfig::resolve(toml_cfg, &[]);
        assert_eq!(cfg.timing.frame_ms, 16);
    }

    #[test]
    fn zero_frame_ms_clamped() {
        let toml_cfg = parse_toml("[timing]\nframe_ms = 0\n");
        let cfg = GameConfig::resolve(toml_cfg, &[]);
        assert_eq!(cfg.timing.frame_ms, 1);
    }

    #[test]
    fn music_toggle_and_volume_clamp() {
        let toml_cfg = parse_toml("[sound]\nmusic = false\nmusic_volume = 3.5\n");
        let cfg = GameConfig::resolve(toml_cfg, &[]);
        assert!(!cfg.sound.music);
        assert_eq!(cfg.sound.music_volume, 1.0);
    }

    #[test]
    fn absolute_levels_dir_kept() {
        let toml_cfg = parse_toml("[general]\nlevels_dir = \"/opt/mazes\"\n");
        let cfg = GameConfig::resolve(toml_cfg, &[]);
        assert_eq!(cfg.levels_dir, PathBuf::from("/opt/mazes"));
    }
}
