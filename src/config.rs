//! Configuration and color scheme management for vconsole.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.vconsole/config.toml`
//! - Built-in color schemes used for the stylesheet and terminal output
//! - The xterm 256-color palette
//!
//! # Configuration File
//!
//! ```toml
//! # ANSI handling: on, off, strip
//! ansi_mode = "on"
//!
//! # Lines kept before the oldest are trimmed (0 = unlimited)
//! max_output_lines = 1000
//!
//! # Capture written text for screen readers
//! screen_reader = false
//!
//! # Only render the trailing window of long output
//! limit_visible = false
//! visible_window_lines = 500
//!
//! # Longest unfinished escape sequence carried between chunks
//! max_pending_escape = 1024
//!
//! # Color scheme: default, solarized-dark, solarized-light,
//! #               monokai, nord, dracula, gruvbox-dark, tokyo-night
//! color_scheme = "default"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::console::{AnsiMode, ConsolePrefs};
use crate::core::term::DEFAULT_MAX_PENDING;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config {}: {}", .path.display(), .source)]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine home directory")]
    NoHomeDir,
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ansi_mode: AnsiMode,
    /// Lines kept before trimming; 0 means unlimited
    pub max_output_lines: usize,
    pub screen_reader: bool,
    pub limit_visible: bool,
    pub visible_window_lines: usize,
    pub max_pending_escape: usize,
    /// Color scheme name
    pub color_scheme: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ansi_mode: AnsiMode::On,
            max_output_lines: 1000,
            screen_reader: false,
            limit_visible: false,
            visible_window_lines: 500,
            max_pending_escape: DEFAULT_MAX_PENDING,
            color_scheme: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                match Self::load_from(&path) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("{}; using defaults", e),
                }
            }
        }
        Self::default()
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path().ok_or(ConfigError::NoHomeDir)?;
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content).map_err(|source| ConfigError::Write { path, source })
    }

    /// Get config file path
    fn config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Output line limit, `None` when unlimited
    pub fn output_line_limit(&self) -> Option<usize> {
        match self.max_output_lines {
            0 => None,
            n => Some(n),
        }
    }

    pub fn console_prefs(&self) -> ConsolePrefs {
        ConsolePrefs {
            ansi_mode: self.ansi_mode,
            screen_reader: self.screen_reader,
            max_pending_escape: self.max_pending_escape,
        }
    }

    /// Get the color scheme
    pub fn get_color_scheme(&self) -> ColorScheme {
        ColorScheme::by_name(&self.color_scheme)
    }
}

/// `~/.vconsole`, created on first use
pub fn config_dir() -> Option<PathBuf> {
    let dir = home_dir()?.join(".vconsole");
    if !dir.exists() {
        let _ = fs::create_dir_all(&dir);
    }
    Some(dir)
}

/// Color definition (RGB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to crossterm Color
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        crossterm::style::Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }

    /// CSS hex notation
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Color scheme definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub name: String,
    pub foreground: Color,
    pub background: Color,
    /// The 16 base ANSI colors, normal then bright
    pub ansi: [Color; 16],
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_scheme()
    }
}

const SOLARIZED_ANSI: [Color; 16] = [
    Color::new(7, 54, 66),
    Color::new(220, 50, 47),
    Color::new(133, 153, 0),
    Color::new(181, 137, 0),
    Color::new(38, 139, 210),
    Color::new(211, 54, 130),
    Color::new(42, 161, 152),
    Color::new(238, 232, 213),
    Color::new(0, 43, 54),
    Color::new(203, 75, 22),
    Color::new(88, 110, 117),
    Color::new(101, 123, 131),
    Color::new(131, 148, 150),
    Color::new(108, 113, 196),
    Color::new(147, 161, 161),
    Color::new(253, 246, 227),
];

impl ColorScheme {
    /// Default color scheme (xterm palette)
    pub fn default_scheme() -> Self {
        Self {
            name: "default".to_string(),
            foreground: Color::new(229, 229, 229),
            background: Color::new(0, 0, 0),
            ansi: [
                Color::new(0, 0, 0),
                Color::new(205, 0, 0),
                Color::new(0, 205, 0),
                Color::new(205, 205, 0),
                Color::new(0, 0, 238),
                Color::new(205, 0, 205),
                Color::new(0, 205, 205),
                Color::new(229, 229, 229),
                Color::new(127, 127, 127),
                Color::new(255, 0, 0),
                Color::new(0, 255, 0),
                Color::new(255, 255, 0),
                Color::new(92, 92, 255),
                Color::new(255, 0, 255),
                Color::new(0, 255, 255),
                Color::new(255, 255, 255),
            ],
        }
    }

    /// Solarized Dark scheme
    pub fn solarized_dark() -> Self {
        Self {
            name: "solarized-dark".to_string(),
            foreground: Color::new(131, 148, 150),
            background: Color::new(0, 43, 54),
            ansi: SOLARIZED_ANSI,
        }
    }

    /// Solarized Light scheme
    pub fn solarized_light() -> Self {
        Self {
            name: "solarized-light".to_string(),
            foreground: Color::new(101, 123, 131),
            background: Color::new(253, 246, 227),
            ansi: SOLARIZED_ANSI,
        }
    }

    /// Monokai scheme
    pub fn monokai() -> Self {
        Self {
            name: "monokai".to_string(),
            foreground: Color::new(248, 248, 242),
            background: Color::new(39, 40, 34),
            ansi: [
                Color::new(39, 40, 34),
                Color::new(249, 38, 114),
                Color::new(166, 226, 46),
                Color::new(244, 191, 117),
                Color::new(102, 217, 239),
                Color::new(174, 129, 255),
                Color::new(161, 239, 228),
                Color::new(248, 248, 242),
                Color::new(117, 113, 94),
                Color::new(249, 38, 114),
                Color::new(166, 226, 46),
                Color::new(244, 191, 117),
                Color::new(102, 217, 239),
                Color::new(174, 129, 255),
                Color::new(161, 239, 228),
                Color::new(249, 248, 245),
            ],
        }
    }

    /// Nord scheme
    pub fn nord() -> Self {
        Self {
            name: "nord".to_string(),
            foreground: Color::new(216, 222, 233),
            background: Color::new(46, 52, 64),
            ansi: [
                Color::new(59, 66, 82),
                Color::new(191, 97, 106),
                Color::new(163, 190, 140),
                Color::new(235, 203, 139),
                Color::new(129, 161, 193),
                Color::new(180, 142, 173),
                Color::new(136, 192, 208),
                Color::new(229, 233, 240),
                Color::new(76, 86, 106),
                Color::new(191, 97, 106),
                Color::new(163, 190, 140),
                Color::new(235, 203, 139),
                Color::new(129, 161, 193),
                Color::new(180, 142, 173),
                Color::new(143, 188, 187),
                Color::new(236, 239, 244),
            ],
        }
    }

    /// Dracula scheme
    pub fn dracula() -> Self {
        Self {
            name: "dracula".to_string(),
            foreground: Color::new(248, 248, 242),
            background: Color::new(40, 42, 54),
            ansi: [
                Color::new(33, 34, 44),
                Color::new(255, 85, 85),
                Color::new(80, 250, 123),
                Color::new(241, 250, 140),
                Color::new(189, 147, 249),
                Color::new(255, 121, 198),
                Color::new(139, 233, 253),
                Color::new(248, 248, 242),
                Color::new(98, 114, 164),
                Color::new(255, 110, 110),
                Color::new(105, 255, 148),
                Color::new(255, 255, 165),
                Color::new(214, 172, 255),
                Color::new(255, 146, 223),
                Color::new(164, 255, 255),
                Color::new(255, 255, 255),
            ],
        }
    }

    /// Gruvbox Dark scheme
    pub fn gruvbox_dark() -> Self {
        Self {
            name: "gruvbox-dark".to_string(),
            foreground: Color::new(235, 219, 178),
            background: Color::new(40, 40, 40),
            ansi: [
                Color::new(40, 40, 40),
                Color::new(204, 36, 29),
                Color::new(152, 151, 26),
                Color::new(215, 153, 33),
                Color::new(69, 133, 136),
                Color::new(177, 98, 134),
                Color::new(104, 157, 106),
                Color::new(168, 153, 132),
                Color::new(146, 131, 116),
                Color::new(251, 73, 52),
                Color::new(184, 187, 38),
                Color::new(250, 189, 47),
                Color::new(131, 165, 152),
                Color::new(211, 134, 155),
                Color::new(142, 192, 124),
                Color::new(235, 219, 178),
            ],
        }
    }

    /// Tokyo Night scheme
    pub fn tokyo_night() -> Self {
        Self {
            name: "tokyo-night".to_string(),
            foreground: Color::new(192, 202, 245),
            background: Color::new(26, 27, 38),
            ansi: [
                Color::new(21, 22, 30),
                Color::new(247, 118, 142),
                Color::new(158, 206, 106),
                Color::new(224, 175, 104),
                Color::new(122, 162, 247),
                Color::new(187, 154, 247),
                Color::new(125, 207, 255),
                Color::new(169, 177, 214),
                Color::new(65, 72, 104),
                Color::new(247, 118, 142),
                Color::new(158, 206, 106),
                Color::new(224, 175, 104),
                Color::new(122, 162, 247),
                Color::new(187, 154, 247),
                Color::new(125, 207, 255),
                Color::new(192, 202, 245),
            ],
        }
    }

    /// Get scheme by name
    pub fn by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "solarized-dark" | "solarized_dark" => Self::solarized_dark(),
            "solarized-light" | "solarized_light" => Self::solarized_light(),
            "monokai" => Self::monokai(),
            "nord" => Self::nord(),
            "dracula" => Self::dracula(),
            "gruvbox-dark" | "gruvbox_dark" | "gruvbox" => Self::gruvbox_dark(),
            "tokyo-night" | "tokyo_night" | "tokyonight" => Self::tokyo_night(),
            _ => Self::default_scheme(),
        }
    }

    /// List available schemes
    pub fn list() -> Vec<&'static str> {
        vec![
            "default",
            "solarized-dark",
            "solarized-light",
            "monokai",
            "nord",
            "dracula",
            "gruvbox-dark",
            "tokyo-night",
        ]
    }

    /// Resolve an xterm 256-color index.
    ///
    /// 0-15 come from the scheme, 16-231 are the 6x6x6 cube and 232-255
    /// the gray ramp.
    pub fn xterm_color(&self, index: u8) -> Color {
        const LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];
        match index {
            0..=15 => self.ansi[index as usize],
            16..=231 => {
                let i = index - 16;
                Color::new(
                    LEVELS[(i / 36) as usize],
                    LEVELS[((i / 6) % 6) as usize],
                    LEVELS[(i % 6) as usize],
                )
            }
            _ => {
                let level = 8 + 10 * (index - 232);
                Color::new(level, level, level)
            }
        }
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
