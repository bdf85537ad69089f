// LogLens - core/level.rs
//
// Log level display tags and their per-parse interning registry.
// Core layer: pure data, no I/O.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// =============================================================================
// Colour
// =============================================================================

/// An RGBA colour, persisted as `#rrggbb` (opaque) or `#aarrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const TRANSPARENT: Color = Color {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(
                f,
                "#{:02x}{:02x}{:02x}{:02x}",
                self.a, self.r, self.g, self.b
            )
        }
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("transparent") {
            return Ok(Color::TRANSPARENT);
        }
        let hex = trimmed
            .strip_prefix('#')
            .ok_or_else(|| format!("colour '{s}' must start with '#'"))?;
        if !hex.is_ascii() {
            return Err(format!("colour '{s}' is not hexadecimal"));
        }
        let byte = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| format!("colour '{s}' is not hexadecimal"))
        };
        match hex.len() {
            6 => Ok(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Color {
                a: byte(0)?,
                r: byte(2)?,
                g: byte(4)?,
                b: byte(6)?,
            }),
            _ => Err(format!("colour '{s}' must have 6 or 8 hex digits")),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

// =============================================================================
// Alignment
// =============================================================================

/// Horizontal alignment of the level tag in a gutter or legend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

// =============================================================================
// LogLevel
// =============================================================================

fn default_font_color() -> Color {
    Color::BLACK
}

fn default_background_color() -> Color {
    Color::TRANSPARENT
}

/// Display tag for one severity class, identified by its name.
///
/// Entries share levels through `Arc`; within one parse, equal names always
/// resolve to the same allocation, so `Arc::ptr_eq` is a valid identity test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLevel {
    #[serde(rename = "level_name")]
    name: String,

    #[serde(default = "default_font_color")]
    font_color: Color,

    #[serde(default = "default_background_color")]
    background_color: Color,

    #[serde(default)]
    alignment: Alignment,
}

impl LogLevel {
    /// A level with the default style (black on transparent, centred).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            font_color: default_font_color(),
            background_color: default_background_color(),
            alignment: Alignment::default(),
        }
    }

    pub fn with_style(
        name: impl Into<String>,
        font_color: Color,
        background_color: Color,
        alignment: Alignment,
    ) -> Self {
        Self {
            name: name.into(),
            font_color,
            background_color,
            alignment,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn font_color(&self) -> Color {
        self.font_color
    }

    pub fn background_color(&self) -> Color {
        self.background_color
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Copy of this level's style under another name.
    fn restyled(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..self.clone()
        }
    }
}

// =============================================================================
// Interning
// =============================================================================

/// Per-parse interning map from level name to a shared `LogLevel`.
///
/// Styles come from the profile's level definitions; names the profile does
/// not declare get the default style.
#[derive(Debug, Default)]
pub struct LevelRegistry {
    styles: HashMap<String, LogLevel>,
    interned: HashMap<String, Arc<LogLevel>>,
    order: Vec<Arc<LogLevel>>,
}

impl LevelRegistry {
    pub fn new(definitions: &[LogLevel]) -> Self {
        let styles = definitions
            .iter()
            .map(|level| (level.name.clone(), level.clone()))
            .collect();
        Self {
            styles,
            interned: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Return the session's level for `name`, creating it on first use.
    pub fn get_or_create(&mut self, name: &str) -> Arc<LogLevel> {
        if let Some(level) = self.interned.get(name) {
            return Arc::clone(level);
        }

        let level = Arc::new(match self.styles.get(name) {
            Some(style) => style.restyled(name),
            None => LogLevel::new(name),
        });
        tracing::trace!(level = name, "Interned new log level");
        self.interned.insert(name.to_string(), Arc::clone(&level));
        self.order.push(Arc::clone(&level));
        level
    }

    /// Distinct levels in first-seen order.
    pub fn levels(&self) -> &[Arc<LogLevel>] {
        &self.order
    }

    pub fn into_levels(self) -> Vec<Arc<LogLevel>> {
        self.order
    }
}
