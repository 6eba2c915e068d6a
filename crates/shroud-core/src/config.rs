//! Configuration types and loading for shroud.
//!
//! This module provides TOML configuration file support. Configuration is
//! loaded from `~/.config/shroud/config.toml` and merged with command-line
//! flags into the [`LockConfig`] the session runs with.
//!
//! # Error Handling
//!
//! - If the config file doesn't exist, default values are returned.
//! - If the config file exists but is invalid, an error is returned (fail
//!   fast, before anything is locked).
//!
//! # Example Configuration
//!
//! ```toml
//! [lock]
//! beep = true                 # ring the bell on a failed attempt
//! dpms = false                # switch the monitor off once locked
//! daemonize = true            # fork and return to the caller
//!
//! [appearance]
//! color = "1d1f21"
//! image = "/usr/share/backgrounds/lock.xpm"
//! tiling = true
//! pointer = "invisible"       # invisible, default, win or a cursor name
//!
//! [grab]
//! attempts = 1000
//! retry_delay_ms = 1
//!
//! [auth]
//! service = "shroud"          # PAM service name
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::grab::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};

/// Default PAM service name.
pub const DEFAULT_SERVICE: &str = "shroud";

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A color given as six hex digits.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("color is invalid, color must be given in 6-byte format: rrggbb (got {0:?})")]
pub struct InvalidColor(pub String);

/// A 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `rrggbb`, optionally prefixed with `#`.
    ///
    /// ```
    /// use shroud_core::config::Rgb;
    ///
    /// assert_eq!(Rgb::from_hex("#FF00ff").unwrap(), Rgb::new(255, 0, 255));
    /// assert!(Rgb::from_hex("fff").is_err());
    /// ```
    pub fn from_hex(input: &str) -> Result<Self, InvalidColor> {
        let hex = input.strip_prefix('#').unwrap_or(input);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(InvalidColor(input.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| InvalidColor(input.to_string()))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Pixel value for a 24-bit TrueColor visual.
    pub fn to_pixel(self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

impl FromStr for Rgb {
    type Err = InvalidColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Rgb {
    type Error = InvalidColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Pointer shown over the lock surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum PointerCursor {
    /// An empty cursor.
    Invisible,
    /// The server's default cursor.
    Default,
    /// A cursor from the cursor theme.
    Named(String),
}

impl From<&str> for PointerCursor {
    fn from(value: &str) -> Self {
        match value {
            "" | "invisible" => PointerCursor::Invisible,
            "default" => PointerCursor::Default,
            "win" => PointerCursor::Named("left_ptr".to_string()),
            name => PointerCursor::Named(name.to_string()),
        }
    }
}

impl From<String> for PointerCursor {
    fn from(value: String) -> Self {
        PointerCursor::from(value.as_str())
    }
}

impl std::fmt::Display for PointerCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointerCursor::Invisible => write!(f, "invisible"),
            PointerCursor::Default => write!(f, "default"),
            PointerCursor::Named(name) => write!(f, "{}", name),
        }
    }
}

/// What fills the lock surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background {
    /// A single color.
    SolidColor(Rgb),
    /// An image, drawn once at the origin or tiled; `fill` covers the rest
    /// and transparent pixels.
    Image {
        path: PathBuf,
        tiled: bool,
        fill: Rgb,
    },
}

impl Background {
    /// The color under everything else.
    pub fn fill(&self) -> Rgb {
        match self {
            Background::SolidColor(color) => *color,
            Background::Image { fill, .. } => *fill,
        }
    }
}

/// How the lock surface looks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appearance {
    pub background: Background,
    pub pointer: PointerCursor,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            background: Background::SolidColor(Rgb::WHITE),
            pointer: PointerCursor::Invisible,
        }
    }
}

/// Everything a lock session runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockConfig {
    /// Ring the bell after a failed authentication.
    pub beep: bool,
    /// Force the display into power-save once locked.
    pub dpms: bool,
    /// Fork and let the parent return.
    pub daemonize: bool,
    pub appearance: Appearance,
    pub grab: RetryPolicy,
    /// PAM service name.
    pub service: String,
}

impl Default for LockConfig {
    fn default() -> Self {
        Config::default().resolve(&Overrides::default())
    }
}

/// Main configuration file struct.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Lock behaviour.
    pub lock: LockSection,
    /// Lock surface appearance.
    pub appearance: AppearanceSection,
    /// Grab retry settings.
    pub grab: GrabSection,
    /// Authentication settings.
    pub auth: AuthSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LockSection {
    /// Ring the bell on a failed attempt (default: false).
    pub beep: bool,
    /// Turn the monitor off once locked (default: false).
    pub dpms: bool,
    /// Fork into the background (default: true).
    pub daemonize: bool,
}

impl Default for LockSection {
    fn default() -> Self {
        Self {
            beep: false,
            dpms: false,
            daemonize: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppearanceSection {
    /// Background color (default: white).
    pub color: Rgb,
    /// XPM image shown on the lock surface.
    pub image: Option<PathBuf>,
    /// Tile the image over the screen (default: false).
    pub tiling: bool,
    /// Pointer shown while locked (default: invisible).
    pub pointer: PointerCursor,
}

impl Default for AppearanceSection {
    fn default() -> Self {
        Self {
            color: Rgb::WHITE,
            image: None,
            tiling: false,
            pointer: PointerCursor::Invisible,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GrabSection {
    /// Attempts per device (default: 1000).
    pub attempts: u32,
    /// Pause between attempts in milliseconds (default: 1).
    pub retry_delay_ms: u64,
}

impl Default for GrabSection {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// PAM service name (default: "shroud").
    pub service: String,
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE.to_string(),
        }
    }
}

/// Command-line values that take precedence over the file.
///
/// Switches can only turn features on; unset options keep the file value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub nofork: bool,
    pub beep: bool,
    pub dpms: bool,
    pub image: Option<PathBuf>,
    pub color: Option<Rgb>,
    pub tiling: bool,
    pub pointer: Option<PointerCursor>,
}

impl Config {
    /// Returns the default configuration file path.
    ///
    /// Returns `~/.config/shroud/config.toml` using `dirs::config_dir()`,
    /// or `None` if the config directory cannot be determined.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("shroud").join("config.toml"))
    }

    /// Load configuration from the default path.
    ///
    /// - Returns `Ok(Config::default())` if no config file exists.
    /// - Returns `Err` if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Merge with command-line overrides into the effective settings.
    pub fn resolve(&self, overrides: &Overrides) -> LockConfig {
        let color = overrides.color.unwrap_or(self.appearance.color);
        let tiled = overrides.tiling || self.appearance.tiling;

        let background = match overrides.image.as_ref().or(self.appearance.image.as_ref()) {
            Some(path) => Background::Image {
                path: path.clone(),
                tiled,
                fill: color,
            },
            None => Background::SolidColor(color),
        };

        LockConfig {
            beep: overrides.beep || self.lock.beep,
            dpms: overrides.dpms || self.lock.dpms,
            daemonize: !overrides.nofork && self.lock.daemonize,
            appearance: Appearance {
                background,
                pointer: overrides
                    .pointer
                    .clone()
                    .unwrap_or_else(|| self.appearance.pointer.clone()),
            },
            grab: RetryPolicy::new(
                self.grab.attempts,
                Duration::from_millis(self.grab.retry_delay_ms),
            ),
            service: self.auth.service.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_config_values() {
        let config = LockConfig::default();

        assert!(!config.beep);
        assert!(!config.dpms);
        assert!(config.daemonize);
        assert_eq!(config.appearance.background, Background::SolidColor(Rgb::WHITE));
        assert_eq!(config.appearance.pointer, PointerCursor::Invisible);
        assert_eq!(config.grab, RetryPolicy::default());
        assert_eq!(config.service, "shroud");
    }

    #[test]
    fn load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r##"
[lock]
beep = true
dpms = true
daemonize = false

[appearance]
color = "#1d1f21"
image = "/tmp/lock.xpm"
tiling = true
pointer = "default"

[grab]
attempts = 50
retry_delay_ms = 20

[auth]
service = "login"
"##
        )
        .unwrap();

        let config = Config::load_from(file.path()).expect("Should parse");
        let resolved = config.resolve(&Overrides::default());

        assert!(resolved.beep);
        assert!(resolved.dpms);
        assert!(!resolved.daemonize);
        assert_eq!(
            resolved.appearance.background,
            Background::Image {
                path: PathBuf::from("/tmp/lock.xpm"),
                tiled: true,
                fill: Rgb::new(0x1d, 0x1f, 0x21),
            }
        );
        assert_eq!(resolved.appearance.pointer, PointerCursor::Default);
        assert_eq!(resolved.grab.max_attempts(), 50);
        assert_eq!(resolved.grab.delay(), Duration::from_millis(20));
        assert_eq!(resolved.service, "login");
    }

    #[test]
    fn load_partial_config_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[lock]
beep = true
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).expect("Should parse");
        assert!(config.lock.beep);
        assert!(config.lock.daemonize);
        assert_eq!(config.appearance.color, Rgb::WHITE);
        assert_eq!(config.grab.attempts, 1000);
        assert_eq!(config.auth.service, "shroud");
    }

    #[test]
    fn load_empty_config_returns_defaults() {
        let file = NamedTempFile::new().unwrap();
        let config = Config::load_from(file.path()).expect("Should parse empty file");
        assert_eq!(config.resolve(&Overrides::default()), LockConfig::default());
    }

    #[test]
    fn load_invalid_config_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();

        let result = Config::load_from(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn load_invalid_color_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[appearance]\ncolor = \"purple\"").unwrap();

        let result = Config::load_from(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn load_missing_file_returns_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from(&dir.path().join("missing.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::Io(_)));
    }

    #[test]
    fn overrides_take_precedence() {
        let config = Config::default();
        let overrides = Overrides {
            nofork: true,
            beep: true,
            dpms: true,
            image: Some(PathBuf::from("/tmp/a.xpm")),
            color: Some(Rgb::BLACK),
            tiling: true,
            pointer: Some(PointerCursor::from("win")),
        };

        let resolved = config.resolve(&overrides);
        assert!(resolved.beep);
        assert!(resolved.dpms);
        assert!(!resolved.daemonize);
        assert_eq!(
            resolved.appearance.background,
            Background::Image {
                path: PathBuf::from("/tmp/a.xpm"),
                tiled: true,
                fill: Rgb::BLACK,
            }
        );
        assert_eq!(
            resolved.appearance.pointer,
            PointerCursor::Named("left_ptr".into())
        );
    }

    #[test]
    fn color_parsing() {
        assert_eq!(Rgb::from_hex("ff00ff"), Ok(Rgb::new(255, 0, 255)));
        assert_eq!(Rgb::from_hex("#000000"), Ok(Rgb::BLACK));
        assert_eq!("aBcDeF".parse::<Rgb>(), Ok(Rgb::new(0xab, 0xcd, 0xef)));

        assert!(Rgb::from_hex("").is_err());
        assert!(Rgb::from_hex("#fff").is_err());
        assert!(Rgb::from_hex("ff00ff00").is_err());
        assert!(Rgb::from_hex("gg0000").is_err());
        assert!(Rgb::from_hex("##ff00ff").is_err());
        assert!(Rgb::from_hex("+f00ff").is_err());
    }

    #[test]
    fn color_pixel_and_display() {
        let color = Rgb::new(0x12, 0x34, 0x56);
        assert_eq!(color.to_pixel(), 0x123456);
        assert_eq!(color.to_string(), "123456");
        assert_eq!(
            InvalidColor("nope".into()).to_string(),
            "color is invalid, color must be given in 6-byte format: rrggbb (got \"nope\")"
        );
    }

    #[test]
    fn pointer_names() {
        assert_eq!(PointerCursor::from("default"), PointerCursor::Default);
        assert_eq!(PointerCursor::from("invisible"), PointerCursor::Invisible);
        assert_eq!(
            PointerCursor::from("win"),
            PointerCursor::Named("left_ptr".into())
        );
        assert_eq!(
            PointerCursor::from("crosshair"),
            PointerCursor::Named("crosshair".into())
        );
    }

    #[test]
    fn background_fill() {
        assert_eq!(Background::SolidColor(Rgb::BLACK).fill(), Rgb::BLACK);
        let image = Background::Image {
            path: PathBuf::from("x.xpm"),
            tiled: false,
            fill: Rgb::WHITE,
        };
        assert_eq!(image.fill(), Rgb::WHITE);
    }

    #[test]
    fn default_path_returns_config_dir() {
        if let Some(path) = Config::default_path() {
            assert!(path.ends_with("shroud/config.toml"));
        }
    }
}
