//! Backdrop image for the lock surface.
//!
//! - [`load`]: read an XPM image, treating a missing file as "no image"
//! - [`tile_origins`]: where copies of the image go on the screen
//! - [`Image::color_runs`]: horizontal runs of equal color, ready to fill

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use shroud_core::Rgb;
use tracing::{debug, warn};

pub mod xpm;

pub use xpm::XpmError;

/// Errors that can occur while loading a backdrop.
#[derive(Debug, thiserror::Error)]
pub enum BackdropError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse { path: String, source: XpmError },
}

/// A decoded image; `None` pixels are transparent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u16,
    height: u16,
    pixels: Vec<Option<Rgb>>,
}

/// A horizontal run of pixels of one color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub x: u16,
    pub y: u16,
    pub len: u16,
}

impl Image {
    /// `pixels` holds `width * height` entries, row by row.
    pub fn new(width: u16, height: u16, pixels: Vec<Option<Rgb>>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    /// Opaque pixels grouped by color as horizontal runs.
    pub fn color_runs(&self) -> HashMap<Rgb, Vec<Run>> {
        let mut runs: HashMap<Rgb, Vec<Run>> = HashMap::new();
        if self.width == 0 {
            return runs;
        }

        for (y, row) in self.pixels.chunks(self.width as usize).enumerate() {
            let mut x = 0;
            while x < row.len() {
                let start = x;
                let color = row[x];
                while x < row.len() && row[x] == color {
                    x += 1;
                }
                if let Some(color) = color {
                    runs.entry(color).or_default().push(Run {
                        x: start as u16,
                        y: y as u16,
                        len: (x - start) as u16,
                    });
                }
            }
        }

        runs
    }
}

/// Load a backdrop image.
///
/// Returns `Ok(None)` when the file does not exist so the caller can fall
/// back to the solid color; any other failure is an error.
pub fn load(path: &Path) -> Result<Option<Image>, BackdropError> {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "Image not found, using background color");
            return Ok(None);
        }
        Err(source) => {
            return Err(BackdropError::Io {
                path: path.display().to_string(),
                source,
            })
        }
    };

    let image = xpm::parse(&source).map_err(|source| BackdropError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "Loaded backdrop image"
    );
    Ok(Some(image))
}

/// Top-left corners of every copy of a `tile` sized image on a `screen`.
///
/// Untiled images are drawn once at the origin. Tiled images cover the
/// screen with `ceil(H / h)` rows and `ceil(W / w)` columns.
pub fn tile_origins(screen: (u16, u16), tile: (u16, u16), tiled: bool) -> Vec<(i16, i16)> {
    let (screen_w, screen_h) = screen;
    let (tile_w, tile_h) = tile;

    if tile_w == 0 || tile_h == 0 {
        return Vec::new();
    }
    if !tiled {
        return vec![(0, 0)];
    }

    let rows = screen_h.div_ceil(tile_h);
    let cols = screen_w.div_ceil(tile_w);
    let coord = |i: u16, size: u16| i16::try_from(u32::from(i) * u32::from(size)).unwrap_or(i16::MAX);

    let mut origins = Vec::with_capacity(rows as usize * cols as usize);
    for row in 0..rows {
        for col in 0..cols {
            origins.push((coord(col, tile_w), coord(row, tile_h)));
        }
    }
    origins
}
