//! X11 display backend.
//!
//! [`X11Display`] owns the connection to the X server and implements the
//! three display traits the lock session drives:
//!
//! - [`InputGrabber`](shroud_core::InputGrabber): pointer and keyboard grabs on the root window
//! - [`LockSurface`](shroud_core::LockSurface): override-redirect window covering the screen
//! - [`InputSource`](shroud_core::InputSource): blocking event reads, key presses translated
//!   through the server's keyboard mapping
//!
//! Dropping the display ungrabs both devices and destroys the window, so the
//! server is released on every exit path.

mod cursor;
mod grab;
mod input;
mod surface;

use std::collections::HashMap;

use shroud_core::keymap::KeyboardMap;
use shroud_core::traits::SurfaceError;
use shroud_core::{Appearance, Background, LockError, Rgb};
use tracing::{debug, info};
use x11rb::connection::Connection;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::xproto::{ConnectionExt as _, Pixmap, Window};
use x11rb::rust_connection::RustConnection;

use crate::backdrop::{self, BackdropError};

/// Errors from the X server connection.
#[derive(Debug, thiserror::Error)]
pub enum X11Error {
    #[error("failed to connect to X server: {0}")]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Reply(#[from] ReplyError),

    #[error(transparent)]
    ReplyOrId(#[from] ReplyOrIdError),

    #[error("X server has no screen {0}")]
    NoScreen(usize),

    #[error(transparent)]
    Backdrop(#[from] BackdropError),
}

impl From<X11Error> for LockError {
    /// Backdrop problems are surface errors; everything else means the
    /// display itself is unusable.
    fn from(error: X11Error) -> Self {
        match error {
            X11Error::Backdrop(e) => LockError::Surface(SurfaceError::Backdrop(e.to_string())),
            other => LockError::Display(other.to_string()),
        }
    }
}

/// A connection to the X server and the resources of one lock.
pub struct X11Display {
    conn: RustConnection,
    screen_num: usize,
    root: Window,
    root_depth: u8,
    width: u16,
    height: u16,
    colormap: u32,
    keymap: KeyboardMap,
    /// Pointer cursor for the grab and the window, `x11rb::NONE` for the default.
    cursor: u32,
    /// Screen-sized backdrop, if an image was loaded.
    backdrop: Option<Pixmap>,
    window: Option<Window>,
    pixels: HashMap<Rgb, u32>,
}

impl X11Display {
    /// Connect to the display named by `$DISPLAY`.
    pub fn open() -> Result<Self, X11Error> {
        let (conn, screen_num) = x11rb::connect(None)?;

        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or(X11Error::NoScreen(screen_num))?;
        let root = screen.root;
        let root_depth = screen.root_depth;
        let width = screen.width_in_pixels;
        let height = screen.height_in_pixels;
        let colormap = screen.default_colormap;

        let keymap = input::load_keyboard_map(&conn)?;

        info!(screen = screen_num, width, height, "Connected to X server");

        Ok(Self {
            conn,
            screen_num,
            root,
            root_depth,
            width,
            height,
            colormap,
            keymap,
            cursor: x11rb::NONE,
            backdrop: None,
            window: None,
            pixels: HashMap::new(),
        })
    }

    /// Screen size in pixels.
    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Create the pointer cursor and render the backdrop image.
    ///
    /// Must run before the session starts: the cursor is part of the pointer
    /// grab, and a malformed image has to fail before anything is locked.
    pub fn prepare(&mut self, appearance: &Appearance) -> Result<(), X11Error> {
        self.cursor = cursor::create(&self.conn, self.screen_num, self.root, &appearance.pointer)?;

        if let Background::Image { path, tiled, fill } = &appearance.background {
            if let Some(image) = backdrop::load(path)? {
                self.backdrop = Some(self.render_backdrop(&image, *tiled, *fill)?);
            }
        }

        self.conn.flush()?;
        Ok(())
    }

    /// Pixel value for `color` in the default colormap.
    fn pixel(&mut self, color: Rgb) -> Result<u32, X11Error> {
        if let Some(pixel) = self.pixels.get(&color) {
            return Ok(*pixel);
        }
        let scale = |c: u8| u16::from(c) * 257;
        let pixel = self
            .conn
            .alloc_color(self.colormap, scale(color.r), scale(color.g), scale(color.b))?
            .reply()?
            .pixel;
        self.pixels.insert(color, pixel);
        Ok(pixel)
    }
}

impl Drop for X11Display {
    fn drop(&mut self) {
        let _ = self.conn.ungrab_keyboard(x11rb::CURRENT_TIME);
        let _ = self.conn.ungrab_pointer(x11rb::CURRENT_TIME);
        if let Some(window) = self.window.take() {
            let _ = self.conn.destroy_window(window);
        }
        if let Some(pixmap) = self.backdrop.take() {
            let _ = self.conn.free_pixmap(pixmap);
        }
        if self.cursor != x11rb::NONE {
            let _ = self.conn.free_cursor(self.cursor);
        }
        if let Err(e) = self.conn.flush() {
            debug!(error = %e, "Failed to flush X connection on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backdrop::XpmError;

    #[test]
    fn backdrop_failures_map_to_surface_errors() {
        let error = X11Error::Backdrop(BackdropError::Parse {
            path: "/tmp/lock.xpm".into(),
            source: XpmError::NotXpm,
        });
        let error = LockError::from(error);

        assert!(matches!(error, LockError::Surface(SurfaceError::Backdrop(_))));
        assert!(error.to_string().contains("/tmp/lock.xpm"));
    }

    #[test]
    fn connection_failures_map_to_display_errors() {
        let error = LockError::from(X11Error::NoScreen(3));

        assert!(matches!(error, LockError::Display(_)));
        assert_eq!(error.to_string(), "cannot open display: X server has no screen 3");
    }
}
