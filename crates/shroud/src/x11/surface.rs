use shroud_core::traits::{SurfaceError, SurfaceHandle};
use shroud_core::{Appearance, LockSurface, Rgb};
use tracing::{debug, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::dpms::{self, ConnectionExt as _, DPMSMode};
use x11rb::protocol::xproto::{
    ChangeGCAux, ConfigureWindowAux, ConnectionExt as _, CreateGCAux, CreateWindowAux, EventMask,
    Pixmap, Rectangle, StackMode, Window, WindowClass,
};

use super::{X11Display, X11Error};
use crate::backdrop::{self, Image};

/// Rectangles per PolyFillRectangle request.
const RECTANGLES_PER_REQUEST: usize = 4096;

impl X11Display {
    /// Draw `image` into a screen-sized pixmap filled with `fill`.
    pub(super) fn render_backdrop(
        &mut self,
        image: &Image,
        tiled: bool,
        fill: Rgb,
    ) -> Result<Pixmap, X11Error> {
        let fill_pixel = self.pixel(fill)?;

        let screen = self.conn.generate_id()?;
        self.conn
            .create_pixmap(self.root_depth, screen, self.root, self.width, self.height)?;
        let tile = self.conn.generate_id()?;
        self.conn
            .create_pixmap(self.root_depth, tile, self.root, image.width(), image.height())?;

        let gc = self.conn.generate_id()?;
        self.conn
            .create_gc(gc, self.root, &CreateGCAux::new().foreground(fill_pixel))?;
        self.conn
            .poly_fill_rectangle(screen, gc, &[full(self.width, self.height)])?;
        self.conn
            .poly_fill_rectangle(tile, gc, &[full(image.width(), image.height())])?;

        for (color, runs) in image.color_runs() {
            let pixel = self.pixel(color)?;
            self.conn
                .change_gc(gc, &ChangeGCAux::new().foreground(pixel))?;

            let rects: Vec<Rectangle> = runs.iter().filter_map(run_rectangle).collect();
            for chunk in rects.chunks(RECTANGLES_PER_REQUEST) {
                self.conn.poly_fill_rectangle(tile, gc, chunk)?;
            }
        }

        let origins = backdrop::tile_origins(self.size(), (image.width(), image.height()), tiled);
        for (x, y) in &origins {
            self.conn.copy_area(
                tile,
                screen,
                gc,
                0,
                0,
                *x,
                *y,
                image.width(),
                image.height(),
            )?;
        }
        debug!(tiles = origins.len(), "Rendered backdrop");

        self.conn.free_gc(gc)?;
        self.conn.free_pixmap(tile)?;
        Ok(screen)
    }

    fn create_window(&mut self, appearance: &Appearance) -> Result<Window, X11Error> {
        let mut aux = CreateWindowAux::new()
            .override_redirect(1u32)
            .event_mask(EventMask::KEY_PRESS | EventMask::KEY_RELEASE | EventMask::VISIBILITY_CHANGE);
        aux = match self.backdrop {
            Some(pixmap) => aux.background_pixmap(pixmap),
            None => aux.background_pixel(self.pixel(appearance.background.fill())?),
        };
        if self.cursor != x11rb::NONE {
            aux = aux.cursor(self.cursor);
        }

        let window = self.conn.generate_id()?;
        self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            window,
            self.root,
            0,
            0,
            self.width,
            self.height,
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &aux,
        )?;
        self.conn.map_window(window)?;
        self.raise(window)?;
        self.conn.flush()?;
        Ok(window)
    }

    /// Put `window` on top of the stacking order.
    pub(super) fn raise(&self, window: Window) -> Result<(), X11Error> {
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn force_power_off(&self) -> Result<bool, X11Error> {
        if self
            .conn
            .extension_information(dpms::X11_EXTENSION_NAME)?
            .is_none()
        {
            return Ok(false);
        }
        if !self.conn.dpms_capable()?.reply()?.capable {
            return Ok(false);
        }
        self.conn.dpms_enable()?;
        self.conn.dpms_force_level(DPMSMode::OFF)?;
        self.conn.flush()?;
        Ok(true)
    }
}

fn full(width: u16, height: u16) -> Rectangle {
    Rectangle {
        x: 0,
        y: 0,
        width,
        height,
    }
}

/// One-pixel-high rectangle for a run; `None` when it starts outside the
/// signed coordinate range.
fn run_rectangle(run: &backdrop::Run) -> Option<Rectangle> {
    Some(Rectangle {
        x: i16::try_from(run.x).ok()?,
        y: i16::try_from(run.y).ok()?,
        width: run.len,
        height: 1,
    })
}

impl LockSurface for X11Display {
    fn show(&mut self, appearance: &Appearance) -> Result<SurfaceHandle, SurfaceError> {
        let window = self
            .create_window(appearance)
            .map_err(|e| SurfaceError::Window(e.to_string()))?;
        self.window = Some(window);
        debug!(window, "Lock window mapped");
        Ok(SurfaceHandle(window))
    }

    fn dispose(&mut self, handle: SurfaceHandle) {
        if self.window == Some(handle.0) {
            self.window = None;
        }
        let result = self
            .conn
            .unmap_window(handle.0)
            .and_then(|_| self.conn.destroy_window(handle.0))
            .and_then(|_| self.conn.flush());
        if let Err(e) = result {
            warn!(error = %e, "Failed to destroy lock window");
        }
    }

    fn power_down(&mut self) -> bool {
        match self.force_power_off() {
            Ok(done) => done,
            Err(e) => {
                warn!(error = %e, "DPMS request failed");
                false
            }
        }
    }

    fn bell(&mut self) {
        let result = self.conn.bell(100).and_then(|_| self.conn.flush());
        if let Err(e) = result {
            debug!(error = %e, "Failed to ring bell");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backdrop::Run;

    #[test]
    fn runs_become_single_row_rectangles() {
        let run = Run { x: 3, y: 7, len: 5 };
        assert_eq!(
            run_rectangle(&run),
            Some(Rectangle {
                x: 3,
                y: 7,
                width: 5,
                height: 1
            })
        );
    }

    #[test]
    fn runs_past_signed_range_are_skipped() {
        let edge = Run { x: 32767, y: 32767, len: 1 };
        assert!(run_rectangle(&edge).is_some());

        assert_eq!(run_rectangle(&Run { x: 32768, y: 0, len: 1 }), None);
        assert_eq!(run_rectangle(&Run { x: 0, y: u16::MAX, len: 1 }), None);
    }
}
