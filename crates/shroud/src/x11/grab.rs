use shroud_core::traits::GrabError;
use shroud_core::InputGrabber;
use tracing::{debug, trace};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, EventMask, GrabMode, GrabStatus};

use super::X11Display;

fn grab_error(e: impl std::fmt::Display) -> GrabError {
    GrabError::Connection(e.to_string())
}

impl InputGrabber for X11Display {
    fn try_grab_pointer(&mut self) -> Result<bool, GrabError> {
        let reply = self
            .conn
            .grab_pointer(
                false,
                self.root,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                self.cursor,
                x11rb::CURRENT_TIME,
            )
            .map_err(grab_error)?
            .reply()
            .map_err(grab_error)?;

        trace!(status = ?reply.status, "GrabPointer");
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn try_grab_keyboard(&mut self) -> Result<bool, GrabError> {
        let reply = self
            .conn
            .grab_keyboard(
                true,
                self.root,
                x11rb::CURRENT_TIME,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )
            .map_err(grab_error)?
            .reply()
            .map_err(grab_error)?;

        trace!(status = ?reply.status, "GrabKeyboard");
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn release(&mut self) {
        let result = self
            .conn
            .ungrab_keyboard(x11rb::CURRENT_TIME)
            .and_then(|_| self.conn.ungrab_pointer(x11rb::CURRENT_TIME))
            .and_then(|_| self.conn.flush());
        if let Err(e) = result {
            debug!(error = %e, "Failed to release grabs");
        }
    }
}
