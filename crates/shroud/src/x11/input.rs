use shroud_core::keymap::KeyboardMap;
use shroud_core::traits::InputError;
use shroud_core::{InputEvent, InputSource};
use tracing::{debug, trace, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, Mapping, Visibility};
use x11rb::protocol::Event;

use super::{X11Display, X11Error};

/// Fetch the keyboard and modifier mappings from the server.
pub(super) fn load_keyboard_map<C: Connection>(conn: &C) -> Result<KeyboardMap, X11Error> {
    let setup = conn.setup();
    let min = setup.min_keycode;
    let count = setup.max_keycode.saturating_sub(min).saturating_add(1);

    let mapping = conn.get_keyboard_mapping(min, count)?.reply()?;
    let modifiers = conn.get_modifier_mapping()?.reply()?;

    Ok(
        KeyboardMap::new(min, mapping.keysyms_per_keycode, mapping.keysyms)
            .with_modifier_map(modifiers.keycodes_per_modifier(), &modifiers.keycodes),
    )
}

impl InputSource for X11Display {
    fn next_event(&mut self) -> Result<InputEvent, InputError> {
        let event = self
            .conn
            .wait_for_event()
            .map_err(|e| InputError::ConnectionLost(e.to_string()))?;

        let event = match event {
            Event::KeyPress(press) => {
                return Ok(InputEvent::KeyPress(
                    self.keymap.lookup(press.detail, u16::from(press.state)),
                ))
            }
            Event::MappingNotify(notify) if notify.request != Mapping::POINTER => {
                match load_keyboard_map(&self.conn) {
                    Ok(keymap) => {
                        debug!("Keyboard mapping changed, reloaded");
                        self.keymap = keymap;
                    }
                    Err(e) => warn!(error = %e, "Failed to reload keyboard mapping"),
                }
                InputEvent::Other
            }
            Event::VisibilityNotify(notify) if notify.state != Visibility::UNOBSCURED => {
                if let Err(e) = self.raise(notify.window) {
                    warn!(error = %e, "Failed to raise lock window");
                }
                InputEvent::Other
            }
            Event::Error(e) => {
                debug!(error = ?e, "X11 error");
                InputEvent::Other
            }
            other => {
                trace!(event = ?other, "Ignoring event");
                InputEvent::Other
            }
        };
        Ok(event)
    }
}
