use shroud_core::PointerCursor;
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::cursor::Handle;
use x11rb::protocol::xproto::{ConnectionExt as _, CreateGCAux, Cursor, Rectangle, Window};
use x11rb::resource_manager;

use super::X11Error;

/// Create the cursor shown while locked; `x11rb::NONE` keeps the default.
pub(super) fn create<C: Connection>(
    conn: &C,
    screen_num: usize,
    root: Window,
    pointer: &PointerCursor,
) -> Result<Cursor, X11Error> {
    match pointer {
        PointerCursor::Default => Ok(x11rb::NONE),
        PointerCursor::Invisible => invisible(conn, root),
        PointerCursor::Named(name) => {
            let database = resource_manager::new_from_default(conn)?;
            let handle = Handle::new(conn, screen_num, &database)?.reply()?;
            let cursor = handle.load_cursor(conn, name)?;
            debug!(name = %name, "Loaded cursor from theme");
            Ok(cursor)
        }
    }
}

/// A 1x1 cursor with an empty mask.
fn invisible<C: Connection>(conn: &C, root: Window) -> Result<Cursor, X11Error> {
    let pixmap = conn.generate_id()?;
    conn.create_pixmap(1, pixmap, root, 1, 1)?;

    let gc = conn.generate_id()?;
    conn.create_gc(gc, pixmap, &CreateGCAux::new().foreground(0u32))?;
    conn.poly_fill_rectangle(
        pixmap,
        gc,
        &[Rectangle {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
        }],
    )?;

    let cursor = conn.generate_id()?;
    conn.create_cursor(cursor, pixmap, pixmap, 0, 0, 0, 0, 0, 0, 0, 0)?;

    conn.free_gc(gc)?;
    conn.free_pixmap(pixmap)?;
    Ok(cursor)
}
