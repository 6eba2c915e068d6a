//! X11 keysym constants, classification ranges and keypad normalization.
//!
//! Everything here is a pure function of the keysym value, so the rules that
//! decide which keys may reach the password buffer are testable without a
//! display connection.

/// An X11 keysym value.
pub type Keysym = u32;

pub const NO_SYMBOL: Keysym = 0;

pub const XK_SPACE: Keysym = 0x0020;
pub const XK_0: Keysym = 0x0030;
pub const XK_9: Keysym = 0x0039;

pub const XK_BACKSPACE: Keysym = 0xff08;
pub const XK_TAB: Keysym = 0xff09;
pub const XK_LINEFEED: Keysym = 0xff0a;
pub const XK_CLEAR: Keysym = 0xff0b;
pub const XK_RETURN: Keysym = 0xff0d;
pub const XK_ESCAPE: Keysym = 0xff1b;
pub const XK_DELETE: Keysym = 0xffff;

pub const XK_SELECT: Keysym = 0xff60;
pub const XK_BREAK: Keysym = 0xff6b;
pub const XK_NUM_LOCK: Keysym = 0xff7f;

pub const XK_KP_SPACE: Keysym = 0xff80;
pub const XK_KP_TAB: Keysym = 0xff89;
pub const XK_KP_ENTER: Keysym = 0xff8d;
pub const XK_KP_F1: Keysym = 0xff91;
pub const XK_KP_F4: Keysym = 0xff94;
pub const XK_KP_HOME: Keysym = 0xff95;
pub const XK_KP_MULTIPLY: Keysym = 0xffaa;
pub const XK_KP_0: Keysym = 0xffb0;
pub const XK_KP_9: Keysym = 0xffb9;
pub const XK_KP_EQUAL: Keysym = 0xffbd;

pub const XK_F1: Keysym = 0xffbe;
pub const XK_F35: Keysym = 0xffe0;

pub const XK_SHIFT_L: Keysym = 0xffe1;

/// Keysyms in this range encode a Unicode code point in the low 24 bits.
pub const UNICODE_OFFSET: Keysym = 0x0100_0000;
pub const UNICODE_MAX: Keysym = 0x0110_ffff;

const PRIVATE_KEYPAD_FIRST: Keysym = 0x1100_0000;
const PRIVATE_KEYPAD_LAST: Keysym = 0x1100_ffff;

pub fn is_keypad_key(keysym: Keysym) -> bool {
    (XK_KP_SPACE..=XK_KP_EQUAL).contains(&keysym)
}

pub fn is_private_keypad_key(keysym: Keysym) -> bool {
    (PRIVATE_KEYPAD_FIRST..=PRIVATE_KEYPAD_LAST).contains(&keysym)
}

pub fn is_function_key(keysym: Keysym) -> bool {
    (XK_F1..=XK_F35).contains(&keysym)
}

pub fn is_misc_function_key(keysym: Keysym) -> bool {
    (XK_SELECT..=XK_BREAK).contains(&keysym)
}

pub fn is_pf_key(keysym: Keysym) -> bool {
    (XK_KP_F1..=XK_KP_F4).contains(&keysym)
}

/// Map keypad Enter and keypad digits onto their main-keyboard keysyms.
///
/// Every other keysym is returned unchanged.
///
/// ```
/// use shroud_core::keysym::{normalize, XK_KP_ENTER, XK_RETURN};
///
/// assert_eq!(normalize(XK_KP_ENTER), XK_RETURN);
/// assert_eq!(normalize(0xffb7), '7' as u32);
/// assert_eq!(normalize('q' as u32), 'q' as u32);
/// ```
pub fn normalize(keysym: Keysym) -> Keysym {
    match keysym {
        XK_KP_ENTER => XK_RETURN,
        XK_KP_0..=XK_KP_9 => keysym - XK_KP_0 + XK_0,
        _ => keysym,
    }
}

/// Keys that must never produce buffer input or control actions.
///
/// Expects an already normalized keysym, so keypad digits and keypad Enter
/// are no longer keypad keys by the time they get here.
pub fn is_non_text_key(keysym: Keysym) -> bool {
    is_function_key(keysym)
        || is_keypad_key(keysym)
        || is_misc_function_key(keysym)
        || is_pf_key(keysym)
        || is_private_keypad_key(keysym)
}
