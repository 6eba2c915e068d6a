//! Key press classification.
//!
//! Turns a [`RawKey`] into a [`KeyEvent`]: either an editing command for the
//! password buffer or printable text. Keys that must never reach the buffer
//! (function keys, remaining keypad keys, PF keys and the like) come out as
//! [`KeyKind::Ignored`].

use zeroize::Zeroizing;

use crate::keymap::RawKey;
use crate::keysym::{self, Keysym};

/// What a key press means to the lock session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Text destined for the password buffer.
    Printable,
    /// Return/Enter: authenticate the buffer contents.
    Submit,
    /// Escape: discard the buffer without authenticating.
    Cancel,
    /// Backspace: drop the last character.
    DeleteLast,
    /// Anything else; produces no mutation and no action.
    Ignored,
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyKind::Printable => write!(f, "printable"),
            KeyKind::Submit => write!(f, "submit"),
            KeyKind::Cancel => write!(f, "cancel"),
            KeyKind::DeleteLast => write!(f, "delete_last"),
            KeyKind::Ignored => write!(f, "ignored"),
        }
    }
}

/// A classified key press.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// The normalized keysym.
    pub symbol: Keysym,
    /// Text for `Printable` events, empty otherwise.
    pub text: Zeroizing<Vec<u8>>,
    pub kind: KeyKind,
}

impl KeyEvent {
    fn command(symbol: Keysym, kind: KeyKind) -> Self {
        Self {
            symbol,
            text: Zeroizing::new(Vec::new()),
            kind,
        }
    }
}

// Manual Debug implementation to avoid exposing typed characters
impl std::fmt::Debug for KeyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyEvent")
            .field("symbol", &format_args!("{:#x}", self.symbol))
            .field("text", &"[REDACTED]")
            .field("kind", &self.kind)
            .finish()
    }
}

/// Classify a looked-up key press.
///
/// Keypad Enter and keypad digits are normalized first, so editing works the
/// same from the keypad.
///
/// # Example
///
/// ```
/// use shroud_core::classify::{classify, KeyKind};
/// use shroud_core::keymap::RawKey;
/// use shroud_core::keysym::{XK_F1, XK_KP_ENTER};
///
/// assert_eq!(classify(RawKey::new(XK_KP_ENTER, b"\r".to_vec())).kind, KeyKind::Submit);
/// assert_eq!(classify(RawKey::new(XK_F1, Vec::new())).kind, KeyKind::Ignored);
/// assert_eq!(classify(RawKey::from_char('k')).kind, KeyKind::Printable);
/// ```
pub fn classify(raw: RawKey) -> KeyEvent {
    let symbol = keysym::normalize(raw.keysym);

    if keysym::is_non_text_key(symbol) {
        return KeyEvent::command(symbol, KeyKind::Ignored);
    }

    match symbol {
        keysym::XK_RETURN => KeyEvent::command(symbol, KeyKind::Submit),
        keysym::XK_ESCAPE => KeyEvent::command(symbol, KeyKind::Cancel),
        keysym::XK_BACKSPACE => KeyEvent::command(symbol, KeyKind::DeleteLast),
        _ if is_printable(&raw.text) => KeyEvent {
            symbol,
            text: raw.text,
            kind: KeyKind::Printable,
        },
        _ => KeyEvent::command(symbol, KeyKind::Ignored),
    }
}

fn is_printable(text: &[u8]) -> bool {
    !text.is_empty() && !text.iter().any(|b| b.is_ascii_control())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keysym::{
        XK_BACKSPACE, XK_BREAK, XK_ESCAPE, XK_F1, XK_F35, XK_KP_0, XK_KP_9, XK_KP_ENTER,
        XK_KP_F1, XK_KP_HOME, XK_KP_MULTIPLY, XK_RETURN, XK_SELECT, XK_SHIFT_L, XK_TAB,
    };

    fn kind_of(keysym: Keysym, text: &[u8]) -> KeyKind {
        classify(RawKey::new(keysym, text.to_vec())).kind
    }

    #[test]
    fn editing_keys() {
        assert_eq!(kind_of(XK_RETURN, b"\r"), KeyKind::Submit);
        assert_eq!(kind_of(XK_KP_ENTER, b"\r"), KeyKind::Submit);
        assert_eq!(kind_of(XK_ESCAPE, b"\x1b"), KeyKind::Cancel);
        assert_eq!(kind_of(XK_BACKSPACE, b"\x08"), KeyKind::DeleteLast);
    }

    #[test]
    fn keypad_digits_are_printable() {
        let event = classify(RawKey::new(XK_KP_0 + 7, b"7".to_vec()));
        assert_eq!(event.kind, KeyKind::Printable);
        assert_eq!(event.symbol, '7' as Keysym);
        assert_eq!(event.text.as_slice(), b"7");

        assert_eq!(kind_of(XK_KP_9, b"9"), KeyKind::Printable);
    }

    #[test]
    fn non_text_keys_are_ignored_even_with_text() {
        // The keypad operators produce text but are still filtered out
        assert_eq!(kind_of(XK_KP_MULTIPLY, b"*"), KeyKind::Ignored);
        assert_eq!(kind_of(XK_KP_HOME, b""), KeyKind::Ignored);
        assert_eq!(kind_of(XK_F1, b""), KeyKind::Ignored);
        assert_eq!(kind_of(XK_F35, b""), KeyKind::Ignored);
        assert_eq!(kind_of(XK_SELECT, b""), KeyKind::Ignored);
        assert_eq!(kind_of(XK_BREAK, b""), KeyKind::Ignored);
        assert_eq!(kind_of(XK_KP_F1, b""), KeyKind::Ignored);
        assert_eq!(kind_of(0x1100_0042, b"x"), KeyKind::Ignored);
    }

    #[test]
    fn ignored_events_carry_no_text() {
        let event = classify(RawKey::new(XK_KP_MULTIPLY, b"*".to_vec()));
        assert!(event.text.is_empty());
    }

    #[test]
    fn keys_without_text_are_ignored() {
        assert_eq!(kind_of(XK_SHIFT_L, b""), KeyKind::Ignored);
    }

    #[test]
    fn control_text_is_ignored() {
        assert_eq!(kind_of(XK_TAB, b"\t"), KeyKind::Ignored);
        // Ctrl+U
        assert_eq!(kind_of('u' as Keysym, b"\x15"), KeyKind::Ignored);
    }

    #[test]
    fn letters_and_unicode_are_printable() {
        let event = classify(RawKey::from_char('h'));
        assert_eq!(event.kind, KeyKind::Printable);
        assert_eq!(event.text.as_slice(), b"h");

        let event = classify(RawKey::from_char('ß'));
        assert_eq!(event.kind, KeyKind::Printable);
        assert_eq!(event.text.as_slice(), "ß".as_bytes());
    }

    #[test]
    fn kind_display() {
        assert_eq!(KeyKind::Printable.to_string(), "printable");
        assert_eq!(KeyKind::DeleteLast.to_string(), "delete_last");
        assert_eq!(KeyKind::Ignored.to_string(), "ignored");
    }
}
