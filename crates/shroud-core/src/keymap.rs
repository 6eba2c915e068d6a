//! Keycode to keysym/text translation.
//!
//! [`KeyboardMap`] holds a copy of the server's keyboard mapping and turns a
//! key press (keycode plus modifier state) into a [`RawKey`]: the keysym the
//! core protocol rules select and the UTF-8 text that key produces. This is
//! the part of `XLookupString` a lock screen needs, minus input methods and
//! compose sequences.

use zeroize::Zeroizing;

use crate::keysym::{self, Keysym, NO_SYMBOL};

/// An X11 keycode.
pub type Keycode = u8;

pub const SHIFT_MASK: u16 = 1 << 0;
pub const LOCK_MASK: u16 = 1 << 1;
pub const CONTROL_MASK: u16 = 1 << 2;

/// Masks of the eight core modifiers, in modifier-map order.
const MODIFIER_MASKS: [u16; 8] = [
    SHIFT_MASK,
    LOCK_MASK,
    CONTROL_MASK,
    1 << 3,
    1 << 4,
    1 << 5,
    1 << 6,
    1 << 7,
];

/// A looked-up key press, before classification.
#[derive(Clone, PartialEq, Eq)]
pub struct RawKey {
    /// The selected keysym (not yet normalized).
    pub keysym: Keysym,
    /// Text produced by the key; may be empty.
    pub text: Zeroizing<Vec<u8>>,
}

impl RawKey {
    pub fn new(keysym: Keysym, text: impl Into<Vec<u8>>) -> Self {
        Self {
            keysym,
            text: Zeroizing::new(text.into()),
        }
    }

    /// A key that produces the text of a single character, like a letter key.
    pub fn from_char(c: char) -> Self {
        let mut utf8 = [0u8; 4];
        Self::new(char_to_keysym(c), c.encode_utf8(&mut utf8).as_bytes())
    }
}

// Manual Debug implementation to avoid exposing typed characters
impl std::fmt::Debug for RawKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawKey")
            .field("keysym", &format_args!("{:#x}", self.keysym))
            .field("text_len", &self.text.len())
            .finish()
    }
}

/// Client-side copy of the server keyboard mapping.
#[derive(Debug, Clone)]
pub struct KeyboardMap {
    min_keycode: Keycode,
    keysyms_per_keycode: usize,
    keysyms: Vec<Keysym>,
    num_lock_mask: u16,
}

impl KeyboardMap {
    /// Build a map from a GetKeyboardMapping reply starting at `min_keycode`.
    pub fn new(min_keycode: Keycode, keysyms_per_keycode: u8, keysyms: Vec<Keysym>) -> Self {
        Self {
            min_keycode,
            keysyms_per_keycode: usize::from(keysyms_per_keycode),
            keysyms,
            num_lock_mask: 0,
        }
    }

    /// Find the modifier bound to Num_Lock from a GetModifierMapping reply.
    ///
    /// `modifier_keycodes` holds `keycodes_per_modifier` entries for each of
    /// the eight modifiers, Shift first.
    pub fn with_modifier_map(mut self, keycodes_per_modifier: u8, modifier_keycodes: &[Keycode]) -> Self {
        let per_modifier = usize::from(keycodes_per_modifier);
        self.num_lock_mask = 0;
        if per_modifier == 0 {
            return self;
        }

        for (index, keycodes) in modifier_keycodes.chunks(per_modifier).take(8).enumerate() {
            let binds_num_lock = keycodes
                .iter()
                .filter(|&&keycode| keycode != 0)
                .any(|&keycode| self.keysyms_for(keycode).contains(&keysym::XK_NUM_LOCK));
            if binds_num_lock {
                self.num_lock_mask = MODIFIER_MASKS[index];
                break;
            }
        }
        self
    }

    pub fn num_lock_mask(&self) -> u16 {
        self.num_lock_mask
    }

    fn keysyms_for(&self, keycode: Keycode) -> &[Keysym] {
        if self.keysyms_per_keycode == 0 || keycode < self.min_keycode {
            return &[];
        }
        let start = usize::from(keycode - self.min_keycode) * self.keysyms_per_keycode;
        self.keysyms
            .get(start..start + self.keysyms_per_keycode)
            .unwrap_or(&[])
    }

    /// Translate a key press into its keysym and text.
    ///
    /// Only the first group is consulted. Unknown keycodes yield
    /// `NO_SYMBOL` and no text.
    pub fn lookup(&self, keycode: Keycode, state: u16) -> RawKey {
        let keysym = self.select_keysym(keycode, state);
        let text = keysym_to_text(keysym, state & CONTROL_MASK != 0);
        RawKey {
            keysym,
            text: Zeroizing::new(text),
        }
    }

    fn select_keysym(&self, keycode: Keycode, state: u16) -> Keysym {
        let syms = self.keysyms_for(keycode);
        let first = syms.first().copied().unwrap_or(NO_SYMBOL);
        let second = syms.get(1).copied().unwrap_or(NO_SYMBOL);

        let (lower, upper) = if second == NO_SYMBOL {
            let (lower, upper) = convert_case(first);
            if lower != upper {
                (lower, upper)
            } else {
                (first, first)
            }
        } else {
            (first, second)
        };

        let shift = state & SHIFT_MASK != 0;
        let lock = state & LOCK_MASK != 0;
        let num_lock = self.num_lock_mask != 0 && state & self.num_lock_mask != 0;

        if num_lock && keysym::is_keypad_key(upper) {
            return if shift { lower } else { upper };
        }

        match (shift, lock) {
            (false, false) => lower,
            (false, true) => convert_case(lower).1,
            (true, false) => upper,
            (true, true) => convert_case(upper).1,
        }
    }
}

/// Lower- and uppercase variants of a keysym; both equal the input when it
/// has no case.
pub fn convert_case(keysym: Keysym) -> (Keysym, Keysym) {
    match keysym {
        0x41..=0x5a | 0xc0..=0xd6 | 0xd8..=0xde => (keysym + 0x20, keysym),
        0x61..=0x7a | 0xe0..=0xf6 | 0xf8..=0xfe => (keysym, keysym - 0x20),
        keysym::UNICODE_OFFSET..=keysym::UNICODE_MAX => {
            match char::from_u32(keysym - keysym::UNICODE_OFFSET) {
                Some(c) => (
                    single_char(c.to_lowercase()).map_or(keysym, char_to_keysym),
                    single_char(c.to_uppercase()).map_or(keysym, char_to_keysym),
                ),
                None => (keysym, keysym),
            }
        }
        _ => (keysym, keysym),
    }
}

fn single_char(mut chars: impl Iterator<Item = char>) -> Option<char> {
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

/// The keysym X assigns to a character.
pub fn char_to_keysym(c: char) -> Keysym {
    let code = u32::from(c);
    match code {
        0x20..=0x7e | 0xa0..=0xff => code,
        _ => keysym::UNICODE_OFFSET + code,
    }
}

/// Text a keysym produces, with the Control-key transformation applied.
pub fn keysym_to_text(keysym: Keysym, control: bool) -> Vec<u8> {
    let c = match keysym {
        0x20..=0x7e | 0xa0..=0xff => char::from_u32(keysym),
        keysym::UNICODE_OFFSET..=keysym::UNICODE_MAX => {
            char::from_u32(keysym - keysym::UNICODE_OFFSET)
        }
        keysym::XK_KP_SPACE => Some(' '),
        keysym::XK_BACKSPACE..=keysym::XK_CLEAR
        | keysym::XK_RETURN
        | keysym::XK_ESCAPE
        | keysym::XK_DELETE
        | keysym::XK_KP_TAB
        | keysym::XK_KP_ENTER
        | keysym::XK_KP_MULTIPLY..=keysym::XK_KP_9
        | keysym::XK_KP_EQUAL => char::from_u32(keysym & 0x7f),
        _ => None,
    };

    let Some(c) = c else {
        return Vec::new();
    };
    let c = if control { control_char(c) } else { c };

    let mut utf8 = [0u8; 4];
    c.encode_utf8(&mut utf8).as_bytes().to_vec()
}

fn control_char(c: char) -> char {
    match c {
        '@'..='~' | ' ' => char::from(c as u8 & 0x1f),
        '2' => '\0',
        '3'..='7' => char::from(c as u8 - b'3' + 0x1b),
        '8' => '\x7f',
        '/' => '\x1f',
        other => other,
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    fn keysym() -> impl Strategy<Value = Keysym> {
        prop_oneof![
            any::<Keysym>(),
            0x20..0x100u32,
            0xff00..0x10000u32,
            keysym::UNICODE_OFFSET..keysym::UNICODE_MAX + 2,
            Just(keysym::XK_NUM_LOCK),
            Just(NO_SYMBOL),
        ]
    }

    proptest! {
        /// Lookup never panics, whatever mapping the server sent.
        #[test]
        fn lookup_never_panics(
            min_keycode in any::<Keycode>(),
            per_keycode in any::<u8>(),
            keysyms in vec(keysym(), 0..64),
            per_modifier in any::<u8>(),
            modifiers in vec(any::<Keycode>(), 0..24),
            keycode in any::<Keycode>(),
            state in any::<u16>(),
        ) {
            let map = KeyboardMap::new(min_keycode, per_keycode, keysyms)
                .with_modifier_map(per_modifier, &modifiers);
            let key = map.lookup(keycode, state);

            prop_assert!(key.text.len() <= 4);
            prop_assert!(std::str::from_utf8(&key.text).is_ok());
            if keycode < min_keycode || per_keycode == 0 {
                prop_assert_eq!(key.keysym, NO_SYMBOL);
                prop_assert!(key.text.is_empty());
            }
        }

        /// The Num_Lock mask is one of the eight modifier bits, or none.
        #[test]
        fn num_lock_mask_is_a_single_modifier(
            keysyms in vec(keysym(), 0..64),
            per_modifier in 0u8..4,
            modifiers in vec(any::<Keycode>(), 0..32),
        ) {
            let map = KeyboardMap::new(8, 2, keysyms).with_modifier_map(per_modifier, &modifiers);
            let mask = map.num_lock_mask();
            prop_assert!(mask == 0 || MODIFIER_MASKS.contains(&mask));
        }
    }
}
