//! XPM3 reader.
//!
//! Only the parts of the format a lock backdrop needs: the values line,
//! the color table (`c` key, falling back to `g`, `g4` and `m`) and the
//! pixel rows. Extensions and hotspots are ignored.

use std::collections::HashMap;

use shroud_core::Rgb;

use super::Image;

/// Largest width or height accepted; window coordinates are signed 16-bit.
pub const MAX_SIDE: u16 = i16::MAX as u16;

/// Errors that can occur while reading an XPM image.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum XpmError {
    #[error("not an XPM image (missing /* XPM */ header)")]
    NotXpm,

    #[error("invalid values line: {0:?}")]
    BadValues(String),

    #[error("image has zero width or height")]
    Empty,

    #[error("image is {width}x{height}, larger than {max}x{max}", max = MAX_SIDE)]
    TooLarge { width: u32, height: u32 },

    #[error("color entry {index} is invalid: {reason}")]
    BadColor { index: usize, reason: String },

    #[error("expected {expected} strings, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("row {row} has {found} bytes, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row} uses a pixel not in the color table")]
    UnknownPixel { row: usize },
}

/// Parse an XPM3 document.
pub fn parse(source: &str) -> Result<Image, XpmError> {
    if !source.trim_start().starts_with("/* XPM */") {
        return Err(XpmError::NotXpm);
    }

    let strings = quoted_strings(source);
    let mut strings = strings.iter();

    let values = strings.next().ok_or(XpmError::Truncated {
        expected: 1,
        found: 0,
    })?;
    let (width, height, ncolors, cpp) = parse_values(values)?;

    let expected = ncolors.saturating_add(1 + height as usize);
    let found = 1 + strings.len();
    if found < expected {
        return Err(XpmError::Truncated { expected, found });
    }

    let mut colors: HashMap<&[u8], Option<Rgb>> = HashMap::with_capacity(ncolors);
    for index in 0..ncolors {
        let line = strings.next().map(String::as_bytes).unwrap_or_default();
        if line.len() < cpp {
            return Err(XpmError::BadColor {
                index,
                reason: "entry shorter than chars per pixel".into(),
            });
        }
        let (key, spec) = line.split_at(cpp);
        let spec = std::str::from_utf8(spec).map_err(|_| XpmError::BadColor {
            index,
            reason: "not valid UTF-8".into(),
        })?;
        let color = color_from_spec(spec).map_err(|reason| XpmError::BadColor { index, reason })?;
        colors.insert(key, color);
    }

    // Rows are checked before their pixels are stored, so memory use follows
    // the input size rather than the declared one.
    let row_len = (width as usize)
        .checked_mul(cpp)
        .ok_or_else(|| XpmError::BadValues(values.clone()))?;
    let mut pixels = Vec::new();
    for row in 0..height as usize {
        let line = strings.next().map(String::as_bytes).unwrap_or_default();
        if line.len() < row_len {
            return Err(XpmError::RowLength {
                row,
                expected: row_len,
                found: line.len(),
            });
        }
        for key in line[..row_len].chunks(cpp) {
            let color = colors.get(key).ok_or(XpmError::UnknownPixel { row })?;
            pixels.push(*color);
        }
    }

    Ok(Image::new(width, height, pixels))
}

/// Collect every double-quoted string outside of C comments.
fn quoted_strings(source: &str) -> Vec<String> {
    let mut strings = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            '"' => {
                let mut current = String::new();
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                current.push(escaped);
                            }
                        }
                        _ => current.push(c),
                    }
                }
                strings.push(current);
            }
            _ => {}
        }
    }

    strings
}

fn parse_values(line: &str) -> Result<(u16, u16, usize, usize), XpmError> {
    let bad = || XpmError::BadValues(line.to_string());
    let mut fields = line.split_whitespace().map(|f| f.parse::<u32>());

    let mut next = || fields.next().ok_or_else(bad)?.map_err(|_| bad());
    let width = next()?;
    let height = next()?;
    let ncolors = next()?;
    let cpp = next()?;

    if width == 0 || height == 0 {
        return Err(XpmError::Empty);
    }
    if ncolors == 0 || cpp == 0 {
        return Err(bad());
    }
    if width > u32::from(MAX_SIDE) || height > u32::from(MAX_SIDE) {
        return Err(XpmError::TooLarge { width, height });
    }
    let ncolors = usize::try_from(ncolors).map_err(|_| bad())?;
    let cpp = usize::try_from(cpp).map_err(|_| bad())?;

    Ok((width as u16, height as u16, ncolors, cpp))
}

/// Pick the color from a color table entry; `None` means transparent.
fn color_from_spec(spec: &str) -> Result<Option<Rgb>, String> {
    const KEYS: [&str; 5] = ["c", "g", "g4", "m", "s"];

    let mut entries: Vec<(&str, String)> = Vec::new();
    for token in spec.split_whitespace() {
        match entries.last_mut() {
            Some((_, value)) if !KEYS.contains(&token) || value.is_empty() => {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(token);
            }
            _ if KEYS.contains(&token) => entries.push((token, String::new())),
            _ => return Err(format!("unexpected token {:?}", token)),
        }
    }

    let value = ["c", "g", "g4", "m"]
        .iter()
        .find_map(|key| entries.iter().find(|(k, _)| k == key))
        .map(|(_, value)| value.as_str())
        .ok_or_else(|| "no color key".to_string())?;

    parse_color(value)
}

fn parse_color(value: &str) -> Result<Option<Rgb>, String> {
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    if value.eq_ignore_ascii_case("black") {
        return Ok(Some(Rgb::BLACK));
    }
    if value.eq_ignore_ascii_case("white") {
        return Ok(Some(Rgb::WHITE));
    }

    let Some(hex) = value.strip_prefix('#') else {
        return Err(format!("unsupported color name {:?}", value));
    };
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(format!("invalid hex color {:?}", value));
    }

    let digits = match hex.len() {
        3 | 6 | 12 => hex.len() / 3,
        _ => return Err(format!("invalid hex color {:?}", value)),
    };
    let channel = |i: usize| {
        let part = &hex[i * digits..(i + 1) * digits];
        let v = u16::from_str_radix(part, 16).unwrap_or(0);
        match digits {
            1 => (v * 0x11) as u8,
            2 => v as u8,
            _ => (v >> 8) as u8,
        }
    };

    Ok(Some(Rgb::new(channel(0), channel(1), channel(2))))
}
