//! Bounded, memory-locked password buffer.
//!
//! The buffer holds the in-progress secret typed on the lock screen. It is
//! allocated once at full capacity so the bytes never move, the allocation is
//! locked with `memsec::mlock` (best effort), and every clear overwrites the
//! storage with zeros.
//!
//! # Security
//!
//! The contents are only reachable through [`PasswordBuffer::snapshot`],
//! which hands out a `SecretSlice` that zeroes itself on drop. `Debug`
//! prints the length, never the bytes.

use secrecy::SecretSlice;
use tracing::{debug, trace};
use zeroize::Zeroize;

/// Total storage in bytes, including one byte kept free for a NUL
/// terminator. At most `CAPACITY - 1` bytes are usable.
pub const CAPACITY: usize = 256;

/// The in-progress secret.
///
/// Invariant: `len < CAPACITY` and `bytes[..len]` never contains an ASCII
/// control byte.
///
/// # Example
///
/// ```
/// use shroud_core::buffer::PasswordBuffer;
///
/// let mut buffer = PasswordBuffer::new();
/// assert!(buffer.try_append(b"hunter"));
/// assert!(!buffer.try_append(b"\x1b"));
/// buffer.delete_last();
/// assert_eq!(buffer.len(), 5);
/// buffer.clear();
/// assert!(buffer.is_empty());
/// ```
pub struct PasswordBuffer {
    bytes: Box<[u8; CAPACITY]>,
    len: usize,
    memory_locked: bool,
}

impl PasswordBuffer {
    /// Allocate an empty buffer and try to lock its storage in RAM.
    pub fn new() -> Self {
        let mut buffer = Self {
            bytes: Box::new([0u8; CAPACITY]),
            len: 0,
            memory_locked: false,
        };
        buffer.try_lock_memory();
        buffer
    }

    fn try_lock_memory(&mut self) {
        let ptr = self.bytes.as_mut_ptr();

        // Safety: the region is our own boxed array, which never moves or
        // resizes for the lifetime of the buffer.
        let locked = unsafe { memsec::mlock(ptr, CAPACITY) };

        if locked {
            self.memory_locked = true;
            debug!("Password buffer memory locked");
        } else {
            // Needs CAP_IPC_LOCK or enough RLIMIT_MEMLOCK
            debug!("Failed to lock password buffer memory");
        }
    }

    /// Append `input` if it fits and contains no control bytes.
    ///
    /// The append is all-or-nothing. Returns `false`, leaving the buffer
    /// untouched, when `input` is empty, contains a control byte, or would
    /// bring the length to `CAPACITY` or beyond.
    pub fn try_append(&mut self, input: &[u8]) -> bool {
        if input.is_empty() || input.iter().any(|b| b.is_ascii_control()) {
            return false;
        }
        if input.len() > self.remaining() {
            trace!(len = self.len, incoming = input.len(), "Password buffer full");
            return false;
        }

        self.bytes[self.len..self.len + input.len()].copy_from_slice(input);
        self.len += input.len();
        true
    }

    /// Remove the last character.
    ///
    /// A UTF-8 sequence is removed as a whole. When the tail is not valid
    /// UTF-8 a single byte goes. No-op on an empty buffer.
    pub fn delete_last(&mut self) {
        if self.len == 0 {
            return;
        }

        let floor = self.len.saturating_sub(4);
        let mut cut = self.len - 1;
        while cut > floor && is_continuation(self.bytes[cut]) {
            cut -= 1;
        }

        let tail = &self.bytes[cut..self.len];
        if std::str::from_utf8(tail).map_or(true, |s| s.chars().count() != 1) {
            cut = self.len - 1;
        }

        self.bytes[cut..self.len].zeroize();
        self.len = cut;
    }

    /// Zero the storage and reset the length.
    pub fn clear(&mut self) {
        self.bytes[..self.len].zeroize();
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes that can still be appended.
    pub fn remaining(&self) -> usize {
        CAPACITY - 1 - self.len
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    /// Whether `mlock` succeeded for the storage.
    pub fn is_memory_locked(&self) -> bool {
        self.memory_locked
    }

    /// Copy the current contents into a self-zeroing secret.
    pub fn snapshot(&self) -> SecretSlice<u8> {
        SecretSlice::from(self.bytes[..self.len].to_vec())
    }
}

fn is_continuation(byte: u8) -> bool {
    byte & 0b1100_0000 == 0b1000_0000
}

impl Default for PasswordBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PasswordBuffer {
    fn drop(&mut self) {
        self.bytes.zeroize();
        if self.memory_locked {
            // Safety: same region that was locked in `try_lock_memory`.
            unsafe {
                memsec::munlock(self.bytes.as_mut_ptr(), CAPACITY);
            }
        }
    }
}

// Manual Debug implementation to avoid exposing the secret
impl std::fmt::Debug for PasswordBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordBuffer")
            .field("bytes", &"[REDACTED]")
            .field("len", &self.len)
            .field("memory_locked", &self.memory_locked)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn contents(buffer: &PasswordBuffer) -> Vec<u8> {
        buffer.snapshot().expose_secret().to_vec()
    }

    #[test]
    fn new_buffer_is_empty() {
        let buffer = PasswordBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.remaining(), CAPACITY - 1);
        assert!(!buffer.is_full());
    }

    #[test]
    fn append_collects_bytes_in_order() {
        let mut buffer = PasswordBuffer::new();
        assert!(buffer.try_append(b"h"));
        assert!(buffer.try_append(b"i"));
        assert_eq!(contents(&buffer), b"hi");
    }

    #[test]
    fn append_rejects_empty_and_control_input() {
        let mut buffer = PasswordBuffer::new();
        assert!(!buffer.try_append(b""));
        assert!(!buffer.try_append(b"\r"));
        assert!(!buffer.try_append(b"\x7f"));
        assert!(!buffer.try_append(b"a\tb"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn append_never_exceeds_capacity() {
        let mut buffer = PasswordBuffer::new();
        for _ in 0..1000 {
            buffer.try_append(b"x");
            assert!(buffer.len() < CAPACITY);
        }
        assert!(buffer.is_full());
        assert_eq!(buffer.len(), CAPACITY - 1);

        // Further input is a no-op, not an error
        assert!(!buffer.try_append(b"y"));
        assert_eq!(buffer.len(), CAPACITY - 1);
    }

    #[test]
    fn multibyte_append_is_all_or_nothing() {
        let mut buffer = PasswordBuffer::new();
        for _ in 0..CAPACITY - 2 {
            assert!(buffer.try_append(b"a"));
        }
        assert_eq!(buffer.remaining(), 1);

        assert!(!buffer.try_append("é".as_bytes()));
        assert_eq!(buffer.len(), CAPACITY - 2);
        assert!(buffer.try_append(b"z"));
    }

    #[test]
    fn delete_last_on_empty_does_not_underflow() {
        let mut buffer = PasswordBuffer::new();
        buffer.delete_last();
        buffer.delete_last();
        assert!(buffer.is_empty());
    }

    #[test]
    fn delete_last_removes_one_byte() {
        let mut buffer = PasswordBuffer::new();
        buffer.try_append(b"abc");
        buffer.delete_last();
        assert_eq!(contents(&buffer), b"ab");
    }

    #[test]
    fn delete_last_removes_whole_utf8_character() {
        let mut buffer = PasswordBuffer::new();
        buffer.try_append(b"a");
        buffer.try_append("€".as_bytes());
        assert_eq!(buffer.len(), 4);

        buffer.delete_last();
        assert_eq!(contents(&buffer), b"a");
    }

    #[test]
    fn delete_last_on_invalid_tail_removes_single_byte() {
        let mut buffer = PasswordBuffer::new();
        // Latin-1 bytes as produced by a non-UTF-8 lookup
        buffer.try_append(&[0x61, 0xe9, 0xa9]);
        buffer.delete_last();
        assert_eq!(contents(&buffer), vec![0x61, 0xe9]);
    }

    #[test]
    fn clear_zeroes_storage() {
        let mut buffer = PasswordBuffer::new();
        buffer.try_append(b"secret");
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn debug_redacts_contents() {
        let mut buffer = PasswordBuffer::new();
        buffer.try_append(b"super-secret-password");
        let debug_output = format!("{:?}", buffer);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super-secret-password"));
    }
}
