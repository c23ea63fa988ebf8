//! Nibble translation
//!
//! Every transmitted byte carries only one nibble of payload. The low nibble
//! is replaced by an 8-bit line code with six ones and two zeros, which keeps
//! the transition density high enough for the receiver to recover timing.

use crate::buffer::Buffer;
use crate::protocol::BUFFER_SIZE;

/// Line codes indexed by nibble value
pub const NIBBLES: [u8; 16] = [
    0xF6, 0xEE, 0xED, 0xEB, 0xDE, 0xDD, 0xDB, 0xBE, 0xBD, 0xBB, 0xB7, 0x7E, 0x7D, 0x7B, 0x77, 0x6F,
];

/// Map the low nibble of `byte` to its line code
#[inline]
pub fn translate_nibble(byte: u8) -> u8 {
    NIBBLES[(byte & 0x0F) as usize]
}

/// Reverse lookup of a line code, `None` if it is not a valid code word
pub fn nibble_from_code(code: u8) -> Option<u8> {
    NIBBLES.iter().position(|&c| c == code).map(|i| i as u8)
}

/// Produce the bytes that go on air for `buffer`
pub fn output_bytes(buffer: &Buffer, translate: bool) -> [u8; BUFFER_SIZE] {
    let mut out = *buffer.as_bytes();
    if translate {
        for b in out.iter_mut() {
            *b = translate_nibble(*b);
        }
    }
    out
}
