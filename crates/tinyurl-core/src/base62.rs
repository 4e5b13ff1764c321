//! Base62 codec between numeric identifiers and short codes.
//!
//! Codes are written most significant symbol first over the alphabet
//! `a-z`, `A-Z`, `0-9`, in that order.

use crate::error::CodecError;

/// The 62 symbols, ordered by value.
pub const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const BASE: u64 = ALPHABET.len() as u64;

/// Encodes `number` as a base62 string.
///
/// `encode(0)` returns the empty string. Store-assigned keys start at 1 and
/// generated ids carry a non-zero timestamp, so zero never reaches a caller
/// in practice.
pub fn encode(mut number: u64) -> String {
    // u64::MAX needs 11 symbols
    let mut chip = Vec::with_capacity(11);
    while number > 0 {
        chip.push(ALPHABET[(number % BASE) as usize]);
        number /= BASE;
    }
    chip.reverse();
    // every byte comes from the ASCII alphabet
    chip.into_iter().map(char::from).collect()
}

/// Decodes a base62 string back into the number it encodes.
///
/// Rejects the empty string, symbols outside [`ALPHABET`], and numerals too
/// large for a `u64`.
pub fn decode(code: &str) -> Result<u64, CodecError> {
    if code.is_empty() {
        return Err(CodecError::InvalidCode("short code is empty".to_string()));
    }

    code.chars().try_fold(0_u64, |number, symbol| {
        let value = index_of(symbol).ok_or_else(|| {
            CodecError::InvalidCode(format!("'{code}' contains '{symbol}' outside the alphabet"))
        })?;
        number
            .checked_mul(BASE)
            .and_then(|n| n.checked_add(value))
            .ok_or_else(|| CodecError::InvalidCode(format!("'{code}' overflows a 64-bit id")))
    })
}

/// Position of `symbol` in [`ALPHABET`].
fn index_of(symbol: char) -> Option<u64> {
    let value = match symbol {
        'a'..='z' => symbol as u8 - b'a',
        'A'..='Z' => symbol as u8 - b'A' + 26,
        '0'..='9' => symbol as u8 - b'0' + 52,
        _ => return None,
    };
    Some(value as u64)
}
