//! URL-safe base64 packing of raw bit-strings.
//!
//! Bits are taken six at a time and mapped through `A-Z a-z 0-9 - _`. There is never `=`
//! padding: the bit-string is right-padded with zero bits by the encoder's [`pad`] hook, so a
//! decoded string may carry trailing zero bits the caller has to ignore.
//!
//! [`pad`]: Base64UrlEncoder::pad

use crate::codec::{GppError, Result};

const DICT: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

const INVALID: u8 = 0xFF;

const fn reverse_dict() -> [u8; 128] {
    let mut table = [INVALID; 128];
    let mut i = 0;
    while i < 64 {
        table[DICT[i] as usize] = i as u8;
        i += 1;
    }
    table
}

const REVERSE_DICT: [u8; 128] = reverse_dict();

pub trait Base64UrlEncoder {
    /// Right-pad `bits` with `'0'` to the length this variant emits.
    fn pad(&self, bits: &mut String);

    fn encode(&self, bit_string: &str) -> Result<String> {
        if !bit_string.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(GppError::Encoding(format!("Unencodable Base64Url '{}'", bit_string)));
        }
        let mut bits = bit_string.to_string();
        self.pad(&mut bits);
        let out = bits
            .as_bytes()
            .chunks(6)
            .map(|chunk| {
                let n = chunk.iter().fold(0usize, |acc, b| (acc << 1) | (b - b'0') as usize);
                DICT[n] as char
            })
            .collect();
        Ok(out)
    }

    fn decode(&self, s: &str) -> Result<String> {
        let mut bits = String::with_capacity(s.len() * 6);
        for c in s.chars() {
            let n = if c.is_ascii() { REVERSE_DICT[c as usize] } else { INVALID };
            if n == INVALID {
                return Err(GppError::Decoding(format!(
                    "Undecodable Base64URL string '{}': invalid character '{}'",
                    s, c
                )));
            }
            bits.push_str(&format!("{:06b}", n));
        }
        Ok(bits)
    }
}

/// Pads to the next 6-bit boundary only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraditionalBase64UrlEncoder;

impl Base64UrlEncoder for TraditionalBase64UrlEncoder {
    fn pad(&self, bits: &mut String) {
        while bits.len() % 6 != 0 {
            bits.push('0');
        }
    }
}

/// Pads to a byte boundary first, then to the next 6-bit boundary (byte-aligned TC strings).
#[derive(Debug, Clone, Copy, Default)]
pub struct CompressedBase64UrlEncoder;

impl Base64UrlEncoder for CompressedBase64UrlEncoder {
    fn pad(&self, bits: &mut String) {
        while bits.len() % 8 != 0 {
            bits.push('0');
        }
        while bits.len() % 6 != 0 {
            bits.push('0');
        }
    }
}

/// Which padding a segment uses on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base64Variant {
    Traditional,
    Compressed,
}

impl Base64Variant {
    pub fn encoder(self) -> &'static dyn Base64UrlEncoder {
        match self {
            Base64Variant::Traditional => &TraditionalBase64UrlEncoder,
            Base64Variant::Compressed => &CompressedBase64UrlEncoder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_table_covers_dictionary() {
        for (i, &c) in DICT.iter().enumerate() {
            assert_eq!(REVERSE_DICT[c as usize] as usize, i);
        }
        assert_eq!(REVERSE_DICT[b'=' as usize], INVALID);
        assert_eq!(REVERSE_DICT[b'+' as usize], INVALID);
    }

    #[test]
    fn compressed_pads_to_byte_then_sextet() {
        let mut bits = "1".repeat(28);
        CompressedBase64UrlEncoder.pad(&mut bits);
        assert_eq!(bits.len(), 36);
        let mut bits = "1".repeat(28);
        TraditionalBase64UrlEncoder.pad(&mut bits);
        assert_eq!(bits.len(), 30);
    }
}
