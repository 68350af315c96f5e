//! Base62 encoding of byte strings as big-endian integers.
//!
//! The alphabet is `0-9a-zA-Z`, case-sensitive. Because the bytes are read
//! as one number, leading zero bytes do not survive a round trip:
//! `[0, 7]` and `[7]` both encode to `"7"`.

use crate::SessionError;

const ALPHABET: &[u8; 62] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Encodes `bytes` as a base62 string. All-zero (or empty) input encodes
/// to the empty string.
pub fn encode(bytes: &[u8]) -> String {
    let mut number: Vec<u8> = bytes.iter().copied().skip_while(|b| *b == 0).collect();
    let mut digits = Vec::new();

    // Schoolbook long division by 62, least significant digit first.
    while !number.is_empty() {
        let mut remainder = 0u32;
        let mut quotient = Vec::with_capacity(number.len());
        for byte in &number {
            let acc = remainder * 256 + u32::from(*byte);
            let q = (acc / 62) as u8;
            remainder = acc % 62;
            if !quotient.is_empty() || q != 0 {
                quotient.push(q);
            }
        }
        digits.push(ALPHABET[remainder as usize]);
        number = quotient;
    }

    digits.iter().rev().map(|d| char::from(*d)).collect()
}

/// Decodes a base62 string back to the minimal big-endian byte string.
///
/// # Errors
/// Returns [`SessionError::InvalidTokenFormat`] if `input` contains a
/// character outside the alphabet.
pub fn decode(input: &str) -> Result<Vec<u8>, SessionError> {
    let mut bytes: Vec<u8> = Vec::new();

    for c in input.chars() {
        let mut carry = u32::from(digit_value(c).ok_or(SessionError::InvalidTokenFormat)?);
        for byte in bytes.iter_mut().rev() {
            let acc = u32::from(*byte) * 62 + carry;
            *byte = (acc & 0xff) as u8;
            carry = acc >> 8;
        }
        while carry > 0 {
            bytes.insert(0, (carry & 0xff) as u8);
            carry >>= 8;
        }
    }

    Ok(bytes)
}

fn digit_value(c: char) -> Option<u8> {
    match c {
        '0'..='9' => Some(c as u8 - b'0'),
        'a'..='z' => Some(c as u8 - b'a' + 10),
        'A'..='Z' => Some(c as u8 - b'A' + 36),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_small_values() {
        assert_eq!(encode(&[0]), "");
        assert_eq!(encode(&[]), "");
        assert_eq!(encode(&[9]), "9");
        assert_eq!(encode(&[10]), "a");
        assert_eq!(encode(&[61]), "Z");
        assert_eq!(encode(&[62]), "10");
        assert_eq!(encode(&[255]), "47");
    }

    #[test]
    fn test_encode_multi_byte_is_big_endian() {
        // 0x0100 = 256 = 4 * 62 + 8
        assert_eq!(encode(&[1, 0]), "48");
    }

    #[test]
    fn test_decode_small_values() {
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
        assert_eq!(decode("0").unwrap(), Vec::<u8>::new());
        assert_eq!(decode("Z").unwrap(), vec![61]);
        assert_eq!(decode("47").unwrap(), vec![255]);
        assert_eq!(decode("48").unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_round_trip_with_nonzero_leading_byte() {
        let samples: [&[u8]; 5] = [
            &[1],
            &[0xff; 16],
            &[0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1],
            &[0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0],
            &[1, 0, 0, 0],
        ];
        for bytes in samples {
            assert_eq!(decode(&encode(bytes)).unwrap(), bytes, "bytes {bytes:?}");
        }
    }

    #[test]
    fn test_round_trip_every_single_leading_byte() {
        for first in 1..=255u8 {
            let bytes = [first, 0, 42, 255, 0, 7, 0, 0];
            assert_eq!(decode(&encode(&bytes)).unwrap(), bytes);
        }
    }

    #[test]
    fn test_leading_zero_bytes_are_dropped() {
        assert_eq!(encode(&[0, 0, 7]), encode(&[7]));
        assert_eq!(decode(&encode(&[0, 0, 7])).unwrap(), vec![7]);
    }

    #[test]
    fn test_encode_is_case_sensitive() {
        assert_ne!(decode("a").unwrap(), decode("A").unwrap());
    }

    #[test]
    fn test_decode_rejects_characters_outside_alphabet() {
        for input in ["abc-def", "abc def", "abc+", "é", "abc=", "ab/c"] {
            assert!(
                matches!(decode(input), Err(SessionError::InvalidTokenFormat)),
                "{input:?} should be rejected"
            );
        }
    }
}
