//! Textual codec for db session ids.
//!
//! A session id is 20 uppercase base-36 digits: 10 encoding the upper half
//! (an unstructured nonce drawn at process start) and 10 encoding the lower
//! half (a per-process monotonic counter). Ten base-36 digits hold values
//! below 36^10 (slightly under 2^52); higher bits are not representable and
//! are discarded on encode.

use crate::errdata;
use crate::errinput;
use crate::error::Result;

/// Length in bytes of an encoded session id.
pub const SESSION_ID_LEN: usize = 20;

const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const BASE: u64 = 36;
const DIGITS_PER_HALF: usize = SESSION_ID_LEN / 2;

/// Encodes the two session-id halves as 20 uppercase base-36 digits, most
/// significant digit first. Values at or above 36^10 wrap.
pub fn encode_session_id(upper: u64, lower: u64) -> String {
    let mut buf = [0u8; SESSION_ID_LEN];
    put_base36(&mut buf[..DIGITS_PER_HALF], upper);
    put_base36(&mut buf[DIGITS_PER_HALF..], lower);
    buf.iter().map(|&digit| digit as char).collect()
}

/// Decodes a session id into its `(upper, lower)` halves, the exact inverse
/// of [`encode_session_id`] over the representable range.
pub fn decode_session_id(id: &[u8]) -> Result<(u64, u64)> {
    if id.len() != SESSION_ID_LEN {
        return errinput!("session id must be {SESSION_ID_LEN} bytes, got {}", id.len());
    }
    let upper = parse_base36(&id[..DIGITS_PER_HALF])?;
    let lower = parse_base36(&id[DIGITS_PER_HALF..])?;
    Ok((upper, lower))
}

fn put_base36(buf: &mut [u8], mut value: u64) {
    for slot in buf.iter_mut().rev() {
        *slot = DIGITS[(value % BASE) as usize];
        value /= BASE;
    }
}

fn parse_base36(digits: &[u8]) -> Result<u64> {
    let mut value = 0u64;
    for &digit in digits {
        let part = match digit {
            b'0'..=b'9' => u64::from(digit - b'0'),
            b'A'..=b'Z' => u64::from(digit - b'A') + 10,
            _ => return errdata!("invalid base-36 digit {:?} in session id", digit as char),
        };
        // 10 digits top out below 2^52, so this cannot overflow.
        value = value * BASE + part;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_encode_structured_id() {
        let id = encode_session_id(0, 0);
        assert_eq!(id, "00000000000000000000");

        let id = encode_session_id(35, 36);
        assert_eq!(id, "000000000Z0000000010");
    }

    #[test]
    fn test_decode_inverts_encode() {
        for (upper, lower) in [
            (0, 1),
            (0x12345678, 0xAA),
            (0x0007_1234_5678_9ABC, 999_999),
            (36u64.pow(10) - 1, 36u64.pow(10) - 1),
        ] {
            let id = encode_session_id(upper, lower);
            assert_eq!(id.len(), SESSION_ID_LEN);
            let decoded = decode_session_id(id.as_bytes()).expect("Failed to decode session id");
            assert_eq!(decoded, (upper, lower));
        }
    }

    #[test]
    fn test_encode_wraps_above_base36_range() {
        let id = encode_session_id(36u64.pow(10), 0);
        assert_eq!(decode_session_id(id.as_bytes()), Ok((0, 0)));
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert!(matches!(
            decode_session_id(b"TOOSHORT"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            decode_session_id(b"000000000000000000000"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_digits() {
        assert!(matches!(
            decode_session_id(b"0000000000000000000a"),
            Err(Error::InvalidData(_))
        ));
        assert!(matches!(
            decode_session_id(b"00000000-00000000000"),
            Err(Error::InvalidData(_))
        ));
    }
}
