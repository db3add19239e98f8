//! Byte tunneling through text-only transports.
//!
//! D1 only speaks JSON, so byte sequences travel as text. Each byte becomes
//! one fixed-width unit: the two-character marker `\u` followed by the byte
//! value as four uppercase hex digits. `[0x99, 0x21]` is sent as
//! `\u0099\u0021`.
//!
//! The shape check ([`is_fully_escaped`]) is structural only. A text value
//! that happens to look like a run of units is indistinguishable from
//! encoded bytes; see [`crate::decode`] for how results deal with that.

use crate::error::{Error, Result};

/// The two characters that open every unit.
pub const MARKER: &str = "\\u";

/// Width of one encoded unit, in bytes of output text.
pub const UNIT_LEN: usize = 6;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Encodes a byte sequence into its escaped text form.
///
/// Never fails. The output is ASCII and exactly `UNIT_LEN * bytes.len()`
/// long.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * UNIT_LEN);
    for &byte in bytes {
        out.push_str(MARKER);
        out.push('0');
        out.push('0');
        out.push(char::from(HEX_UPPER[usize::from(byte >> 4)]));
        out.push(char::from(HEX_UPPER[usize::from(byte & 0x0F)]));
    }
    out
}

/// Returns true if `s` consists entirely of marker + 4 hex digit units.
///
/// The empty string qualifies (it is the encoding of no bytes). Lowercase hex
/// digits do not.
#[must_use]
pub fn is_fully_escaped(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() % UNIT_LEN != 0 {
        return false;
    }
    bytes.chunks_exact(UNIT_LEN).all(is_unit)
}

fn is_unit(unit: &[u8]) -> bool {
    unit[..2] == *MARKER.as_bytes() && unit[2..].iter().all(|&b| hex_value(b).is_some())
}

const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Decodes escaped text back into bytes.
///
/// # Errors
///
/// Returns [`Error::MalformedEscape`] if `s` is not fully escaped, or if a
/// unit carries a value above `0xFF`.
pub fn decode(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    if bytes.len() % UNIT_LEN != 0 {
        return Err(Error::MalformedEscape {
            position: bytes.len() - bytes.len() % UNIT_LEN,
            reason: format!("trailing partial unit in {} bytes of input", bytes.len()),
        });
    }

    let mut out = Vec::with_capacity(bytes.len() / UNIT_LEN);
    for (index, unit) in bytes.chunks_exact(UNIT_LEN).enumerate() {
        let position = index * UNIT_LEN;
        if unit[..2] != *MARKER.as_bytes() {
            return Err(Error::MalformedEscape {
                position,
                reason: "missing \\u marker".to_string(),
            });
        }

        let mut value: u16 = 0;
        for &digit in &unit[2..] {
            let Some(nibble) = hex_value(digit) else {
                return Err(Error::MalformedEscape {
                    position,
                    reason: format!("'{}' is not an uppercase hex digit", char::from(digit)),
                });
            };
            value = (value << 4) | u16::from(nibble);
        }

        let byte = u8::try_from(value).map_err(|_| Error::MalformedEscape {
            position,
            reason: format!("unit value {value:#06X} does not fit in a byte"),
        })?;
        out.push(byte);
    }
    Ok(out)
}
