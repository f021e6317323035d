//! Conversions between wire fields and host values.
//!
//! SCSI, like the network, is big-endian; the AUL labels are fixed-width
//! space-padded ASCII. Everything here is pure and never reads or writes
//! past the declared field width.

use byteorder::{BigEndian, ByteOrder};

pub fn to_u16(t: &[u8; 2]) -> u16 {
    BigEndian::read_u16(t)
}

pub fn to_u32(t: &[u8; 4]) -> u32 {
    BigEndian::read_u32(t)
}

/// Some SCSI replies carry 3-byte counters.
pub fn to_u32_3(t: &[u8; 3]) -> u32 {
    BigEndian::read_u24(t)
}

pub fn to_s32(t: &[u8; 4]) -> i32 {
    BigEndian::read_i32(t)
}

pub fn to_u64(t: &[u8; 8]) -> u64 {
    BigEndian::read_u64(t)
}

/// 48-bit logical object identifiers (e.g. end-of-wrap positions) widen
/// into a u64.
pub fn to_u64_6(t: &[u8; 6]) -> u64 {
    BigEndian::read_u48(t)
}

pub fn set_u16(t: &mut [u8; 2], val: u16) {
    BigEndian::write_u16(t, val);
}

pub fn set_u32(t: &mut [u8; 4], val: u32) {
    BigEndian::write_u32(t, val);
}

pub fn set_u64(t: &mut [u8; 8], val: u64) {
    BigEndian::write_u64(t, val);
}

/// Copy `value` into a fixed-width field, space-padding the remainder.
/// A value longer than the field is truncated. No NUL terminator, ever:
/// a value exactly filling the field occupies all of it.
pub fn set_string(field: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    let n = bytes.len().min(field.len());
    field[..n].copy_from_slice(&bytes[..n]);
    for b in &mut field[n..] {
        *b = b' ';
    }
}

/// Render a decimal integer right-aligned with leading zeros. Values that
/// do not fit are taken modulo 10^width, as the label format requires.
pub fn set_int(field: &mut [u8], value: u64) {
    let mut v = value;
    for b in field.iter_mut().rev() {
        *b = b'0' + (v % 10) as u8;
        v /= 10;
    }
}

/// Space-padded equality: the field matches if it holds `expected` followed
/// only by spaces.
pub fn cmp_string(field: &[u8], expected: &str) -> bool {
    let bytes = expected.as_bytes();
    if bytes.len() > field.len() {
        return false;
    }
    field[..bytes.len()] == *bytes && field[bytes.len()..].iter().all(|&b| b == b' ')
}

/// Extract the logical string from a fixed-width field: stop at the first
/// NUL, then trim the space padding.
pub fn to_string(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).trim().to_string()
}

/// Dump a buffer as offset | hex bytes | ASCII, eight bytes per line.
pub fn hex_dump(data: &[u8]) -> String {
    let mut out = String::new();
    for (i, chunk) in data.chunks(8).enumerate() {
        out.push_str(&format!("{:04x} | ", i * 8));
        for b in chunk {
            out.push_str(&format!("{b:02x} "));
        }
        for _ in chunk.len()..8 {
            out.push_str("   ");
        }
        out.push_str("| ");
        for &b in chunk {
            out.push(if (0x20..0x7f).contains(&b) { b as char } else { '.' });
        }
        out.push('\n');
    }
    out
}
