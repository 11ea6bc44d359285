//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Byte-level encoders for each object kind. Every function returns the complete
//! serialized object, marker byte included, ready to be placed in the object table.

use crate::document::{
    ObjectKind,
    EXTENDED_LENGTH,
    SINGLETON_FALSE,
    SINGLETON_NULL,
    SINGLETON_TRUE,
};

/// Appends the low `width` bytes of `value` in big-endian order.
pub fn push_be_n(buffer: &mut Vec<u8>, width: usize, value: u64) {
    debug_assert!(width >= 1 && width <= 8, "width must be between 1 and 8 bytes, inclusive");
    buffer.extend_from_slice(&value.to_be_bytes()[8 - width ..]);
}

/// Appends a marker byte for `kind` carrying `length`.
///
/// Lengths below 15 are packed into the low nibble of the marker. Longer lengths
/// set the nibble to `0xF` and follow the marker with an inline integer object.
fn push_header(buffer: &mut Vec<u8>, kind: ObjectKind, length: usize) {
    if length < usize::from(EXTENDED_LENGTH) {
        buffer.push(kind.marker(length as u8));
    } else {
        buffer.push(kind.marker(EXTENDED_LENGTH));
        push_unsigned(buffer, length as u64);
    }
}

/// Appends an integer object for a non-negative value in its narrowest unsigned form.
fn push_unsigned(buffer: &mut Vec<u8>, value: u64) {
    let (size_exponent, width) = if value <= u64::from(u8::max_value()) {
        (0, 1)
    } else if value <= u64::from(u16::max_value()) {
        (1, 2)
    } else if value <= u64::from(u32::max_value()) {
        (2, 4)
    } else {
        (3, 8)
    };
    buffer.push(ObjectKind::Integer.marker(size_exponent));
    push_be_n(buffer, width, value);
}

/// Encodes the null marker.
pub fn null() -> Vec<u8> {
    vec![SINGLETON_NULL]
}

/// Encodes a boolean literal.
pub fn boolean(value: bool) -> Vec<u8> {
    vec![if value { SINGLETON_TRUE } else { SINGLETON_FALSE }]
}

/// Encodes an integer in the narrowest of 1, 2 or 4 unsigned bytes, or as an
/// 8-byte signed value when it is negative or does not fit in 32 bits.
pub fn integer(value: i64) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(9);
    if value >= 0 && value <= i64::from(u32::max_value()) {
        push_unsigned(&mut buffer, value as u64);
    } else {
        buffer.push(ObjectKind::Integer.marker(3));
        buffer.extend_from_slice(&value.to_be_bytes());
    }
    buffer
}

/// Encodes a double-precision real.
pub fn real(value: f64) -> Vec<u8> {
    let mut buffer = vec![ObjectKind::Real.marker(3)];
    buffer.extend_from_slice(&value.to_be_bytes());
    buffer
}

/// Encodes a date given as seconds from the Core Data epoch.
pub fn date(absolute_time: f64) -> Vec<u8> {
    let mut buffer = vec![ObjectKind::Date.marker(3)];
    buffer.extend_from_slice(&absolute_time.to_be_bytes());
    buffer
}

/// Encodes a data object.
pub fn data(bytes: &[u8]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(bytes.len() + 10);
    push_header(&mut buffer, ObjectKind::Data, bytes.len());
    buffer.extend_from_slice(bytes);
    buffer
}

/// Encodes a string.
///
/// 7-bit clean strings are written as 8-bit strings with a byte count. Anything else
/// is written as big-endian UTF-16 with a character count in which a surrogate pair
/// counts twice, once for the character and once for its lead surrogate.
pub fn string(value: &str) -> Vec<u8> {
    if value.is_ascii() {
        let mut buffer = Vec::with_capacity(value.len() + 10);
        push_header(&mut buffer, ObjectKind::AsciiString, value.len());
        buffer.extend_from_slice(value.as_bytes());
        buffer
    } else {
        let code_units = value.encode_utf16().collect::<Vec<u16>>();
        let lead_surrogates = code_units
            .iter()
            .filter(|&&unit| unit >= 0xD800 && unit <= 0xDBFF)
            .count();
        let char_count = value.chars().count() + lead_surrogates;
        debug_assert_eq!(char_count, code_units.len());

        let mut buffer = Vec::with_capacity(code_units.len() * 2 + 10);
        push_header(&mut buffer, ObjectKind::Utf16String, char_count);
        for unit in code_units {
            buffer.extend_from_slice(&unit.to_be_bytes());
        }
        buffer
    }
}

/// Encodes an array of object references, each `object_reference_size` bytes wide.
pub fn array(references: &[usize], object_reference_size: usize) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(references.len() * object_reference_size + 10);
    push_header(&mut buffer, ObjectKind::Array, references.len());
    for &reference in references {
        push_be_n(&mut buffer, object_reference_size, reference as u64);
    }
    buffer
}

/// Encodes a dictionary as all key references followed by all value references.
pub fn dictionary(keys: &[usize], values: &[usize], object_reference_size: usize) -> Vec<u8> {
    debug_assert_eq!(keys.len(), values.len(), "every key must be paired with a value");
    let mut buffer = Vec::with_capacity(keys.len() * object_reference_size * 2 + 10);
    push_header(&mut buffer, ObjectKind::Dictionary, keys.len());
    for &reference in keys.iter().chain(values) {
        push_be_n(&mut buffer, object_reference_size, reference as u64);
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons() {
        assert_eq!(null(), vec![0x00]);
        assert_eq!(boolean(false), vec![0x08]);
        assert_eq!(boolean(true), vec![0x09]);
    }

    #[test]
    fn test_integer_widths() {
        assert_eq!(integer(0), vec![0x10, 0x00]);
        assert_eq!(integer(250), vec![0x10, 0xFA]);
        assert_eq!(integer(1000), vec![0x11, 0x03, 0xE8]);
        assert_eq!(integer(70000), vec![0x12, 0x00, 0x01, 0x11, 0x70]);
        assert_eq!(integer(4294967295), vec![0x12, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(
            integer(4294967296),
            vec![0x13, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            integer(-1),
            vec![0x13, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            integer(i64::min_value()),
            vec![0x13, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_real_and_date() {
        assert_eq!(real(-2.5), vec![0x23, 0xC0, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(date(40.1328125), vec![0x33, 0x40, 0x44, 0x11, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_data_lengths() {
        assert_eq!(data(&[]), vec![0x40]);
        assert_eq!(data(&[0xAB; 14])[0], 0x4E);

        // 15 bytes no longer fit in the marker.
        let encoded = data(&[0xAB; 15]);
        assert_eq!(&encoded[.. 3], &[0x4F, 0x10, 0x0F]);
        assert_eq!(encoded.len(), 3 + 15);

        let encoded = data(&[0x00; 300]);
        assert_eq!(&encoded[.. 4], &[0x4F, 0x11, 0x01, 0x2C]);
        assert_eq!(encoded.len(), 4 + 300);
    }

    #[test]
    fn test_ascii_string() {
        assert_eq!(string(""), vec![0x50]);
        assert_eq!(string("Hello"), vec![0x55, 0x48, 0x65, 0x6c, 0x6c, 0x6f]);
    }

    #[test]
    fn test_utf16_string() {
        // U+00E9 is one code unit.
        assert_eq!(string("é"), vec![0x61, 0x00, 0xE9]);

        // U+1F600 is a surrogate pair and counts as two.
        assert_eq!(string("\u{1F600}"), vec![0x62, 0xD8, 0x3D, 0xDE, 0x00]);
        assert_eq!(
            string("a\u{1F600}é"),
            vec![0x64, 0x00, 0x61, 0xD8, 0x3D, 0xDE, 0x00, 0x00, 0xE9]
        );
    }

    #[test]
    fn test_array_references() {
        assert_eq!(array(&[], 1), vec![0xA0]);
        assert_eq!(array(&[1, 2], 1), vec![0xA2, 0x01, 0x02]);
        assert_eq!(array(&[1, 256], 2), vec![0xA2, 0x00, 0x01, 0x01, 0x00]);
    }

    #[test]
    fn test_dictionary_references() {
        assert_eq!(dictionary(&[1, 2], &[3, 4], 1), vec![0xD2, 0x01, 0x02, 0x03, 0x04]);
    }
}
