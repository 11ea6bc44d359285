//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use ascii::AsciiStr;
use nom::{
    IResult,
    bytes::complete::take,
    combinator::{map, map_res, verify},
    error::ErrorKind,
    multi::many_m_n,
    number::complete::{be_u8, be_u16, be_u32, be_i64, be_f32, be_f64},
    sequence::tuple,
};

use std::borrow::Cow;
use std::convert::TryFrom;
use std::string::FromUtf16Error;

use crate::document::{ObjectKind, EXTENDED_LENGTH};
use crate::de::parser::utils::be_usize_n_list;

/// Parses a marker byte and returns both the tag nibble and the encoded value nibble.
pub fn any_marker(input: &[u8]) -> IResult<&[u8], (u8, u8)> {
    map(
        be_u8,
        |b| (b >> 4, b & 0b0000_1111)
    )(input)
}

/// Returns a parser which consumes a marker of the specified kind.
/// On success, the parser yields the value nibble encoded in the marker.
fn marker(
    kind: ObjectKind
) -> impl Fn(&[u8]) -> IResult<&[u8], u8> {
    move |input: &[u8]| {
        map(
            verify(any_marker, move |(tag, _): &(u8, u8)| -> bool {
                *tag == kind.tag()
            }),
            |(_, value)| value
        )(input)
    }
}

/// Returns a parser for a big-endian integer payload of `1 << size_exponent` bytes.
///
/// # Notes
///
/// 1. The 1-, 2- and 4-byte forms are unsigned.
/// 2. The 8-byte form is a signed two's complement value.
/// 3. Payloads wider than 8 bytes are rejected.
pub fn integer_payload(
    size_exponent: u8
) -> impl Fn(&[u8]) -> IResult<&[u8], i64> {
    move |input: &[u8]| {
        match size_exponent {
            0 => map(be_u8, |value| i64::from(value))(input),
            1 => map(be_u16, |value| i64::from(value))(input),
            2 => map(be_u32, |value| i64::from(value))(input),
            3 => be_i64(input),
            _ => Err(nom::Err::Error((input, ErrorKind::TooLarge))),
        }
    }
}

/// Returns a parser for a big-endian IEEE-754 payload of 4 or 8 bytes.
/// Single-precision values are widened to double precision.
pub fn real_payload(
    size_exponent: u8
) -> impl Fn(&[u8]) -> IResult<&[u8], f64> {
    move |input: &[u8]| {
        match size_exponent {
            2 => map(be_f32, |value| f64::from(value))(input),
            3 => be_f64(input),
            _ => Err(nom::Err::Error((input, ErrorKind::Verify))),
        }
    }
}

/// Parses an integer object.
pub fn integer(input: &[u8]) -> IResult<&[u8], i64> {
    let (input, size_exponent) = marker(ObjectKind::Integer)(input)?;
    integer_payload(size_exponent)(input)
}

/// Parses a 32- or 64-bit floating point object.
pub fn real(input: &[u8]) -> IResult<&[u8], f64> {
    let (input, size_exponent) = marker(ObjectKind::Real)(input)?;
    real_payload(size_exponent)(input)
}

/// Parses a CFAbsoluteTime date object.
pub fn date(input: &[u8]) -> IResult<&[u8], f64> {
    let (input, size_exponent) = marker(ObjectKind::Date)(input)?;
    real_payload(size_exponent)(input)
}

/// Returns a parser for the length of an object payload.
/// The parameter is the value encoded in the marker byte to which the payload corresponds.
/// If the encoded value is:
///   0b0000_0000 ..= 0b0000_1110:
///     No additional input is consumed and the encoded value represents directly
///     the payload count value.
///   0b0000_1111:
///     An integer object with a 1, 2, 4 or 8 byte payload follows.
///     This object is consumed, interpreted as an unsigned value, and returned.
fn payload_count(
    encoded_value: u8,
) -> impl Fn(&[u8]) -> IResult<&[u8], usize> {
    move |input: &[u8]| {
        if encoded_value == EXTENDED_LENGTH {
            map_res(
                integer,
                |value| usize::try_from(value)
            )(input)
        } else {
            Ok((input, encoded_value as usize))
        }
    }
}

/// Parses a variable-length data object and returns the corresponding slice of the input.
pub fn data(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let (input, encoded_value) = marker(ObjectKind::Data)(input)?;
    let (input, data_length) = payload_count(encoded_value)(input)?;
    take(data_length)(input)
}

/// Interprets the payload of an 8-bit string object.
///
/// Pure ASCII is borrowed as-is. Writers which store UTF-8 in 8-bit strings are
/// tolerated, and anything else is read as ISO-8859-1, where every byte is a code point.
fn eight_bit_text(bytes: &[u8]) -> Cow<'_, str> {
    if let Ok(ascii) = AsciiStr::from_ascii(bytes) {
        return Cow::Borrowed(ascii.as_str());
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

/// Parses a variable-length 8-bit string object.
///
/// # Notes
///
/// 1. The length is a count of bytes.
/// 2. This is a zero-copy operation unless the payload is ISO-8859-1.
pub fn ascii_string(input: &[u8]) -> IResult<&[u8], Cow<'_, str>> {
    let (input, encoded_value) = marker(ObjectKind::AsciiString)(input)?;
    let (input, char_count) = payload_count(encoded_value)(input)?;
    map(
        take(char_count),
        eight_bit_text
    )(input)
}

/// Parses a variable-length UTF-16 string object and returns an owned string.
///
/// # Notes
///
/// 1. The length is a count of UTF-16 code units, two bytes each.
/// 2. Validates that the data contained in the object is valid UTF-16.
/// 3. This is not a zero-copy operation.
pub fn utf16_string(input: &[u8]) -> IResult<&[u8], String> {
    let (input, encoded_value) = marker(ObjectKind::Utf16String)(input)?;
    let (input, char_count) = payload_count(encoded_value)(input)?;
    let byte_count = char_count.checked_mul(2).ok_or_else(|| {
        nom::Err::Error((input, ErrorKind::TooLarge))
    })?;
    let (input, payload) = take(byte_count)(input)?;
    let (_, code_units) = map_res(
        many_m_n(
            char_count,
            char_count,
            be_u16
        ), |code_units| -> Result<String, FromUtf16Error> {
            String::from_utf16(&code_units)
        }
    )(payload)?;
    Ok((input, code_units))
}

/// Returns a parser for an array with the specified-width object references.
///
/// The value returned by the parser is a list of value object references.
pub fn array(
    object_reference_size: usize
) -> impl Fn(&[u8]) -> IResult<&[u8], Vec<usize>> {
    move |input: &[u8]| {
        let (input, encoded_value) = marker(ObjectKind::Array)(input)?;
        let (input, array_length) = payload_count(encoded_value)(input)?;
        be_usize_n_list(array_length, object_reference_size)(input)
    }
}

/// Returns a parser for a dictionary with the specified-width key and value references.
///
/// The value returned by the parser is a list of matched key and value object references.
/// In each tuple, the key is first and the value is second.
pub fn dictionary(
    object_reference_size: usize
) -> impl Fn(&[u8]) -> IResult<&[u8], Vec<(usize, usize)>> {
    move |input: &[u8]| {
        let (input, encoded_value) = marker(ObjectKind::Dictionary)(input)?;
        let (input, entry_count) = payload_count(encoded_value)(input)?;

        map(
            tuple((
                be_usize_n_list(entry_count, object_reference_size),
                be_usize_n_list(entry_count, object_reference_size),
            )), |(
                keys,
                values
            )| {
                // Interleave the key and value references
                keys.into_iter()
                    .zip(values.into_iter())
                    .collect::<Vec<(usize, usize)>>()
            }
        )(input)
    }
}
