//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use nom::{
    IResult,
    combinator::map_res,
    bytes::complete::take,
    multi::many_m_n,
};

use std::convert::TryFrom;

/// Returns a parser which recognizes a variable-length big-endian number
/// between 1 and 8 bytes long, inclusive.
///
/// # Notes
///
/// 1. Widths which are not a power of two, such as the 3-byte offsets
///    found in some legacy documents, are read the same way.
/// 2. A valid result will be returned for a signed value of exactly 8 bytes.
pub fn be_u64_n(
    n: usize
) -> impl Fn(&[u8]) -> IResult<&[u8], u64> {
    assert!(n >= 1 && n <= 8, "number must be between 1 and 8 bytes, inclusive");
    move |input: &[u8]| {
        let (input, bytes) = take(n)(input)?;
        let value = bytes.iter().fold(0u64, |acc, x| {
            (acc << 8) | u64::from(*x)
        });
        Ok((input, value))
    }
}

/// Returns a parser which recognizes a variable-length unsigned big-endian number
/// between 1 and 8 bytes long, inclusive. This value is then converted safely
/// into a usize, which varies based on the pointer size of the platform.
///
/// # Notes
///
/// 1. n may be up to 8 even on platforms with smaller word sizes.
/// 2. The value is checked to confirm it is in range before it is cast to usize.
pub fn be_usize_n(
    n: usize
) -> impl Fn(&[u8]) -> IResult<&[u8], usize> {
    move |input: &[u8]| {
        map_res(
            be_u64_n(n),
            |value| usize::try_from(value)
        )(input)
    }
}

/// Returns a parser for exactly `count` unsigned big-endian numbers of `n` bytes each.
///
/// The full run of `count * n` bytes is taken up front so a corrupt count fails
/// on the length of the input rather than on an oversized allocation.
pub fn be_usize_n_list(
    count: usize,
    n: usize,
) -> impl Fn(&[u8]) -> IResult<&[u8], Vec<usize>> {
    move |input: &[u8]| {
        let length = count.checked_mul(n).ok_or_else(|| {
            nom::Err::Error((input, nom::error::ErrorKind::TooLarge))
        })?;
        let (input, run) = take(length)(input)?;
        let (_, values) = many_m_n(count, count, be_usize_n(n))(run)?;
        Ok((input, values))
    }
}

#[cfg(test)]
mod tests {
    use super::{be_u64_n, be_usize_n, be_usize_n_list};

    #[test]
    fn test_be_usize_n_length_1() {
        let (input, result) = be_usize_n(1)(&[0x05]).unwrap();
        assert_eq!(input.len(), 0);
        assert_eq!(result, 5);
    }

    #[test]
    fn test_be_usize_n_length_3() {
        // Legacy 3-byte offset table entries.
        let (input, result) = be_usize_n(3)(&[0x01, 0x00, 0x2A]).unwrap();
        assert_eq!(input.len(), 0);
        assert_eq!(result, 65578);
    }

    #[test]
    fn test_be_u64_n_length_8() {
        let (input, result) = be_u64_n(8)(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE]).unwrap();
        assert_eq!(input.len(), 0);
        assert_eq!(result as i64, -2);
    }

    #[test]
    fn test_be_usize_n_list() {
        let (input, result) = be_usize_n_list(3, 2)(&[0x00, 0x01, 0x01, 0x00, 0xFF, 0xFF, 0x07]).unwrap();
        assert_eq!(input, &[0x07]);
        assert_eq!(result, vec![1, 256, 65535]);
    }

    #[test]
    fn test_be_usize_n_list_truncated() {
        assert!(be_usize_n_list(4, 2)(&[0x00, 0x01, 0x01, 0x00]).is_err());
        assert!(be_usize_n_list(usize::max_value(), 2)(&[0x00]).is_err());
    }
}
