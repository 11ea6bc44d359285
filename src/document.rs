//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # The bplist document format.
//!
//! Constants and structures defined in this module represent the various
//! sections of a binary property list document.
//!
//! A bplist document is organized into four segments:
//!
//! 1. Header
//! 2. Object Table
//! 3. Offset Table
//! 4. Trailer
//!
//! # References
//!
//! 1. https://github.com/opensource-apple/CF/blob/master/ForFoundationOnly.h
//! 2. https://opensource.apple.com/source/CF/CF-855.17/CFBinaryPList.c

/// The number of bytes of data required to define a bplist header.
pub const HEADER_SIZE: usize = 8;

/// The bplist magic number ("bplist").
pub const HEADER_MAGIC_NUMBER: &[u8] = &[ 0x62, 0x70, 0x6C, 0x69, 0x73, 0x74 ];

/// The bplist version 00 identifier ("00").
pub const HEADER_VERSION_00: (u8, u8) = (0x30, 0x30);

/// The complete header written at the start of every encoded document.
pub const HEADER_BPLIST00: &[u8] = b"bplist00";

/// Binary property list header.
///
/// The header is composed of a magic number and a two-byte version marker
/// representing the major and minor version of the serialization format in
/// which the document is encoded.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub struct Header {
    /// The bplist version as as two 8-bit values.
    pub version: (u8, u8)
}

/// Binary property list offset table.
///
/// The offset table is a mapping from element identifiers to byte offset from
/// the start of the file at which the object resides.
pub type OffsetTable = Vec<usize>;

/// Marker value of a length nibble indicating the length follows as an integer object.
pub const EXTENDED_LENGTH: u8 = 0x0F;

/// Null-type marker values.
pub const SINGLETON_NULL: u8 = 0x00;
pub const SINGLETON_FALSE: u8 = 0x08;
pub const SINGLETON_TRUE: u8 = 0x09;
pub const SINGLETON_FILL: u8 = 0x0F;

/// The kind of object, as named by the high nibble of its marker byte.
///
/// The bplist00 format is self-describing. Each object consists of a marker byte
/// and zero or more bytes of additional data. The high four bits of the marker
/// select one of these kinds and the low four bits carry a length or value.
///
/// # Notes
/// 1. All values are stored in network byte order (big endian).
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum ObjectKind {
    /// Null, boolean literals and fill bytes.
    Singleton,
    /// An integer of 1, 2, 4 or 8 bytes.
    Integer,
    /// A single- or double-precision floating point value.
    Real,
    /// A CFAbsoluteTime value.
    Date,
    /// An arbitrary set of bytes.
    Data,
    /// An 8-bit string.
    AsciiString,
    /// A 16-bit UTF-16 string.
    Utf16String,
    /// An array.
    Array,
    /// A dictionary.
    Dictionary,
}

impl ObjectKind {

    /// The high nibble identifying this kind within a marker byte.
    pub fn tag(self) -> u8 {
        use ObjectKind::*;
        match self {
            Singleton =>
                0x0,
            Integer =>
                0x1,
            Real =>
                0x2,
            Date =>
                0x3,
            Data =>
                0x4,
            AsciiString =>
                0x5,
            Utf16String =>
                0x6,
            Array =>
                0xA,
            Dictionary =>
                0xD,
        }
    }

    /// Looks up the kind named by the high nibble of a marker byte.
    pub fn from_tag(tag: u8) -> Option<ObjectKind> {
        use ObjectKind::*;
        match tag {
            0x0 => Some(Singleton),
            0x1 => Some(Integer),
            0x2 => Some(Real),
            0x3 => Some(Date),
            0x4 => Some(Data),
            0x5 => Some(AsciiString),
            0x6 => Some(Utf16String),
            0xA => Some(Array),
            0xD => Some(Dictionary),
            _ => None,
        }
    }

    /// Composes a marker byte from the kind tag and a 4-bit value.
    pub fn marker(self, value: u8) -> u8 {
        debug_assert!(value <= 0x0F, "marker values are 4 bits");
        (self.tag() << 4) | value
    }

}

/// The number of bytes of data required to define a bplist trailer.
pub const TRAILER_SIZE: usize = 32;

/// The number of unused bytes in the trailer preamble.
pub const TRAILER_PREAMBLE_UNUSED_SIZE: usize = 6;

/// The number of always-zero bytes preceding each 32-bit trailer field.
pub const TRAILER_FIELD_UNUSED_SIZE: usize = 4;

/// Binary property list trailer.
///
/// The trailer contains information necessary to interpret the preceding
/// document, particularly the size of variably-sized offsets and references.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Hash)]
pub struct Trailer {
    /// Number of bytes needed for each offset table entry.
    pub offset_table_entry_size: usize,
    /// Number of bytes needed for each object reference in a container.
    pub object_reference_size: usize,
    /// Number of objects encoded in the document.
    pub number_of_objects: usize,
    /// Element id of the root object.
    pub root_object: usize,
    /// Offset into the file denoting the start of the offset table.
    pub offset_table_offset: usize,
}

/// Deepest chain of nested arrays and dictionaries accepted when decoding or encoding.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Objects the decoder may produce per byte of input.
///
/// Without shared containers every decoded object is named by a distinct reference
/// of at least one byte, so the allowance only limits repeated expansion of shared ones.
pub const DECODED_OBJECTS_PER_INPUT_BYTE: usize = 8;

/// Smallest of 1, 2, 4 or 8 bytes able to hold `value` as an unsigned integer.
pub fn bytes_needed(value: u64) -> usize {
    if value <= u64::from(u8::max_value()) {
        1
    } else if value <= u64::from(u16::max_value()) {
        2
    } else if value <= u64::from(u32::max_value()) {
        4
    } else {
        8
    }
}
