//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use std;
use std::fmt::{self, Display};
use std::io;

use serde::{de, ser};

pub type Result<T> = std::result::Result<T, Error>;

/// Binary property list encoding and decoding error.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Constructed from serialization and deserialization errors.
    Message(String),
    /// Reading from or writing to the underlying stream failed.
    Io(String),
    /// The bplist magic number and version marker is missing or invalid.
    MissingOrInvalidHeader,
    /// The offset table used determine the location of objects in the object table is missing or invalid.
    MissingOrInvalidOffsetTable,
    /// The trailer with the metadata necessary to interpret the offset table and object table is missing or invalid.
    MissingOrInvalidTrailer,
    /// The version number in the header is not one of the versions supported by this library.
    UnsupportedVersion,
    /// Encountered a reference to an object not in the offset table.
    InvalidObjectReference,
    /// Encountered an offset to an object not in the object table.
    InvalidOffsetToObject,
    /// The root object in the trailer is not in the offset table.
    InvalidRootObject,
    /// The high nibble of a marker byte does not name a supported object type.
    UnknownObjectType(u8),
    /// A null-type marker carried a value other than null, false, true or fill.
    InvalidNullType(u8),
    /// A numeric marker declared a payload wider than 8 bytes.
    IntegerTooWide(u8),
    /// The current object was expected to be a valid integer, but parsing it failed.
    ExpectedInteger,
    /// The current object was expected to be a valid 32- or 64-bit floating point value.
    ExpectedReal,
    /// The current object was expected to be a valid date object, but parsing it failed.
    ExpectedDate,
    /// The current object was expected to be a valid data buffer, but parsing it failed.
    ExpectedData,
    /// The current object was expected to be a valid 8-bit string, but parsing it failed.
    ExpectedAsciiString,
    /// The current object was expected to be a valid UTF-16 string, but parsing it failed.
    ExpectedUtf16String,
    /// The current object was expected to be a valid array, but parsing it failed.
    ExpectedArray,
    /// The current object was expected to be a valid dictionary, but parsing it failed.
    ExpectedDictionary,
    /// A dictionary key referenced an object which is not a string.
    InvalidDictionaryKey,
    /// Binary property lists are directed acyclic graphs and objects cannot reference each other.
    CycleDetected,
    /// Arrays and dictionaries are nested deeper than the supported limit.
    NestingTooDeep,
    /// Shared containers expand into more objects than the input size allows.
    ObjectBudgetExceeded,
    /// A dictionary entry with the given key has a null value and the encoder was configured to reject it.
    NullDictionaryValue(String),
    /// The document has more objects, or a larger offset table position, than the trailer can describe.
    DocumentTooLarge,
    /// Prematurely reached the end of the file.
    Eof,
}

impl ser::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error.to_string())
    }
}

impl Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Message(msg) =>
                formatter.write_str(msg),
            Error::Io(msg) =>
                write!(formatter, "i/o error: {}", msg),
            Error::MissingOrInvalidHeader =>
                formatter.write_str("missing or invalid bplist header"),
            Error::MissingOrInvalidOffsetTable =>
                formatter.write_str("missing or invalid bplist offset table"),
            Error::MissingOrInvalidTrailer =>
                formatter.write_str("missing or invalid bplist trailer"),
            Error::UnsupportedVersion =>
                formatter.write_str("document is not a version (0,0) bplist"),
            Error::InvalidObjectReference =>
                formatter.write_str("invalid reference to object not in offset table"),
            Error::InvalidOffsetToObject =>
                formatter.write_str("invalid offset to element in offset table"),
            Error::InvalidRootObject =>
                formatter.write_str("invalid root object in document metadata"),
            Error::UnknownObjectType(tag) =>
                write!(formatter, "unknown object type: {:#x}", tag),
            Error::InvalidNullType(length) =>
                write!(formatter, "unknown null type: {}", length),
            Error::IntegerTooWide(length) =>
                write!(formatter, "numeric value greater than 8 bytes: {}", length),
            Error::ExpectedInteger =>
                formatter.write_str("expected integer"),
            Error::ExpectedReal =>
                formatter.write_str("expected 32- or 64-bit floating point value"),
            Error::ExpectedDate =>
                formatter.write_str("expected CFAbsoluteTime value"),
            Error::ExpectedData =>
                formatter.write_str("expected data"),
            Error::ExpectedAsciiString =>
                formatter.write_str("expected 8-bit string"),
            Error::ExpectedUtf16String =>
                formatter.write_str("expected UTF-16 string"),
            Error::ExpectedArray =>
                formatter.write_str("expected array of object references"),
            Error::ExpectedDictionary =>
                formatter.write_str("expected dictionary"),
            Error::InvalidDictionaryKey =>
                formatter.write_str("dictionary key is not a string"),
            Error::CycleDetected =>
                formatter.write_str("cycle detected"),
            Error::NestingTooDeep =>
                formatter.write_str("arrays and dictionaries nested too deeply"),
            Error::ObjectBudgetExceeded =>
                formatter.write_str("shared objects expand beyond the decoding budget"),
            Error::NullDictionaryValue(key) =>
                write!(formatter, "null value for dictionary key `{}`", key),
            Error::DocumentTooLarge =>
                formatter.write_str("document too large for a bplist00 trailer"),
            Error::Eof =>
                formatter.write_str("unexpected end of input"),
        }
    }
}

impl std::error::Error for Error {}
