//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

pub(crate) mod date;
mod parser;
mod value;

use log::{debug, trace};
use ordered_float::OrderedFloat;
use serde::de::DeserializeOwned;

use std::io::{Read, Seek, SeekFrom};

use crate::document::{
    ObjectKind,
    OffsetTable,
    DECODED_OBJECTS_PER_INPUT_BYTE,
    HEADER_SIZE,
    HEADER_VERSION_00,
    MAX_NESTING_DEPTH,
    SINGLETON_FALSE,
    SINGLETON_FILL,
    SINGLETON_NULL,
    SINGLETON_TRUE,
    TRAILER_SIZE,
};
use crate::error::{Error, Result};
use crate::value::{Date, Dictionary, Value};

#[derive(Clone, Eq, PartialEq, Debug)]
struct Metadata {
    /// The table of offsets from the start of the input to the location of a given object.
    offset_table: OffsetTable,
    /// The byte length of an object reference.
    object_reference_size: usize,
    /// The index of the root object to decode.
    root_object: usize,
    /// The range of bytes of the input where objects may reside.
    object_table_range: std::ops::Range<usize>,
}

impl Metadata {
    /// Utilizes the offset table to compute the offset of the given object.
    fn offset_of(&self, object: usize) -> Result<usize> {
        self.offset_table
            .get(object)
            .cloned()
            .ok_or(Error::InvalidObjectReference)
    }
}

/// Provides access to objects within the object table.
///
/// One instance exists per decode and carries all of its working state.
#[derive(Debug)]
struct ObjectTable<'a> {
    input: &'a [u8],
    metadata: Metadata,
    /// The containers currently being decoded, innermost last.
    collection_stack: Vec<usize>,
    /// Objects which may still be decoded before giving up.
    remaining_objects: usize,
}

/// Defines a basic parser with specific error handling.
macro_rules! define_parser {
    ($name:ident, $parser:expr, $type:ty, $expected_error:path) => {
        fn $name(&self, object: usize) -> Result<$type> {
            let data = self.data_for(object)?;
            $parser(data)
                .map(|(_, value)| value)
                .map_err(|_| $expected_error)
        }
    };
}

impl<'a> ObjectTable<'a> {

    /// Parses the metadata necessary to interpret the contents of the document.
    ///
    /// # Notes
    ///
    /// The smallest possible document consists of:
    ///   1. A fixed-sized header.
    ///   2. An object table with a single one-byte entry such as a boolean.
    ///   3. An offset table with a single one-byte entry for the root object.
    ///   4. A fixed-sized trailer.
    fn new(input: &'a [u8]) -> Result<Self> {
        if input.len() < HEADER_SIZE + 2 + TRAILER_SIZE {
            return Err(Error::Eof);
        }

        // Parse the header and verify both the magic number and the version marker.
        let header_slice = &input[0 .. HEADER_SIZE];
        let (_, header) = parser::document::header(header_slice).map_err(|_| {
            Error::MissingOrInvalidHeader
        })?;
        if header.version != HEADER_VERSION_00 {
            return Err(Error::UnsupportedVersion);
        }

        // Parse the trailer from the end of the input and sanity check the fields.
        let trailer_start = input.len() - TRAILER_SIZE;
        let (_, trailer) = parser::document::trailer(&input[trailer_start .. ]).map_err(|_| {
            Error::MissingOrInvalidTrailer
        })?;
        debug!(
            "trailer: {} objects, root {}, offset table at {} ({}-byte entries), {}-byte references",
            trailer.number_of_objects,
            trailer.root_object,
            trailer.offset_table_offset,
            trailer.offset_table_entry_size,
            trailer.object_reference_size,
        );
        let valid_size = |size: usize| size >= 1 && size <= 8;
        if !valid_size(trailer.offset_table_entry_size) || !valid_size(trailer.object_reference_size) {
            return Err(Error::MissingOrInvalidTrailer);
        }
        if trailer.root_object >= trailer.number_of_objects {
            return Err(Error::InvalidRootObject);
        }

        // Compute the location and length of the offset table.
        let offset_table_start = trailer.offset_table_offset;
        let offset_table_end = trailer.number_of_objects
            .checked_mul(trailer.offset_table_entry_size)
            .and_then(|length| length.checked_add(offset_table_start))
            .ok_or(Error::MissingOrInvalidOffsetTable)?;

        // The offset table should follow the header and not overlap with the trailer.
        if offset_table_start < HEADER_SIZE || offset_table_end > trailer_start {
            return Err(Error::MissingOrInvalidOffsetTable);
        }

        // Parse the offset table.
        let offset_table_slice = &input[offset_table_start .. offset_table_end];
        let (_, offset_table) = parser::document::offset_table(
            trailer.number_of_objects,
            trailer.offset_table_entry_size
        )(offset_table_slice).map_err(|_| {
            Error::MissingOrInvalidOffsetTable
        })?;

        Ok(ObjectTable {
            input,
            metadata: Metadata {
                offset_table,
                object_reference_size: trailer.object_reference_size,
                root_object: trailer.root_object,
                object_table_range: (HEADER_SIZE .. offset_table_start),
            },
            collection_stack: Vec::new(),
            remaining_objects: input.len().saturating_mul(DECODED_OBJECTS_PER_INPUT_BYTE),
        })
    }

    /// Returns the slice of the input corresponding to the object.
    fn data_for(&self, object: usize) -> Result<&'a [u8]> {
        let offset = self.metadata.offset_of(object)?;

        // Make sure the offset is to a point within the object table.
        if !self.metadata.object_table_range.contains(&offset) {
            return Err(Error::InvalidOffsetToObject);
        }

        Ok(&self.input[offset .. self.metadata.object_table_range.end])
    }

    /// Parses the marker byte for the specified object and returns its kind and value nibble.
    fn kind_of(&self, object: usize) -> Result<(ObjectKind, u8)> {
        let data = self.data_for(object)?;
        let (_, (tag, value)) = parser::object::any_marker(data).map_err(|_| Error::Eof)?;
        let kind = ObjectKind::from_tag(tag).ok_or(Error::UnknownObjectType(tag))?;
        Ok((kind, value))
    }

    define_parser![
        parse_integer,
        parser::object::integer,
        i64,
        Error::ExpectedInteger
    ];
    define_parser![
        parse_real,
        parser::object::real,
        f64,
        Error::ExpectedReal
    ];
    define_parser![
        parse_date,
        parser::object::date,
        f64,
        Error::ExpectedDate
    ];
    define_parser![
        parse_data,
        parser::object::data,
        &'a [u8],
        Error::ExpectedData
    ];
    define_parser![
        parse_ascii_string,
        parser::object::ascii_string,
        std::borrow::Cow<'a, str>,
        Error::ExpectedAsciiString
    ];
    define_parser![
        parse_utf16_string,
        parser::object::utf16_string,
        String,
        Error::ExpectedUtf16String
    ];

    /// Parses an array of objects whose reference size is determined in metadata.
    fn parse_array(&self, object: usize) -> Result<Vec<usize>> {
        let data = self.data_for(object)?;
        parser::object::array(self.metadata.object_reference_size)(data)
            .map(|(_, objects)| objects)
            .map_err(|_| Error::ExpectedArray)
    }

    /// Parses a dictionary of key-value object pairs whose reference size is determined in metadata.
    fn parse_dictionary(&self, object: usize) -> Result<Vec<(usize, usize)>> {
        let data = self.data_for(object)?;
        parser::object::dictionary(self.metadata.object_reference_size)(data)
            .map(|(_, pairs)| pairs)
            .map_err(|_| Error::ExpectedDictionary)
    }

    /// Pushes a container onto the collection stack to ensure no cycles can occur
    /// and the nesting depth stays bounded.
    #[must_use = "the result must be checked to avoid creating a cycle"]
    fn enter_collection(&mut self, object: usize) -> Result<()> {
        if self.collection_stack.contains(&object) {
            Err(Error::CycleDetected)
        } else if self.collection_stack.len() >= MAX_NESTING_DEPTH {
            Err(Error::NestingTooDeep)
        } else {
            self.collection_stack.push(object);
            Ok(())
        }
    }

    /// Pops the most recently entered collection from the stack.
    fn exit_collection(&mut self) {
        let exited = self.collection_stack.pop();
        debug_assert!(exited.is_some(), "unbalanced calls in object stack tracking");
    }

    /// Decodes the object with the specified index, recursing into containers.
    fn value_of(&mut self, object: usize) -> Result<Value> {
        // Shared containers are decoded again for every reference to them.
        self.remaining_objects = self.remaining_objects
            .checked_sub(1)
            .ok_or(Error::ObjectBudgetExceeded)?;

        let (kind, value) = self.kind_of(object)?;
        trace!("object {}: {:?} ({:#x})", object, kind, value);

        match kind {

            // Null, booleans and fill bytes are encoded entirely in the marker.
            ObjectKind::Singleton => match value {
                SINGLETON_NULL | SINGLETON_FILL =>
                    Ok(Value::Null),
                SINGLETON_FALSE =>
                    Ok(Value::Boolean(false)),
                SINGLETON_TRUE =>
                    Ok(Value::Boolean(true)),
                other =>
                    Err(Error::InvalidNullType(other)),
            },

            // Numeric objects encode the payload width as a power of two.
            ObjectKind::Integer | ObjectKind::Real | ObjectKind::Date if value > 3 =>
                Err(Error::IntegerTooWide(value)),
            ObjectKind::Integer =>
                Ok(Value::Integer(self.parse_integer(object)?)),
            ObjectKind::Real =>
                Ok(Value::Real(OrderedFloat(self.parse_real(object)?))),
            ObjectKind::Date =>
                Ok(Value::Date(Date::from_absolute_time(self.parse_date(object)?))),

            ObjectKind::Data =>
                Ok(Value::Data(self.parse_data(object)?.to_vec())),
            ObjectKind::AsciiString =>
                Ok(Value::String(self.parse_ascii_string(object)?.into_owned())),
            ObjectKind::Utf16String =>
                Ok(Value::String(self.parse_utf16_string(object)?)),

            ObjectKind::Array => {
                let objects = self.parse_array(object)?;

                // Track entering the array to detect reference cycles.
                self.enter_collection(object)?;
                let elements = objects
                    .into_iter()
                    .map(|element| self.value_of(element))
                    .collect::<Result<Vec<Value>>>();
                self.exit_collection();
                Ok(Value::Array(elements?))
            }

            ObjectKind::Dictionary => {
                let pairs = self.parse_dictionary(object)?;

                // Track entering the dictionary to detect reference cycles.
                self.enter_collection(object)?;
                let entries = self.dictionary_entries(pairs);
                self.exit_collection();
                Ok(Value::Dictionary(entries?))
            }
        }
    }

    /// Decodes the key and value of each pair, in order, into a dictionary.
    /// A key which repeats replaces the value stored under its first occurrence.
    fn dictionary_entries(&mut self, pairs: Vec<(usize, usize)>) -> Result<Dictionary> {
        let mut entries = Dictionary::with_capacity(pairs.len());
        for (key, value) in pairs {
            let key = match self.value_of(key)? {
                Value::String(key) => key,
                _ => return Err(Error::InvalidDictionaryKey),
            };
            let value = self.value_of(value)?;
            entries.insert(key, value);
        }
        Ok(entries)
    }

}

/// Decodes a complete binary property list document held in memory.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    let mut object_table = ObjectTable::new(bytes)?;
    let root_object = object_table.metadata.root_object;
    object_table.value_of(root_object)
}

/// Decodes a complete binary property list document from a seekable stream.
///
/// The whole stream, from its start, is read into memory before decoding.
pub fn decode_reader<R>(mut reader: R) -> Result<Value>
where
    R: Read + Seek,
{
    reader.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode(&bytes)
}

/// Support for deserializing any supported type from a binary property list document.
pub fn from_slice<T>(bytes: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    let value = decode(bytes)?;
    T::deserialize(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wraps an object table in a header, one-byte offset table and trailer.
    fn document(objects: &[&[u8]], object_reference_size: u8) -> Vec<u8> {
        let mut bytes = b"bplist00".to_vec();
        let mut offsets = Vec::new();
        for object in objects {
            offsets.push(bytes.len() as u8);
            bytes.extend_from_slice(object);
        }
        let table_offset = bytes.len() as u8;
        bytes.extend_from_slice(&offsets);
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 1, object_reference_size]);
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, objects.len() as u8]);
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 0]);
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, table_offset]);
        bytes
    }

    #[test]
    fn test_decode_singletons() {
        assert_eq!(decode(&document(&[&[0x00]], 1)), Ok(Value::Null));
        assert_eq!(decode(&document(&[&[0x08]], 1)), Ok(Value::Boolean(false)));
        assert_eq!(decode(&document(&[&[0x09]], 1)), Ok(Value::Boolean(true)));
        assert_eq!(decode(&document(&[&[0x0F]], 1)), Ok(Value::Null));
        assert_eq!(decode(&document(&[&[0x01]], 1)), Err(Error::InvalidNullType(1)));
    }

    #[test]
    fn test_decode_unknown_type() {
        assert_eq!(decode(&document(&[&[0x70]], 1)), Err(Error::UnknownObjectType(0x7)));
    }

    #[test]
    fn test_decode_numeric_too_wide() {
        assert_eq!(decode(&document(&[&[0x14, 0, 0]], 1)), Err(Error::IntegerTooWide(4)));
        assert_eq!(decode(&document(&[&[0x24, 0, 0]], 1)), Err(Error::IntegerTooWide(4)));
        assert_eq!(decode(&document(&[&[0x21, 0, 0]], 1)), Err(Error::ExpectedReal));
    }

    #[test]
    fn test_decode_dictionary_duplicate_keys() {
        let bytes = document(&[
            // { k: 1, k: 2 }
            &[0xD2, 0x01, 0x01, 0x02, 0x03],
            &[0x51, b'k'],
            &[0x10, 0x01],
            &[0x10, 0x02],
        ], 1);
        let value = decode(&bytes).unwrap();
        let entries = value.as_dictionary().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.get("k"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_decode_dictionary_non_string_key() {
        let bytes = document(&[
            &[0xD1, 0x01, 0x01],
            &[0x10, 0x01],
        ], 1);
        assert_eq!(decode(&bytes), Err(Error::InvalidDictionaryKey));
    }

    #[test]
    fn test_decode_shared_objects_are_not_cycles() {
        // [ ["s"], ["s"] ] where both elements reference the same array object.
        let bytes = document(&[
            &[0xA2, 0x01, 0x01],
            &[0xA1, 0x02],
            &[0x51, b's'],
        ], 1);
        let nested = Value::Array(vec![Value::from("s")]);
        assert_eq!(decode(&bytes), Ok(Value::Array(vec![nested.clone(), nested])));
    }

    #[test]
    fn test_decode_self_reference() {
        let bytes = document(&[&[0xA1, 0x00]], 1);
        assert_eq!(decode(&bytes), Err(Error::CycleDetected));
    }

    #[test]
    fn test_decode_reference_out_of_range() {
        let bytes = document(&[&[0xA1, 0x05]], 1);
        assert_eq!(decode(&bytes), Err(Error::InvalidObjectReference));
    }

    #[test]
    fn test_decode_invalid_reference_size() {
        let bytes = document(&[&[0x09]], 0);
        assert_eq!(decode(&bytes), Err(Error::MissingOrInvalidTrailer));
    }

    #[test]
    fn test_decode_bad_header() {
        let mut bytes = document(&[&[0x09]], 1);
        bytes[7] = b'1';
        assert_eq!(decode(&bytes), Err(Error::UnsupportedVersion));
        bytes[0] = b'x';
        assert_eq!(decode(&bytes), Err(Error::MissingOrInvalidHeader));
    }

    /// Builds `length` arrays, each holding `fanout` references to the next, ending in `true`.
    /// Offsets are 4 bytes wide and references 2 bytes wide.
    fn array_chain(length: usize, fanout: u8) -> Vec<u8> {
        let mut bytes = b"bplist00".to_vec();
        let mut offsets = Vec::new();
        for index in 0 .. length {
            offsets.push(bytes.len() as u32);
            bytes.push(0xA0 | fanout);
            for _ in 0 .. fanout {
                bytes.extend_from_slice(&(index as u16 + 1).to_be_bytes());
            }
        }
        offsets.push(bytes.len() as u32);
        bytes.push(0x09);

        let table_offset = bytes.len() as u64;
        for offset in &offsets {
            bytes.extend_from_slice(&offset.to_be_bytes());
        }
        bytes.extend_from_slice(&[0, 0, 0, 0, 0, 0, 4, 2]);
        bytes.extend_from_slice(&(offsets.len() as u64).to_be_bytes());
        bytes.extend_from_slice(&0u64.to_be_bytes());
        bytes.extend_from_slice(&table_offset.to_be_bytes());
        bytes
    }

    #[test]
    fn test_decode_shared_chain() {
        let pair = Value::Array(vec![Value::Boolean(true), Value::Boolean(true)]);
        let middle = Value::Array(vec![pair.clone(), pair]);
        assert_eq!(
            decode(&array_chain(3, 2)),
            Ok(Value::Array(vec![middle.clone(), middle]))
        );
    }

    #[test]
    fn test_decode_shared_chain_expansion() {
        // 40 arrays of [next, next] would expand into 2^40 leaves.
        let bytes = array_chain(40, 2);
        assert!(bytes.len() < 512);
        assert_eq!(decode(&bytes), Err(Error::ObjectBudgetExceeded));
    }

    #[test]
    fn test_decode_nesting_limit() {
        let value = decode(&array_chain(MAX_NESTING_DEPTH, 1)).unwrap();
        assert!(value.as_array().is_some());

        assert_eq!(decode(&array_chain(MAX_NESTING_DEPTH + 1, 1)), Err(Error::NestingTooDeep));
        assert_eq!(decode(&array_chain(20_000, 1)), Err(Error::NestingTooDeep));
    }
}
