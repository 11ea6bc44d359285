//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use std::convert::TryFrom;

use crate::document::{
    bytes_needed,
    Trailer,
    HEADER_BPLIST00,
    TRAILER_FIELD_UNUSED_SIZE,
    TRAILER_PREAMBLE_UNUSED_SIZE,
    TRAILER_SIZE,
};
use crate::error::{Error, Result};
use crate::ser::object::push_be_n;

/// Appends one 8-byte trailer field, of which only the low 32 bits may be non-zero.
fn push_trailer_field(buffer: &mut Vec<u8>, value: usize) -> Result<()> {
    let value = u32::try_from(value).map_err(|_| Error::DocumentTooLarge)?;
    buffer.extend_from_slice(&[0u8; TRAILER_FIELD_UNUSED_SIZE]);
    buffer.extend_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Appends the fixed-sized 32-byte trailer.
pub fn push_trailer(buffer: &mut Vec<u8>, trailer: &Trailer) -> Result<()> {
    buffer.extend_from_slice(&[0u8; TRAILER_PREAMBLE_UNUSED_SIZE]);
    buffer.push(trailer.offset_table_entry_size as u8);
    buffer.push(trailer.object_reference_size as u8);
    push_trailer_field(buffer, trailer.number_of_objects)?;
    push_trailer_field(buffer, trailer.root_object)?;
    push_trailer_field(buffer, trailer.offset_table_offset)?;
    Ok(())
}

/// Lays out a complete document from an object table whose root is object 0.
///
/// Objects are written in index order directly after the header, followed by an offset
/// table sized to the largest offset it records and finally the trailer.
pub fn assemble(object_table: &[Vec<u8>], object_reference_size: usize) -> Result<Vec<u8>> {
    let objects_size = object_table.iter().map(Vec::len).sum::<usize>();
    let mut buffer = Vec::with_capacity(HEADER_BPLIST00.len() + objects_size + TRAILER_SIZE);
    buffer.extend_from_slice(HEADER_BPLIST00);

    let mut offsets = Vec::with_capacity(object_table.len());
    for object in object_table {
        offsets.push(buffer.len());
        buffer.extend_from_slice(object);
    }

    let offset_table_offset = buffer.len();
    let offset_table_entry_size = bytes_needed(offset_table_offset as u64);
    buffer.reserve(offsets.len() * offset_table_entry_size + TRAILER_SIZE);
    for offset in offsets {
        push_be_n(&mut buffer, offset_table_entry_size, offset as u64);
    }

    push_trailer(&mut buffer, &Trailer {
        offset_table_entry_size,
        object_reference_size,
        number_of_objects: object_table.len(),
        root_object: 0,
        offset_table_offset,
    })?;
    Ok(buffer)
}
