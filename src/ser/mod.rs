//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Write;

use log::{debug, trace};

use crate::document::{bytes_needed, MAX_NESTING_DEPTH};
use crate::error::{Error, Result};
use crate::value::Value;

mod document;
mod object;

/// How the encoder treats dictionary entries whose value is `Value::Null`.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum NullValues {
    /// Leave the entry out of the encoded dictionary.
    Drop,
    /// Fail with `Error::NullDictionaryValue`.
    Reject,
}

impl Default for NullValues {
    fn default() -> Self {
        NullValues::Drop
    }
}

/// Options controlling how a value tree is encoded.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct EncodeOptions {
    pub null_values: NullValues,
}

impl EncodeOptions {

    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the handling of null dictionary values.
    pub fn null_values(mut self, null_values: NullValues) -> Self {
        self.null_values = null_values;
        self
    }

}

/// Returns `value` with null dictionary values handled according to `policy`.
///
/// The input is never modified. A copy is made only when an entry has to be dropped.
fn without_null_values(value: &Value, policy: NullValues) -> Result<Cow<'_, Value>> {
    match value {
        Value::Array(elements) => {
            let cleaned = elements
                .iter()
                .map(|element| without_null_values(element, policy))
                .collect::<Result<Vec<_>>>()?;
            if cleaned.iter().all(|element| matches!(element, Cow::Borrowed(_))) {
                Ok(Cow::Borrowed(value))
            } else {
                Ok(Cow::Owned(Value::Array(cleaned.into_iter().map(Cow::into_owned).collect())))
            }
        }

        Value::Dictionary(entries) => {
            let mut changed = false;
            let mut cleaned = Vec::with_capacity(entries.len());
            for (key, entry) in entries {
                if entry.is_null() {
                    match policy {
                        NullValues::Reject =>
                            return Err(Error::NullDictionaryValue(key.clone())),
                        NullValues::Drop => {
                            trace!("dropping null value for key {:?}", key);
                            changed = true;
                            continue;
                        }
                    }
                }
                let entry = without_null_values(entry, policy)?;
                changed |= matches!(entry, Cow::Owned(_));
                cleaned.push((key, entry));
            }
            if changed {
                Ok(Cow::Owned(Value::Dictionary(
                    cleaned
                        .into_iter()
                        .map(|(key, entry)| (key.clone(), entry.into_owned()))
                        .collect()
                )))
            } else {
                Ok(Cow::Borrowed(value))
            }
        }

        _ =>
            Ok(Cow::Borrowed(value)),
    }
}

/// Whether no chain of nested arrays and dictionaries in `value` is longer than `depth`.
fn nesting_within(value: &Value, depth: usize) -> bool {
    match value {
        Value::Array(elements) =>
            depth > 0 && elements.iter().all(|element| nesting_within(element, depth - 1)),
        Value::Dictionary(entries) =>
            depth > 0 && entries.values().all(|entry| nesting_within(entry, depth - 1)),
        _ =>
            true,
    }
}

/// Upper bound on the number of object references the containers in `value` hold.
///
/// Arrays contribute one reference per element and dictionaries two per entry, plus
/// whatever their nested containers contribute.
fn count_object_refs(value: &Value) -> u64 {
    match value {
        Value::Array(elements) =>
            elements.len() as u64 + elements.iter().map(count_object_refs).sum::<u64>(),
        Value::Dictionary(entries) =>
            entries.len() as u64 * 2 + entries.values().map(count_object_refs).sum::<u64>(),
        _ =>
            0,
    }
}

/// Working state for a single encode call.
struct Encoder {
    /// Serialized objects, indexed by object reference.
    object_table: Vec<Vec<u8>>,
    /// Object references of strings already written.
    unique_table: HashMap<String, usize>,
    /// Width of every object reference written into a container.
    object_reference_size: usize,
}

impl Encoder {

    fn new(object_reference_size: usize) -> Self {
        Encoder {
            object_table: Vec::new(),
            unique_table: HashMap::new(),
            object_reference_size,
        }
    }

    /// Claims the next object reference. The slot is filled once the object is serialized.
    fn reserve_slot(&mut self) -> usize {
        self.object_table.push(Vec::new());
        self.object_table.len() - 1
    }

    /// Adds a serialized object to the table and returns its reference.
    fn push(&mut self, bytes: Vec<u8>) -> usize {
        let slot = self.reserve_slot();
        self.fill(slot, bytes);
        slot
    }

    fn fill(&mut self, slot: usize, bytes: Vec<u8>) {
        trace!("object {}: {:#04x}, {} bytes", slot, bytes[0], bytes.len());
        self.object_table[slot] = bytes;
    }

    /// Writes a string, or returns the reference of an identical one already written.
    fn write_string(&mut self, string: &str) -> usize {
        if let Some(&existing) = self.unique_table.get(string) {
            return existing;
        }
        let slot = self.push(object::string(string));
        self.unique_table.insert(string.to_owned(), slot);
        slot
    }

    /// Serializes `value` and its children into the object table, returning its reference.
    ///
    /// Containers take their slot before any child so that a parent always precedes its
    /// children and the root is object 0.
    fn write(&mut self, value: &Value) -> usize {
        match value {
            Value::Null =>
                self.push(object::null()),
            Value::Boolean(value) =>
                self.push(object::boolean(*value)),
            Value::Integer(value) =>
                self.push(object::integer(*value)),
            Value::Real(value) =>
                self.push(object::real(value.into_inner())),
            Value::Date(date) =>
                self.push(object::date(date.absolute_time.into_inner())),
            Value::Data(bytes) =>
                self.push(object::data(bytes)),
            Value::String(string) =>
                self.write_string(string),

            Value::Array(elements) => {
                let slot = self.reserve_slot();
                let references = elements
                    .iter()
                    .map(|element| self.write(element))
                    .collect::<Vec<_>>();
                let bytes = object::array(&references, self.object_reference_size);
                self.fill(slot, bytes);
                slot
            }

            Value::Dictionary(entries) => {
                let slot = self.reserve_slot();
                let keys = entries
                    .keys()
                    .map(|key| self.write_string(key))
                    .collect::<Vec<_>>();
                let values = entries
                    .values()
                    .map(|entry| self.write(entry))
                    .collect::<Vec<_>>();
                let bytes = object::dictionary(&keys, &values, self.object_reference_size);
                self.fill(slot, bytes);
                slot
            }
        }
    }

}

/// Encodes a value tree as a bplist00 document using the default options.
pub fn encode(root: &Value) -> Result<Vec<u8>> {
    encode_with(root, &EncodeOptions::default())
}

/// Encodes a value tree as a bplist00 document.
///
/// # Errors
///
/// Fails with `Error::NullDictionaryValue` when `options` reject null dictionary
/// values and one is present, with `Error::NestingTooDeep` when containers are nested
/// deeper than a decoder will accept, and with `Error::DocumentTooLarge` when the object
/// count or the offset table position does not fit the 32-bit trailer fields.
pub fn encode_with(root: &Value, options: &EncodeOptions) -> Result<Vec<u8>> {
    if !nesting_within(root, MAX_NESTING_DEPTH) {
        return Err(Error::NestingTooDeep);
    }
    let root = without_null_values(root, options.null_values)?;

    let object_refs = count_object_refs(&root);
    let object_reference_size = bytes_needed(object_refs);

    let mut encoder = Encoder::new(object_reference_size);
    let top_object = encoder.write(&root);
    debug_assert_eq!(top_object, 0);

    let encoded = document::assemble(&encoder.object_table, object_reference_size)?;
    debug!(
        "encoded {} objects ({} unique strings), reference size {}, {} bytes",
        encoder.object_table.len(),
        encoder.unique_table.len(),
        object_reference_size,
        encoded.len()
    );
    Ok(encoded)
}

/// Encodes a value tree using the default options and writes the document to `writer`.
///
/// The document is fully built before anything is written, so an encoding failure
/// leaves the writer untouched.
pub fn encode_to_writer<W: Write>(writer: &mut W, root: &Value) -> Result<()> {
    let encoded = encode(root)?;
    writer.write_all(&encoded)?;
    writer.flush()?;
    Ok(())
}
