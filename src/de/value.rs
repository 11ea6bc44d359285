//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! A decoded `Value` tree doubles as a serde `Deserializer`, which is how
//! documents are deserialized into arbitrary Rust types.

use serde::de::{
    self,
    DeserializeSeed,
    IntoDeserializer,
    MapAccess,
    SeqAccess,
    Visitor,
};

use std::vec;

use crate::de::date;
use crate::error::{Error, Result};
use crate::value::Value;

impl<'de> de::Deserializer<'de> for Value {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self {
            Value::Null =>
                visitor.visit_unit(),
            Value::Boolean(value) =>
                visitor.visit_bool(value),
            Value::Integer(value) =>
                visitor.visit_i64(value),
            Value::Real(value) =>
                visitor.visit_f64(value.into_inner()),
            Value::Data(bytes) =>
                visitor.visit_byte_buf(bytes),
            Value::String(string) =>
                visitor.visit_string(string),

            // A date value is deserialized as a Date type via map access object.
            Value::Date(date) => {
                let deserializer = DateDeserializer::new(date.absolute_time.into_inner());
                visitor.visit_map(deserializer)
            }

            // Arrays are processed through a sequence access object.
            Value::Array(elements) =>
                visitor.visit_seq(ArraySequence::new(elements)),

            // Dictionaries are processed through a map access object.
            Value::Dictionary(entries) =>
                visitor.visit_map(DictionarySequence::new(entries.into_iter().collect())),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self {
            Value::Null => visitor.visit_none(),
            other => visitor.visit_some(other),
        }
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    /// Unit variants are read from strings.
    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self {
            Value::String(variant) =>
                visitor.visit_enum(variant.into_deserializer()),
            other =>
                Err(de::Error::custom(format!("expected enum variant name, found {}", other.kind_name()))),
        }
    }

    serde::forward_to_deserialize_any! {
        bool
        u8 u16 u32 u64 u128
        i8 i16 i32 i64 i128
        f32 f64
        char str string
        seq map
        bytes byte_buf
        struct
        unit unit_struct
        tuple tuple_struct
        ignored_any
        identifier
    }

}

impl<'de> IntoDeserializer<'de, Error> for Value {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self::Deserializer {
        self
    }
}

/// Access object to process the elements in an Array.
struct ArraySequence {
    elements: vec::IntoIter<Value>,
}

impl ArraySequence {
    fn new(elements: Vec<Value>) -> Self {
        ArraySequence {
            elements: elements.into_iter()
        }
    }
}

impl<'de> SeqAccess<'de> for ArraySequence {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        if let Some(element) = self.elements.next() {
            seed.deserialize(element).map(Some)
        } else {
            Ok(None)
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.elements.len())
    }
}

/// Access object used to process the elements in a Dictionary.
struct DictionarySequence {
    key_value_pairs: vec::IntoIter<(String, Value)>,
    current_value: Option<Value>,
}

impl DictionarySequence {
    fn new(list: Vec<(String, Value)>) -> Self {
        DictionarySequence {
            key_value_pairs: list.into_iter(),
            current_value: None,
        }
    }
}

impl<'de> MapAccess<'de> for DictionarySequence {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        // Advance the iterator to obtain the next key-value pair.
        if let Some((key, value)) = self.key_value_pairs.next() {
            self.current_value = Some(value);
            seed.deserialize(key.into_deserializer()).map(Some)
        } else {
            Ok(None)
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        match self.current_value.take() {
            Some(value) => seed.deserialize(value),
            None => Err(de::Error::custom("value requested before key")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.key_value_pairs.len())
    }
}

/// Access object to provide a Map around a Date-type pseudo-structure.
struct DateDeserializer {
    visited: bool,
    absolute_time: f64,
}

impl DateDeserializer {
    fn new(absolute_time: f64) -> Self {
        DateDeserializer {
            absolute_time,
            visited: false,
        }
    }
}

impl<'de> MapAccess<'de> for DateDeserializer {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de> {
        if self.visited {
            Ok(None)
        } else {
            self.visited = true;
            seed.deserialize(date::STRUCT_FIELD.into_deserializer()).map(Some)
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de> {
        seed.deserialize(self.absolute_time.into_deserializer())
    }
}
