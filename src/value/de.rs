//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

use serde::de;
use ordered_float::OrderedFloat;

use std::fmt;

use crate::de::date;
use crate::value::{Date, Dictionary, Value};

/// Deserialization of bplist values into an object model which supports
/// all values that can be losslessly read from and written into a bplist document.
/// This is implemented generically, meaning that substantially any serde format will be
/// able to deserialize into a bplist value. The notable exception is `Date`, which is
/// implemented as a single-entry map/struct with a magic key, and as such will only be
/// deserialized from a bplist value.
impl<'de> de::Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Value, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> de::Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any valid bplist value")
            }

            #[inline]
            fn visit_unit<E>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            #[inline]
            fn visit_none<E>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            #[inline]
            fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                de::Deserialize::deserialize(deserializer)
            }

            #[inline]
            fn visit_bool<E>(self, value: bool) -> Result<Value, E> {
                Ok(Value::Boolean(value))
            }

            #[inline]
            fn visit_i64<E>(self, value: i64) -> Result<Value, E> {
                Ok(Value::Integer(value))
            }

            #[inline]
            fn visit_u64<E>(self, value: u64) -> Result<Value, E>
            where
                E: de::Error {
                if value <= i64::max_value() as u64 {
                    Ok(Value::Integer(value as i64))
                } else {
                    Err(de::Error::custom("u64 value was too large"))
                }
            }

            #[inline]
            fn visit_f64<E>(self, value: f64) -> Result<Value, E> {
                Ok(Value::Real(OrderedFloat::from(value)))
            }

            #[inline]
            fn visit_str<E>(self, value: &str) -> Result<Value, E> {
                Ok(Value::String(value.into()))
            }

            #[inline]
            fn visit_string<E>(self, value: String) -> Result<Value, E> {
                Ok(Value::String(value))
            }

            #[inline]
            fn visit_bytes<E>(self, value: &[u8]) -> Result<Value, E> {
                Ok(Value::Data(value.into()))
            }

            #[inline]
            fn visit_byte_buf<E>(self, value: Vec<u8>) -> Result<Value, E> {
                Ok(Value::Data(value))
            }

            #[inline]
            fn visit_seq<V>(self, mut visitor: V) -> Result<Value, V::Error>
            where
                V: de::SeqAccess<'de>,
            {
                let mut vec = Vec::with_capacity(visitor.size_hint().unwrap_or(0));
                while let Some(elem) = visitor.next_element()? {
                    vec.push(elem);
                }
                Ok(Value::Array(vec))
            }

            fn visit_map<V>(self, mut visitor: V) -> Result<Value, V::Error>
            where
                V: de::MapAccess<'de>,
            {
                let mut map = Dictionary::new();

                // Dates are identified by a special key.
                let mut key: Option<String> = visitor.next_key()?;
                if let Some(ref name) = key {
                    if name == date::STRUCT_FIELD {
                        let date::AbsoluteTime(seconds) = visitor.next_value()?;
                        return Ok(Value::Date(Date::from_absolute_time(seconds)));
                    }
                }

                // Process all key-value pairs checking for duplicates.
                while let Some(k) = key {
                    if map.contains_key(&k) {
                        let msg = format!("duplicate key: `{}`", k);
                        return Err(de::Error::custom(msg));
                    }
                    let v = visitor.next_value()?;
                    map.insert(k, v);
                    key = visitor.next_key()?;
                }

                Ok(Value::Dictionary(map))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}
