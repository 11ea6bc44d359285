//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! # The bplist value model.
//!
//! The bplist format version 00 supports the following object kinds:
//!
//! 1. Null.
//! 2. Boolean.
//! 3. Integers, up to 64 bits long.
//! 4. Real, single- and double-precision.
//! 5. Date.
//! 6. Data.
//! 7. String.
//! 8. Array.
//! 9. Dictionary.
//!
//! # References
//!
//! 1. https://github.com/opensource-apple/CF/blob/master/ForFoundationOnly.h
//! 2. https://opensource.apple.com/source/CF/CF-855.17/CFBinaryPList.c

use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;
use ordered_float::OrderedFloat;

mod de;
mod ser;

/// Seconds between the Unix epoch and the Core Data epoch.
const UNIX_TO_APPLE_EPOCH_SECONDS: i64 = 978_307_200;

/// A date structure roughly equivalent to an `NSDate`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Date {
    /// A double-precision 64-bit offset, in seconds, from the Core Data Epoch.
    /// This is defined as 1 January 2001, 00:00:00 UTC.
    pub absolute_time: OrderedFloat<f64>,
}

impl Date {

    /// Creates a date the given number of seconds after 1 January 2001, 00:00:00 UTC.
    pub fn from_absolute_time(absolute_time: f64) -> Self {
        Date { absolute_time: OrderedFloat(absolute_time) }
    }

    /// The Core Data epoch itself.
    pub fn apple_epoch() -> DateTime<Utc> {
        DateTime::<Utc>::default() + chrono::Duration::seconds(UNIX_TO_APPLE_EPOCH_SECONDS)
    }

    /// Converts an instant into an offset from the Core Data epoch.
    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        let since_epoch = instant.signed_duration_since(Self::apple_epoch());
        let seconds = since_epoch.num_seconds();
        let nanos = (since_epoch - chrono::Duration::seconds(seconds))
            .num_nanoseconds()
            .unwrap_or(0);
        Date::from_absolute_time(seconds as f64 + nanos as f64 / 1e9)
    }

    /// Converts the offset back into an instant, if it is representable.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let absolute_time = self.absolute_time.into_inner();
        if !absolute_time.is_finite() {
            return None;
        }
        let seconds = absolute_time.floor();
        let nanos = ((absolute_time - seconds) * 1e9).round() as i64;
        let seconds = (seconds as i64).checked_add(UNIX_TO_APPLE_EPOCH_SECONDS)?;
        Utc.timestamp_opt(seconds, 0).single()?
            .checked_add_signed(chrono::Duration::nanoseconds(nanos))
    }

}

impl From<DateTime<Utc>> for Date {
    fn from(instant: DateTime<Utc>) -> Self {
        Date::from_datetime(instant)
    }
}

/// An array of values roughly equivalent to an `NSArray`.
pub type Array = Vec<Value>;

/// A map of string keys to values roughly equivalent to an `NSDictionary`.
///
/// Entries keep the order in which they were inserted or decoded. Two dictionaries
/// compare equal when they hold the same entries, regardless of that order.
pub type Dictionary = IndexMap<String, Value>;

/// Represents any value which can be encoded in a binary property list.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Value {
    /// Represents the bplist null marker, like `NSNull`.
    Null,

    /// Represents a bplist boolean, like `NSNumber`.
    Boolean(bool),

    /// Represents a bplist integral value of up to 64 bits, like `NSNumber`.
    Integer(i64),

    /// Represents a bplist floating-point value, like `NSNumber`.
    ///
    /// Unlike normal `f64` values, these values have a defined order, implementing
    /// `Eq` in addition to `PartialEq`.
    Real(OrderedFloat<f64>),

    /// Represents a bplist date, like `NSDate`.
    ///
    /// Dates are encoded as `CFAbsoluteTime` values. This is a double-precision 64-bit
    /// offset, in seconds, from the Core Data Epoch, defined as 1 January 2001, 00:00:00 UTC.
    /// As serde does not have a built-in date type, this is treated as a custom type and
    /// deserialized as a structure.
    Date(Date),

    /// Represents a bplist data instance, like `NSData`.
    Data(Vec<u8>),

    /// Represents a bplist string, like `NSString`.
    String(String),

    /// Represents a bplist array of values, like `NSArray<id>`.
    Array(Array),

    /// Represents a bplist dictionary, like `NSDictionary<NSString*,id>`.
    Dictionary(Dictionary),
}

impl Value {

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(value) => Some(value.into_inner()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<Date> {
        match self {
            Value::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Value::Data(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Value::Dictionary(value) => Some(value),
            _ => None,
        }
    }

    /// A short name for the kind of value, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Date(_) => "date",
            Value::Data(_) => "data",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Dictionary(_) => "dictionary",
        }
    }

}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(OrderedFloat(value))
    }
}

impl From<Date> for Value {
    fn from(value: Date) -> Self {
        Value::Date(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Array> for Value {
    fn from(value: Array) -> Self {
        Value::Array(value)
    }
}

impl From<Dictionary> for Value {
    fn from(value: Dictionary) -> Self {
        Value::Dictionary(value)
    }
}

impl<K: Into<String>, V: Into<Value>> std::iter::FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Dictionary(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_epoch() {
        let date = Date::from_datetime(Date::apple_epoch());
        assert_eq!(date.absolute_time, OrderedFloat(0.0));
        assert_eq!(date.to_datetime(), Some(Date::apple_epoch()));
    }

    #[test]
    fn test_date_before_and_after_epoch() {
        let instant = Utc.timestamp_opt(UNIX_TO_APPLE_EPOCH_SECONDS + 90, 500_000_000).unwrap();
        let date = Date::from(instant);
        assert_eq!(date.absolute_time, OrderedFloat(90.5));
        assert_eq!(date.to_datetime(), Some(instant));

        let instant = Utc.timestamp_opt(0, 0).unwrap();
        let date = Date::from(instant);
        assert_eq!(date.absolute_time, OrderedFloat(-978307200.0));
        assert_eq!(date.to_datetime(), Some(instant));
    }

    #[test]
    fn test_dictionary_equality_ignores_order() {
        let forward: Value = vec![("a", 1i64), ("b", 2i64)].into_iter().collect();
        let backward: Value = vec![("b", 2i64), ("a", 1i64)].into_iter().collect();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert_eq!(Value::from(3i64).as_i64(), Some(3));
        assert_eq!(Value::from(true).as_str(), None);
        assert!(Value::Null.is_null());
        assert_eq!(Value::Data(vec![1, 2]).as_data(), Some(&[1u8, 2][..]));
    }
}
