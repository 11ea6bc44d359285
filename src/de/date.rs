//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Dates have no counterpart in the serde data model. They travel as a struct with
//! a single field, where both the struct name and the field name are reserved, so
//! a date can be told apart from an ordinary dictionary on the way back in.

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};

use std::fmt;

use crate::value::Date;

pub const STRUCT_NAME: &str = "$__bplist_private_Date";

pub const STRUCT_FIELD: &str = "$__bplist_private_Date_absolute_time";

/// The reserved field name. Any other key is an error.
struct AbsoluteTimeField;

impl<'de> Deserialize<'de> for AbsoluteTimeField {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let field = String::deserialize(deserializer)?;
        if field == STRUCT_FIELD {
            Ok(AbsoluteTimeField)
        } else {
            Err(de::Error::unknown_field(&field, &[STRUCT_FIELD]))
        }
    }
}

/// Seconds from the Core Data epoch, accepted from any numeric representation.
pub struct AbsoluteTime(pub f64);

impl<'de> Deserialize<'de> for AbsoluteTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SecondsVisitor;

        impl<'de> Visitor<'de> for SecondsVisitor {
            type Value = AbsoluteTime;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("seconds since 1 January 2001")
            }

            fn visit_f64<E: de::Error>(self, seconds: f64) -> Result<AbsoluteTime, E> {
                Ok(AbsoluteTime(seconds))
            }

            fn visit_i64<E: de::Error>(self, seconds: i64) -> Result<AbsoluteTime, E> {
                Ok(AbsoluteTime(seconds as f64))
            }

            fn visit_u64<E: de::Error>(self, seconds: u64) -> Result<AbsoluteTime, E> {
                Ok(AbsoluteTime(seconds as f64))
            }
        }

        deserializer.deserialize_f64(SecondsVisitor)
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DateVisitor;

        impl<'de> Visitor<'de> for DateVisitor {
            type Value = Date;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a date")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Date, A::Error>
            where
                A: MapAccess<'de>,
            {
                match map.next_key::<AbsoluteTimeField>()? {
                    Some(_) => {
                        let AbsoluteTime(seconds) = map.next_value()?;
                        Ok(Date::from_absolute_time(seconds))
                    }
                    None =>
                        Err(de::Error::missing_field(STRUCT_FIELD)),
                }
            }
        }

        deserializer.deserialize_struct(STRUCT_NAME, &[STRUCT_FIELD], DateVisitor)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use crate::value::{Date, Value};

    #[test]
    fn test_date_through_json() {
        let date = Date::from_absolute_time(-86400.25);
        let json = serde_json::to_value(&date).unwrap();
        let mut expected = serde_json::Map::new();
        expected.insert(String::from(super::STRUCT_FIELD), serde_json::json!(-86400.25));
        assert_eq!(json, serde_json::Value::Object(expected));
        assert_eq!(Date::deserialize(json.clone()).unwrap(), date);
        assert_eq!(Value::deserialize(json).unwrap(), Value::Date(date));
    }

    #[test]
    fn test_date_rejects_other_fields() {
        assert!(Date::deserialize(serde_json::json!({ "seconds": 1.0 })).is_err());
        assert!(Date::deserialize(serde_json::json!({})).is_err());
    }
}
