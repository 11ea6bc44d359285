//
// Copyright 2020 bplist Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.
//

//! Encoder and decoder for binary property list (`bplist00`) documents.
//!
//! ```no_run
//! let value = bplist::Value::from(vec![
//!     bplist::Value::from("hello"),
//!     bplist::Value::from(42i64),
//! ]);
//! let bytes = bplist::encode(&value).unwrap();
//! assert_eq!(bplist::decode(&bytes).unwrap(), value);
//! ```

mod de;
mod document;
mod error;
mod ser;

pub mod value;
pub use value::{Date, Dictionary, Value};

pub use de::{decode, decode_reader, from_slice};
pub use error::{Error, Result};
pub use ser::{encode, encode_to_writer, encode_with, EncodeOptions, NullValues};
