//! tagcode is a descriptor-driven data-interchange engine: one immutable,
//! runtime-built description of a data shape drives encoding and decoding
//! against two wire formats, a compact self-describing binary format and
//! JSON text, with no per-type generated code.
//!
//! # Quickstart
//!
//! Build a [`Descriptor`] once, then drive values through either codec.
//!
//! ```
//! use tagcode::{record, Descriptor, Value};
//!
//! let desc = record! {
//!     id: Descriptor::uint64(),
//!     name: Descriptor::string(),
//!     scores: Descriptor::list(Descriptor::float64()),
//! };
//!
//! let value = Value::Record(vec![
//!     Value::U64(7),
//!     Value::Str("ada".into()),
//!     Value::List(vec![Value::F64(2.5), Value::F64(4.0)]),
//! ]);
//!
//! // Binary: tag-prefixed, little-endian, end-marker framed.
//! let bytes = tagcode::binary::encode(&desc, &value).unwrap();
//! assert_eq!(tagcode::binary::decode(&desc, &bytes).unwrap(), value);
//!
//! // JSON: same descriptor, human-readable wire.
//! let text = tagcode::json::to_string(&desc, &value).unwrap();
//! assert_eq!(tagcode::json::from_str(&desc, &text).unwrap(), value);
//! ```
//!
//! # Schema evolution
//!
//! Binary decoding is positional against the descriptor list: appending
//! trailing fields to a record keeps old data readable (the new fields
//! default-initialize), and dropping trailing fields keeps new data
//! readable (the remainder is decoded and discarded value by value). JSON
//! decoding is name-based and tolerates reordered, missing, and unknown
//! object keys.
//!
//! ```
//! use tagcode::{record, Descriptor, Value};
//!
//! let v1 = record! { id: Descriptor::uint64() };
//! let v2 = record! { id: Descriptor::uint64(), tag: Descriptor::string().nullable() };
//!
//! let old_bytes = tagcode::binary::encode(&v1, &Value::Record(vec![Value::U64(1)])).unwrap();
//! assert_eq!(
//!     tagcode::binary::decode(&v2, &old_bytes).unwrap(),
//!     Value::Record(vec![Value::U64(1), Value::Null]),
//! );
//! ```
//!
//! # Containers and transactional decoding
//!
//! Arbitrary container back ends plug in through the [`Sequence`] and
//! [`Dictionary`] adapter traits; the same wire data can decode into a
//! `Vec`, a `VecDeque`, a `LinkedList`, a capacity-bounded
//! [`FixedArray`], or any dictionary. Decoding is all-or-nothing: custom
//! constructions are rolled back through the [`Ledger`] when a decode
//! fails partway.

pub mod adapter;
pub mod binary;
pub mod config;
mod context;
pub mod desc;
pub mod error;
pub mod io;
pub mod json;
pub mod ledger;
pub mod value;

#[cfg(feature = "serde")]
mod ser;

pub use {
    adapter::{Dictionary, FixedArray, Sequence},
    config::Config,
    desc::{Construct, Descriptor, Field, Kind, Shape},
    error::{Error, Result},
    ledger::Ledger,
    value::{MapKey, Value},
};
