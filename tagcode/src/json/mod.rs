//! JSON text over the same descriptors as the binary codec.
//!
//! Output is conventional JSON. Records become objects keyed by the
//! descriptor's member names; maps become objects whose keys are the
//! scalar key rendered as a JSON string; number text uses the shortest
//! digit string that round-trips exactly. Parsing is name-based and
//! tolerant: object keys in any order, declared fields may be absent
//! (they default-initialize), unknown keys are skipped, and whitespace is
//! accepted anywhere whether or not the text was pretty-printed.
//!
//! # Example
//!
//! ```
//! use tagcode::{record, Descriptor, Value};
//!
//! let desc = record! {
//!     id: Descriptor::uint32(),
//!     name: Descriptor::string(),
//! };
//! let value = Value::Record(vec![Value::U32(7), Value::Str("ada".into())]);
//!
//! let text = tagcode::json::to_string(&desc, &value).unwrap();
//! assert_eq!(text, r#"{"id":7,"name":"ada"}"#);
//!
//! // Field order and unknown keys don't matter on the way back in.
//! let reordered = r#"{ "name": "ada", "extra": [1, {}], "id": 7 }"#;
//! assert_eq!(tagcode::json::from_str(&desc, reordered).unwrap(), value);
//! ```
use crate::{
    adapter::{Dictionary, Sequence},
    config::Config,
    context::Context,
    desc::Descriptor,
    error::{destination_too_small, invalid_value, null_not_permitted, Result},
    ledger::Ledger,
    value::Value,
};

mod read;
mod write;

use {read::JsonReader, write::JsonOut};

/// Composable JSON writer: begin, drive field operations, finish.
///
/// Top-level values are separated by newlines. The first failing
/// operation poisons the writer and `finish` discards all partial text.
pub struct Writer {
    ctx: Context,
    out: JsonOut,
    count: usize,
}

impl Writer {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            ctx: Context::new(config),
            out: JsonOut::new(false),
            count: 0,
        }
    }

    /// Pretty-printing mode: two-space indentation and newlines.
    pub fn pretty() -> Self {
        Self::pretty_with_config(Config::default())
    }

    pub fn pretty_with_config(config: Config) -> Self {
        Self {
            ctx: Context::new(config),
            out: JsonOut::new(true),
            count: 0,
        }
    }

    pub fn value(&mut self, desc: &Descriptor, value: &Value) -> Result<()> {
        self.op(|ctx, out| write::write_value(ctx, out, desc, value))
    }

    pub fn seq<C: Sequence + ?Sized>(&mut self, desc: &Descriptor, seq: &C) -> Result<()> {
        self.op(|ctx, out| write::write_seq(ctx, out, desc, seq))
    }

    pub fn map<D: Dictionary + ?Sized>(&mut self, desc: &Descriptor, map: &D) -> Result<()> {
        self.op(|ctx, out| write::write_map(ctx, out, desc, map))
    }

    /// The accumulated text on success, the first error otherwise.
    pub fn finish(self) -> Result<String> {
        if let Some(err) = self.ctx.error() {
            return Err(err.clone());
        }
        Ok(self.out.into_string())
    }

    fn op(&mut self, f: impl FnOnce(&mut Context, &mut JsonOut) -> Result<()>) -> Result<()> {
        self.ctx.guard()?;
        let mark = self.out.len();
        if self.count > 0 {
            self.out.push('\n');
        }
        match f(&mut self.ctx, &mut self.out) {
            Ok(()) => {
                self.count += 1;
                Ok(())
            }
            Err(err) => {
                self.out.truncate_to(mark);
                Err(self.ctx.fail(err))
            }
        }
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

/// Composable JSON parser.
///
/// Parsed values accumulate inside the parser and are released only by a
/// successful [`Parser::finish`]; on failure the allocation ledger is
/// unwound and the caller receives nothing.
pub struct Parser<'a> {
    ctx: Context,
    rd: JsonReader<'a>,
    ledger: Ledger,
    values: Vec<Value>,
}

impl<'a> Parser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::with_config(text, Config::default())
    }

    pub fn with_config(text: &'a str, config: Config) -> Self {
        Self {
            ctx: Context::new(config),
            rd: JsonReader::new(text),
            ledger: Ledger::new(),
            values: Vec::new(),
        }
    }

    /// Parse one value and buffer it for [`Parser::finish`].
    pub fn value(&mut self, desc: &Descriptor) -> Result<()> {
        self.ctx.guard()?;
        match read::parse_value(&mut self.ctx, &mut self.rd, &mut self.ledger, desc) {
            Ok(value) => {
                self.values.push(value);
                Ok(())
            }
            Err(err) => Err(self.ctx.fail(err)),
        }
    }

    /// Close the context. Trailing non-whitespace is an error.
    pub fn finish(mut self) -> Result<Vec<Value>> {
        if self.ctx.error().is_none() && !self.rd.at_end() {
            self.ctx.fail(invalid_value("trailing characters after document"));
        }
        let Self {
            ctx,
            ledger,
            values,
            ..
        } = self;
        match ctx.error() {
            Some(err) => {
                let err = err.clone();
                ledger.unwind();
                Err(err)
            }
            None => {
                ledger.discard();
                Ok(values)
            }
        }
    }
}

/// Render one value as compact JSON.
pub fn to_string(desc: &Descriptor, value: &Value) -> Result<String> {
    let mut w = Writer::new();
    w.value(desc, value)?;
    w.finish()
}

/// Render one value with indentation and newlines.
pub fn to_string_pretty(desc: &Descriptor, value: &Value) -> Result<String> {
    let mut w = Writer::pretty();
    w.value(desc, value)?;
    w.finish()
}

/// Render an adapter-backed sequence as compact JSON.
pub fn seq_to_string<C: Sequence + ?Sized>(desc: &Descriptor, seq: &C) -> Result<String> {
    let mut w = Writer::new();
    w.seq(desc, seq)?;
    w.finish()
}

/// Render an adapter-backed sequence with indentation and newlines.
pub fn seq_to_string_pretty<C: Sequence + ?Sized>(desc: &Descriptor, seq: &C) -> Result<String> {
    let mut w = Writer::pretty();
    w.seq(desc, seq)?;
    w.finish()
}

/// Render an adapter-backed dictionary as compact JSON.
pub fn map_to_string<D: Dictionary + ?Sized>(desc: &Descriptor, map: &D) -> Result<String> {
    let mut w = Writer::new();
    w.map(desc, map)?;
    w.finish()
}

/// Render an adapter-backed dictionary with indentation and newlines.
pub fn map_to_string_pretty<D: Dictionary + ?Sized>(desc: &Descriptor, map: &D) -> Result<String> {
    let mut w = Writer::pretty();
    w.map(desc, map)?;
    w.finish()
}

/// Parse one value. All-or-nothing: a failure unwinds every registered
/// construction and returns nothing.
pub fn from_str(desc: &Descriptor, text: &str) -> Result<Value> {
    let mut ctx = Context::new(Config::default());
    let mut rd = JsonReader::new(text);
    let mut ledger = Ledger::new();
    match read::parse_value(&mut ctx, &mut rd, &mut ledger, desc) {
        Ok(_) if !rd.at_end() => {
            ledger.unwind();
            Err(invalid_value("trailing characters after document"))
        }
        Ok(value) => {
            ledger.discard();
            Ok(value)
        }
        Err(err) => {
            ledger.unwind();
            Err(err)
        }
    }
}

/// Parse a JSON array into a caller-supplied sequence. The text is fully
/// validated before the destination is touched.
pub fn seq_from_str_into<C: Sequence + ?Sized>(
    desc: &Descriptor,
    text: &str,
    dst: &mut C,
) -> Result<()> {
    let items = match from_str(desc, text)? {
        Value::List(items) => items,
        Value::Null => return Err(null_not_permitted()),
        _ => return Err(invalid_value("sequence descriptor produced a non-sequence value")),
    };
    if let Some(capacity) = dst.capacity() {
        let needed = dst.len() + items.len();
        if needed > capacity {
            return Err(destination_too_small(needed, capacity));
        }
    }
    for item in items {
        dst.append(item)?;
    }
    Ok(())
}

/// Parse a JSON object into a caller-supplied dictionary.
pub fn map_from_str_into<D: Dictionary + ?Sized>(
    desc: &Descriptor,
    text: &str,
    dst: &mut D,
) -> Result<()> {
    let pairs = match from_str(desc, text)? {
        Value::Map(pairs) => pairs,
        Value::Null => return Err(null_not_permitted()),
        _ => return Err(invalid_value("map descriptor produced a non-map value")),
    };
    for (key, value) in pairs {
        dst.insert_pair(key, value)?;
    }
    Ok(())
}
