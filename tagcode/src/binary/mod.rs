//! The self-describing binary wire format.
//!
//! Every value is prefixed by a one-byte kind tag; multi-byte payloads and
//! length fields are little-endian on the wire regardless of host order.
//! Records, lists and maps are closed by a reserved end marker, which is
//! what allows positional decoding to tolerate schema evolution: trailing
//! fields added to a schema default-initialize when decoding old data, and
//! unknown trailing fields in new data are decoded and discarded value by
//! value.
//!
//! # Example
//!
//! ```
//! use tagcode::{record, Descriptor, Value};
//!
//! let desc = record! {
//!     i: Descriptor::int32(),
//!     d: Descriptor::float64(),
//! };
//! let value = Value::Record(vec![Value::I32(100), Value::F64(2.5)]);
//!
//! let bytes = tagcode::binary::encode(&desc, &value).unwrap();
//! assert_eq!(tagcode::binary::decode(&desc, &bytes).unwrap(), value);
//! ```
use crate::{
    adapter::{Dictionary, Sequence},
    config::Config,
    context::Context,
    desc::Descriptor,
    error::{destination_too_small, invalid_value, null_not_permitted, Result},
    io::{Reader, WriteBuf},
    ledger::Ledger,
    value::Value,
};

mod decode;
mod encode;

/// Wire tag enumeration. `FALSE`/`TRUE` collapse tag and value into one
/// byte; `END` closes every record/list/map region.
pub(crate) mod tag {
    pub const FALSE: u8 = 0;
    pub const TRUE: u8 = 1;
    pub const I8: u8 = 2;
    pub const I16: u8 = 3;
    pub const I32: u8 = 4;
    pub const I64: u8 = 5;
    pub const U8: u8 = 6;
    pub const U16: u8 = 7;
    pub const U32: u8 = 8;
    pub const U64: u8 = 9;
    pub const F32: u8 = 10;
    pub const F64: u8 = 11;
    pub const STR: u8 = 12;
    pub const RECORD: u8 = 13;
    pub const LIST: u8 = 14;
    pub const MAP: u8 = 15;
    pub const NULL: u8 = 16;
    pub const END: u8 = 17;
}

/// Composable binary encoder: begin, drive field operations, finish.
///
/// The first failing operation poisons the encoder; every later operation
/// returns the stored error, and `finish` discards all partial output.
pub struct Encoder<'a> {
    ctx: Context,
    out: WriteBuf<'a>,
}

impl<'a> Encoder<'a> {
    /// Append to a growable buffer, leaving existing content in place.
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        Self::with_config(buf, Config::default())
    }

    pub fn with_config(buf: &'a mut Vec<u8>, config: Config) -> Self {
        Self {
            ctx: Context::new(config),
            out: WriteBuf::growable(buf),
        }
    }

    /// Fill a caller-supplied fixed buffer; overflow is an error, never a
    /// reallocation.
    pub fn fixed(buf: &'a mut [u8]) -> Self {
        Self::fixed_with_config(buf, Config::default())
    }

    pub fn fixed_with_config(buf: &'a mut [u8], config: Config) -> Self {
        Self {
            ctx: Context::new(config),
            out: WriteBuf::fixed(buf),
        }
    }

    /// Encode one value. A failed operation commits no bytes.
    pub fn value(&mut self, desc: &Descriptor, value: &Value) -> Result<()> {
        self.op(|ctx, out| encode::encode_value(ctx, out, desc, value))
    }

    /// Encode an adapter-backed sequence under a list/array descriptor.
    pub fn seq<C: Sequence + ?Sized>(&mut self, desc: &Descriptor, seq: &C) -> Result<()> {
        self.op(|ctx, out| encode::encode_seq(ctx, out, desc, seq))
    }

    /// Encode an adapter-backed dictionary under a map descriptor.
    pub fn map<D: Dictionary + ?Sized>(&mut self, desc: &Descriptor, map: &D) -> Result<()> {
        self.op(|ctx, out| encode::encode_map(ctx, out, desc, map))
    }

    /// Close the context: the number of bytes written on success, the
    /// first error (with all partial output discarded) otherwise.
    pub fn finish(mut self) -> Result<usize> {
        if let Some(err) = self.ctx.error() {
            let err = err.clone();
            self.out.rewind();
            return Err(err);
        }
        Ok(self.out.written())
    }

    fn op(
        &mut self,
        f: impl FnOnce(&mut Context, &mut WriteBuf<'a>) -> Result<()>,
    ) -> Result<()> {
        self.ctx.guard()?;
        let mark = self.out.written();
        match f(&mut self.ctx, &mut self.out) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.out.truncate_to(mark);
                Err(self.ctx.fail(err))
            }
        }
    }
}

/// Composable binary decoder.
///
/// Decoded values accumulate inside the decoder and are released only by
/// a successful [`Decoder::finish`]; on failure the allocation ledger is
/// unwound and the caller receives nothing.
pub struct Decoder<'de> {
    ctx: Context,
    rd: Reader<'de>,
    ledger: Ledger,
    values: Vec<Value>,
}

impl<'de> Decoder<'de> {
    pub fn new(bytes: &'de [u8]) -> Self {
        Self::with_config(bytes, Config::default())
    }

    pub fn with_config(bytes: &'de [u8], config: Config) -> Self {
        Self {
            ctx: Context::new(config),
            rd: Reader::new(bytes),
            ledger: Ledger::new(),
            values: Vec::new(),
        }
    }

    /// Decode one value and buffer it for [`Decoder::finish`].
    pub fn value(&mut self, desc: &Descriptor) -> Result<()> {
        self.ctx.guard()?;
        match decode::decode_value(&mut self.ctx, &mut self.rd, &mut self.ledger, desc) {
            Ok(value) => {
                self.values.push(value);
                Ok(())
            }
            Err(err) => Err(self.ctx.fail(err)),
        }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rd.remaining()
    }

    /// Close the context: all buffered values on success (the ledger is
    /// discarded), or the first error after the ledger has been unwound.
    pub fn finish(self) -> Result<Vec<Value>> {
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

/// Encode one value into a fresh growable buffer.
pub fn encode(desc: &Descriptor, value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.value(desc, value)?;
    enc.finish()?;
    Ok(buf)
}

/// Encode one value into a caller-supplied fixed buffer, returning the
/// number of bytes written.
pub fn encode_into(buf: &mut [u8], desc: &Descriptor, value: &Value) -> Result<usize> {
    let mut enc = Encoder::fixed(buf);
    enc.value(desc, value)?;
    enc.finish()
}

/// Encode an adapter-backed sequence into a fresh buffer.
pub fn encode_seq<C: Sequence + ?Sized>(desc: &Descriptor, seq: &C) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.seq(desc, seq)?;
    enc.finish()?;
    Ok(buf)
}

/// Encode an adapter-backed dictionary into a fresh buffer.
pub fn encode_map<D: Dictionary + ?Sized>(desc: &Descriptor, map: &D) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.map(desc, map)?;
    enc.finish()?;
    Ok(buf)
}

/// Decode one value. All-or-nothing: a failure unwinds every registered
/// construction and returns nothing.
pub fn decode(desc: &Descriptor, bytes: &[u8]) -> Result<Value> {
    decode_one(desc, bytes)
}

/// Decode a list/array into a caller-supplied sequence.
///
/// The wire data is fully validated before the destination is touched; a
/// destination with a fixed capacity smaller than the incoming element
/// count fails with [`Error::DestinationTooSmall`](crate::Error::DestinationTooSmall)
/// without appending anything. Use [`decode`] for nullable sequences.
pub fn decode_seq_into<C: Sequence + ?Sized>(
    desc: &Descriptor,
    bytes: &[u8],
    dst: &mut C,
) -> Result<()> {
    let items = match decode_one(desc, bytes)? {
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

/// Decode a map into a caller-supplied dictionary. Same contract as
/// [`decode_seq_into`]; duplicate keys in the wire data are rejected
/// before the destination is touched.
pub fn decode_map_into<D: Dictionary + ?Sized>(
    desc: &Descriptor,
    bytes: &[u8],
    dst: &mut D,
) -> Result<()> {
    let pairs = match decode_one(desc, bytes)? {
        Value::Map(pairs) => pairs,
        Value::Null => return Err(null_not_permitted()),
        _ => return Err(invalid_value("map descriptor produced a non-map value")),
    };
    for (key, value) in pairs {
        dst.insert_pair(key, value)?;
    }
    Ok(())
}

/// Begin → single operation → End.
fn decode_one(desc: &Descriptor, bytes: &[u8]) -> Result<Value> {
    let mut ctx = Context::new(Config::default());
    let mut rd = Reader::new(bytes);
    let mut ledger = Ledger::new();
    match decode::decode_value(&mut ctx, &mut rd, &mut ledger, desc) {
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

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            adapter::FixedArray,
            desc::{Construct, Field},
            record,
            value::MapKey,
            Error,
        },
        proptest::prelude::*,
        std::{
            collections::{BTreeMap, HashMap, LinkedList, VecDeque},
            sync::{
                atomic::{AtomicIsize, Ordering},
                Arc,
            },
        },
    };

    fn point_desc() -> Descriptor {
        record! {
            i: Descriptor::int32(),
            d: Descriptor::float64(),
        }
    }

    #[test]
    fn record_roundtrips_through_a_fixed_buffer() {
        let desc = point_desc();
        let value = Value::Record(vec![Value::I32(100), Value::F64(2.5)]);
        let mut buf = [0u8; 1024];
        let written = encode_into(&mut buf, &desc, &value).unwrap();
        assert!(written > 0);
        assert_eq!(decode(&desc, &buf[..written]).unwrap(), value);
    }

    #[test]
    fn booleans_collapse_tag_and_value() {
        let desc = Descriptor::bool();
        assert_eq!(encode(&desc, &Value::Bool(false)).unwrap(), [tag::FALSE]);
        assert_eq!(encode(&desc, &Value::Bool(true)).unwrap(), [tag::TRUE]);
    }

    #[test]
    fn scalars_are_little_endian_on_the_wire() {
        let bytes = encode(&Descriptor::uint32(), &Value::U32(0x01020304)).unwrap();
        assert_eq!(bytes, [tag::U32, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn strings_are_length_prefixed_without_terminator() {
        let bytes = encode(&Descriptor::string(), &Value::Str("hey".into())).unwrap();
        assert_eq!(bytes, [tag::STR, 3, 0, 0, 0, b'h', b'e', b'y']);
    }

    #[test]
    fn list_roundtrips() {
        let desc = Descriptor::list(Descriptor::int32());
        let value = Value::List((0..10).map(Value::I32).collect());
        let bytes = encode(&desc, &value).unwrap();
        assert_eq!(decode(&desc, &bytes).unwrap(), value);
    }

    #[test]
    fn adapter_and_value_list_encodings_are_identical() {
        let desc = Descriptor::list(Descriptor::int32());
        let items: Vec<Value> = (0..10).map(Value::I32).collect();
        let via_value = encode(&desc, &Value::List(items.clone())).unwrap();
        let via_adapter = encode_seq(&desc, &items).unwrap();
        assert_eq!(via_value, via_adapter);
    }

    #[test]
    fn map_decodes_into_a_fresh_dictionary() {
        let desc = Descriptor::map(Descriptor::int32(), Descriptor::fixed_string(100));
        let mut src: BTreeMap<MapKey, Value> = BTreeMap::new();
        for i in 0..10i64 {
            src.insert(MapKey::Int(i), Value::Str(format!("hello {i}")));
        }
        let bytes = encode_map(&desc, &src).unwrap();

        let mut dst: HashMap<MapKey, Value> = HashMap::new();
        decode_map_into(&desc, &bytes, &mut dst).unwrap();
        assert_eq!(dst.len(), 10);
        assert_eq!(dst.get(&MapKey::Int(5)), Some(&Value::Str("hello 5".into())));
    }

    #[test]
    fn cross_container_decode() {
        let desc = Descriptor::list(Descriptor::uint16());
        let src: VecDeque<Value> = (0..5u16).map(Value::U16).collect();
        let bytes = encode_seq(&desc, &src).unwrap();

        let mut as_vec: Vec<Value> = Vec::new();
        decode_seq_into(&desc, &bytes, &mut as_vec).unwrap();
        let mut as_linked: LinkedList<Value> = LinkedList::new();
        decode_seq_into(&desc, &bytes, &mut as_linked).unwrap();
        let mut as_fixed = FixedArray::new(5);
        decode_seq_into(&desc, &bytes, &mut as_fixed).unwrap();

        let expected: Vec<Value> = (0..5u16).map(Value::U16).collect();
        assert_eq!(as_vec, expected);
        assert_eq!(as_linked.into_iter().collect::<Vec<_>>(), expected);
        assert_eq!(as_fixed.as_slice(), &expected[..]);
    }

    #[test]
    fn fixed_destination_too_small_is_specific() {
        let desc = Descriptor::list(Descriptor::uint8());
        let items: Vec<Value> = (0..5u8).map(Value::U8).collect();
        let bytes = encode_seq(&desc, &items).unwrap();

        let mut dst = FixedArray::new(3);
        assert_eq!(
            decode_seq_into(&desc, &bytes, &mut dst),
            Err(Error::DestinationTooSmall { needed: 5, capacity: 3 })
        );
        // Nothing was appended.
        assert!(dst.is_empty());
    }

    #[test]
    fn array_descriptor_enforces_capacity_both_ways() {
        let items: Vec<Value> = (0..5u8).map(Value::U8).collect();
        let open = Descriptor::list(Descriptor::uint8());
        let bytes = encode_seq(&open, &items).unwrap();

        // Decode side: the declared count is checked before any element.
        let narrow = Descriptor::array(Descriptor::uint8(), 3);
        assert_eq!(
            decode(&narrow, &bytes),
            Err(Error::DestinationTooSmall { needed: 5, capacity: 3 })
        );

        // Encode side: the value cannot exceed the counted-length field.
        assert_eq!(
            encode(&narrow, &Value::List(items)),
            Err(Error::TooManyElements(5))
        );

        // A wide-enough array accepts the same wire data.
        let wide = Descriptor::array(Descriptor::uint8(), 8);
        let decoded = decode(&wide, &bytes).unwrap();
        assert_eq!(decoded.as_list().map(<[Value]>::len), Some(5));
    }

    #[test]
    fn fixed_string_capacity_is_enforced() {
        let bytes = encode(&Descriptor::string(), &Value::Str("abcdef".into())).unwrap();
        assert_eq!(
            decode(&Descriptor::fixed_string(4), &bytes),
            Err(Error::DestinationTooSmall { needed: 6, capacity: 4 })
        );
        assert_eq!(
            decode(&Descriptor::fixed_string(6), &bytes).unwrap(),
            Value::Str("abcdef".into())
        );
    }

    #[test]
    fn null_roundtrips_only_where_permitted() {
        let nullable = Descriptor::string().nullable();
        let bytes = encode(&nullable, &Value::Null).unwrap();
        assert_eq!(bytes, [tag::NULL]);
        assert_eq!(decode(&nullable, &bytes).unwrap(), Value::Null);

        assert_eq!(
            encode(&Descriptor::string(), &Value::Null),
            Err(Error::NullNotPermitted)
        );
        assert_eq!(
            decode(&Descriptor::string(), &bytes),
            Err(Error::NullNotPermitted)
        );
    }

    #[test]
    fn empty_container_is_empty_not_absent() {
        let desc = Descriptor::list(Descriptor::int8()).nullable();
        let empty = encode(&desc, &Value::List(Vec::new())).unwrap();
        let null = encode(&desc, &Value::Null).unwrap();
        assert_ne!(empty, null);
        assert_eq!(decode(&desc, &empty).unwrap(), Value::List(Vec::new()));
        assert_eq!(decode(&desc, &null).unwrap(), Value::Null);
    }

    #[test]
    fn new_schema_reads_old_data_with_defaults() {
        let old = record! {
            a: Descriptor::int32(),
            b: Descriptor::string(),
        };
        let new = record! {
            a: Descriptor::int32(),
            b: Descriptor::string(),
            c: Descriptor::float64(),
            d: Descriptor::list(Descriptor::uint8()).nullable(),
        };
        let bytes = encode(&old, &Value::Record(vec![Value::I32(7), Value::Str("x".into())]))
            .unwrap();
        let decoded = decode(&new, &bytes).unwrap();
        assert_eq!(
            decoded,
            Value::Record(vec![
                Value::I32(7),
                Value::Str("x".into()),
                Value::F64(0.0),
                Value::Null,
            ])
        );
    }

    #[test]
    fn old_schema_skips_new_trailing_fields() {
        let old = record! {
            a: Descriptor::int32(),
        };
        let new = record! {
            a: Descriptor::int32(),
            // Trailing additions exercise the recursive skipper: a nested
            // record, a list, a map, and a string.
            extra: record! {
                inner: Descriptor::string(),
                flag: Descriptor::bool(),
            },
            tail: Descriptor::list(Descriptor::float64()),
            lookup: Descriptor::map(Descriptor::string(), Descriptor::uint64()),
            note: Descriptor::string().nullable(),
        };
        let value = Value::Record(vec![
            Value::I32(42),
            Value::Record(vec![Value::Str("deep".into()), Value::Bool(true)]),
            Value::List(vec![Value::F64(1.5), Value::F64(-2.25)]),
            Value::Map(vec![(MapKey::Str("k".into()), Value::U64(9))]),
            Value::Null,
        ]);
        let bytes = encode(&new, &value).unwrap();
        let decoded = decode(&old, &bytes).unwrap();
        assert_eq!(decoded, Value::Record(vec![Value::I32(42)]));
    }

    #[test]
    fn prefix_roundtrip_is_stable_under_evolution() {
        // A ⊂ B: the common prefix survives A→B→A.
        let a = record! { x: Descriptor::uint16() };
        let b = record! { x: Descriptor::uint16(), y: Descriptor::uint16() };
        let bytes_a = encode(&a, &Value::Record(vec![Value::U16(3)])).unwrap();
        let as_b = decode(&b, &bytes_a).unwrap();
        let bytes_b = encode(&b, &as_b).unwrap();
        let back = decode(&a, &bytes_b).unwrap();
        assert_eq!(back, Value::Record(vec![Value::U16(3)]));
    }

    fn nested_list_desc(depth: usize) -> Descriptor {
        let mut desc = Descriptor::uint8();
        for _ in 0..depth {
            desc = Descriptor::list(desc);
        }
        desc
    }

    fn nested_list_value(depth: usize) -> Value {
        let mut value = Value::U8(1);
        for _ in 0..depth {
            value = Value::List(vec![value]);
        }
        value
    }

    #[test]
    fn nesting_depth_boundary() {
        let config = Config {
            max_depth: 4,
            ..Config::default()
        };

        // Exactly at the maximum: fine.
        let desc = nested_list_desc(4);
        let value = nested_list_value(4);
        let mut buf = Vec::new();
        let mut enc = Encoder::with_config(&mut buf, config.clone());
        enc.value(&desc, &value).unwrap();
        enc.finish().unwrap();
        let mut dec = Decoder::with_config(&buf, config.clone());
        dec.value(&desc).unwrap();
        assert_eq!(dec.finish().unwrap(), vec![value]);

        // One level deeper: the nesting-overflow error.
        let desc = nested_list_desc(5);
        let value = nested_list_value(5);
        let mut buf = Vec::new();
        let mut enc = Encoder::with_config(&mut buf, config.clone());
        assert_eq!(enc.value(&desc, &value), Err(Error::DepthExceeded(4)));
        assert_eq!(enc.finish(), Err(Error::DepthExceeded(4)));
        assert!(buf.is_empty());
    }

    #[test]
    fn skip_depth_is_bounded_too() {
        // Data written under a deep schema, decoded under a shallow record
        // schema that must skip the deep trailing field.
        let deep_field = nested_list_desc(6);
        let with_field = Descriptor::record(vec![
            Field::new("a", Descriptor::uint8()),
            Field::new("deep", deep_field),
        ]);
        let shallow = record! { a: Descriptor::uint8() };
        let value = Value::Record(vec![Value::U8(1), nested_list_value(6)]);
        let bytes = encode(&with_field, &value).unwrap();

        let config = Config {
            max_depth: 4,
            ..Config::default()
        };
        let mut dec = Decoder::with_config(&bytes, config);
        assert_eq!(dec.value(&shallow), Err(Error::DepthExceeded(4)));
    }

    #[test]
    fn nan_fails_before_any_byte_is_committed() {
        let desc = point_desc();
        let mut buf = vec![0xAB];
        let mut enc = Encoder::new(&mut buf);
        enc.value(&Descriptor::int8(), &Value::I8(1)).unwrap();
        let err = enc
            .value(&desc, &Value::Record(vec![Value::I32(1), Value::F64(f64::NAN)]))
            .unwrap_err();
        assert_eq!(err, Error::NonFiniteFloat);
        // Poisoned: the stored error answers every later operation.
        assert_eq!(
            enc.value(&Descriptor::int8(), &Value::I8(2)),
            Err(Error::NonFiniteFloat)
        );
        assert_eq!(enc.finish(), Err(Error::NonFiniteFloat));
        // The buffer is exactly as it was before the context opened.
        assert_eq!(buf, [0xAB]);
    }

    #[test]
    fn non_finite_bit_patterns_are_rejected_on_decode() {
        let mut bytes = vec![tag::F64];
        bytes.extend_from_slice(&f64::NAN.to_le_bytes());
        assert_eq!(decode(&Descriptor::float64(), &bytes), Err(Error::NonFiniteFloat));

        let mut bytes = vec![tag::F32];
        bytes.extend_from_slice(&f32::INFINITY.to_le_bytes());
        assert_eq!(decode(&Descriptor::float32(), &bytes), Err(Error::NonFiniteFloat));
    }

    #[test]
    fn tag_mismatch_and_unsupported_kind() {
        let bytes = encode(&Descriptor::uint8(), &Value::U8(9)).unwrap();
        assert_eq!(
            decode(&Descriptor::int32(), &bytes),
            Err(Error::TagMismatch { expected: tag::I32, found: tag::U8 })
        );
        assert_eq!(
            decode(&Descriptor::int32(), &[0x63]),
            Err(Error::UnsupportedKind(0x63))
        );
    }

    #[test]
    fn truncated_buffers_report_exhaustion() {
        let desc = Descriptor::string();
        let bytes = encode(&desc, &Value::Str("hello".into())).unwrap();
        // Header promises five bytes; give it two.
        assert!(matches!(
            decode(&desc, &bytes[..bytes.len() - 3]),
            Err(Error::BufferExhausted(_))
        ));
    }

    #[test]
    fn declared_count_past_buffer_end_fails_fast() {
        let mut bytes = vec![tag::LIST];
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            decode(&Descriptor::list(Descriptor::uint8()), &bytes),
            Err(Error::BufferExhausted(_))
        ));
    }

    #[test]
    fn fixed_output_buffer_reports_exhaustion() {
        let desc = Descriptor::string();
        let mut buf = [0u8; 4];
        let mut enc = Encoder::fixed(&mut buf);
        let err = enc.value(&desc, &Value::Str("too long".into())).unwrap_err();
        assert!(matches!(err, Error::BufferExhausted(_)));
    }

    #[test]
    fn duplicate_map_keys_are_rejected() {
        let desc = Descriptor::map(Descriptor::uint8(), Descriptor::bool());
        // Hand-build wire data with a duplicated key.
        let mut bytes = vec![tag::MAP];
        bytes.extend_from_slice(&2u32.to_le_bytes());
        for _ in 0..2 {
            bytes.extend_from_slice(&[tag::U8, 1, tag::TRUE]);
        }
        bytes.push(tag::END);
        assert_eq!(decode(&desc, &bytes), Err(Error::AppendRejected));
    }

    /// Pool-style constructor that counts outstanding objects; the
    /// create/dismantle balance is the leak accounting.
    struct CountingPool {
        outstanding: Arc<AtomicIsize>,
        template: Value,
    }

    impl CountingPool {
        fn new(template: Value) -> (Arc<AtomicIsize>, Arc<Self>) {
            let outstanding = Arc::new(AtomicIsize::new(0));
            let pool = Arc::new(Self {
                outstanding: Arc::clone(&outstanding),
                template,
            });
            (outstanding, pool)
        }
    }

    impl Construct for CountingPool {
        fn create(&self) -> Value {
            self.outstanding.fetch_add(1, Ordering::Relaxed);
            self.template.clone()
        }
        fn dismantle(&self) {
            self.outstanding.fetch_sub(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn ledger_unwinds_constructions_on_decode_failure() {
        // Four-field record whose second field is a pool-constructed
        // nested record. Corrupting the wire after the third field makes
        // decode fail once the pooled object already exists.
        let (outstanding, pool) = CountingPool::new(Value::Record(vec![Value::Str("seed".into())]));
        let inner = record! { s: Descriptor::string() };
        let desc = Descriptor::record(vec![
            Field::new("a", Descriptor::int32()),
            Field::new("b", inner.clone().nullable().with_constructor(pool)),
            Field::new("c", Descriptor::uint8()),
            Field::new("d", Descriptor::float32()),
        ]);
        let value = Value::Record(vec![
            Value::I32(1),
            Value::Record(vec![Value::Str("wire".into())]),
            Value::U8(2),
            Value::F32(0.5),
        ]);
        let good = encode(&desc, &value).unwrap();

        let decoded = decode(&desc, &good).unwrap();
        assert_eq!(decoded, value);
        // Success: ownership transferred, nothing dismantled.
        assert_eq!(outstanding.load(Ordering::Relaxed), 1);
        outstanding.store(0, Ordering::Relaxed);

        // Swap the fourth field's float tag for garbage.
        let mut corrupt = good.clone();
        let f32_tag_at = good.iter().rposition(|&b| b == tag::F32).unwrap();
        corrupt[f32_tag_at] = 0x63;
        assert_eq!(decode(&desc, &corrupt), Err(Error::UnsupportedKind(0x63)));
        // Rollback: zero net constructions.
        assert_eq!(outstanding.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn failed_document_decode_releases_nothing() {
        let (outstanding, pool) = CountingPool::new(Value::Str("pooled".into()));
        let with_pool = Descriptor::record(vec![
            Field::new("a", Descriptor::uint8()),
            Field::new("s", Descriptor::string().nullable().with_constructor(pool)),
        ]);

        // Wire carries only `a`; `s` is filled from the pool.
        let writer = record! { a: Descriptor::uint8() };
        let bytes = encode(&writer, &Value::Record(vec![Value::U8(1)])).unwrap();

        let mut dec = Decoder::new(&bytes);
        // First op succeeds and takes a pooled object.
        dec.value(&with_pool).unwrap();
        assert_eq!(outstanding.load(Ordering::Relaxed), 1);
        // Second op fails: the buffer is exhausted.
        assert!(dec.value(&with_pool).is_err());
        // End unwinds everything acquired since Begin.
        assert!(dec.finish().is_err());
        assert_eq!(outstanding.load(Ordering::Relaxed), 0);
    }

    fn arb_scalar() -> impl Strategy<Value = (Descriptor, Value)> {
        prop_oneof![
            any::<bool>().prop_map(|v| (Descriptor::bool(), Value::Bool(v))),
            any::<i8>().prop_map(|v| (Descriptor::int8(), Value::I8(v))),
            any::<i16>().prop_map(|v| (Descriptor::int16(), Value::I16(v))),
            any::<i32>().prop_map(|v| (Descriptor::int32(), Value::I32(v))),
            any::<i64>().prop_map(|v| (Descriptor::int64(), Value::I64(v))),
            any::<u8>().prop_map(|v| (Descriptor::uint8(), Value::U8(v))),
            any::<u16>().prop_map(|v| (Descriptor::uint16(), Value::U16(v))),
            any::<u32>().prop_map(|v| (Descriptor::uint32(), Value::U32(v))),
            any::<u64>().prop_map(|v| (Descriptor::uint64(), Value::U64(v))),
            proptest::num::f32::NORMAL.prop_map(|v| (Descriptor::float32(), Value::F32(v))),
            proptest::num::f64::NORMAL.prop_map(|v| (Descriptor::float64(), Value::F64(v))),
            ".*".prop_map(|v: String| (Descriptor::string(), Value::Str(v))),
        ]
    }

    proptest! {
        #[test]
        fn scalar_roundtrip((desc, value) in arb_scalar()) {
            let bytes = encode(&desc, &value).unwrap();
            prop_assert_eq!(decode(&desc, &bytes).unwrap(), value);
        }

        #[test]
        fn scalar_list_roundtrip(values in proptest::collection::vec(any::<i64>(), 0..=64)) {
            let desc = Descriptor::list(Descriptor::int64());
            let value = Value::List(values.into_iter().map(Value::I64).collect());
            let bytes = encode(&desc, &value).unwrap();
            prop_assert_eq!(decode(&desc, &bytes).unwrap(), value);
        }

        #[test]
        fn decoder_never_panics_on_arbitrary_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..=256)) {
            let desc = record! {
                a: Descriptor::int32(),
                b: Descriptor::string().nullable(),
                c: Descriptor::list(Descriptor::float64()),
            };
            let _ = decode(&desc, &bytes);
        }
    }
}
