//! Binary decode paths.
//!
//! Record matching is positional: the Nth descriptor is matched against
//! the Nth value still present in the buffer, until either the descriptor
//! list or the wire's end marker runs out. Unknown trailing values are
//! skipped by recursively decoding and discarding one value at a time,
//! never by scanning for the end-marker byte across undecoded bytes.
use {
    super::tag,
    crate::{
        context::{fresh_destination, record_seed, seeded_list, seeded_map, Context},
        desc::{Descriptor, Field, Shape},
        error::{
            buffer_exhausted, destination_too_small, invalid_value, map_key_not_representable,
            non_finite_float, null_not_permitted, preallocation_limit, tag_mismatch,
            unsupported_kind, Result,
        },
        io::Reader,
        ledger::Ledger,
        value::{MapKey, Value},
    },
};

pub(super) fn decode_value(
    ctx: &mut Context,
    rd: &mut Reader<'_>,
    ledger: &mut Ledger,
    desc: &Descriptor,
) -> Result<Value> {
    if rd.peek()? == tag::NULL {
        rd.consume(1)?;
        if !desc.is_nullable() {
            return Err(null_not_permitted());
        }
        return Ok(Value::Null);
    }
    match desc.shape() {
        Shape::Bool => match rd.read_byte()? {
            tag::FALSE => Ok(Value::Bool(false)),
            tag::TRUE => Ok(Value::Bool(true)),
            found => Err(tag_error(tag::FALSE, found)),
        },
        Shape::I8 => {
            expect_tag(rd, tag::I8)?;
            Ok(Value::I8(rd.read_byte()? as i8))
        }
        Shape::I16 => {
            expect_tag(rd, tag::I16)?;
            Ok(Value::I16(i16::from_le_bytes(rd.read_array()?)))
        }
        Shape::I32 => {
            expect_tag(rd, tag::I32)?;
            Ok(Value::I32(i32::from_le_bytes(rd.read_array()?)))
        }
        Shape::I64 => {
            expect_tag(rd, tag::I64)?;
            Ok(Value::I64(i64::from_le_bytes(rd.read_array()?)))
        }
        Shape::U8 => {
            expect_tag(rd, tag::U8)?;
            Ok(Value::U8(rd.read_byte()?))
        }
        Shape::U16 => {
            expect_tag(rd, tag::U16)?;
            Ok(Value::U16(u16::from_le_bytes(rd.read_array()?)))
        }
        Shape::U32 => {
            expect_tag(rd, tag::U32)?;
            Ok(Value::U32(u32::from_le_bytes(rd.read_array()?)))
        }
        Shape::U64 => {
            expect_tag(rd, tag::U64)?;
            Ok(Value::U64(u64::from_le_bytes(rd.read_array()?)))
        }
        Shape::F32 => {
            expect_tag(rd, tag::F32)?;
            let v = f32::from_le_bytes(rd.read_array()?);
            if !v.is_finite() {
                return Err(non_finite_float());
            }
            Ok(Value::F32(v))
        }
        Shape::F64 => {
            expect_tag(rd, tag::F64)?;
            let v = f64::from_le_bytes(rd.read_array()?);
            if !v.is_finite() {
                return Err(non_finite_float());
            }
            Ok(Value::F64(v))
        }
        Shape::Str => Ok(Value::Str(read_string(ctx, rd, None)?)),
        Shape::FixedStr { capacity } => {
            Ok(Value::Str(read_string(ctx, rd, Some(*capacity))?))
        }
        Shape::Record(fields) => decode_record(ctx, rd, ledger, desc, fields),
        Shape::List(elem) => decode_list(ctx, rd, ledger, desc, elem, None),
        Shape::Array { elem, capacity } => {
            decode_list(ctx, rd, ledger, desc, elem, Some(*capacity))
        }
        Shape::Map { key, value } => decode_map(ctx, rd, ledger, desc, key, value),
    }
}

fn decode_record(
    ctx: &mut Context,
    rd: &mut Reader<'_>,
    ledger: &mut Ledger,
    desc: &Descriptor,
    fields: &[Field],
) -> Result<Value> {
    expect_tag(rd, tag::RECORD)?;
    ctx.descend()?;
    let mut seed = record_seed(ledger, desc, fields.len());
    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        if rd.peek()? == tag::END {
            break;
        }
        out.push(decode_value(ctx, rd, ledger, field.descriptor())?);
    }
    // Fields the wire did not carry keep their default-initialized value.
    let decoded = out.len();
    for (index, field) in fields.iter().enumerate().skip(decoded) {
        let value = match &mut seed {
            Some(values) => std::mem::replace(&mut values[index], Value::Null),
            None => fresh_destination(ledger, field.descriptor()),
        };
        out.push(value);
    }
    // Trailing values the descriptor does not know about are decoded and
    // discarded one at a time.
    while rd.peek()? != tag::END {
        skip_value(ctx, rd)?;
    }
    rd.consume(1)?;
    ctx.ascend();
    Ok(Value::Record(out))
}

fn decode_list(
    ctx: &mut Context,
    rd: &mut Reader<'_>,
    ledger: &mut Ledger,
    desc: &Descriptor,
    elem: &Descriptor,
    capacity: Option<usize>,
) -> Result<Value> {
    expect_tag(rd, tag::LIST)?;
    ctx.descend()?;
    let count = read_count(rd)?;
    if let Some(capacity) = capacity {
        if count > capacity {
            return Err(destination_too_small(count, capacity));
        }
    }
    guard_preallocation(ctx, count.saturating_mul(size_of::<Value>()))?;
    let mut items = seeded_list(ledger, desc);
    items.reserve(count);
    for _ in 0..count {
        items.push(decode_value(ctx, rd, ledger, elem)?);
    }
    expect_tag(rd, tag::END)?;
    ctx.ascend();
    Ok(Value::List(items))
}

fn decode_map(
    ctx: &mut Context,
    rd: &mut Reader<'_>,
    ledger: &mut Ledger,
    desc: &Descriptor,
    key_desc: &Descriptor,
    value_desc: &Descriptor,
) -> Result<Value> {
    expect_tag(rd, tag::MAP)?;
    ctx.descend()?;
    let count = read_count(rd)?;
    guard_preallocation(ctx, count.saturating_mul(size_of::<(MapKey, Value)>()))?;
    let mut pairs = seeded_map(ledger, desc);
    pairs.reserve(count);
    for _ in 0..count {
        let key = decode_map_key(ctx, rd, key_desc)?;
        let value = decode_value(ctx, rd, ledger, value_desc)?;
        crate::adapter::Dictionary::insert_pair(&mut pairs, key, value)?;
    }
    expect_tag(rd, tag::END)?;
    ctx.ascend();
    Ok(Value::Map(pairs))
}

fn decode_map_key(
    ctx: &mut Context,
    rd: &mut Reader<'_>,
    key_desc: &Descriptor,
) -> Result<MapKey> {
    match key_desc.shape() {
        Shape::Bool => match rd.read_byte()? {
            tag::FALSE => Ok(MapKey::Bool(false)),
            tag::TRUE => Ok(MapKey::Bool(true)),
            found => Err(tag_error(tag::FALSE, found)),
        },
        Shape::I8 => {
            expect_tag(rd, tag::I8)?;
            Ok(MapKey::Int(rd.read_byte()? as i8 as i64))
        }
        Shape::I16 => {
            expect_tag(rd, tag::I16)?;
            Ok(MapKey::Int(i16::from_le_bytes(rd.read_array()?) as i64))
        }
        Shape::I32 => {
            expect_tag(rd, tag::I32)?;
            Ok(MapKey::Int(i32::from_le_bytes(rd.read_array()?) as i64))
        }
        Shape::I64 => {
            expect_tag(rd, tag::I64)?;
            Ok(MapKey::Int(i64::from_le_bytes(rd.read_array()?)))
        }
        Shape::U8 => {
            expect_tag(rd, tag::U8)?;
            Ok(MapKey::UInt(rd.read_byte()? as u64))
        }
        Shape::U16 => {
            expect_tag(rd, tag::U16)?;
            Ok(MapKey::UInt(u16::from_le_bytes(rd.read_array()?) as u64))
        }
        Shape::U32 => {
            expect_tag(rd, tag::U32)?;
            Ok(MapKey::UInt(u32::from_le_bytes(rd.read_array()?) as u64))
        }
        Shape::U64 => {
            expect_tag(rd, tag::U64)?;
            Ok(MapKey::UInt(u64::from_le_bytes(rd.read_array()?)))
        }
        Shape::Str => Ok(MapKey::Str(read_string(ctx, rd, None)?)),
        Shape::FixedStr { capacity } => {
            Ok(MapKey::Str(read_string(ctx, rd, Some(*capacity))?))
        }
        _ => Err(map_key_not_representable()),
    }
}

/// Recursively decode and discard one value.
///
/// Every skipped value is individually consumed through the same tag
/// grammar the real decoder uses, so skipping can never resynchronize on
/// a payload byte that merely looks like an end marker.
pub(super) fn skip_value(ctx: &mut Context, rd: &mut Reader<'_>) -> Result<()> {
    match rd.read_byte()? {
        tag::FALSE | tag::TRUE | tag::NULL => Ok(()),
        tag::I8 | tag::U8 => rd.consume(1),
        tag::I16 | tag::U16 => rd.consume(2),
        tag::I32 | tag::U32 | tag::F32 => rd.consume(4),
        tag::I64 | tag::U64 | tag::F64 => rd.consume(8),
        tag::STR => {
            let len = read_count(rd)?;
            rd.consume(len)
        }
        tag::RECORD => {
            ctx.descend()?;
            while rd.peek()? != tag::END {
                skip_value(ctx, rd)?;
            }
            rd.consume(1)?;
            ctx.ascend();
            Ok(())
        }
        tag::LIST => {
            ctx.descend()?;
            let count = read_count(rd)?;
            for _ in 0..count {
                skip_value(ctx, rd)?;
            }
            expect_tag(rd, tag::END)?;
            ctx.ascend();
            Ok(())
        }
        tag::MAP => {
            ctx.descend()?;
            let count = read_count(rd)?;
            for _ in 0..count {
                skip_value(ctx, rd)?;
                skip_value(ctx, rd)?;
            }
            expect_tag(rd, tag::END)?;
            ctx.ascend();
            Ok(())
        }
        tag::END => Err(invalid_value("unexpected end marker")),
        other => Err(unsupported_kind(other)),
    }
}

fn expect_tag(rd: &mut Reader<'_>, expected: u8) -> Result<()> {
    let found = rd.read_byte()?;
    if found != expected {
        return Err(tag_error(expected, found));
    }
    Ok(())
}

fn tag_error(expected: u8, found: u8) -> crate::Error {
    if found > tag::END {
        unsupported_kind(found)
    } else {
        tag_mismatch(expected, found)
    }
}

/// Read a 4-byte element count. A count that cannot possibly fit in the
/// remaining buffer (every element takes at least one byte) fails before
/// anything is allocated.
fn read_count(rd: &mut Reader<'_>) -> Result<usize> {
    let count = u32::from_le_bytes(rd.read_array()?) as usize;
    if count > rd.remaining() {
        return Err(buffer_exhausted(count));
    }
    Ok(count)
}

fn guard_preallocation(ctx: &Context, needed: usize) -> Result<()> {
    let limit = ctx.config().max_preallocation;
    if needed > limit {
        return Err(preallocation_limit(needed, limit));
    }
    Ok(())
}

/// Read a length-prefixed string, enforcing the destination capacity
/// before any payload byte is consumed.
fn read_string(ctx: &mut Context, rd: &mut Reader<'_>, capacity: Option<usize>) -> Result<String> {
    expect_tag(rd, tag::STR)?;
    let len = u32::from_le_bytes(rd.read_array()?) as usize;
    if let Some(capacity) = capacity {
        if len > capacity {
            return Err(destination_too_small(len, capacity));
        }
    }
    if len > rd.remaining() {
        return Err(buffer_exhausted(len));
    }
    guard_preallocation(ctx, len)?;
    let bytes = rd.read_slice(len)?;
    Ok(std::str::from_utf8(bytes)?.to_owned())
}
