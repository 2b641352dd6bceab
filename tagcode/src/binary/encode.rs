//! Binary encode paths.
use {
    super::tag,
    crate::{
        adapter::{Dictionary, Sequence},
        context::Context,
        desc::{Descriptor, Field, Shape},
        error::{
            destination_too_small, invalid_value, kind_mismatch, map_key_not_representable,
            non_finite_float, string_too_long, too_many_elements, Result,
        },
        io::WriteBuf,
        value::{MapKey, Value},
    },
};

pub(super) fn encode_value(
    ctx: &mut Context,
    out: &mut WriteBuf<'_>,
    desc: &Descriptor,
    value: &Value,
) -> Result<()> {
    if let Value::Null = value {
        if !desc.is_nullable() {
            return Err(crate::error::null_not_permitted());
        }
        return out.write_byte(tag::NULL);
    }
    match (desc.shape(), value) {
        // The boolean tag doubles as the value.
        (Shape::Bool, Value::Bool(v)) => out.write_byte(*v as u8),
        (Shape::I8, Value::I8(v)) => write_scalar(out, tag::I8, &v.to_le_bytes()),
        (Shape::I16, Value::I16(v)) => write_scalar(out, tag::I16, &v.to_le_bytes()),
        (Shape::I32, Value::I32(v)) => write_scalar(out, tag::I32, &v.to_le_bytes()),
        (Shape::I64, Value::I64(v)) => write_scalar(out, tag::I64, &v.to_le_bytes()),
        (Shape::U8, Value::U8(v)) => write_scalar(out, tag::U8, &v.to_le_bytes()),
        (Shape::U16, Value::U16(v)) => write_scalar(out, tag::U16, &v.to_le_bytes()),
        (Shape::U32, Value::U32(v)) => write_scalar(out, tag::U32, &v.to_le_bytes()),
        (Shape::U64, Value::U64(v)) => write_scalar(out, tag::U64, &v.to_le_bytes()),
        (Shape::F32, Value::F32(v)) => {
            if !v.is_finite() {
                return Err(non_finite_float());
            }
            write_scalar(out, tag::F32, &v.to_le_bytes())
        }
        (Shape::F64, Value::F64(v)) => {
            if !v.is_finite() {
                return Err(non_finite_float());
            }
            write_scalar(out, tag::F64, &v.to_le_bytes())
        }
        (Shape::Str, Value::Str(s)) => write_string(out, s),
        (Shape::FixedStr { capacity }, Value::Str(s)) => {
            if s.len() > *capacity {
                return Err(destination_too_small(s.len(), *capacity));
            }
            write_string(out, s)
        }
        (Shape::Record(fields), Value::Record(values)) => {
            encode_record(ctx, out, fields, values)
        }
        (Shape::List(elem), Value::List(items)) => {
            ctx.descend()?;
            out.write_byte(tag::LIST)?;
            write_count(out, items.len())?;
            for item in items {
                encode_value(ctx, out, elem, item)?;
            }
            out.write_byte(tag::END)?;
            ctx.ascend();
            Ok(())
        }
        (Shape::Array { elem, capacity }, Value::List(items)) => {
            if items.len() > *capacity {
                return Err(too_many_elements(items.len()));
            }
            ctx.descend()?;
            out.write_byte(tag::LIST)?;
            write_count(out, items.len())?;
            for item in items {
                encode_value(ctx, out, elem, item)?;
            }
            out.write_byte(tag::END)?;
            ctx.ascend();
            Ok(())
        }
        (Shape::Map { key, value }, Value::Map(pairs)) => {
            ctx.descend()?;
            out.write_byte(tag::MAP)?;
            write_count(out, pairs.len())?;
            for (k, v) in pairs {
                encode_map_key(out, key, k)?;
                encode_value(ctx, out, value, v)?;
            }
            out.write_byte(tag::END)?;
            ctx.ascend();
            Ok(())
        }
        _ => Err(kind_mismatch(desc.kind(), value.kind())),
    }
}

fn encode_record(
    ctx: &mut Context,
    out: &mut WriteBuf<'_>,
    fields: &[Field],
    values: &[Value],
) -> Result<()> {
    if fields.len() != values.len() {
        return Err(invalid_value("record arity differs from its descriptor"));
    }
    ctx.descend()?;
    out.write_byte(tag::RECORD)?;
    for (field, value) in fields.iter().zip(values) {
        encode_value(ctx, out, field.descriptor(), value)?;
    }
    out.write_byte(tag::END)?;
    ctx.ascend();
    Ok(())
}

/// Encode an adapter-backed sequence. Open-ended descriptors reserve the
/// count and patch it in once iteration completes; fixed arrays know the
/// count up front.
pub(super) fn encode_seq<C: Sequence + ?Sized>(
    ctx: &mut Context,
    out: &mut WriteBuf<'_>,
    desc: &Descriptor,
    seq: &C,
) -> Result<()> {
    let elem = match desc.shape() {
        Shape::List(elem) => elem,
        Shape::Array { elem, capacity } => {
            if seq.len() > *capacity {
                return Err(too_many_elements(seq.len()));
            }
            elem
        }
        _ => return Err(kind_mismatch(desc.kind(), crate::desc::Kind::List)),
    };
    ctx.descend()?;
    out.write_byte(tag::LIST)?;
    match desc.shape() {
        Shape::Array { .. } => {
            write_count(out, seq.len())?;
            seq.visit(&mut |item| encode_value(ctx, out, elem, item))?;
        }
        _ => {
            let pos = out.reserve_count()?;
            let mut count: usize = 0;
            seq.visit(&mut |item| {
                encode_value(ctx, out, elem, item)?;
                count += 1;
                Ok(())
            })?;
            if count > u32::MAX as usize {
                return Err(too_many_elements(count));
            }
            out.patch_count(pos, count as u32);
        }
    }
    out.write_byte(tag::END)?;
    ctx.ascend();
    Ok(())
}

/// Encode an adapter-backed dictionary; the pair count is patched in after
/// iteration completes.
pub(super) fn encode_map<D: Dictionary + ?Sized>(
    ctx: &mut Context,
    out: &mut WriteBuf<'_>,
    desc: &Descriptor,
    map: &D,
) -> Result<()> {
    let Shape::Map { key, value } = desc.shape() else {
        return Err(kind_mismatch(desc.kind(), crate::desc::Kind::Map));
    };
    ctx.descend()?;
    out.write_byte(tag::MAP)?;
    let pos = out.reserve_count()?;
    let mut count: usize = 0;
    map.visit_pairs(&mut |k, v| {
        encode_map_key(out, key, k)?;
        encode_value(ctx, out, value, v)?;
        count += 1;
        Ok(())
    })?;
    if count > u32::MAX as usize {
        return Err(too_many_elements(count));
    }
    out.patch_count(pos, count as u32);
    out.write_byte(tag::END)?;
    ctx.ascend();
    Ok(())
}

/// Encode a map key as a tagged scalar with the width the key descriptor
/// declares; out-of-range keys are malformed values.
fn encode_map_key(out: &mut WriteBuf<'_>, key_desc: &Descriptor, key: &MapKey) -> Result<()> {
    const RANGE: crate::Error = crate::Error::InvalidValue("map key out of range for its descriptor");
    match (key_desc.shape(), key) {
        (Shape::Bool, MapKey::Bool(v)) => out.write_byte(*v as u8),
        (Shape::I8, MapKey::Int(v)) => {
            write_scalar(out, tag::I8, &i8::try_from(*v).map_err(|_| RANGE)?.to_le_bytes())
        }
        (Shape::I16, MapKey::Int(v)) => {
            write_scalar(out, tag::I16, &i16::try_from(*v).map_err(|_| RANGE)?.to_le_bytes())
        }
        (Shape::I32, MapKey::Int(v)) => {
            write_scalar(out, tag::I32, &i32::try_from(*v).map_err(|_| RANGE)?.to_le_bytes())
        }
        (Shape::I64, MapKey::Int(v)) => write_scalar(out, tag::I64, &v.to_le_bytes()),
        (Shape::U8, MapKey::UInt(v)) => {
            write_scalar(out, tag::U8, &u8::try_from(*v).map_err(|_| RANGE)?.to_le_bytes())
        }
        (Shape::U16, MapKey::UInt(v)) => {
            write_scalar(out, tag::U16, &u16::try_from(*v).map_err(|_| RANGE)?.to_le_bytes())
        }
        (Shape::U32, MapKey::UInt(v)) => {
            write_scalar(out, tag::U32, &u32::try_from(*v).map_err(|_| RANGE)?.to_le_bytes())
        }
        (Shape::U64, MapKey::UInt(v)) => write_scalar(out, tag::U64, &v.to_le_bytes()),
        (Shape::Str, MapKey::Str(s)) => write_string(out, s),
        (Shape::FixedStr { capacity }, MapKey::Str(s)) => {
            if s.len() > *capacity {
                return Err(destination_too_small(s.len(), *capacity));
            }
            write_string(out, s)
        }
        (Shape::F32 | Shape::F64, _) => Err(map_key_not_representable()),
        _ => Err(kind_mismatch(key_desc.kind(), key.kind())),
    }
}

#[inline]
fn write_scalar(out: &mut WriteBuf<'_>, tag: u8, payload: &[u8]) -> Result<()> {
    out.write_byte(tag)?;
    out.write(payload)
}

fn write_string(out: &mut WriteBuf<'_>, s: &str) -> Result<()> {
    if s.len() > u32::MAX as usize {
        return Err(string_too_long(s.len()));
    }
    out.write_byte(tag::STR)?;
    out.write(&(s.len() as u32).to_le_bytes())?;
    out.write(s.as_bytes())
}

fn write_count(out: &mut WriteBuf<'_>, count: usize) -> Result<()> {
    if count > u32::MAX as usize {
        return Err(too_many_elements(count));
    }
    out.write(&(count as u32).to_le_bytes())
}
