//! JSON writer.
use {
    crate::{
        adapter::{Dictionary, Sequence},
        context::Context,
        desc::{Descriptor, Field, Shape},
        error::{
            destination_too_small, invalid_value, kind_mismatch, map_key_not_representable,
            non_finite_float, too_many_elements, Result,
        },
        value::{MapKey, Value},
    },
    std::fmt::Write as _,
};

/// Text sink with optional pretty-printing state.
pub(super) struct JsonOut {
    buf: String,
    pretty: bool,
    indent: usize,
}

impl JsonOut {
    pub(super) fn new(pretty: bool) -> Self {
        Self {
            buf: String::new(),
            pretty,
            indent: 0,
        }
    }

    pub(super) fn into_string(self) -> String {
        self.buf
    }

    pub(super) fn push(&mut self, ch: char) {
        self.buf.push(ch);
    }

    pub(super) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(super) fn truncate_to(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    fn open(&mut self, bracket: char) {
        self.buf.push(bracket);
        self.indent += 1;
    }

    fn close(&mut self, bracket: char, wrote_any: bool) {
        self.indent -= 1;
        if self.pretty && wrote_any {
            self.newline();
        }
        self.buf.push(bracket);
    }

    fn entry_sep(&mut self, first: bool) {
        if !first {
            self.buf.push(',');
        }
        if self.pretty {
            self.newline();
        }
    }

    fn colon(&mut self) {
        self.buf.push(':');
        if self.pretty {
            self.buf.push(' ');
        }
    }

    fn newline(&mut self) {
        self.buf.push('\n');
        for _ in 0..self.indent {
            self.buf.push_str("  ");
        }
    }
}

pub(super) fn write_value(
    ctx: &mut Context,
    out: &mut JsonOut,
    desc: &Descriptor,
    value: &Value,
) -> Result<()> {
    if let Value::Null = value {
        if !desc.is_nullable() {
            return Err(crate::error::null_not_permitted());
        }
        out.buf.push_str("null");
        return Ok(());
    }
    match (desc.shape(), value) {
        (Shape::Bool, Value::Bool(v)) => {
            out.buf.push_str(if *v { "true" } else { "false" });
            Ok(())
        }
        (Shape::I8, Value::I8(v)) => write_int(out, *v as i64),
        (Shape::I16, Value::I16(v)) => write_int(out, *v as i64),
        (Shape::I32, Value::I32(v)) => write_int(out, *v as i64),
        (Shape::I64, Value::I64(v)) => write_int(out, *v),
        (Shape::U8, Value::U8(v)) => write_uint(out, *v as u64),
        (Shape::U16, Value::U16(v)) => write_uint(out, *v as u64),
        (Shape::U32, Value::U32(v)) => write_uint(out, *v as u64),
        (Shape::U64, Value::U64(v)) => write_uint(out, *v),
        (Shape::F32, Value::F32(v)) => {
            if !v.is_finite() {
                return Err(non_finite_float());
            }
            // Shortest digit string that parses back to the same value.
            let _ = write!(out.buf, "{v}");
            Ok(())
        }
        (Shape::F64, Value::F64(v)) => {
            if !v.is_finite() {
                return Err(non_finite_float());
            }
            let _ = write!(out.buf, "{v}");
            Ok(())
        }
        (Shape::Str, Value::Str(s)) => {
            write_escaped(&mut out.buf, s);
            Ok(())
        }
        (Shape::FixedStr { capacity }, Value::Str(s)) => {
            if s.len() > *capacity {
                return Err(destination_too_small(s.len(), *capacity));
            }
            write_escaped(&mut out.buf, s);
            Ok(())
        }
        (Shape::Record(fields), Value::Record(values)) => {
            write_record(ctx, out, fields, values)
        }
        (Shape::List(elem), Value::List(items)) => write_elems(ctx, out, elem, items),
        (Shape::Array { elem, capacity }, Value::List(items)) => {
            if items.len() > *capacity {
                return Err(too_many_elements(items.len()));
            }
            write_elems(ctx, out, elem, items)
        }
        (Shape::Map { key, value: vdesc }, Value::Map(pairs)) => {
            ctx.descend()?;
            out.open('{');
            let mut first = true;
            for (k, v) in pairs {
                out.entry_sep(first);
                first = false;
                write_key(ctx, out, key, k)?;
                out.colon();
                write_value(ctx, out, vdesc, v)?;
            }
            out.close('}', !first);
            ctx.ascend();
            Ok(())
        }
        _ => Err(kind_mismatch(desc.kind(), value.kind())),
    }
}

fn write_record(
    ctx: &mut Context,
    out: &mut JsonOut,
    fields: &[Field],
    values: &[Value],
) -> Result<()> {
    if fields.len() != values.len() {
        return Err(invalid_value("record arity differs from its descriptor"));
    }
    ctx.descend()?;
    out.open('{');
    let mut first = true;
    for (field, value) in fields.iter().zip(values) {
        out.entry_sep(first);
        first = false;
        write_escaped(&mut out.buf, field.name());
        out.colon();
        write_value(ctx, out, field.descriptor(), value)?;
    }
    out.close('}', !first);
    ctx.ascend();
    Ok(())
}

fn write_elems(
    ctx: &mut Context,
    out: &mut JsonOut,
    elem: &Descriptor,
    items: &[Value],
) -> Result<()> {
    ctx.descend()?;
    out.open('[');
    let mut first = true;
    for item in items {
        out.entry_sep(first);
        first = false;
        write_value(ctx, out, elem, item)?;
    }
    out.close(']', !first);
    ctx.ascend();
    Ok(())
}

/// Adapter-backed sequence.
pub(super) fn write_seq<C: Sequence + ?Sized>(
    ctx: &mut Context,
    out: &mut JsonOut,
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
    out.open('[');
    let mut first = true;
    seq.visit(&mut |item| {
        out.entry_sep(first);
        first = false;
        write_value(ctx, out, elem, item)
    })?;
    out.close(']', !first);
    ctx.ascend();
    Ok(())
}

/// Adapter-backed dictionary.
pub(super) fn write_map<D: Dictionary + ?Sized>(
    ctx: &mut Context,
    out: &mut JsonOut,
    desc: &Descriptor,
    map: &D,
) -> Result<()> {
    let Shape::Map { key, value } = desc.shape() else {
        return Err(kind_mismatch(desc.kind(), crate::desc::Kind::Map));
    };
    ctx.descend()?;
    out.open('{');
    let mut first = true;
    map.visit_pairs(&mut |k, v| {
        out.entry_sep(first);
        first = false;
        write_key(ctx, out, key, k)?;
        out.colon();
        write_value(ctx, out, value, v)
    })?;
    out.close('}', !first);
    ctx.ascend();
    Ok(())
}

/// Map keys become JSON strings: `"5"`, `"true"`, or the string itself.
fn write_key(
    _ctx: &mut Context,
    out: &mut JsonOut,
    key_desc: &Descriptor,
    key: &MapKey,
) -> Result<()> {
    const RANGE: crate::Error = crate::Error::InvalidValue("map key out of range for its descriptor");
    match (key_desc.shape(), key) {
        (Shape::Bool, MapKey::Bool(v)) => {
            out.buf.push_str(if *v { "\"true\"" } else { "\"false\"" });
            Ok(())
        }
        (Shape::I8, MapKey::Int(v)) => write_int_key(out, i8::try_from(*v).map_err(|_| RANGE)? as i64),
        (Shape::I16, MapKey::Int(v)) => write_int_key(out, i16::try_from(*v).map_err(|_| RANGE)? as i64),
        (Shape::I32, MapKey::Int(v)) => write_int_key(out, i32::try_from(*v).map_err(|_| RANGE)? as i64),
        (Shape::I64, MapKey::Int(v)) => write_int_key(out, *v),
        (Shape::U8, MapKey::UInt(v)) => write_uint_key(out, u8::try_from(*v).map_err(|_| RANGE)? as u64),
        (Shape::U16, MapKey::UInt(v)) => write_uint_key(out, u16::try_from(*v).map_err(|_| RANGE)? as u64),
        (Shape::U32, MapKey::UInt(v)) => write_uint_key(out, u32::try_from(*v).map_err(|_| RANGE)? as u64),
        (Shape::U64, MapKey::UInt(v)) => write_uint_key(out, *v),
        (Shape::Str, MapKey::Str(s)) => {
            write_escaped(&mut out.buf, s);
            Ok(())
        }
        (Shape::FixedStr { capacity }, MapKey::Str(s)) => {
            if s.len() > *capacity {
                return Err(destination_too_small(s.len(), *capacity));
            }
            write_escaped(&mut out.buf, s);
            Ok(())
        }
        (Shape::F32 | Shape::F64, _) => Err(map_key_not_representable()),
        _ => Err(kind_mismatch(key_desc.kind(), key.kind())),
    }
}

fn write_int(out: &mut JsonOut, v: i64) -> Result<()> {
    let _ = write!(out.buf, "{v}");
    Ok(())
}

fn write_uint(out: &mut JsonOut, v: u64) -> Result<()> {
    let _ = write!(out.buf, "{v}");
    Ok(())
}

fn write_int_key(out: &mut JsonOut, v: i64) -> Result<()> {
    let _ = write!(out.buf, "\"{v}\"");
    Ok(())
}

fn write_uint_key(out: &mut JsonOut, v: u64) -> Result<()> {
    let _ = write!(out.buf, "\"{v}\"");
    Ok(())
}

/// Escape per JSON conventions: quote, backslash, the named control
/// escapes, and `\u00XX` for the remaining control bytes.
pub(super) fn write_escaped(buf: &mut String, s: &str) {
    buf.push('"');
    for ch in s.chars() {
        match ch {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\u{08}' => buf.push_str("\\b"),
            '\u{0C}' => buf.push_str("\\f"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            ch if (ch as u32) < 0x20 => {
                let _ = write!(buf, "\\u{:04x}", ch as u32);
            }
            ch => buf.push(ch),
        }
    }
    buf.push('"');
}
