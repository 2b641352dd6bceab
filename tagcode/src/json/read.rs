//! JSON parser.
//!
//! Record parsing is name-based: object keys may arrive in any order and
//! as any subset of the declared fields; unmatched declared fields keep
//! their default-initialized value and unrecognized keys are skipped by a
//! recursive value skipper. Whitespace is tolerated everywhere regardless
//! of how the text was produced.
use crate::{
    context::{fresh_destination, record_seed, seeded_list, seeded_map, Context},
    desc::{Descriptor, Field, Shape},
    error::{
        buffer_exhausted, destination_too_small, invalid_value, map_key_missing,
        map_key_not_representable, non_finite_float, null_not_permitted, Result,
    },
    ledger::Ledger,
    value::{MapKey, Value},
};

/// Cursor over the input text. Positions always sit on UTF-8 boundaries
/// because every multi-byte sequence is consumed whole.
pub(super) struct JsonReader<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> JsonReader<'a> {
    pub(super) fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn bytes(&self) -> &'a [u8] {
        self.text.as_bytes()
    }

    pub(super) fn skip_ws(&mut self) {
        while let Some(b) = self.bytes().get(self.pos) {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                _ => break,
            }
        }
    }

    fn peek(&self) -> Result<u8> {
        self.bytes()
            .get(self.pos)
            .copied()
            .ok_or_else(|| buffer_exhausted(1))
    }

    fn advance(&mut self, amt: usize) {
        self.pos += amt;
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        self.skip_ws();
        let found = self.peek()?;
        if found != expected {
            return Err(invalid_value(expected_token(expected)));
        }
        self.advance(1);
        Ok(())
    }

    /// Consume a keyword like `true` if it is next.
    fn eat(&mut self, word: &str) -> bool {
        if self.text[self.pos..].starts_with(word) {
            self.advance(word.len());
            true
        } else {
            false
        }
    }

    pub(super) fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.pos == self.text.len()
    }
}

fn expected_token(byte: u8) -> &'static str {
    match byte {
        b'{' => "expected '{'",
        b'}' => "expected '}'",
        b'[' => "expected '['",
        b']' => "expected ']'",
        b':' => "expected ':'",
        b',' => "expected ','",
        b'"' => "expected '\"'",
        _ => "unexpected character",
    }
}

pub(super) fn parse_value(
    ctx: &mut Context,
    rd: &mut JsonReader<'_>,
    ledger: &mut Ledger,
    desc: &Descriptor,
) -> Result<Value> {
    rd.skip_ws();
    if rd.peek()? == b'n' {
        if !rd.eat("null") {
            return Err(invalid_value("invalid literal"));
        }
        if !desc.is_nullable() {
            return Err(null_not_permitted());
        }
        return Ok(Value::Null);
    }
    match desc.shape() {
        Shape::Bool => {
            if rd.eat("true") {
                Ok(Value::Bool(true))
            } else if rd.eat("false") {
                Ok(Value::Bool(false))
            } else {
                Err(invalid_value("expected a boolean"))
            }
        }
        Shape::I8 => parse_int(rd).map(Value::I8),
        Shape::I16 => parse_int(rd).map(Value::I16),
        Shape::I32 => parse_int(rd).map(Value::I32),
        Shape::I64 => parse_int(rd).map(Value::I64),
        Shape::U8 => parse_uint(rd).map(Value::U8),
        Shape::U16 => parse_uint(rd).map(Value::U16),
        Shape::U32 => parse_uint(rd).map(Value::U32),
        Shape::U64 => parse_uint(rd).map(Value::U64),
        Shape::F32 => {
            let v = parse_float(rd)? as f32;
            if !v.is_finite() {
                return Err(non_finite_float());
            }
            Ok(Value::F32(v))
        }
        Shape::F64 => {
            let v = parse_float(rd)?;
            if !v.is_finite() {
                return Err(non_finite_float());
            }
            Ok(Value::F64(v))
        }
        Shape::Str => parse_string(rd).map(Value::Str),
        Shape::FixedStr { capacity } => {
            let s = parse_string(rd)?;
            if s.len() > *capacity {
                return Err(destination_too_small(s.len(), *capacity));
            }
            Ok(Value::Str(s))
        }
        Shape::Record(fields) => parse_record(ctx, rd, ledger, desc, fields),
        Shape::List(elem) => parse_elems(ctx, rd, ledger, desc, elem, None),
        Shape::Array { elem, capacity } => {
            parse_elems(ctx, rd, ledger, desc, elem, Some(*capacity))
        }
        Shape::Map { key, value } => parse_map(ctx, rd, ledger, desc, key, value),
    }
}

fn parse_record(
    ctx: &mut Context,
    rd: &mut JsonReader<'_>,
    ledger: &mut Ledger,
    desc: &Descriptor,
    fields: &[Field],
) -> Result<Value> {
    rd.expect(b'{')?;
    ctx.descend()?;
    let mut slots: Vec<Option<Value>> = (0..fields.len()).map(|_| None).collect();
    let mut first = true;
    loop {
        rd.skip_ws();
        if rd.peek()? == b'}' {
            rd.advance(1);
            break;
        }
        if !first {
            rd.expect(b',')?;
            rd.skip_ws();
        }
        first = false;
        let name = parse_string(rd)?;
        rd.expect(b':')?;
        match fields.iter().position(|f| f.name() == name) {
            Some(index) => {
                // A repeated key overwrites: the last occurrence wins.
                slots[index] = Some(parse_value(ctx, rd, ledger, fields[index].descriptor())?);
            }
            None => skip_json_value(ctx, rd)?,
        }
    }
    // Unmatched declared fields keep their default-initialized value.
    let mut seed = record_seed(ledger, desc, fields.len());
    let values = slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| match slot {
            Some(value) => value,
            None => match &mut seed {
                Some(seeded) => std::mem::replace(&mut seeded[index], Value::Null),
                None => fresh_destination(ledger, fields[index].descriptor()),
            },
        })
        .collect();
    ctx.ascend();
    Ok(Value::Record(values))
}

fn parse_elems(
    ctx: &mut Context,
    rd: &mut JsonReader<'_>,
    ledger: &mut Ledger,
    desc: &Descriptor,
    elem: &Descriptor,
    capacity: Option<usize>,
) -> Result<Value> {
    rd.expect(b'[')?;
    ctx.descend()?;
    let mut items = seeded_list(ledger, desc);
    let mut first = true;
    loop {
        rd.skip_ws();
        if rd.peek()? == b']' {
            rd.advance(1);
            break;
        }
        if !first {
            rd.expect(b',')?;
        }
        first = false;
        if let Some(capacity) = capacity {
            if items.len() == capacity {
                return Err(destination_too_small(items.len() + 1, capacity));
            }
        }
        items.push(parse_value(ctx, rd, ledger, elem)?);
    }
    ctx.ascend();
    Ok(Value::List(items))
}

fn parse_map(
    ctx: &mut Context,
    rd: &mut JsonReader<'_>,
    ledger: &mut Ledger,
    desc: &Descriptor,
    key_desc: &Descriptor,
    value_desc: &Descriptor,
) -> Result<Value> {
    rd.expect(b'{')?;
    ctx.descend()?;
    let mut pairs: Vec<(MapKey, Value)> = seeded_map(ledger, desc);
    let mut first = true;
    loop {
        rd.skip_ws();
        if rd.peek()? == b'}' {
            rd.advance(1);
            break;
        }
        if !first {
            rd.expect(b',')?;
            rd.skip_ws();
        }
        first = false;
        if rd.peek()? != b'"' {
            return Err(map_key_missing());
        }
        let raw = parse_string(rd)?;
        let key = parse_map_key(key_desc, raw)?;
        rd.expect(b':')?;
        let value = parse_value(ctx, rd, ledger, value_desc)?;
        crate::adapter::Dictionary::insert_pair(&mut pairs, key, value)?;
    }
    ctx.ascend();
    Ok(Value::Map(pairs))
}

/// Interpret an object key per the key descriptor's kind.
fn parse_map_key(key_desc: &Descriptor, raw: String) -> Result<MapKey> {
    const BAD: crate::Error = crate::Error::InvalidValue("map key does not match its descriptor");
    match key_desc.shape() {
        Shape::Bool => match raw.as_str() {
            "true" => Ok(MapKey::Bool(true)),
            "false" => Ok(MapKey::Bool(false)),
            _ => Err(BAD),
        },
        Shape::I8 => Ok(MapKey::Int(raw.parse::<i8>().map_err(|_| BAD)? as i64)),
        Shape::I16 => Ok(MapKey::Int(raw.parse::<i16>().map_err(|_| BAD)? as i64)),
        Shape::I32 => Ok(MapKey::Int(raw.parse::<i32>().map_err(|_| BAD)? as i64)),
        Shape::I64 => Ok(MapKey::Int(raw.parse::<i64>().map_err(|_| BAD)?)),
        Shape::U8 => Ok(MapKey::UInt(raw.parse::<u8>().map_err(|_| BAD)? as u64)),
        Shape::U16 => Ok(MapKey::UInt(raw.parse::<u16>().map_err(|_| BAD)? as u64)),
        Shape::U32 => Ok(MapKey::UInt(raw.parse::<u32>().map_err(|_| BAD)? as u64)),
        Shape::U64 => Ok(MapKey::UInt(raw.parse::<u64>().map_err(|_| BAD)?)),
        Shape::Str => Ok(MapKey::Str(raw)),
        Shape::FixedStr { capacity } => {
            if raw.len() > *capacity {
                return Err(destination_too_small(raw.len(), *capacity));
            }
            Ok(MapKey::Str(raw))
        }
        _ => Err(map_key_not_representable()),
    }
}

/// Skip one JSON value of any shape, bounded by the nesting limit.
fn skip_json_value(ctx: &mut Context, rd: &mut JsonReader<'_>) -> Result<()> {
    rd.skip_ws();
    match rd.peek()? {
        b'n' => {
            if rd.eat("null") {
                Ok(())
            } else {
                Err(invalid_value("invalid literal"))
            }
        }
        b't' => {
            if rd.eat("true") {
                Ok(())
            } else {
                Err(invalid_value("invalid literal"))
            }
        }
        b'f' => {
            if rd.eat("false") {
                Ok(())
            } else {
                Err(invalid_value("invalid literal"))
            }
        }
        b'"' => parse_string(rd).map(drop),
        b'[' => {
            rd.advance(1);
            ctx.descend()?;
            let mut first = true;
            loop {
                rd.skip_ws();
                if rd.peek()? == b']' {
                    rd.advance(1);
                    break;
                }
                if !first {
                    rd.expect(b',')?;
                }
                first = false;
                skip_json_value(ctx, rd)?;
            }
            ctx.ascend();
            Ok(())
        }
        b'{' => {
            rd.advance(1);
            ctx.descend()?;
            let mut first = true;
            loop {
                rd.skip_ws();
                if rd.peek()? == b'}' {
                    rd.advance(1);
                    break;
                }
                if !first {
                    rd.expect(b',')?;
                    rd.skip_ws();
                }
                first = false;
                parse_string(rd)?;
                rd.expect(b':')?;
                skip_json_value(ctx, rd)?;
            }
            ctx.ascend();
            Ok(())
        }
        _ => number_token(rd).map(drop),
    }
}

/// Scan one number token per the JSON grammar and return its text.
fn number_token<'a>(rd: &mut JsonReader<'a>) -> Result<&'a str> {
    rd.skip_ws();
    let start = rd.pos;
    let bytes = rd.bytes();
    let mut pos = rd.pos;
    if bytes.get(pos) == Some(&b'-') {
        pos += 1;
    }
    let int_start = pos;
    while matches!(bytes.get(pos), Some(b'0'..=b'9')) {
        pos += 1;
    }
    if pos == int_start {
        return Err(invalid_value("expected a number"));
    }
    // No leading zeros.
    if pos - int_start > 1 && bytes[int_start] == b'0' {
        return Err(invalid_value("leading zero in number"));
    }
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        let frac_start = pos;
        while matches!(bytes.get(pos), Some(b'0'..=b'9')) {
            pos += 1;
        }
        if pos == frac_start {
            return Err(invalid_value("expected digits after decimal point"));
        }
    }
    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        pos += 1;
        if matches!(bytes.get(pos), Some(b'+' | b'-')) {
            pos += 1;
        }
        let exp_start = pos;
        while matches!(bytes.get(pos), Some(b'0'..=b'9')) {
            pos += 1;
        }
        if pos == exp_start {
            return Err(invalid_value("expected digits in exponent"));
        }
    }
    rd.pos = pos;
    Ok(&rd.text[start..pos])
}

/// Integer kinds accept integer syntax only, range-checked per width.
fn parse_int<T: TryFrom<i64>>(rd: &mut JsonReader<'_>) -> Result<T> {
    let token = number_token(rd)?;
    if token.contains(['.', 'e', 'E']) {
        return Err(invalid_value("expected an integer"));
    }
    let wide: i64 = token
        .parse()
        .map_err(|_| invalid_value("integer out of range"))?;
    T::try_from(wide).map_err(|_| invalid_value("integer out of range"))
}

fn parse_uint<T: TryFrom<u64>>(rd: &mut JsonReader<'_>) -> Result<T> {
    let token = number_token(rd)?;
    if token.contains(['.', 'e', 'E']) {
        return Err(invalid_value("expected an integer"));
    }
    let wide: u64 = token
        .parse()
        .map_err(|_| invalid_value("integer out of range"))?;
    T::try_from(wide).map_err(|_| invalid_value("integer out of range"))
}

fn parse_float(rd: &mut JsonReader<'_>) -> Result<f64> {
    let token = number_token(rd)?;
    token.parse().map_err(|_| invalid_value("invalid number"))
}

/// Parse a JSON string with full escape support, including `\uXXXX`
/// surrogate pairs.
fn parse_string(rd: &mut JsonReader<'_>) -> Result<String> {
    rd.expect(b'"')?;
    let mut out = String::new();
    let bytes = rd.bytes();
    let mut pos = rd.pos;
    let mut run_start = pos;
    loop {
        let Some(&b) = bytes.get(pos) else {
            return Err(buffer_exhausted(1));
        };
        match b {
            b'"' => {
                out.push_str(&rd.text[run_start..pos]);
                rd.pos = pos + 1;
                return Ok(out);
            }
            b'\\' => {
                out.push_str(&rd.text[run_start..pos]);
                pos += 1;
                let Some(&esc) = bytes.get(pos) else {
                    return Err(buffer_exhausted(1));
                };
                pos += 1;
                match esc {
                    b'"' => out.push('"'),
                    b'\\' => out.push('\\'),
                    b'/' => out.push('/'),
                    b'b' => out.push('\u{08}'),
                    b'f' => out.push('\u{0C}'),
                    b'n' => out.push('\n'),
                    b'r' => out.push('\r'),
                    b't' => out.push('\t'),
                    b'u' => {
                        let unit = hex4(bytes, pos)?;
                        pos += 4;
                        let cp = match unit {
                            0xD800..=0xDBFF => {
                                // High surrogate: a low surrogate must follow.
                                if bytes.get(pos) != Some(&b'\\') || bytes.get(pos + 1) != Some(&b'u')
                                {
                                    return Err(invalid_value("unpaired surrogate"));
                                }
                                let low = hex4(bytes, pos + 2)?;
                                pos += 6;
                                if !(0xDC00..=0xDFFF).contains(&low) {
                                    return Err(invalid_value("unpaired surrogate"));
                                }
                                0x10000 + (((unit - 0xD800) as u32) << 10) + (low - 0xDC00) as u32
                            }
                            0xDC00..=0xDFFF => return Err(invalid_value("unpaired surrogate")),
                            unit => unit as u32,
                        };
                        match char::from_u32(cp) {
                            Some(ch) => out.push(ch),
                            None => return Err(invalid_value("invalid unicode escape")),
                        }
                    }
                    _ => return Err(invalid_value("invalid escape sequence")),
                }
                run_start = pos;
            }
            0x00..=0x1F => return Err(invalid_value("unescaped control character")),
            _ => pos += 1,
        }
    }
}

fn hex4(bytes: &[u8], pos: usize) -> Result<u16> {
    let Some(digits) = bytes.get(pos..pos + 4) else {
        return Err(buffer_exhausted(4));
    };
    let mut unit: u16 = 0;
    for &d in digits {
        let nibble = match d {
            b'0'..=b'9' => d - b'0',
            b'a'..=b'f' => d - b'a' + 10,
            b'A'..=b'F' => d - b'A' + 10,
            _ => return Err(invalid_value("invalid unicode escape")),
        };
        unit = (unit << 4) | nibble as u16;
    }
    Ok(unit)
}

