//! The textual inspection format's grammar: `name = value` / bare `value` fields, comma
//! separated, wrapped in `(...)` for sub-messages. This grammar exists solely to let a person
//! read and author what `fudge-wire` puts on the wire; it is not part of the wire format itself.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while, take_while1},
    character::complete::digit1,
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    multi::separated_list0,
    sequence::{delimited, terminated, tuple},
    Finish, IResult,
};

use anyhow::{anyhow, Result};
use base64::decode as b64_decode;
use fudge_wire::{Field, Message, Value};

/// Parses one complete textual field (the top-level production `fudge-nq --encode` consumes).
pub fn parse(i: &str) -> Result<Field> {
    Ok(all_consuming(terminated(field, white))(i).finish().map_err(|e| anyhow!("{}", e))?.1)
}

const WHITESPACE: &str = " \t\r\n";
const B64_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn white(i: &str) -> IResult<&str, &str> {
    take_while(move |c| WHITESPACE.contains(c))(i)
}

fn identifier(i: &str) -> IResult<&str, &str> {
    is_not(" \t\r\n\\$,=\"'()@:~")(i)
}

fn boolean(i: &str) -> IResult<&str, bool> {
    alt((value(true, tag("true")), value(false, tag("false"))))(i)
}

fn digits_signed(i: &str) -> IResult<&str, &str> {
    recognize(tuple((opt(tag("-")), digit1)))(i)
}

fn float_literal(i: &str) -> IResult<&str, &str> {
    recognize(tuple((opt(tag("-")), digit1, opt(tuple((tag("."), digit1))))))(i)
}

fn float32(i: &str) -> IResult<&str, f32> {
    map_res(tuple((tag("$"), float_literal)), |(_, n)| n.parse())(i)
}

fn float64(i: &str) -> IResult<&str, f64> {
    map_res(tuple((tag("$$"), float_literal)), |(_, n)| n.parse())(i)
}

/// Bare integers default to `i32`; a trailing suffix picks a narrower or wider width so the
/// textual form round-trips the exact on-wire type.
fn integer(i: &str) -> IResult<&str, Value> {
    alt((
        map_res(terminated(digits_signed, tag("b")), |n: &str| n.parse::<i8>().map(Value::I8)),
        map_res(terminated(digits_signed, tag("s")), |n: &str| n.parse::<i16>().map(Value::I16)),
        map_res(terminated(digits_signed, tag("L")), |n: &str| n.parse::<i64>().map(Value::I64)),
        map_res(digits_signed, |n: &str| n.parse::<i32>().map(Value::I32)),
    ))(i)
}

fn b64_payload(i: &str) -> IResult<&str, &str> {
    recognize(tuple((take_while(move |c| B64_CHARS.contains(c)), opt(tag("=")), opt(tag("=")))))(i)
}

/// An opaque, unrecognized variable-width type: `~<type-id>'<base64>'`.
fn unknown_bytes(i: &str) -> IResult<&str, Value> {
    map_res(
        tuple((tag("~"), digit1, tag("'"), b64_payload, tag("'"))),
        |(_, id, _, payload, _): (&str, &str, &str, &str, &str)| -> Result<Value, anyhow::Error> {
            let type_id: u8 = id.parse()?;
            let bytes = b64_decode(payload)?;
            Ok(Value::Unknown(type_id, bytes))
        },
    )(i)
}

fn escaped_string(i: &str) -> IResult<&str, String> {
    delimited(
        tag("\""),
        alt((
            escaped_transform(is_not("\\\""), '\\', alt((value("\\", tag("\\")), value("\n", tag("n")), value("\"", tag("\""))))),
            map(tag(""), String::from),
        )),
        tag("\""),
    )(i)
}

fn container(i: &str) -> IResult<&str, Message> {
    map(
        delimited(
            tag("("),
            tuple((separated_list0(tag(","), field), white, opt(tag(",")), white)),
            tag(")"),
        ),
        |(fields, ..)| fields.into_iter().collect::<Message>(),
    )(i)
}

fn fudge_value(i: &str) -> IResult<&str, Value> {
    map(
        tuple((
            white,
            alt((
                map(container, Value::Message),
                map(escaped_string, Value::Str),
                unknown_bytes,
                map(float64, Value::F64),
                map(float32, Value::F32),
                integer,
                map(boolean, Value::Bool),
            )),
            white,
        )),
        |(_, v, _)| v,
    )(i)
}

/// `name`, `@ordinal`, or `@ordinal:name` preceding `=`.
fn key(i: &str) -> IResult<&str, (Option<String>, Option<i16>)> {
    alt((
        map(
            tuple((tag("@"), digits_signed, tag(":"), identifier, white, tag("="))),
            |(_, ord, _, name, _, _): (&str, &str, &str, &str, &str, &str)| {
                (Some(String::from(name)), ord.parse().ok())
            },
        ),
        map(tuple((tag("@"), digits_signed, white, tag("="))), |(_, ord, _, _): (&str, &str, &str, &str)| {
            (None, ord.parse().ok())
        }),
        map(tuple((identifier, white, tag("="))), |(name, _, _): (&str, &str, &str)| (Some(String::from(name)), None)),
    ))(i)
}

fn field(i: &str) -> IResult<&str, Field> {
    alt((
        map(tuple((white, key, white, fudge_value, white)), |(_, (name, ordinal), _, v, _)| {
            let mut field = Field::new(v);
            if let Some(n) = name {
                field = field.with_name(n);
            }
            if let Some(o) = ordinal {
                field = field.with_ordinal(o);
            }
            field
        }),
        map(fudge_value, Field::new),
    ))(i)
}

/// Renders a decoded field as the same textual form [`parse`] consumes.
pub fn render_field(field: &Field) -> String {
    let mut out = String::new();
    match (&field.name, field.ordinal) {
        (Some(name), Some(ord)) => out.push_str(&format!("@{}:{} = ", ord, name)),
        (Some(name), None) => out.push_str(&format!("{} = ", name)),
        (None, Some(ord)) => out.push_str(&format!("@{} = ", ord)),
        (None, None) => {}
    }
    out.push_str(&render_value(&field.value));
    out
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::I8(n) => format!("{}b", n),
        Value::I16(n) => format!("{}s", n),
        Value::I32(n) => n.to_string(),
        Value::I64(n) => format!("{}L", n),
        Value::F32(n) => format!("${}", n),
        Value::F64(n) => format!("$${}", n),
        Value::Str(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Value::Message(msg) => render_message(msg),
        Value::Unknown(type_id, bytes) => format!("~{}'{}'", type_id, base64::encode(bytes)),
    }
}

/// Renders a whole message as `(field, field, ...)`.
pub fn render_message(msg: &Message) -> String {
    let body: Vec<String> = msg.iter().map(render_field).collect();
    format!("({})", body.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives() {
        assert_eq!(parse("true").unwrap(), Field::new(Value::Bool(true)));
        assert_eq!(parse("false").unwrap(), Field::new(Value::Bool(false)));
    }

    #[test]
    fn integers() {
        assert_eq!(parse("123").unwrap(), Field::new(Value::I32(123)));
        assert_eq!(parse("-123").unwrap(), Field::new(Value::I32(-123)));
        assert_eq!(parse("5b").unwrap(), Field::new(Value::I8(5)));
        assert_eq!(parse("5s").unwrap(), Field::new(Value::I16(5)));
        assert_eq!(parse("5L").unwrap(), Field::new(Value::I64(5)));
    }

    #[test]
    fn floats() {
        assert_eq!(parse("$1.5").unwrap(), Field::new(Value::F32(1.5)));
        assert_eq!(parse("$$1.5").unwrap(), Field::new(Value::F64(1.5)));
    }

    #[test]
    fn strings() {
        assert_eq!(parse("\"\"").unwrap(), Field::new(Value::Str(String::new())));
        assert_eq!(parse("\"abc\"").unwrap(), Field::new(Value::Str("abc".to_string())));
        assert_eq!(parse("\"abc\\\"def\"").unwrap(), Field::new(Value::Str("abc\"def".to_string())));
    }

    #[test]
    fn named_field() {
        let f = parse("name = true").unwrap();
        assert_eq!(f.name.as_deref(), Some("name"));
        assert_eq!(f.value, Value::Bool(true));
    }

    #[test]
    fn ordinal_field() {
        let f = parse("@5 = true").unwrap();
        assert_eq!(f.ordinal, Some(5));
        assert_eq!(f.value, Value::Bool(true));
    }

    #[test]
    fn named_and_ordinal_field() {
        let f = parse("@5:name = true").unwrap();
        assert_eq!(f.name.as_deref(), Some("name"));
        assert_eq!(f.ordinal, Some(5));
    }

    #[test]
    fn nested_message() {
        let f = parse("(true, x = false)").unwrap();
        match f.value {
            Value::Message(msg) => {
                assert_eq!(msg.len(), 2);
                assert_eq!(msg.by_name("x").unwrap().value, Value::Bool(false));
            }
            other => panic!("expected a message, got {:?}", other),
        }
    }

    #[test]
    fn render_then_reparse_roundtrips() {
        let mut msg = Message::new();
        msg.push(Field::new(Value::I32(7)).with_name("a"));
        msg.push(Field::new(Value::Bool(true)).with_ordinal(3));
        let field = Field::new(Value::Message(msg));
        let rendered = render_value(&field.value);
        let reparsed = parse(&rendered).unwrap();
        assert_eq!(reparsed.value, field.value);
    }
}
