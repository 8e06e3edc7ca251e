//! PDF lexer and object parser (ISO 32000-1:2008 §7.2–7.3).
//!
//! A condensed, nom-based tokenizer/parser covering the object syntax the
//! reconstruction pipeline needs: numbers, literal and hex strings, names,
//! arrays, dictionaries, streams, and indirect references. Unlike a
//! general-purpose PDF engine this does not need to recover from
//! encrypted strings or validate cross-reference consistency beyond what
//! `xref.rs` already does.

use super::object::{Object, ObjectRef};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{map, map_res, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};
use std::collections::HashMap;

fn is_pdf_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Skip whitespace and `%`-to-end-of-line comments.
fn skip_ws(input: &[u8]) -> IResult<&[u8], ()> {
    let (input, _) = many0(alt((
        value((), take_while1(is_pdf_whitespace)),
        value((), pair(char('%'), take_till(|b| b == b'\n' || b == b'\r'))),
    )))(input)?;
    Ok((input, ()))
}

fn ws<'a, F, O>(mut inner: F) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], O>
where
    F: FnMut(&'a [u8]) -> IResult<&'a [u8], O>,
{
    move |input: &'a [u8]| {
        let (input, _) = skip_ws(input)?;
        inner(input)
    }
}

fn parse_number(input: &[u8]) -> IResult<&[u8], Object> {
    let (input, text) = recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(tuple((digit1, opt(pair(char('.'), opt(digit1)))))),
            recognize(pair(char('.'), digit1)),
        )),
    )))(input)?;
    let text = std::str::from_utf8(text).unwrap_or_default();
    if text.contains('.') {
        let value: f64 = text.parse().unwrap_or(0.0);
        Ok((input, Object::Real(value)))
    } else {
        let value: i64 = text.parse().unwrap_or(0);
        Ok((input, Object::Integer(value)))
    }
}

fn parse_name(input: &[u8]) -> IResult<&[u8], Object> {
    let (input, _) = char('/')(input)?;
    let (input, raw) = take_while(|b: u8| !is_pdf_whitespace(b) && !is_delimiter(b))(input)?;
    let mut name = String::new();
    let mut iter = raw.iter().copied().peekable();
    while let Some(b) = iter.next() {
        if b == b'#' {
            let hi = iter.next();
            let lo = iter.next();
            if let (Some(hi), Some(lo)) = (hi, lo) {
                let hex = [hi, lo];
                if let Ok(s) = std::str::from_utf8(&hex) {
                    if let Ok(code) = u8::from_str_radix(s, 16) {
                        name.push(code as char);
                        continue;
                    }
                }
            }
        } else {
            name.push(b as char);
        }
    }
    Ok((input, Object::Name(name)))
}

fn parse_literal_string(input: &[u8]) -> IResult<&[u8], Object> {
    let (mut input, _) = char('(')(input)?;
    let mut depth = 1;
    let mut bytes = Vec::new();
    loop {
        match input.first().copied() {
            None => break,
            Some(b'\\') => {
                let escaped = input.get(1).copied();
                input = &input[2.min(input.len())..];
                match escaped {
                    Some(b'n') => bytes.push(b'\n'),
                    Some(b'r') => bytes.push(b'\r'),
                    Some(b't') => bytes.push(b'\t'),
                    Some(b'b') => bytes.push(0x08),
                    Some(b'f') => bytes.push(0x0C),
                    Some(b'(') => bytes.push(b'('),
                    Some(b')') => bytes.push(b')'),
                    Some(b'\\') => bytes.push(b'\\'),
                    Some(other) => bytes.push(other),
                    None => {}
                }
            }
            Some(b'(') => {
                depth += 1;
                bytes.push(b'(');
                input = &input[1..];
            }
            Some(b')') => {
                depth -= 1;
                input = &input[1..];
                if depth == 0 {
                    break;
                }
                bytes.push(b')');
            }
            Some(b) => {
                bytes.push(b);
                input = &input[1..];
            }
        }
    }
    Ok((input, Object::String(bytes)))
}

fn parse_hex_string(input: &[u8]) -> IResult<&[u8], Object> {
    let (input, hex) = delimited(char('<'), take_till(|b| b == b'>'), char('>'))(input)?;
    let digits: Vec<u8> = hex.iter().copied().filter(|b| !is_pdf_whitespace(*b)).collect();
    let mut bytes = Vec::with_capacity(digits.len() / 2 + 1);
    let mut chunks = digits.chunks(2);
    for chunk in &mut chunks {
        let s = std::str::from_utf8(chunk).unwrap_or("0");
        let s = if chunk.len() == 1 {
            format!("{s}0")
        } else {
            s.to_string()
        };
        bytes.push(u8::from_str_radix(&s, 16).unwrap_or(0));
    }
    Ok((input, Object::String(bytes)))
}

fn parse_array(input: &[u8]) -> IResult<&[u8], Object> {
    let (input, items) = delimited(
        ws(char('[')),
        many0(ws(parse_object)),
        ws(char(']')),
    )(input)?;
    Ok((input, Object::Array(items)))
}

fn parse_dict_entries(input: &[u8]) -> IResult<&[u8], HashMap<String, Object>> {
    let (input, pairs) = delimited(
        ws(tag("<<")),
        many0(pair(ws(parse_name), ws(parse_object))),
        ws(tag(">>")),
    )(input)?;
    let mut dict = HashMap::new();
    for (key, value) in pairs {
        if let Object::Name(name) = key {
            dict.insert(name, value);
        }
    }
    Ok((input, dict))
}

fn parse_reference_or_number(input: &[u8]) -> IResult<&[u8], Object> {
    let (input, number) = parse_number(input)?;
    let checkpoint = input;
    let attempt: IResult<&[u8], (Object, Object)> =
        pair(ws(parse_number), ws(char('R')))(checkpoint).map(|(i, (g, _))| (i, (number.clone(), g)));
    match attempt {
        Ok((rest, (Object::Integer(num), Object::Integer(gen)))) => Ok((
            rest,
            Object::Reference(ObjectRef {
                number: num as u32,
                generation: gen as u16,
            }),
        )),
        _ => Ok((input, number)),
    }
}

/// Parse a single PDF object (leading whitespace already consumed by the
/// caller where applicable).
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    alt((
        value(Object::Null, tag("null")),
        value(Object::Bool(true), tag("true")),
        value(Object::Bool(false), tag("false")),
        parse_dict_entries_as_dict_or_stream,
        parse_array,
        parse_name,
        parse_hex_string,
        parse_literal_string,
        parse_reference_or_number,
    ))(input)
}

fn parse_dict_entries_as_dict_or_stream(input: &[u8]) -> IResult<&[u8], Object> {
    let (input, dict) = parse_dict_entries(input)?;
    let (input, _) = skip_ws(input)?;
    let stream_attempt: IResult<&[u8], &[u8]> = tag("stream")(input);
    if let Ok((mut rest, _)) = stream_attempt {
        if rest.first() == Some(&b'\r') {
            rest = &rest[1..];
        }
        if rest.first() == Some(&b'\n') {
            rest = &rest[1..];
        }
        let length = dict
            .get("Length")
            .and_then(Object::as_i64)
            .unwrap_or(0)
            .max(0) as usize;
        let length = length.min(rest.len());
        let (data, rest) = rest.split_at(length);
        let (rest, _) = ws(tag("endstream"))(rest).unwrap_or((rest, &[][..]));
        return Ok((rest, Object::Stream(dict, data.to_vec())));
    }
    Ok((input, Object::Dict(dict)))
}

/// Parse an indirect object definition `N G obj ... endobj`, returning the
/// object number, generation and contained object.
pub fn parse_indirect_object(input: &[u8]) -> IResult<&[u8], (ObjectRef, Object)> {
    let (input, (num, gen, _)) =
        tuple((ws(map_res(digit1, parse_u32)), ws(map_res(digit1, parse_u32)), ws(tag("obj"))))(
            input,
        )?;
    let (input, object) = ws(parse_object)(input)?;
    let (input, _) = opt(ws(tag("endobj")))(input)?;
    Ok((
        input,
        (
            ObjectRef {
                number: num,
                generation: gen as u16,
            },
            object,
        ),
    ))
}

fn parse_u32(digits: &[u8]) -> Result<u32, std::num::ParseIntError> {
    std::str::from_utf8(digits).unwrap_or("0").parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_integer() {
        let (_, obj) = parse_object(b"42").unwrap();
        assert_eq!(obj, Object::Integer(42));
    }

    #[test]
    fn parses_negative_real() {
        let (_, obj) = parse_object(b"-3.14").unwrap();
        assert_eq!(obj, Object::Real(-3.14));
    }

    #[test]
    fn parses_name_with_hex_escape() {
        let (_, obj) = parse_object(b"/A#42C").unwrap();
        assert_eq!(obj, Object::Name("ABC".to_string()));
    }

    #[test]
    fn parses_literal_string_with_nested_parens() {
        let (_, obj) = parse_object(b"(a(b)c)").unwrap();
        assert_eq!(obj, Object::String(b"a(b)c".to_vec()));
    }

    #[test]
    fn parses_hex_string() {
        let (_, obj) = parse_object(b"<48656C6C6F>").unwrap();
        assert_eq!(obj, Object::String(b"Hello".to_vec()));
    }

    #[test]
    fn parses_array_of_numbers() {
        let (_, obj) = parse_object(b"[1 2 3]").unwrap();
        assert_eq!(
            obj,
            Object::Array(vec![Object::Integer(1), Object::Integer(2), Object::Integer(3)])
        );
    }

    #[test]
    fn parses_reference() {
        let (_, obj) = parse_object(b"10 0 R").unwrap();
        assert_eq!(
            obj,
            Object::Reference(ObjectRef {
                number: 10,
                generation: 0
            })
        );
    }

    #[test]
    fn parses_dict() {
        let (_, obj) = parse_object(b"<< /Type /Page /Count 3 >>").unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get("Type").unwrap().as_name(), Some("Page"));
        assert_eq!(dict.get("Count").unwrap().as_i64(), Some(3));
    }

    #[test]
    fn parses_stream_using_length() {
        let input = b"<< /Length 5 >>\nstream\nhello\nendstream";
        let (_, obj) = parse_object(input).unwrap();
        match obj {
            Object::Stream(_, data) => assert_eq!(data, b"hello"),
            _ => panic!("expected stream"),
        }
    }

    #[test]
    fn parses_indirect_object() {
        let input = b"7 0 obj\n42\nendobj";
        let (_, (reference, object)) = parse_indirect_object(input).unwrap();
        assert_eq!(reference.number, 7);
        assert_eq!(object, Object::Integer(42));
    }
}
