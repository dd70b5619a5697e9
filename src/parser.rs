//! PDF object parser.
//!
//! Recursive descent over lexer tokens. Composite objects (arrays,
//! dictionaries, streams) recurse into [`parse_object`]; references are
//! recognised by two-token lookahead (`10 0 R`).

use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::{Dictionary, Object, ObjectRef};
use nom::IResult;

/// Decode escape sequences in PDF literal strings.
///
/// Handles `\n \r \t \b \f \( \) \\`, one to three digit octal escapes, and
/// backslash line continuations. Unknown escapes drop the backslash.
///
/// ```
/// # use pdfa_oxide::parser::decode_literal_string_escapes;
/// assert_eq!(decode_literal_string_escapes(b"Section \\247 1"), b"Section \xa7 1");
/// ```
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        let c = raw[i];
        if c != b'\\' || i + 1 == raw.len() {
            out.push(c);
            i += 1;
            continue;
        }

        let next = raw[i + 1];
        i += 2;
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'\n' => {},
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'0'..=b'7' => {
                let mut value = u32::from(next - b'0');
                let mut digits = 1;
                while digits < 3 {
                    match raw.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            i += 1;
                            digits += 1;
                        },
                        _ => break,
                    }
                }
                out.push((value & 0xFF) as u8);
            },
            other => out.push(other),
        }
    }

    out
}

fn fail(input: &[u8], kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

/// Parse a PDF object from input bytes.
///
/// ```
/// use pdfa_oxide::parser::parse_object;
///
/// let (_, obj) = parse_object(b"<< /Type /Page /Count 3 >>").unwrap();
/// assert_eq!(obj.get("Count").and_then(|o| o.as_integer()), Some(3));
/// ```
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    let (input, tok) = token(input)?;

    match tok {
        Token::Null => Ok((input, Object::Null)),
        Token::True => Ok((input, Object::Boolean(true))),
        Token::False => Ok((input, Object::Boolean(false))),

        Token::Integer(i) => {
            if let Ok((after_gen, Token::Integer(gen))) = token(input) {
                if let Ok((after_r, Token::R)) = token(after_gen) {
                    if (0..=i64::from(u32::MAX)).contains(&i)
                        && (0..=i64::from(u16::MAX)).contains(&gen)
                    {
                        return Ok((after_r, Object::Reference(ObjectRef::new(i as u32, gen as u16))));
                    }
                }
            }
            Ok((input, Object::Integer(i)))
        },

        Token::Real(r) => Ok((input, Object::Real(r))),

        Token::LiteralString(bytes) => Ok((input, Object::String(decode_literal_string_escapes(bytes)))),

        Token::HexString(hex) => match decode_hex(hex) {
            Ok(decoded) => Ok((input, Object::String(decoded))),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::HexDigit,
            ))),
        },

        Token::Name(name) => Ok((input, Object::Name(name))),

        Token::ArrayStart => parse_array(input),

        Token::DictStart => {
            let (remaining, dict) = parse_dictionary(input)?;

            if let Ok((stream_input, Token::StreamStart)) = token(remaining) {
                let (rest, data) = parse_stream_data(stream_input, &dict)?;
                return Ok((
                    rest,
                    Object::Stream {
                        dict,
                        data: bytes::Bytes::from(data),
                    },
                ));
            }

            Ok((remaining, Object::Dictionary(dict)))
        },

        _ => Err(fail(input, nom::error::ErrorKind::Tag)),
    }
}

/// Parse stream data after the `stream` keyword.
///
/// A direct `Length` is trusted when it lands on `endstream`; otherwise the
/// data runs up to the next `endstream` keyword (indirect lengths, damaged files).
fn parse_stream_data<'a>(input: &'a [u8], dict: &Dictionary) -> IResult<&'a [u8], Vec<u8>> {
    let input = if input.starts_with(b"\r\n") {
        &input[2..]
    } else if input.starts_with(b"\n") || input.starts_with(b"\r") {
        &input[1..]
    } else {
        log::warn!("No end-of-line marker after stream keyword");
        input
    };

    if let Some(length) = dict.get("Length").and_then(|o| o.as_integer()) {
        let length = length.max(0) as usize;
        if length <= input.len() {
            if let Ok((rest, Token::StreamEnd)) = token(&input[length..]) {
                return Ok((rest, input[..length].to_vec()));
            }
        }
        log::debug!("Stream Length {} does not reach endstream, scanning", length);
    }

    match find_endstream(input) {
        Some(pos) => {
            let mut data = &input[..pos];
            if data.ends_with(b"\r\n") {
                data = &data[..data.len() - 2];
            } else if data.ends_with(b"\n") || data.ends_with(b"\r") {
                data = &data[..data.len() - 1];
            }
            Ok((&input[pos + b"endstream".len()..], data.to_vec()))
        },
        None => Err(fail(input, nom::error::ErrorKind::Eof)),
    }
}

fn find_endstream(input: &[u8]) -> Option<usize> {
    let keyword = b"endstream";
    input.windows(keyword.len()).position(|window| window == keyword)
}

/// Parse array contents after `[`.
fn parse_array(input: &[u8]) -> IResult<&[u8], Object> {
    let mut objects = Vec::new();
    let mut remaining = input;

    loop {
        if let Ok((rest, Token::ArrayEnd)) = token(remaining) {
            return Ok((rest, Object::Array(objects)));
        }
        let (rest, obj) = parse_object(remaining)?;
        objects.push(obj);
        remaining = rest;
    }
}

/// Parse dictionary contents after `<<`. Keys must be names.
fn parse_dictionary(input: &[u8]) -> IResult<&[u8], Dictionary> {
    let mut dict = Dictionary::new();
    let mut remaining = input;

    loop {
        let (rest, tok) = token(remaining)?;
        match tok {
            Token::DictEnd => return Ok((rest, dict)),
            Token::Name(key) => {
                let (rest, value) = parse_object(rest)?;
                // A null value is equivalent to an absent key.
                if !value.is_null() {
                    dict.insert(key, value);
                }
                remaining = rest;
            },
            _ => return Err(fail(remaining, nom::error::ErrorKind::Tag)),
        }
    }
}

/// Parse `N G obj ... endobj` starting at `input`.
pub fn parse_indirect_object(input: &[u8]) -> IResult<&[u8], (ObjectRef, Object)> {
    let (input, id) = match token(input)? {
        (rest, Token::Integer(n)) if n >= 0 => (rest, n as u32),
        _ => return Err(fail(input, nom::error::ErrorKind::Digit)),
    };
    let (input, gen) = match token(input)? {
        (rest, Token::Integer(g)) if (0..=i64::from(u16::MAX)).contains(&g) => (rest, g as u16),
        _ => return Err(fail(input, nom::error::ErrorKind::Digit)),
    };
    let (input, _) = match token(input)? {
        (rest, Token::ObjStart) => (rest, ()),
        _ => return Err(fail(input, nom::error::ErrorKind::Tag)),
    };
    let (input, obj) = parse_object(input)?;
    let input = match token(input) {
        Ok((rest, Token::ObjEnd)) => rest,
        _ => {
            log::warn!("Object {} {} is missing endobj", id, gen);
            input
        },
    };
    Ok((input, (ObjectRef::new(id, gen), obj)))
}

/// Parse the indirect object whose header starts at byte `offset` of `data`.
///
/// Whitespace before the object number is tolerated; anything else at the
/// offset, a comment included, is an error.
pub fn parse_object_at(data: &[u8], offset: usize) -> Result<(ObjectRef, Object)> {
    let slice = data.get(offset..).ok_or_else(|| Error::ParseError {
        offset,
        reason: "offset beyond end of file".to_string(),
    })?;
    if !slice
        .iter()
        .find(|c| !c.is_ascii_whitespace())
        .is_some_and(u8::is_ascii_digit)
    {
        return Err(Error::ParseError {
            offset,
            reason: "no object number at offset".to_string(),
        });
    }
    parse_indirect_object(slice)
        .map(|(_, parsed)| parsed)
        .map_err(|e| Error::ParseError {
            offset,
            reason: format!("{:?}", e),
        })
}

/// Decode a hex string to bytes. Whitespace is ignored, an odd final digit is padded with 0.
///
/// ```
/// use pdfa_oxide::parser::decode_hex;
/// assert_eq!(decode_hex(b"48656C6C6F").unwrap(), b"Hello");
/// assert_eq!(decode_hex(b"7").unwrap(), vec![0x70]);
/// ```
pub fn decode_hex(hex_bytes: &[u8]) -> Result<Vec<u8>> {
    let digits: Vec<u8> = hex_bytes
        .iter()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|&c| match c {
            b'0'..=b'9' => Ok(c - b'0'),
            b'a'..=b'f' => Ok(c - b'a' + 10),
            b'A'..=b'F' => Ok(c - b'A' + 10),
            other => Err(Error::ParseError {
                offset: 0,
                reason: format!("Invalid hex digit: {:?}", other as char),
            }),
        })
        .collect::<Result<_>>()?;

    Ok(digits
        .chunks(2)
        .map(|pair| pair[0] << 4 | pair.get(1).copied().unwrap_or(0))
        .collect())
}
