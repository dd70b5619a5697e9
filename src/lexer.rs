//! PDF lexer (tokenizer).
//!
//! Tokenizes both object syntax (file bodies, xref trailers) and content
//! streams. Bare words that are not object keywords come back as
//! [`Token::Operator`], which is what the content-stream scanner needs to
//! count `q`/`Q` pairs and to find rendering-intent operators.
//!
//! Whitespace (space, \t, \r, \n, \0, \f) and comments (% to EOL) are skipped.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{map, opt, value},
    multi::many0,
    sequence::{delimited, preceded},
    IResult,
};

/// Token types recognized by the PDF lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Integer number (e.g., 42, -123)
    Integer(i64),

    /// Real (floating-point) number (e.g., 3.14, -2.5, .5)
    Real(f64),

    /// Raw literal string content, escapes still encoded
    LiteralString(&'a [u8]),

    /// Raw hex string content, whitespace preserved
    HexString(&'a [u8]),

    /// Name with `#xx` escapes decoded
    Name(String),

    /// `true`
    True,

    /// `false`
    False,

    /// `null`
    Null,

    /// `[`
    ArrayStart,

    /// `]`
    ArrayEnd,

    /// `<<`
    DictStart,

    /// `>>`
    DictEnd,

    /// `obj`
    ObjStart,

    /// `endobj`
    ObjEnd,

    /// `stream`
    StreamStart,

    /// `endstream`
    StreamEnd,

    /// `R` (used in "10 0 R")
    R,

    /// Any other bare word, e.g. a content-stream operator such as `q`, `RG` or `ri`
    Operator(&'a [u8]),
}

fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

fn is_delimiter(c: u8) -> bool {
    matches!(c, b'/' | b'%' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}')
}

/// True for bytes that can appear inside a bare word or name.
pub fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

fn whitespace(input: &[u8]) -> IResult<&[u8], ()> {
    value((), take_while1(is_whitespace))(input)
}

fn comment(input: &[u8]) -> IResult<&[u8], ()> {
    value((), preceded(char('%'), take_till(|c| c == b'\r' || c == b'\n')))(input)
}

/// Skip all whitespace and comments.
pub fn skip_ws(input: &[u8]) -> IResult<&[u8], ()> {
    value((), many0(alt((whitespace, comment))))(input)
}

fn digit_error(input: &[u8]) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit))
}

/// Parse an integer or real number.
///
/// PDF allows a leading sign and a missing integer or fraction part
/// (`.5`, `5.`, `-.002`), but never an exponent.
fn parse_number(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let start = input;
    let (input, sign) = opt(one_of("+-"))(input)?;
    let (input, int_part) = opt(digit1)(input)?;
    let (input, frac_part) = opt(preceded(char('.'), opt(digit1)))(input)?;

    if int_part.is_none() && frac_part.is_none() {
        return Err(digit_error(start));
    }

    let int_str = match int_part {
        Some(bytes) => std::str::from_utf8(bytes).map_err(|_| digit_error(start))?,
        None => "0",
    };

    match frac_part {
        Some(frac) => {
            let frac_str = match frac {
                Some(bytes) => std::str::from_utf8(bytes).map_err(|_| digit_error(start))?,
                None => "0",
            };
            let mut num: f64 = format!("{}.{}", int_str, frac_str)
                .parse()
                .map_err(|_| digit_error(start))?;
            if sign == Some('-') {
                num = -num;
            }
            Ok((input, Token::Real(num)))
        },
        None => {
            let mut num: i64 = int_str.parse().map_err(|_| digit_error(start))?;
            if sign == Some('-') {
                num = -num;
            }
            Ok((input, Token::Integer(num)))
        },
    }
}

/// Parse a literal string enclosed in balanced parentheses.
///
/// Escapes are skipped over, not decoded; the parser decodes them.
fn parse_literal_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (body, _) = char('(')(input)?;
    let mut depth = 1usize;
    let mut pos = 0;

    while depth > 0 && pos < body.len() {
        match body[pos] {
            b'\\' => pos += 2,
            b'(' => {
                depth += 1;
                pos += 1;
            },
            b')' => {
                depth -= 1;
                pos += 1;
            },
            _ => pos += 1,
        }
    }

    if depth != 0 || pos > body.len() {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }

    Ok((&body[pos..], Token::LiteralString(&body[..pos - 1])))
}

/// Parse a hexadecimal string enclosed in angle brackets.
fn parse_hex_string(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    if input.starts_with(b"<<") {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }

    delimited(
        char('<'),
        map(
            take_while(|c: u8| c.is_ascii_hexdigit() || c.is_ascii_whitespace()),
            Token::HexString,
        ),
        char('>'),
    )(input)
}

/// Decode `#xx` escape sequences in PDF names.
///
/// Malformed escapes are kept literally.
///
/// ```
/// # use pdfa_oxide::lexer::decode_name_escapes;
/// assert_eq!(decode_name_escapes("A#20B#23C"), "A B#C");
/// assert_eq!(decode_name_escapes("A#"), "A#");
/// ```
pub fn decode_name_escapes(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'#' && i + 2 < bytes.len() {
            let (hi, lo) = (bytes[i + 1], bytes[i + 2]);
            if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() {
                out.push(hex_value(hi) << 4 | hex_value(lo));
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        _ => c - b'A' + 10,
    }
}

/// Parse a name starting with /.
fn parse_name(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    preceded(
        char('/'),
        map(take_while(is_regular), |bytes: &[u8]| {
            Token::Name(decode_name_escapes(&String::from_utf8_lossy(bytes)))
        }),
    )(input)
}

fn parse_delimiter(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    alt((
        value(Token::DictStart, tag(b"<<")),
        value(Token::DictEnd, tag(b">>")),
        value(Token::ArrayStart, tag(b"[")),
        value(Token::ArrayEnd, tag(b"]")),
    ))(input)
}

/// Parse a bare word: an object keyword or a content operator.
///
/// The whole run of regular characters is read first, so `RG` is never
/// mistaken for the reference marker `R` and `endobj` never for `end`.
fn parse_word(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, word) = take_while1(is_regular)(input)?;
    let token = match word {
        b"true" => Token::True,
        b"false" => Token::False,
        b"null" => Token::Null,
        b"obj" => Token::ObjStart,
        b"endobj" => Token::ObjEnd,
        b"stream" => Token::StreamStart,
        b"endstream" => Token::StreamEnd,
        b"R" => Token::R,
        other => Token::Operator(other),
    };
    Ok((rest, token))
}

/// Parse a single PDF token after skipping whitespace and comments.
///
/// Numbers are tried before bare words so `-5` and `.5` lex as numbers.
pub fn token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (input, _) = skip_ws(input)?;

    alt((
        parse_delimiter,
        parse_name,
        parse_number_token,
        parse_literal_string,
        parse_hex_string,
        parse_word,
    ))(input)
}

/// A number must not run straight into regular characters (`1a` is a word).
fn parse_number_token(input: &[u8]) -> IResult<&[u8], Token<'_>> {
    let (rest, tok) = parse_number(input)?;
    match rest.first() {
        Some(&c) if is_regular(c) && c != b'+' && c != b'-' => Err(digit_error(input)),
        _ => Ok((rest, tok)),
    }
}

/// Parse tokens until input is exhausted or an invalid token is found.
pub fn tokens(input: &[u8]) -> IResult<&[u8], Vec<Token<'_>>> {
    many0(token)(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integers() {
        assert_eq!(token(b"42"), Ok((&b""[..], Token::Integer(42))));
        assert_eq!(token(b"-123"), Ok((&b""[..], Token::Integer(-123))));
        assert_eq!(token(b"+7"), Ok((&b""[..], Token::Integer(7))));
    }

    #[test]
    fn test_parse_reals() {
        assert_eq!(token(b"-2.5"), Ok((&b""[..], Token::Real(-2.5))));
        assert_eq!(token(b".5"), Ok((&b""[..], Token::Real(0.5))));
        assert_eq!(token(b"5."), Ok((&b""[..], Token::Real(5.0))));
        assert_eq!(token(b"-.002"), Ok((&b""[..], Token::Real(-0.002))));
    }

    #[test]
    fn test_parse_literal_strings() {
        assert_eq!(token(b"(Hello)"), Ok((&b""[..], Token::LiteralString(b"Hello"))));
        assert_eq!(
            token(b"(Hello (nested) World)"),
            Ok((&b""[..], Token::LiteralString(b"Hello (nested) World")))
        );
        assert_eq!(token(b"(a\\)b)"), Ok((&b""[..], Token::LiteralString(b"a\\)b"))));
        assert_eq!(token(b"()"), Ok((&b""[..], Token::LiteralString(b""))));
    }

    #[test]
    fn test_unbalanced_literal_string_fails() {
        assert!(token(b"(never closed").is_err());
    }

    #[test]
    fn test_parse_hex_string() {
        assert_eq!(token(b"<48 65>"), Ok((&b""[..], Token::HexString(b"48 65"))));
        assert_eq!(token(b"<<"), Ok((&b""[..], Token::DictStart)));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(token(b"/Type"), Ok((&b""[..], Token::Name("Type".to_string()))));
        assert_eq!(token(b"/A#20B"), Ok((&b""[..], Token::Name("A B".to_string()))));
        assert_eq!(token(b"/ "), Ok((&b" "[..], Token::Name(String::new()))));
    }

    #[test]
    fn test_decode_name_escapes_directly() {
        assert_eq!(decode_name_escapes("Type"), "Type");
        assert_eq!(decode_name_escapes("A#2"), "A#2");
        assert_eq!(decode_name_escapes("A#ZZ"), "A#ZZ");
        assert_eq!(decode_name_escapes("#41#42"), "AB");
    }

    #[test]
    fn test_object_keywords() {
        assert_eq!(token(b"true"), Ok((&b""[..], Token::True)));
        assert_eq!(token(b"null"), Ok((&b""[..], Token::Null)));
        assert_eq!(token(b"endobj"), Ok((&b""[..], Token::ObjEnd)));
        assert_eq!(token(b"endstream"), Ok((&b""[..], Token::StreamEnd)));
        assert_eq!(token(b"stream\n"), Ok((&b"\n"[..], Token::StreamStart)));
    }

    #[test]
    fn test_operator_words_are_not_keywords() {
        assert_eq!(token(b"RG"), Ok((&b""[..], Token::Operator(b"RG"))));
        assert_eq!(token(b"R"), Ok((&b""[..], Token::R)));
        assert_eq!(token(b"q"), Ok((&b""[..], Token::Operator(b"q"))));
        assert_eq!(token(b"T*"), Ok((&b""[..], Token::Operator(b"T*"))));
        assert_eq!(token(b"'"), Ok((&b""[..], Token::Operator(b"'"))));
        assert_eq!(token(b"truex"), Ok((&b""[..], Token::Operator(b"truex"))));
    }

    #[test]
    fn test_skip_whitespace_and_comments() {
        assert_eq!(token(b"  \n% note\r\n  42"), Ok((&b""[..], Token::Integer(42))));
        assert_eq!(token(b"%a\n%b\n/N"), Ok((&b""[..], Token::Name("N".to_string()))));
    }

    #[test]
    fn test_content_stream_tokens() {
        let (rest, toks) = tokens(b"q 1 0 0 RG /Perceptual ri Q").unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            toks,
            vec![
                Token::Operator(b"q"),
                Token::Integer(1),
                Token::Integer(0),
                Token::Integer(0),
                Token::Operator(b"RG"),
                Token::Name("Perceptual".to_string()),
                Token::Operator(b"ri"),
                Token::Operator(b"Q"),
            ]
        );
    }

    #[test]
    fn test_reference_tokens() {
        let (_, toks) = tokens(b"<< /Pages 2 0 R >>").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::DictStart,
                Token::Name("Pages".to_string()),
                Token::Integer(2),
                Token::Integer(0),
                Token::R,
                Token::DictEnd,
            ]
        );
    }
}
