// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP tokenizer using nom
//!
//! Zero-copy tokenization and fast entity scanning.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{map, map_res, opt, recognize},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::error::{Error, Result};

/// STEP token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Entity reference: #123
    EntityRef(u32),
    /// String literal, still escaped: 'text'
    String(&'a str),
    /// Integer: 42
    Integer(i64),
    /// Float: 3.14
    Float(f64),
    /// Enum: .TRUE., .F., .ELEMENT.
    Enum(&'a str),
    /// List: (1, 2, 3)
    List(Vec<Token<'a>>),
    /// Typed value: IFCPARAMETERVALUE(0.), IFCBOOLEAN(.T.)
    TypedValue(&'a str, Vec<Token<'a>>),
    /// Null value: $
    Null,
    /// Asterisk (derived value): *
    Derived,
}

/// Parse entity reference: #123
fn entity_ref(input: &str) -> IResult<&str, Token> {
    map(
        preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
        Token::EntityRef,
    )(input)
}

/// Body of a quoted string up to the closing quote. A doubled quote is an
/// escaped quote and stays in the slice.
fn string_body(input: &str, quote: u8) -> IResult<&str, &str> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while let Some(offset) = memchr::memchr(quote, &bytes[i..]) {
        let at = i + offset;
        if bytes.get(at + 1) == Some(&quote) {
            i = at + 2;
            continue;
        }
        return Ok((&input[at..], &input[..at]));
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

/// Parse string literal: 'text' or "text"
fn string_literal(input: &str) -> IResult<&str, Token> {
    alt((
        map(
            delimited(char('\''), |i| string_body(i, b'\''), char('\'')),
            Token::String,
        ),
        map(
            delimited(char('"'), |i| string_body(i, b'"'), char('"')),
            Token::String,
        ),
    ))(input)
}

/// Parse integer: 42, -42, +42
fn integer(input: &str) -> IResult<&str, Token> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
        s.parse::<i64>().map(Token::Integer)
    })(input)
}

/// Parse float: 3.14, -3.14, 1.5E-10, 0., 1.E5
fn float(input: &str) -> IResult<&str, Token> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            char('.'),
            opt(digit1),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| fast_float::parse::<f64, _>(s).map(Token::Float),
    )(input)
}

/// Parse enum: .TRUE., .F., .ELEMENT.
fn enum_value(input: &str) -> IResult<&str, Token> {
    map(
        delimited(
            char('.'),
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            char('.'),
        ),
        Token::Enum,
    )(input)
}

fn null(input: &str) -> IResult<&str, Token> {
    map(char('$'), |_| Token::Null)(input)
}

fn derived(input: &str) -> IResult<&str, Token> {
    map(char('*'), |_| Token::Derived)(input)
}

fn keyword(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

/// Comma separated tokens in parentheses
fn arguments(input: &str) -> IResult<&str, Vec<Token>> {
    delimited(
        pair(char('('), ws),
        separated_list0(delimited(ws, char(','), ws), token),
        pair(ws, char(')')),
    )(input)
}

/// Parse typed value: IFCPARAMETERVALUE(0.), IFCBOOLEAN(.T.)
fn typed_value(input: &str) -> IResult<&str, Token> {
    map(pair(keyword, arguments), |(type_name, args)| {
        Token::TypedValue(type_name, args)
    })(input)
}

fn ws(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c.is_whitespace())(input)
}

/// Parse a token with optional surrounding whitespace
fn token(input: &str) -> IResult<&str, Token> {
    delimited(
        ws,
        alt((
            float, // before integer, a float starts like one
            integer,
            entity_ref,
            string_literal,
            enum_value,
            list,
            typed_value,
            null,
            derived,
        )),
        ws,
    )(input)
}

fn list(input: &str) -> IResult<&str, Token> {
    map(arguments, Token::List)(input)
}

/// Parse a complete entity instance
///
/// Example: `#123=IFCCARTESIANPOINT((0.,0.,1.));`
///
/// Returns the id, the upper-case type keyword as written, and the arguments.
pub fn parse_entity(input: &str) -> Result<(u32, &str, Vec<Token>)> {
    let result: IResult<&str, (u32, &str, Vec<Token>)> = tuple((
        delimited(
            ws,
            preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
            ws,
        ),
        preceded(char('='), delimited(ws, keyword, ws)),
        arguments,
    ))(input);

    match result {
        Ok((rest, (id, type_name, args))) => {
            let rest = rest.trim_start();
            if !rest.starts_with(';') {
                return Err(Error::parse(
                    input.len() - rest.len(),
                    format!("expected ';' after entity #{}", id),
                ));
            }
            Ok((id, type_name, args))
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(Error::parse(
            input.len() - e.input.len(),
            format!("failed to parse entity: {:?}", e.code),
        )),
        Err(nom::Err::Incomplete(_)) => Err(Error::parse(input.len(), "incomplete entity")),
    }
}

/// Parse an unnumbered record such as a header entry
///
/// Example: `FILE_SCHEMA(('IFC4'));`
pub fn parse_record(input: &str) -> Result<(&str, Vec<Token>)> {
    let result: IResult<&str, (&str, Vec<Token>)> =
        pair(delimited(ws, keyword, ws), arguments)(input);

    match result {
        Ok((rest, record)) if rest.trim_start().starts_with(';') => Ok(record),
        Ok((rest, (name, _))) => Err(Error::parse(
            input.len() - rest.len(),
            format!("expected ';' after {}", name),
        )),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(Error::parse(
            input.len() - e.input.len(),
            format!("failed to parse record: {:?}", e.code),
        )),
        Err(nom::Err::Incomplete(_)) => Err(Error::parse(input.len(), "incomplete record")),
    }
}

/// Offset just past the `;` that ends the instance starting at `from`.
///
/// Semicolons inside quoted strings do not count.
pub fn find_entity_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    loop {
        let offset = memchr::memchr2(b';', b'\'', &bytes[pos..])?;
        let at = pos + offset;
        if bytes[at] == b';' {
            return Some(at + 1);
        }
        // Skip the string; a doubled quote reopens it immediately
        let close = memchr::memchr(b'\'', &bytes[at + 1..])?;
        pos = at + 1 + close + 1;
    }
}

/// Byte offset of the first instance after the `DATA;` keyword, or 0 when
/// the content has no header (a bare list of instances).
pub fn data_section_start(content: &str) -> usize {
    memchr::memmem::find(content.as_bytes(), b"DATA;")
        .map(|at| at + "DATA;".len())
        .unwrap_or(0)
}

/// Fast entity scanner - finds instances without parsing their arguments
pub struct EntityScanner<'a> {
    content: &'a str,
    start: usize,
    position: usize,
}

impl<'a> EntityScanner<'a> {
    /// Scanner over the data section of `content`
    pub fn new(content: &'a str) -> Self {
        let start = data_section_start(content);
        Self {
            content,
            start,
            position: start,
        }
    }

    /// Scan for the next entity
    /// Returns (entity_id, type_name, line_start, line_end)
    pub fn next_entity(&mut self) -> Option<(u32, &'a str, usize, usize)> {
        let bytes = self.content.as_bytes();
        let len = bytes.len();

        loop {
            let line_start = self.position + memchr::memchr(b'#', &bytes[self.position..])?;

            let mut pos = line_start + 1;
            while pos < len && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            let id_end = pos;
            while pos < len && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }

            if id_end == line_start + 1 || pos >= len || bytes[pos] != b'=' {
                // A reference or stray '#', not an instance
                self.position = line_start + 1;
                continue;
            }

            let id = self.content[line_start + 1..id_end].parse::<u32>().ok()?;
            let line_end = find_entity_end(bytes, pos)?;

            let type_start = pos + 1;
            let type_start = type_start
                + self.content[type_start..line_end]
                    .find(|c: char| !c.is_whitespace())?;
            let type_end = self.content[type_start..line_end]
                .find(|c: char| c == '(' || c.is_whitespace())
                .map(|i| type_start + i)
                .unwrap_or(line_end);

            self.position = line_end;
            return Some((id, &self.content[type_start..type_end], line_start, line_end));
        }
    }

    /// Find all entities of a specific type
    pub fn find_by_type(&mut self, target_type: &str) -> Vec<(u32, usize, usize)> {
        let mut results = Vec::new();

        while let Some((id, type_name, start, end)) = self.next_entity() {
            if type_name.eq_ignore_ascii_case(target_type) {
                results.push((id, start, end));
            }
        }

        results
    }

    /// Count entities by type
    pub fn count_by_type(&mut self) -> rustc_hash::FxHashMap<String, usize> {
        let mut counts = rustc_hash::FxHashMap::default();

        while let Some((_, type_name, _, _)) = self.next_entity() {
            *counts.entry(type_name.to_string()).or_insert(0) += 1;
        }

        counts
    }

    /// Reset scanner to the start of the data section
    pub fn reset(&mut self) {
        self.position = self.start;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_ref() {
        assert_eq!(entity_ref("#123"), Ok(("", Token::EntityRef(123))));
        assert_eq!(entity_ref("#0"), Ok(("", Token::EntityRef(0))));
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(string_literal("'hello'"), Ok(("", Token::String("hello"))));
        assert_eq!(
            string_literal("'it''s'"),
            Ok(("", Token::String("it''s")))
        );
        assert_eq!(string_literal("''"), Ok(("", Token::String(""))));
        assert!(string_literal("'open").is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(integer("42"), Ok(("", Token::Integer(42))));
        assert_eq!(integer("-42"), Ok(("", Token::Integer(-42))));
        assert_eq!(float("3.14"), Ok(("", Token::Float(3.14))));
        assert_eq!(float("-3.14"), Ok(("", Token::Float(-3.14))));
        assert_eq!(float("1.5E-10"), Ok(("", Token::Float(1.5e-10))));
        assert_eq!(float("0."), Ok(("", Token::Float(0.0))));
        assert_eq!(float("1.E3"), Ok(("", Token::Float(1000.0))));
        assert_eq!(token("7"), Ok(("", Token::Integer(7))));
    }

    #[test]
    fn test_enum_null_derived() {
        assert_eq!(enum_value(".T."), Ok(("", Token::Enum("T"))));
        assert_eq!(enum_value(".ELEMENT."), Ok(("", Token::Enum("ELEMENT"))));
        assert_eq!(token(" $ "), Ok(("", Token::Null)));
        assert_eq!(token("*"), Ok(("", Token::Derived)));
    }

    #[test]
    fn test_nested_list_and_typed_value() {
        let (_, tok) = token("(1,(2,3), IFCLENGTHMEASURE(2.5))").unwrap();
        assert_eq!(
            tok,
            Token::List(vec![
                Token::Integer(1),
                Token::List(vec![Token::Integer(2), Token::Integer(3)]),
                Token::TypedValue("IFCLENGTHMEASURE", vec![Token::Float(2.5)]),
            ])
        );
        assert_eq!(token("()"), Ok(("", Token::List(vec![]))));
    }

    #[test]
    fn test_parse_entity() {
        let (id, type_name, args) =
            parse_entity("#9 = IFCDIRECTION((0.,0.,1.));").unwrap();
        assert_eq!(id, 9);
        assert_eq!(type_name, "IFCDIRECTION");
        assert_eq!(
            args,
            vec![Token::List(vec![
                Token::Float(0.0),
                Token::Float(0.0),
                Token::Float(1.0)
            ])]
        );

        let (_, _, args) = parse_entity("#1=IFCWALL('a;b',$,*,.T.,#3);").unwrap();
        assert_eq!(args.len(), 5);
        assert_eq!(args[0], Token::String("a;b"));
        assert_eq!(args[4], Token::EntityRef(3));
    }

    #[test]
    fn test_parse_entity_errors() {
        assert!(matches!(
            parse_entity("#1=IFCWALL('x'"),
            Err(Error::Parse { .. })
        ));
        match parse_entity("#1=IFCWALL(1,@);") {
            Err(Error::Parse { position, .. }) => assert!(position > 0),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(parse_entity("#1=IFCWALL(1)").is_err());
    }

    #[test]
    fn test_find_entity_end_skips_strings() {
        let text = b"#1=IFCLABEL('a;b''c;');#2=X();";
        let end = find_entity_end(text, 0).unwrap();
        assert_eq!(&text[..end], b"#1=IFCLABEL('a;b''c;');");
        assert_eq!(find_entity_end(text, end), Some(text.len()));
        assert_eq!(find_entity_end(b"#1=X('", 0), None);
    }

    #[test]
    fn test_entity_scanner() {
        let content = r#"ISO-10303-21;
HEADER;
FILE_NAME('#99=IFCFAKE();',$,$,$,$,$,$);
ENDSEC;
DATA;
#1=IFCPROJECT('guid',$,$,$,$,$,$,$,$);
#2=IFCWALL('guid2',$,$,$,$,$,#1,$);
#3=IFCDOOR('room #4',$,$,$,$,$,$,$);
#4 = IFCWALL('guid4',$,$,$,$,$,$,$);
ENDSEC;
END-ISO-10303-21;
"#;

        let mut scanner = EntityScanner::new(content);

        let (id, type_name, start, end) = scanner.next_entity().unwrap();
        assert_eq!(id, 1);
        assert_eq!(type_name, "IFCPROJECT");
        assert!(content[start..end].ends_with(';'));

        scanner.reset();
        let walls = scanner.find_by_type("IfcWall");
        assert_eq!(walls.iter().map(|w| w.0).collect::<Vec<_>>(), vec![2, 4]);

        scanner.reset();
        let counts = scanner.count_by_type();
        assert_eq!(counts.get("IFCPROJECT"), Some(&1));
        assert_eq!(counts.get("IFCWALL"), Some(&2));
        assert_eq!(counts.get("IFCDOOR"), Some(&1));
        assert_eq!(counts.get("IFCFAKE"), None);
    }
}
