/// STL parser for binary and ASCII formats
use std::fmt;

use nalgebra::Point3;
use nom::{
    branch::alt,
    bytes::complete::{tag, take},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{opt, recognize},
    number::complete::{le_f32, le_u32},
    sequence::tuple,
    IResult,
};

use crate::error::ParseError;
use crate::geometry::{Mesh, Triangle, Vertex};

/// Binary header size (80-byte comment + u32 triangle count)
pub const BINARY_HEADER_LEN: usize = 84;
/// Binary triangle record size (normal + 3 vertices + attribute)
pub const BINARY_RECORD_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StlFormat {
    Ascii,
    Binary,
}

impl fmt::Display for StlFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StlFormat::Ascii => f.write_str("ASCII"),
            StlFormat::Binary => f.write_str("binary"),
        }
    }
}

/// Parse a binary STL file.
///
/// Inputs shorter than the header yield an empty mesh. Parsing stops at the
/// first record that would run past the end of the buffer.
pub fn parse_binary(data: &[u8]) -> Mesh {
    let Ok((mut rest, triangle_count)) = parse_binary_header(data) else {
        return Mesh::new();
    };

    let available = rest.len() / BINARY_RECORD_LEN;
    let mut mesh = Mesh::with_capacity((triangle_count as usize).min(available));

    for _ in 0..triangle_count {
        match parse_binary_record(rest) {
            Ok((remaining, triangle)) => {
                mesh.add_triangle(triangle);
                rest = remaining;
            }
            Err(_) => break,
        }
    }

    mesh
}

fn parse_binary_header(input: &[u8]) -> IResult<&[u8], u32> {
    let (input, _) = take(BINARY_HEADER_LEN - 4)(input)?;
    le_u32(input)
}

fn parse_binary_record(input: &[u8]) -> IResult<&[u8], Triangle> {
    // The record must be complete before any of it is used
    let (rest, record) = take(BINARY_RECORD_LEN)(input)?;
    let (record, _normal) = take(12usize)(record)?;
    let (record, v0) = parse_le_vertex(record)?;
    let (record, v1) = parse_le_vertex(record)?;
    let (_attribute, v2) = parse_le_vertex(record)?;
    Ok((rest, Triangle::new(v0, v1, v2)))
}

fn parse_le_vertex(input: &[u8]) -> IResult<&[u8], Vertex> {
    let (input, (x, y, z)) = tuple((le_f32, le_f32, le_f32))(input)?;
    Ok((input, Point3::new(x, y, z)))
}

/// Parse an ASCII STL file.
///
/// Only `vertex` lines matter; every three of them form a triangle in file
/// order and a trailing incomplete group is dropped. Coordinates that fail to
/// parse become NaN.
pub fn parse_ascii(input: &str) -> Mesh {
    let mut mesh = Mesh::new();
    let mut pending: Vec<Vertex> = Vec::with_capacity(3);

    for line in input.lines() {
        let Ok((_, vertex)) = parse_vertex_line(line.trim()) else {
            continue;
        };
        pending.push(vertex);
        if pending.len() == 3 {
            mesh.add_triangle(Triangle::new(pending[0], pending[1], pending[2]));
            pending.clear();
        }
    }

    mesh
}

fn parse_vertex_line(line: &str) -> IResult<&str, Vertex> {
    tag("vertex")(line)?;
    let mut coords = line.split_whitespace().skip(1).map(lenient_float);
    let x = coords.next().unwrap_or(f32::NAN);
    let y = coords.next().unwrap_or(f32::NAN);
    let z = coords.next().unwrap_or(f32::NAN);
    Ok(("", Point3::new(x, y, z)))
}

/// Longest numeric prefix. An exponent without digits is left off, and
/// only the exact word `Infinity` names an infinite value.
fn number_prefix(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(one_of("+-")),
        alt((
            tag("Infinity"),
            recognize(tuple((
                alt((
                    recognize(tuple((digit1, opt(tuple((char('.'), digit0)))))),
                    recognize(tuple((char('.'), digit1))),
                )),
                opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
            ))),
        )),
    )))(input)
}

/// Leading-float parse: `1.5mm` reads as 1.5, `2e` as 2, garbage as NaN
fn lenient_float(token: &str) -> f32 {
    number_prefix(token)
        .ok()
        .and_then(|(_, number)| number.parse().ok())
        .unwrap_or(f32::NAN)
}

/// Pick a parser: text containing `solid` is ASCII, anything else is binary
pub fn detect_format(data: &[u8]) -> StlFormat {
    if String::from_utf8_lossy(data).contains("solid") {
        StlFormat::Ascii
    } else {
        StlFormat::Binary
    }
}

/// Detect and parse an STL file (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh, ParseError> {
    let format = detect_format(data);
    let mesh = match format {
        StlFormat::Ascii => parse_ascii(&String::from_utf8_lossy(data)),
        StlFormat::Binary => parse_binary(data),
    };

    if mesh.is_empty() {
        return Err(ParseError::Empty { format });
    }
    Ok(mesh)
}
