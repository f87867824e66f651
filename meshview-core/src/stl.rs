/// STL file parser for binary and ASCII formats
use log::debug;
use nalgebra::Point3;
use nom::{
    bytes::complete::{tag_no_case, take},
    character::complete::{multispace0, multispace1, not_line_ending},
    combinator::eof,
    multi::{count, many0, many1},
    number::complete::{float, le_f32, le_u16},
    sequence::preceded,
    IResult,
};

use crate::error::{ViewError, ViewResult};
use crate::geometry::{Mesh, Rgba, Triangle};

const HEADER_LEN: usize = 80;
const PREAMBLE_LEN: usize = HEADER_LEN + 4;
const RECORD_LEN: usize = 50;

/// Parse a binary STL file
///
/// Facets whose attribute word has bit 15 set carry a 15-bit RGB color
/// (VisCAM/SolidView convention); if any facet does, the mesh gets face colors.
pub fn parse_binary_stl(data: &[u8]) -> ViewResult<Mesh> {
    if data.len() < PREAMBLE_LEN {
        return Err(ViewError::InvalidHeader {
            expected: PREAMBLE_LEN,
            got: data.len(),
        });
    }

    let declared = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    let needed = declared
        .checked_mul(RECORD_LEN)
        .and_then(|n| n.checked_add(PREAMBLE_LEN))
        .ok_or_else(|| ViewError::invalid_content("triangle count overflows"))?;
    if data.len() < needed {
        let complete = (data.len() - PREAMBLE_LEN) / RECORD_LEN;
        return Err(ViewError::UnexpectedEof {
            position: PREAMBLE_LEN + complete * RECORD_LEN,
        });
    }

    let (_, records) = count(parse_binary_facet, declared)(&data[PREAMBLE_LEN..needed])
        .map_err(|_| ViewError::UnexpectedEof { position: data.len() })?;

    let colored = records.iter().any(|(_, color)| color.is_some());
    let mut triangles = Vec::with_capacity(records.len());
    let mut colors = Vec::with_capacity(if colored { records.len() } else { 0 });
    for (triangle, color) in records {
        triangles.push(triangle);
        if colored {
            colors.push(color.unwrap_or(Rgba::UNSET));
        }
    }

    debug!(
        "binary STL: {} facets, colored={}, trailing bytes={}",
        triangles.len(),
        colored,
        data.len() - needed
    );
    Ok(Mesh::from_triangles(&triangles, colored.then_some(colors)))
}

fn parse_binary_facet(input: &[u8]) -> IResult<&[u8], (Triangle, Option<Rgba>)> {
    // Stored normal is ignored, the winding order is authoritative
    let (input, _) = take(12usize)(input)?;
    let (input, v0) = parse_binary_point(input)?;
    let (input, v1) = parse_binary_point(input)?;
    let (input, v2) = parse_binary_point(input)?;
    let (input, attribute) = le_u16(input)?;
    Ok((input, (Triangle::new(v0, v1, v2), attribute_color(attribute))))
}

fn parse_binary_point(input: &[u8]) -> IResult<&[u8], Point3<f32>> {
    let (input, x) = le_f32(input)?;
    let (input, y) = le_f32(input)?;
    let (input, z) = le_f32(input)?;
    Ok((input, Point3::new(x, y, z)))
}

fn attribute_color(attribute: u16) -> Option<Rgba> {
    if attribute & 0x8000 == 0 {
        return None;
    }
    let expand = |v: u16| {
        let v = (v & 0x1f) as u8;
        (v << 3) | (v >> 2)
    };
    Some(Rgba::rgb(
        expand(attribute >> 10),
        expand(attribute >> 5),
        expand(attribute),
    ))
}

/// Parse an ASCII STL file
///
/// Several `solid ... endsolid` blocks in one file are concatenated.
pub fn parse_ascii_stl(input: &str) -> ViewResult<Mesh> {
    match parse_ascii_stl_impl(input) {
        Ok((_, triangles)) => {
            debug!("ASCII STL: {} facets", triangles.len());
            Ok(Mesh::from_triangles(&triangles, None))
        }
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            let near: String = e.input.trim_start().chars().take(32).collect();
            Err(ViewError::invalid_content(format!(
                "failed to parse ASCII STL near '{near}'"
            )))
        }
        Err(nom::Err::Incomplete(_)) => Err(ViewError::invalid_content(
            "failed to parse ASCII STL: truncated input",
        )),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Vec<Triangle>> {
    let (input, solids) = many1(parse_solid)(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = eof(input)?;
    Ok((input, solids.into_iter().flatten().collect()))
}

fn parse_solid(input: &str) -> IResult<&str, Vec<Triangle>> {
    let (input, _) = preceded(multispace0, tag_no_case("solid"))(input)?;
    let (input, _) = not_line_ending(input)?; // Optional name
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag_no_case("endsolid"))(input)?;
    let (input, _) = not_line_ending(input)?;
    Ok((input, triangles))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag_no_case("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag_no_case("normal"))(input)?;
    let (input, _normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag_no_case("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag_no_case("loop"))(input)?;
    let (input, v1) = parse_vertex(input)?;
    let (input, v2) = parse_vertex(input)?;
    let (input, v3) = parse_vertex(input)?;
    let (input, _) = preceded(multispace0, tag_no_case("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag_no_case("endfacet"))(input)?;

    Ok((input, Triangle::new(v1, v2, v3)))
}

fn parse_vertex(input: &str) -> IResult<&str, Point3<f32>> {
    let (input, _) = preceded(multispace0, tag_no_case("vertex"))(input)?;
    let (input, (x, y, z)) = parse_vector3(input)?;
    Ok((input, Point3::new(x, y, z)))
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

/// Detect and parse STL file (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> ViewResult<Mesh> {
    // A size that matches the declared facet count is binary, whatever the header says
    if data.len() >= PREAMBLE_LEN {
        let declared = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as u64;
        if declared * RECORD_LEN as u64 + PREAMBLE_LEN as u64 == data.len() as u64 {
            return parse_binary_stl(data);
        }
    }

    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    if data[start..]
        .get(..5)
        .is_some_and(|word| word.eq_ignore_ascii_case(b"solid"))
    {
        // Might be ASCII; solid names from CAD exports are not always UTF-8
        let text = String::from_utf8_lossy(data);
        match parse_ascii_stl(&text) {
            Ok(mesh) => return Ok(mesh),
            Err(ascii_err) => {
                debug!("ASCII STL parse failed ({ascii_err}), trying binary");
                return parse_binary_stl(data).map_err(|_| ascii_err);
            }
        }
    }

    // Try binary format
    parse_binary_stl(data)
}
