//! STL reader: format detection and binary/ASCII facet decoding.

use std::path::Path;

use borescan_math::{Point3, Vec3};
use tracing::{debug, info};

use crate::error::{Result, StlError};
use crate::{Facet, StlFormat, StlMesh};

/// Binary header size in bytes.
pub const HEADER_SIZE: usize = 80;

/// Size of one binary triangle record (normal + 3 vertices + attribute).
pub const RECORD_SIZE: usize = 50;

/// Number of leading bytes inspected when detecting the format.
const SNIFF_SIZE: usize = 1000;

/// Read an STL file from disk, detecting the encoding.
pub fn read_stl(path: impl AsRef<Path>) -> Result<Vec<Facet>> {
    Ok(read_stl_mesh(path)?.facets)
}

/// Read an STL file from disk, keeping the detected format and solid name.
pub fn read_stl_mesh(path: impl AsRef<Path>) -> Result<StlMesh> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    debug!(path = %path.display(), bytes = data.len(), "read STL file");
    parse_stl_mesh(&data)
}

/// Parse STL data from a byte buffer, detecting the encoding.
pub fn parse_stl(data: &[u8]) -> Result<Vec<Facet>> {
    Ok(parse_stl_mesh(data)?.facets)
}

/// Parse STL data from a byte buffer, keeping the format and solid name.
pub fn parse_stl_mesh(data: &[u8]) -> Result<StlMesh> {
    let format = detect_format(data);
    let mesh = match format {
        StlFormat::Ascii => {
            // Stray non-UTF-8 bytes (usually in the solid name) are replaced;
            // a damaged number still fails the facet grammar.
            let text = String::from_utf8_lossy(data);
            StlMesh {
                format,
                name: solid_name(&text),
                facets: parse_ascii(&text)?,
            }
        }
        StlFormat::Binary => StlMesh {
            format,
            name: None,
            facets: parse_binary(data)?,
        },
    };
    info!(format = ?mesh.format, facets = mesh.facets.len(), "parsed STL");
    Ok(mesh)
}

/// Decide whether `data` is ASCII or binary STL.
///
/// The leading sample must be printable ASCII or whitespace and contain both
/// the `facet normal` and `vertex` keywords to count as text; anything else
/// is binary.
pub fn detect_format(data: &[u8]) -> StlFormat {
    let sample = &data[..data.len().min(SNIFF_SIZE)];
    if !sample
        .iter()
        .all(|b| b.is_ascii_graphic() || b.is_ascii_whitespace())
    {
        return StlFormat::Binary;
    }
    let text = String::from_utf8_lossy(sample).to_ascii_lowercase();
    if text.contains("facet normal") && text.contains("vertex") {
        StlFormat::Ascii
    } else {
        StlFormat::Binary
    }
}

/// Decode binary STL.
///
/// ```text
/// UINT8[80]    header (ignored)
/// UINT32       triangle count, little-endian
/// foreach triangle
///     REAL32[3] normal
///     REAL32[3] vertex 1
///     REAL32[3] vertex 2
///     REAL32[3] vertex 3
///     UINT16    attribute byte count (ignored)
/// ```
///
/// Trailing bytes past the declared records are ignored.
pub fn parse_binary(data: &[u8]) -> Result<Vec<Facet>> {
    if data.len() < HEADER_SIZE + 4 {
        return Err(StlError::format(format!(
            "binary STL needs at least {} bytes, got {}",
            HEADER_SIZE + 4,
            data.len()
        )));
    }

    let declared = u32::from_le_bytes([
        data[HEADER_SIZE],
        data[HEADER_SIZE + 1],
        data[HEADER_SIZE + 2],
        data[HEADER_SIZE + 3],
    ]);

    let body = &data[HEADER_SIZE + 4..];
    let available = body.len() / RECORD_SIZE;
    if (declared as usize) > available {
        return Err(StlError::Truncated {
            declared,
            available,
        });
    }

    let facets: Vec<Facet> = body
        .chunks_exact(RECORD_SIZE)
        .take(declared as usize)
        .map(|rec| {
            let normal = read_vec(&rec[0..12]);
            Facet {
                normal,
                vertices: [
                    Point3::from(read_vec(&rec[12..24])),
                    Point3::from(read_vec(&rec[24..36])),
                    Point3::from(read_vec(&rec[36..48])),
                ],
            }
        })
        .collect();

    debug!(declared, "decoded binary STL records");
    Ok(facets)
}

/// Read three little-endian f32 values.
fn read_vec(buf: &[u8]) -> Vec3 {
    let f = |i: usize| f32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]) as f64;
    Vec3::new(f(0), f(4), f(8))
}

/// Decode ASCII STL.
///
/// ```text
/// solid name
///   facet normal ni nj nk
///     outer loop
///       vertex v1x v1y v1z
///       vertex v2x v2y v2z
///       vertex v3x v3y v3z
///     endloop
///   endfacet
/// endsolid name
/// ```
///
/// Keywords are case-insensitive and numbers may use exponent notation.
/// Everything after `solid` or `endsolid` on its line is the solid name.
pub fn parse_ascii(text: &str) -> Result<Vec<Facet>> {
    let mut tokens = text
        .lines()
        .enumerate()
        .flat_map(|(line, l)| l.split_ascii_whitespace().map(move |t| (line, t)))
        .peekable();
    let mut facets = Vec::new();

    while let Some((line, tok)) = tokens.next() {
        if tok.eq_ignore_ascii_case("solid") || tok.eq_ignore_ascii_case("endsolid") {
            // The rest of the line is the solid name.
            while tokens.next_if(|(l, _)| *l == line).is_some() {}
            continue;
        }
        if !tok.eq_ignore_ascii_case("facet") {
            continue;
        }
        let index = facets.len();

        expect_keyword(&mut tokens, "normal", index)?;
        let normal = read_triple(&mut tokens, index, "normal")?;

        // Anything between the normal and the loop is tolerated.
        loop {
            match tokens.next().map(|(_, t)| t) {
                Some(t) if t.eq_ignore_ascii_case("outer") => break,
                Some(t) if t.eq_ignore_ascii_case("facet") || t.eq_ignore_ascii_case("endfacet") => {
                    return Err(StlError::facet(index, "missing 'outer loop'"));
                }
                Some(_) => {}
                None => return Err(StlError::facet(index, "unexpected end of data")),
            }
        }
        expect_keyword(&mut tokens, "loop", index)?;

        let mut vertices = [Point3::origin(); 3];
        for v in vertices.iter_mut() {
            expect_keyword(&mut tokens, "vertex", index)?;
            *v = Point3::from(read_triple(&mut tokens, index, "vertex")?);
        }

        expect_keyword(&mut tokens, "endloop", index)?;
        expect_keyword(&mut tokens, "endfacet", index)?;

        facets.push(Facet { normal, vertices });
    }

    Ok(facets)
}

fn expect_keyword<'a, I>(tokens: &mut I, keyword: &str, index: usize) -> Result<()>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    match tokens.next().map(|(_, t)| t) {
        Some(t) if t.eq_ignore_ascii_case(keyword) => Ok(()),
        Some(t) => Err(StlError::facet(
            index,
            format!("expected '{keyword}', found '{t}'"),
        )),
        None => Err(StlError::facet(
            index,
            format!("expected '{keyword}', found end of data"),
        )),
    }
}

fn read_triple<'a, I>(tokens: &mut I, index: usize, what: &str) -> Result<Vec3>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let mut out = [0.0f64; 3];
    for (i, slot) in out.iter_mut().enumerate() {
        let (_, tok) = tokens.next().ok_or_else(|| {
            StlError::facet(index, format!("{what} is missing component {}", i + 1))
        })?;
        *slot = tok.parse::<f64>().map_err(|_| {
            StlError::facet(
                index,
                format!("{what} component {} is not a number: '{tok}'", i + 1),
            )
        })?;
    }
    Ok(Vec3::new(out[0], out[1], out[2]))
}

/// Name following the leading `solid` keyword, if any.
fn solid_name(text: &str) -> Option<String> {
    let first = text.lines().next()?.trim();
    let rest = first.strip_prefix("solid")?.trim();
    (!rest.is_empty()).then(|| rest.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const ONE_FACET: &str = "solid part
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1.5e0 0 0
      vertex 0 -2.5E-1 0
    endloop
  endfacet
endsolid part
";

    fn binary_with_count(declared: u32, records: usize) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data.extend_from_slice(&declared.to_le_bytes());
        for _ in 0..records {
            let mut rec = [0u8; RECORD_SIZE];
            rec[12..16].copy_from_slice(&1.0f32.to_le_bytes());
            data.extend_from_slice(&rec);
        }
        data
    }

    #[test]
    fn test_detect_ascii() {
        assert_eq!(detect_format(ONE_FACET.as_bytes()), StlFormat::Ascii);
    }

    #[test]
    fn test_detect_binary_with_solid_header() {
        // A binary header that happens to start with "solid".
        let mut data = binary_with_count(1, 1);
        data[..5].copy_from_slice(b"solid");
        data[90] = 0xff;
        assert_eq!(detect_format(&data), StlFormat::Binary);
    }

    #[test]
    fn test_parse_ascii() {
        let mesh = parse_stl_mesh(ONE_FACET.as_bytes()).unwrap();
        assert_eq!(mesh.format, StlFormat::Ascii);
        assert_eq!(mesh.name.as_deref(), Some("part"));
        assert_eq!(mesh.facets.len(), 1);
        let f = &mesh.facets[0];
        assert_abs_diff_eq!(f.normal.z, 1.0);
        assert_abs_diff_eq!(f.vertices[1].x, 1.5);
        assert_abs_diff_eq!(f.vertices[2].y, -0.25);
    }

    #[test]
    fn test_ascii_missing_component() {
        let text = "solid s\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 1 0\nvertex 0 1 0\nendloop\nendfacet\nendsolid s\n";
        let err = parse_ascii(text).unwrap_err();
        assert!(matches!(err, StlError::Format { facet: Some(0), .. }));
    }

    #[test]
    fn test_ascii_unterminated() {
        let text = "facet normal 0 0 1 outer loop vertex 0 0 0 vertex 1 0 0 vertex 0 1 0";
        assert!(matches!(
            parse_ascii(text),
            Err(StlError::Format { facet: Some(0), .. })
        ));
    }

    #[test]
    fn test_control_bytes_are_binary() {
        let mut data = ONE_FACET.as_bytes().to_vec();
        data[5] = 0;
        assert_eq!(detect_format(&data), StlFormat::Binary);
    }

    #[test]
    fn test_solid_name_with_keywords() {
        let text = ONE_FACET
            .replace("endsolid part", "endsolid facet vertex")
            .replace("solid part", "solid facet normal 1");
        let mesh = parse_stl_mesh(text.as_bytes()).unwrap();
        assert_eq!(mesh.format, StlFormat::Ascii);
        assert_eq!(mesh.name.as_deref(), Some("facet normal 1"));
        assert_eq!(mesh.facets.len(), 1);
    }

    #[test]
    fn test_latin1_name_past_sniff_window() {
        let block: String = ONE_FACET
            .lines()
            .skip(1)
            .take(7)
            .map(|l| format!("{l}\n"))
            .collect();
        let mut text = String::from("solid part\n");
        for _ in 0..20 {
            text.push_str(&block);
        }
        assert!(text.len() > SNIFF_SIZE);
        let mut data = text.into_bytes();
        data.extend_from_slice(b"endsolid caf\xe9\n");

        let mesh = parse_stl_mesh(&data).unwrap();
        assert_eq!(mesh.format, StlFormat::Ascii);
        assert_eq!(mesh.facets.len(), 20);
    }

    #[test]
    fn test_parse_binary_reads_vertices() {
        let data = binary_with_count(2, 2);
        let facets = parse_binary(&data).unwrap();
        assert_eq!(facets.len(), 2);
        assert_abs_diff_eq!(facets[0].vertices[0].x, 1.0);
    }

    #[test]
    fn test_truncated_binary() {
        let data = binary_with_count(5, 3);
        match parse_stl(&data) {
            Err(StlError::Truncated {
                declared,
                available,
            }) => {
                assert_eq!(declared, 5);
                assert_eq!(available, 3);
            }
            other => panic!("expected truncation error, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_record_is_truncated() {
        let mut data = binary_with_count(2, 2);
        data.truncate(data.len() - 1);
        assert!(matches!(parse_stl(&data), Err(StlError::Truncated { .. })));
    }

    #[test]
    fn test_zero_triangles() {
        let data = binary_with_count(0, 0);
        assert!(parse_stl(&data).unwrap().is_empty());
    }

    #[test]
    fn test_too_short_for_header() {
        assert!(matches!(
            parse_stl(&[0u8; 40]),
            Err(StlError::Format { facet: None, .. })
        ));
    }
}
