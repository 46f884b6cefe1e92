//! STL writers.

use std::fmt::Write as _;

use crate::error::{Result, StlError};
use crate::reader::{HEADER_SIZE, RECORD_SIZE};
use crate::Facet;

/// Encode facets as binary STL.
///
/// `header` is truncated or space-padded to 80 bytes.
pub fn write_binary_stl(facets: &[Facet], header: &str) -> Result<Vec<u8>> {
    let count = u32::try_from(facets.len())
        .map_err(|_| StlError::format(format!("{} facets exceed the binary STL limit", facets.len())))?;

    let mut data = Vec::with_capacity(HEADER_SIZE + 4 + facets.len() * RECORD_SIZE);

    let mut head = [b' '; HEADER_SIZE];
    let bytes = header.as_bytes();
    let n = bytes.len().min(HEADER_SIZE);
    head[..n].copy_from_slice(&bytes[..n]);
    data.extend_from_slice(&head);
    data.extend_from_slice(&count.to_le_bytes());

    for facet in facets {
        for c in facet.normal.iter() {
            data.extend_from_slice(&(*c as f32).to_le_bytes());
        }
        for v in &facet.vertices {
            for c in v.coords.iter() {
                data.extend_from_slice(&(*c as f32).to_le_bytes());
            }
        }
        // Attribute byte count
        data.extend_from_slice(&0u16.to_le_bytes());
    }

    Ok(data)
}

/// Encode facets as ASCII STL.
pub fn write_ascii_stl(facets: &[Facet], name: &str) -> String {
    let mut out = String::with_capacity(64 + facets.len() * 256);
    // Writing to a String cannot fail.
    let _ = writeln!(out, "solid {name}");
    for f in facets {
        let _ = writeln!(
            out,
            "  facet normal {:e} {:e} {:e}",
            f.normal.x, f.normal.y, f.normal.z
        );
        let _ = writeln!(out, "    outer loop");
        for v in &f.vertices {
            let _ = writeln!(out, "      vertex {:e} {:e} {:e}", v.x, v.y, v.z);
        }
        let _ = writeln!(out, "    endloop");
        let _ = writeln!(out, "  endfacet");
    }
    let _ = writeln!(out, "endsolid {name}");
    out
}
