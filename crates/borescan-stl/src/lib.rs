#![warn(missing_docs)]

//! STL mesh reading and writing for borescan.
//!
//! Decodes binary and ASCII STL into a flat list of [`Facet`]s. No
//! topology is reconstructed: each facet owns its three vertices, so a
//! vertex shared by several triangles appears once per triangle.
//!
//! # Example
//!
//! ```no_run
//! use borescan_stl::read_stl;
//!
//! let facets = read_stl("part.stl").unwrap();
//! println!("{} facets", facets.len());
//! ```

pub mod error;
pub mod reader;
pub mod writer;

pub use error::{Result, StlError};
pub use reader::{detect_format, parse_ascii, parse_binary, parse_stl, parse_stl_mesh, read_stl, read_stl_mesh};
pub use writer::{write_ascii_stl, write_binary_stl};

use borescan_math::{Point3, Vec3};

/// One triangle of an STL mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Facet {
    /// Normal as stored in the file (not normalized or checked).
    pub normal: Vec3,
    /// The three corners.
    pub vertices: [Point3; 3],
}

impl Facet {
    /// Create a facet with an explicit normal.
    pub fn new(normal: Vec3, vertices: [Point3; 3]) -> Self {
        Self { normal, vertices }
    }

    /// Create a facet whose normal is computed from the winding of its
    /// vertices (counter-clockwise seen from the outside).
    pub fn from_vertices(v0: Point3, v1: Point3, v2: Point3) -> Self {
        let n = (v1 - v0).cross(&(v2 - v0));
        let len = n.norm();
        let normal = if len > 1e-10 { n / len } else { Vec3::zeros() };
        Self {
            normal,
            vertices: [v0, v1, v2],
        }
    }
}

/// STL encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StlFormat {
    /// 80-byte header, count, 50-byte records.
    Binary,
    /// `solid` / `facet normal` text grammar.
    Ascii,
}

/// A parsed STL file.
#[derive(Debug, Clone)]
pub struct StlMesh {
    /// Detected encoding.
    pub format: StlFormat,
    /// Solid name from an ASCII file's first line.
    pub name: Option<String>,
    /// All facets in file order.
    pub facets: Vec<Facet>,
}
