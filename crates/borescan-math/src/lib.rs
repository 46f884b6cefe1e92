#![warn(missing_docs)]

//! Math types for the borescan analyzer.
//!
//! Thin wrappers around nalgebra plus the small amount of frame math the
//! detectors share: projecting points onto an axis-aligned frame, cylindrical
//! coordinates, bucket rounding, and angle statistics.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// A point in 3D space (mm).
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = nalgebra::Vector3<f64>;

/// A point in a 2D plane perpendicular to an axis (mm).
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in 2D space.
pub type Vec2 = nalgebra::Vector2<f64>;

/// One of the three principal coordinate axes.
///
/// Bores are assumed to be aligned with one of these. Each axis carries a
/// right-handed in-plane basis `(u, v)` with `u × v = axis`, so that a
/// positive angle progression means a right-hand helix for every axis:
///
/// | axis | u | v |
/// |------|---|---|
/// | X    | y | z |
/// | Y    | z | x |
/// | Z    | x | y |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// The X axis.
    X,
    /// The Y axis.
    Y,
    /// The Z axis (part "up" for most prints).
    #[default]
    Z,
}

impl Axis {
    /// All three axes in X, Y, Z order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Index of this axis into `[x, y, z]`.
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Indices of the in-plane `(u, v)` coordinates.
    pub fn plane_indices(self) -> (usize, usize) {
        match self {
            Axis::X => (1, 2),
            Axis::Y => (2, 0),
            Axis::Z => (0, 1),
        }
    }

    /// Unit direction vector.
    pub fn direction(self) -> Vec3 {
        let mut d = Vec3::zeros();
        d[self.index()] = 1.0;
        d
    }

    /// Coordinate of `p` along this axis.
    pub fn height(self, p: &Point3) -> f64 {
        p[self.index()]
    }

    /// In-plane coordinates of `p`.
    pub fn plane(self, p: &Point3) -> Point2 {
        let (u, v) = self.plane_indices();
        Point2::new(p[u], p[v])
    }

    /// Split `p` into in-plane coordinates and height.
    pub fn project(self, p: &Point3) -> (Point2, f64) {
        (self.plane(p), self.height(p))
    }

    /// Inverse of [`Axis::project`].
    pub fn lift(self, q: &Point2, height: f64) -> Point3 {
        let (u, v) = self.plane_indices();
        let mut p = Point3::origin();
        p[u] = q.x;
        p[v] = q.y;
        p[self.index()] = height;
        p
    }

    /// Express `p` in cylindrical coordinates about the line through
    /// `center` parallel to this axis.
    pub fn to_cylindrical(self, p: &Point3, center: &Point2) -> CylindricalPoint {
        let (q, height) = self.project(p);
        let d = q - center;
        CylindricalPoint {
            radius: d.norm(),
            angle: d.y.atan2(d.x),
            height,
        }
    }

    /// Lowercase axis name.
    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(format!("unknown axis '{other}' (expected x, y or z)")),
        }
    }
}

/// A point relative to an axis: distance from it, angle around it, and
/// position along it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CylindricalPoint {
    /// Distance from the axis (mm).
    pub radius: f64,
    /// Signed angle in the axis-perpendicular plane, in (-π, π].
    pub angle: f64,
    /// Coordinate along the axis (mm).
    pub height: f64,
}

/// Bucket key for `value` with buckets of `width`.
///
/// Every detector groups by this function so bucket boundaries agree
/// between stages.
pub fn bucket_key(value: f64, width: f64) -> i64 {
    (value / width).round() as i64
}

/// Representative value (bucket center) for a key from [`bucket_key`].
pub fn bucket_value(key: i64, width: f64) -> f64 {
    key as f64 * width
}

/// Group items by the bucket of a scalar key, ordered by bucket.
pub fn group_by_bucket<T, I, F>(items: I, width: f64, key: F) -> BTreeMap<i64, Vec<T>>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> f64,
{
    let mut groups: BTreeMap<i64, Vec<T>> = BTreeMap::new();
    for item in items {
        groups.entry(bucket_key(key(&item), width)).or_default().push(item);
    }
    groups
}

/// Wrap an angle difference into [-π, π].
pub fn wrap_angle(mut a: f64) -> f64 {
    while a > PI {
        a -= 2.0 * PI;
    }
    while a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Mean and population variance. `None` for an empty input.
pub fn mean_variance<I>(values: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: Clone,
{
    let iter = values.into_iter();
    let mut n = 0usize;
    let mut sum = 0.0;
    for v in iter.clone() {
        n += 1;
        sum += v;
    }
    if n == 0 {
        return None;
    }
    let mean = sum / n as f64;
    let var = iter.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    Some((mean, var))
}

/// Circular mean of a set of angles.
///
/// Returns the mean direction and the mean resultant length in [0, 1]
/// (1 when all angles agree, near 0 when they are spread evenly).
pub fn circular_mean<I>(angles: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = f64>,
{
    let mut n = 0usize;
    let (mut s, mut c) = (0.0, 0.0);
    for a in angles {
        let (sa, ca) = a.sin_cos();
        s += sa;
        c += ca;
        n += 1;
    }
    if n == 0 {
        return None;
    }
    let (s, c) = (s / n as f64, c / n as f64);
    Some((s.atan2(c), (s * s + c * c).sqrt()))
}
