//! Synthetic parts for the integration tests.

#![allow(dead_code)]

use std::f64::consts::TAU;

use borescan::{Axis, Point2, Point3, PointCloud};
use borescan_stl::Facet;

/// Point at `radius` and `angle` around the axis through `center`.
pub fn polar(axis: Axis, center: Point2, radius: f64, angle: f64, height: f64) -> Point3 {
    axis.lift(
        &Point2::new(center.x + radius * angle.cos(), center.y + radius * angle.sin()),
        height,
    )
}

/// Open tube wall: `segments` around, a ring every `ring_step` from 0 to
/// `height`. Interior ring vertices are shared by six triangles.
pub fn tube_facets(
    axis: Axis,
    center: Point2,
    radius: f64,
    height: f64,
    segments: usize,
    ring_step: f64,
) -> Vec<Facet> {
    let rings = (height / ring_step).round() as usize;
    let p = |i: usize, j: usize| {
        let a = TAU * (i % segments) as f64 / segments as f64;
        polar(axis, center, radius, a, j as f64 * ring_step)
    };
    let mut facets = Vec::with_capacity(rings * segments * 2);
    for j in 0..rings {
        for i in 0..segments {
            facets.push(Facet::from_vertices(p(i, j), p(i + 1, j), p(i, j + 1)));
            facets.push(Facet::from_vertices(p(i + 1, j), p(i + 1, j + 1), p(i, j + 1)));
        }
    }
    facets
}

/// Heights of the tube rings.
pub fn ring_heights(height: f64, ring_step: f64) -> Vec<f64> {
    let rings = (height / ring_step).round() as usize;
    (0..=rings).map(|j| j as f64 * ring_step).collect()
}

/// Helix sampled every 0.01 mm of height, starting on a 0.2 mm bucket
/// boundary so every height bucket is full.
pub fn helix_points(axis: Axis, radius: f64, pitch: f64, turns: usize, left: bool) -> PointCloud {
    let sign = if left { -1.0 } else { 1.0 };
    let n = ((turns as f64 * pitch / 0.2).round() as usize) * 20;
    let points = (0..n)
        .map(|k| {
            let h = 0.105 + 0.01 * k as f64;
            polar(axis, Point2::origin(), radius, sign * TAU * h / pitch, h)
        })
        .collect();
    PointCloud::from_points(points)
}

/// Thread flank as a triangle strip between `radius` and `radius + width`,
/// sampled every 0.025 mm of height.
pub fn helix_ribbon(
    axis: Axis,
    radius: f64,
    width: f64,
    pitch: f64,
    samples: usize,
    left: bool,
) -> Vec<Facet> {
    let sign = if left { -1.0 } else { 1.0 };
    let at = |k: usize, r: f64| {
        let h = 0.1125 + 0.025 * k as f64;
        polar(axis, Point2::origin(), r, sign * TAU * h / pitch, h)
    };
    let mut facets = Vec::with_capacity(2 * samples);
    for k in 0..samples.saturating_sub(1) {
        let (a0, b0) = (at(k, radius), at(k, radius + width));
        let (a1, b1) = (at(k + 1, radius), at(k + 1, radius + width));
        facets.push(Facet::from_vertices(a0, b0, a1));
        facets.push(Facet::from_vertices(b0, b1, a1));
    }
    facets
}

/// Stack of square 0.5 mm point grids at integer heights 0..=10 with a
/// round hole of radius 3 through the slices from `hole_from` upward.
pub fn blind_hole_block(axis: Axis, hole: Point2, hole_from: i32) -> PointCloud {
    let mut points = Vec::new();
    for h in 0..=10 {
        for i in 0..=24 {
            for j in 0..=24 {
                let q = Point2::new(hole.x - 6.0 + 0.5 * i as f64, hole.y - 6.0 + 0.5 * j as f64);
                if h >= hole_from && (q - hole).norm() < 3.0 {
                    continue;
                }
                points.push(axis.lift(&q, h as f64));
            }
        }
    }
    PointCloud::from_points(points)
}

/// Deterministic reordering: visit indices with a stride coprime to the
/// length.
pub fn permute<T: Clone>(items: &[T], stride: usize) -> Vec<T> {
    let n = items.len();
    let mut stride = stride.max(1);
    while n > 1 && gcd(stride, n) != 1 {
        stride += 1;
    }
    (0..n).map(|i| items[(i * stride) % n].clone()).collect()
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}
