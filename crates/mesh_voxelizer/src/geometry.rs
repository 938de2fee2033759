//! Geometry primitives shared by every voxelization pass.

use bytemuck::{Pod, Zeroable};
pub use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxelError};

/// 8-bit RGB color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    /// Neutral grey assigned to faces that carry no material.
    pub const DEFAULT: Rgb = Rgb([128, 128, 128]);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn r(self) -> u8 {
        self.0[0]
    }

    pub fn g(self) -> u8 {
        self.0[1]
    }

    pub fn b(self) -> u8 {
        self.0[2]
    }

    /// Packs the color as little-endian RGBA8 with full alpha.
    pub fn pack_rgba(self) -> u32 {
        u32::from_le_bytes([self.0[0], self.0[1], self.0[2], 255])
    }

    pub fn unpack_rgba(packed: u32) -> Self {
        let [r, g, b, _] = packed.to_le_bytes();
        Self([r, g, b])
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self([r, g, b])
    }
}

/// A colored triangle. Fields are private so a triangle cannot change after
/// construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    vertices: [Vec3; 3],
    color: Rgb,
}

impl Triangle {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, color: Rgb) -> Self {
        Self {
            vertices: [v0, v1, v2],
            color,
        }
    }

    pub fn vertices(&self) -> &[Vec3; 3] {
        &self.vertices
    }

    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn min(&self) -> Vec3 {
        let [v0, v1, v2] = self.vertices;
        v0.min(v1).min(v2)
    }

    pub fn max(&self) -> Vec3 {
        let [v0, v1, v2] = self.vertices;
        v0.max(v1).max(v2)
    }

    /// Unit face normal, or zero for a degenerate triangle.
    pub fn normal(&self) -> Vec3 {
        let [v0, v1, v2] = self.vertices;
        (v1 - v0).cross(v2 - v1).normalize_or_zero()
    }

    pub fn is_finite(&self) -> bool {
        self.vertices.iter().all(|v| v.is_finite())
    }

    /// Exact overlap test against the box `center ± half`.
    pub fn intersects_box(&self, center: Vec3, half: Vec3) -> bool {
        crate::intersect::triangle_box_overlap(&self.vertices, center, half)
    }
}

/// Axis-aligned bounding box with `min <= max` on every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Builds the tightest box around `points`. Fails for an empty set.
    pub fn from_points<I>(points: I) -> Result<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut iter = points.into_iter();
        let first = iter.next().ok_or(VoxelError::EmptyMesh)?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Ok(Self { min, max })
    }

    pub fn from_triangles(triangles: &[Triangle]) -> Result<Self> {
        Self::from_points(triangles.iter().flat_map(|tri| tri.vertices().iter().copied()))
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn max_extent(&self) -> f32 {
        self.extent().max_element()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}
