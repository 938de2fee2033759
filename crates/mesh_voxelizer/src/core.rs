use std::collections::HashMap;
use std::ops::RangeInclusive;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VoxelError};
use crate::geometry::{BoundingBox, Rgb, Triangle};

/// Tolerance, in f32 ulps, when turning an extent/cell ratio into a cell count.
const DIM_ULPS: f32 = 4.0;

/// Ceiling that snaps values within a few ulps of an integer to it. Anything
/// further above an integer gets the extra cell.
#[inline]
fn robust_ceil(value: f32) -> u32 {
    let rounded = value.round();
    if (value - rounded).abs() <= DIM_ULPS * f32::EPSILON * value.abs().max(1.0) {
        rounded as u32
    } else {
        value.ceil() as u32
    }
}

/// Integer cell coordinate `(x, y, z)`.
pub type VoxelCoord = [u32; 3];

/// Sparse voxel storage. The first triangle to claim a cell fixes its color.
pub type VoxelMap = HashMap<VoxelCoord, Rgb>;

/// Uniform grid with cubic cells anchored at `origin_world`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelGridSpec {
    pub origin_world: Vec3,
    pub voxel_size: f32,
    pub dims: [u32; 3],
}

impl VoxelGridSpec {
    /// Sizes a grid so that `resolution` cells span the longest axis of
    /// `bounds`. Every axis uses the same cell size and gets at least one cell.
    pub fn from_bounds(bounds: &BoundingBox, resolution: u32) -> Result<Self> {
        if resolution == 0 {
            return Err(VoxelError::InvalidParameter("resolution must be >= 1".into()));
        }
        if !bounds.is_finite() {
            return Err(VoxelError::DegenerateGeometry(
                "bounding box is not finite".into(),
            ));
        }
        let extent = bounds.extent();
        let max_extent = extent.max_element();
        if max_extent <= 0.0 {
            return Err(VoxelError::DegenerateGeometry(
                "bounding box has zero extent on every axis".into(),
            ));
        }

        let voxel_size = max_extent / resolution as f32;
        // The longest axis spans exactly `resolution` cells by construction.
        let axis_dim = |len: f32| {
            if len == max_extent {
                resolution
            } else {
                robust_ceil(len / voxel_size).max(1)
            }
        };
        let grid = Self {
            origin_world: bounds.min,
            voxel_size,
            dims: [axis_dim(extent.x), axis_dim(extent.y), axis_dim(extent.z)],
        };
        grid.validate()?;
        Ok(grid)
    }

    /// A finer grid sharing this grid's origin, `factor` cells per base cell
    /// along each axis.
    pub fn subdivided(&self, factor: u32) -> Result<Self> {
        if factor == 0 {
            return Err(VoxelError::InvalidParameter("subdivision must be >= 1".into()));
        }
        let grid = Self {
            origin_world: self.origin_world,
            voxel_size: self.voxel_size / factor as f32,
            dims: [
                self.dims[0].saturating_mul(factor),
                self.dims[1].saturating_mul(factor),
                self.dims[2].saturating_mul(factor),
            ],
        };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.voxel_size.is_finite() || self.voxel_size <= 0.0 {
            return Err(VoxelError::DegenerateGeometry(
                "voxel_size must be finite and > 0".into(),
            ));
        }
        if self.dims.iter().any(|&d| d == 0) {
            return Err(VoxelError::InvalidParameter("dims must be >= 1".into()));
        }
        if !self.origin_world.is_finite() {
            return Err(VoxelError::DegenerateGeometry(
                "origin_world must be finite".into(),
            ));
        }
        Ok(())
    }

    pub fn num_voxels(&self) -> u64 {
        self.dims[0] as u64 * self.dims[1] as u64 * self.dims[2] as u64
    }

    pub fn half_extents(&self) -> Vec3 {
        Vec3::splat(self.voxel_size * 0.5)
    }

    /// World-space center of cell `coord`.
    pub fn cell_center(&self, coord: VoxelCoord) -> Vec3 {
        let index = Vec3::new(coord[0] as f32, coord[1] as f32, coord[2] as f32);
        self.origin_world + (index + Vec3::splat(0.5)) * self.voxel_size
    }

    pub fn contains(&self, coord: VoxelCoord) -> bool {
        coord[0] < self.dims[0] && coord[1] < self.dims[1] && coord[2] < self.dims[2]
    }

    /// Cells covered by the triangle's own bounding box, padded by `epsilon`
    /// cells and clamped to `[0, dim - 1]` on each axis.
    ///
    /// A triangle on a max face of the grid floors to index `dim` and is
    /// clamped into the last cell. `None` only when the box lies entirely
    /// beyond the grid on some axis.
    pub fn candidate_range(&self, tri: &Triangle, epsilon: f32) -> Option<[RangeInclusive<u32>; 3]> {
        let inv = 1.0 / self.voxel_size;
        let min_v = (tri.min() - self.origin_world) * inv - Vec3::splat(epsilon);
        let max_v = (tri.max() - self.origin_world) * inv + Vec3::splat(epsilon);

        let axis = |lo: f32, hi: f32, dim: u32| -> Option<RangeInclusive<u32>> {
            let last = dim as i64 - 1;
            let (lo, hi) = (lo.floor() as i64, hi.floor() as i64);
            if hi < 0 || lo > last + 1 {
                return None;
            }
            let lo = lo.clamp(0, last);
            let hi = hi.clamp(0, last);
            Some((lo as u32)..=(hi as u32))
        };

        Some([
            axis(min_v.x, max_v.x, self.dims[0])?,
            axis(min_v.y, max_v.y, self.dims[1])?,
            axis(min_v.z, max_v.z, self.dims[2])?,
        ])
    }
}

/// Triangles handed over by the mesh ingestion side, plus the bounding box
/// the grid is sized from.
///
/// The box may be supplied separately because loaders usually derive it from
/// every parsed vertex, including faces they later drop.
#[derive(Debug, Clone)]
pub struct MeshInput {
    pub triangles: Vec<Triangle>,
    pub bounds: BoundingBox,
}

impl MeshInput {
    pub fn new(triangles: Vec<Triangle>) -> Result<Self> {
        let bounds = BoundingBox::from_triangles(&triangles)?;
        Ok(Self { triangles, bounds })
    }

    pub fn with_bounds(triangles: Vec<Triangle>, bounds: BoundingBox) -> Self {
        Self { triangles, bounds }
    }

    pub fn validate(&self) -> Result<()> {
        if self.triangles.is_empty() {
            return Err(VoxelError::EmptyMesh);
        }
        if let Some(index) = self.triangles.iter().position(|tri| !tri.is_finite()) {
            return Err(VoxelError::InvalidParameter(format!(
                "triangle {index} contains non-finite vertex"
            )));
        }
        if self.bounds.min.cmpgt(self.bounds.max).any() {
            return Err(VoxelError::DegenerateGeometry(
                "bounding box min exceeds max".into(),
            ));
        }
        Ok(())
    }
}

/// Tuning knobs for a voxelization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoxelizeOpts {
    /// Padding, in cells, added around each triangle's candidate range.
    /// Non-zero values also pick up cells that only touch the triangle on
    /// their lower face.
    pub epsilon: f32,
    /// Sub cells per base cell edge for detail voxelization.
    pub subdivision: u32,
    /// Scan bricks on the rayon pool instead of one triangle at a time.
    pub parallel: bool,
    /// Brick edge length in cells for the parallel scan.
    pub brick_dim: u32,
    /// Emit a progress event every this many triangles (0 disables).
    pub progress_interval: usize,
}

impl Default for VoxelizeOpts {
    fn default() -> Self {
        Self {
            epsilon: 0.0,
            subdivision: 4,
            parallel: false,
            brick_dim: 8,
            progress_interval: 10_000,
        }
    }
}

impl VoxelizeOpts {
    pub fn validate(&self) -> Result<()> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(VoxelError::InvalidParameter(
                "epsilon must be finite and >= 0".into(),
            ));
        }
        if self.subdivision == 0 {
            return Err(VoxelError::InvalidParameter("subdivision must be >= 1".into()));
        }
        if self.subdivision > u8::MAX as u32 {
            return Err(VoxelError::InvalidParameter(format!(
                "subdivision must be <= {} (got {})",
                u8::MAX,
                self.subdivision
            )));
        }
        if self.brick_dim == 0 {
            return Err(VoxelError::InvalidParameter("brick_dim must be >= 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoxelizeStats {
    pub triangles: u32,
    pub candidates_tested: u64,
    pub hits: u64,
}

impl VoxelizeStats {
    pub fn merge(&mut self, other: &VoxelizeStats) {
        self.candidates_tested += other.candidates_tested;
        self.hits += other.hits;
    }
}

#[derive(Debug, Clone)]
pub struct VoxelizationOutput {
    /// Requested cells along the longest axis.
    pub resolution: u32,
    pub grid: VoxelGridSpec,
    pub voxels: VoxelMap,
    pub stats: VoxelizeStats,
}

impl VoxelizationOutput {
    /// Same output with interior voxels removed.
    pub fn hollowed(&self) -> Self {
        Self {
            resolution: self.resolution,
            grid: self.grid,
            voxels: crate::hollow::hollow(&self.voxels),
            stats: self.stats,
        }
    }
}

/// One filled cell of a detail voxel's sub grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubVoxel {
    pub local: [u8; 3],
    pub color: Rgb,
}

/// A base cell that is partially covered or mixes colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailVoxel {
    pub coord: VoxelCoord,
    pub sub_voxels: Vec<SubVoxel>,
}

#[derive(Debug, Clone)]
pub struct DetailVoxelizationOutput {
    pub resolution: u32,
    /// Base grid; detail coordinates index into it as well.
    pub grid: VoxelGridSpec,
    pub subdivision: u32,
    pub voxels: VoxelMap,
    pub detail: Vec<DetailVoxel>,
    pub stats: VoxelizeStats,
}
