//! Triangle mesh to colored voxel conversion.
//!
//! Every cell of a cubic-celled grid that a triangle touches takes that
//! triangle's color, with the first triangle in input order winning. On top
//! of the plain scan the crate offers a two-tier detail mode (sub voxels
//! where a cell is only partially covered) and shell extraction.
//!
//! # Example
//!
//! ```
//! use mesh_voxelizer::{voxelize, MeshInput, Rgb, Triangle, Vec3};
//!
//! let red = Rgb::new(255, 0, 0);
//! let mesh = MeshInput::new(vec![Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y, red)]).unwrap();
//!
//! let output = voxelize(&mesh, 2).unwrap();
//! assert_eq!(output.grid.dims, [2, 2, 1]);
//! assert_eq!(output.voxels.get(&[0, 0, 0]), Some(&red));
//! ```

pub mod core;
pub mod csr;
pub mod detail;
pub mod error;
pub mod export;
pub mod geometry;
pub mod hollow;
pub mod intersect;
pub mod parallel;
pub mod reference_cpu;
pub mod voxelize;

pub use crate::core::{
    DetailVoxel, DetailVoxelizationOutput, MeshInput, SubVoxel, VoxelCoord, VoxelGridSpec,
    VoxelMap, VoxelizationOutput, VoxelizeOpts, VoxelizeStats,
};
pub use crate::detail::{voxelize_detail, voxelize_detail_with_opts};
pub use crate::error::{Result, VoxelError};
pub use crate::export::{DenseVolume, VoxelFormat, VoxelSet};
pub use crate::geometry::{BoundingBox, Rgb, Triangle, Vec3};
pub use crate::hollow::hollow;
pub use crate::intersect::triangle_box_overlap;
pub use crate::voxelize::{voxelize, voxelize_with_opts};
