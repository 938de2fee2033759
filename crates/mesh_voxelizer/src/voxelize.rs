use tracing::info;

use crate::core::{MeshInput, VoxelGridSpec, VoxelMap, VoxelizationOutput, VoxelizeOpts, VoxelizeStats};
use crate::error::Result;
use crate::geometry::Triangle;
use crate::parallel::voxelize_surface_parallel;
use crate::reference_cpu::voxelize_surface_cpu;

/// Runs the surface scan on `grid`, sequentially or brick-parallel as
/// configured. Both paths yield the same map.
pub(crate) fn scan_surface(
    triangles: &[Triangle],
    grid: &VoxelGridSpec,
    opts: &VoxelizeOpts,
) -> (VoxelMap, VoxelizeStats) {
    if opts.parallel {
        voxelize_surface_parallel(triangles, grid, opts)
    } else {
        voxelize_surface_cpu(triangles, grid, opts)
    }
}

/// Voxelizes `mesh` with `resolution` cells along its longest axis.
///
/// Cells take the color of the first triangle (in input order) that touches
/// them; later triangles never overwrite a filled cell. Callers layering
/// detail over a base hull should put the detail triangles first.
pub fn voxelize(mesh: &MeshInput, resolution: u32) -> Result<VoxelizationOutput> {
    voxelize_with_opts(mesh, resolution, &VoxelizeOpts::default())
}

pub fn voxelize_with_opts(
    mesh: &MeshInput,
    resolution: u32,
    opts: &VoxelizeOpts,
) -> Result<VoxelizationOutput> {
    mesh.validate()?;
    opts.validate()?;
    let grid = VoxelGridSpec::from_bounds(&mesh.bounds, resolution)?;

    info!(
        triangles = mesh.triangles.len(),
        resolution,
        dims = ?grid.dims,
        voxel_size = grid.voxel_size,
        parallel = opts.parallel,
        "voxelizing mesh"
    );
    let (voxels, stats) = scan_surface(&mesh.triangles, &grid, opts);
    info!(
        voxels = voxels.len(),
        tested = stats.candidates_tested,
        "voxelization finished"
    );

    Ok(VoxelizationOutput {
        resolution,
        grid,
        voxels,
        stats,
    })
}
