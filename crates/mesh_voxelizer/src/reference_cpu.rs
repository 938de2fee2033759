use tracing::debug;

use crate::core::{VoxelGridSpec, VoxelMap, VoxelizeOpts, VoxelizeStats};
use crate::geometry::Triangle;

/// Sequential surface scan: triangles in input order, each tested against
/// the cells of its own bounding box that are still empty.
pub fn voxelize_surface_cpu(
    triangles: &[Triangle],
    grid: &VoxelGridSpec,
    opts: &VoxelizeOpts,
) -> (VoxelMap, VoxelizeStats) {
    let mut voxels = VoxelMap::new();
    let mut stats = VoxelizeStats {
        triangles: triangles.len() as u32,
        ..VoxelizeStats::default()
    };
    let half = grid.half_extents();
    let total = triangles.len();

    for (tri_index, tri) in triangles.iter().enumerate() {
        if opts.progress_interval > 0 && (tri_index + 1) % opts.progress_interval == 0 {
            debug!(
                processed = tri_index + 1,
                total,
                voxels = voxels.len(),
                "voxelizing triangles"
            );
        }

        let Some([xs, ys, zs]) = grid.candidate_range(tri, opts.epsilon) else {
            continue;
        };
        for x in xs {
            for y in ys.clone() {
                for z in zs.clone() {
                    let coord = [x, y, z];
                    if voxels.contains_key(&coord) {
                        continue;
                    }
                    stats.candidates_tested += 1;
                    if tri.intersects_box(grid.cell_center(coord), half) {
                        voxels.insert(coord, tri.color());
                        stats.hits += 1;
                    }
                }
            }
        }
    }

    (voxels, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MeshInput;
    use crate::geometry::{Rgb, Vec3};

    #[test]
    fn cpu_voxelizes_single_triangle() {
        let grid = VoxelGridSpec {
            origin_world: Vec3::ZERO,
            voxel_size: 1.0,
            dims: [4, 4, 4],
        };
        let tri = Triangle::new(
            Vec3::new(0.1, 0.1, 0.1),
            Vec3::new(1.2, 0.1, 0.1),
            Vec3::new(0.1, 1.2, 0.1),
            Rgb::new(1, 2, 3),
        );
        let (voxels, stats) = voxelize_surface_cpu(&[tri], &grid, &VoxelizeOpts::default());
        assert_eq!(voxels.len(), 3);
        assert!(voxels.contains_key(&[0, 0, 0]));
        assert!(voxels.contains_key(&[1, 0, 0]));
        assert!(voxels.contains_key(&[0, 1, 0]));
        assert!(voxels.values().all(|&c| c == Rgb::new(1, 2, 3)));
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.candidates_tested, 4);
    }

    #[test]
    fn filled_cells_are_not_retested() {
        let grid = VoxelGridSpec {
            origin_world: Vec3::ZERO,
            voxel_size: 1.0,
            dims: [2, 2, 1],
        };
        let a = Triangle::new(
            Vec3::new(0.0, 0.0, 0.5),
            Vec3::new(2.0, 0.0, 0.5),
            Vec3::new(0.0, 2.0, 0.5),
            Rgb::new(10, 0, 0),
        );
        let b = Triangle::new(a.vertices()[0], a.vertices()[1], a.vertices()[2], Rgb::new(0, 10, 0));
        let (voxels, stats) = voxelize_surface_cpu(&[a, b], &grid, &VoxelizeOpts::default());
        assert!(voxels.values().all(|&c| c == Rgb::new(10, 0, 0)));
        // The second triangle only sees cells the first one left empty.
        assert_eq!(stats.candidates_tested, 4 + (4 - voxels.len() as u64));
    }

    #[test]
    fn triangles_outside_grid_are_skipped() {
        let mesh = MeshInput::new(vec![Triangle::new(
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Rgb::DEFAULT,
        )])
        .expect("mesh");
        let grid = VoxelGridSpec::from_bounds(&mesh.bounds, 4).expect("grid");
        let far = Triangle::new(
            Vec3::splat(5.0),
            Vec3::new(6.0, 5.0, 5.0),
            Vec3::new(5.0, 6.0, 5.0),
            Rgb::DEFAULT,
        );
        let (voxels, stats) = voxelize_surface_cpu(&[far], &grid, &VoxelizeOpts::default());
        assert!(voxels.is_empty());
        assert_eq!(stats.candidates_tested, 0);
    }
}
