//! Brick-parallel surface scan.
//!
//! The grid is cut into cubic bricks that own disjoint cells. Each brick
//! replays its triangles in input order, so a cell still takes the color of
//! the lowest-index triangle touching it and the merged map equals the
//! sequential result exactly.

use rayon::prelude::*;

use crate::core::{VoxelGridSpec, VoxelMap, VoxelizeOpts, VoxelizeStats};
use crate::csr::{build_brick_csr, BrickTriangleCsr};
use crate::geometry::Triangle;

fn scan_brick(
    triangles: &[Triangle],
    grid: &VoxelGridSpec,
    csr: &BrickTriangleCsr,
    brick: usize,
    epsilon: f32,
) -> (VoxelMap, VoxelizeStats) {
    let origin = csr.brick_origins[brick];
    let brick_max = [
        (origin[0] + csr.brick_dim).min(grid.dims[0]) - 1,
        (origin[1] + csr.brick_dim).min(grid.dims[1]) - 1,
        (origin[2] + csr.brick_dim).min(grid.dims[2]) - 1,
    ];
    let half = grid.half_extents();
    let mut voxels = VoxelMap::new();
    let mut stats = VoxelizeStats::default();

    for &tri_index in csr.triangles_in(brick) {
        let tri = &triangles[tri_index as usize];
        let Some(range) = grid.candidate_range(tri, epsilon) else {
            continue;
        };
        let lo = [
            (*range[0].start()).max(origin[0]),
            (*range[1].start()).max(origin[1]),
            (*range[2].start()).max(origin[2]),
        ];
        let hi = [
            (*range[0].end()).min(brick_max[0]),
            (*range[1].end()).min(brick_max[1]),
            (*range[2].end()).min(brick_max[2]),
        ];

        for x in lo[0]..=hi[0] {
            for y in lo[1]..=hi[1] {
                for z in lo[2]..=hi[2] {
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

/// Same contract as [`crate::reference_cpu::voxelize_surface_cpu`], run on
/// the rayon pool.
pub fn voxelize_surface_parallel(
    triangles: &[Triangle],
    grid: &VoxelGridSpec,
    opts: &VoxelizeOpts,
) -> (VoxelMap, VoxelizeStats) {
    let csr = build_brick_csr(triangles, grid, opts.brick_dim, opts.epsilon);

    let bricks: Vec<(VoxelMap, VoxelizeStats)> = (0..csr.num_bricks())
        .into_par_iter()
        .map(|brick| scan_brick(triangles, grid, &csr, brick, opts.epsilon))
        .collect();

    let mut voxels = VoxelMap::with_capacity(bricks.iter().map(|(map, _)| map.len()).sum());
    let mut stats = VoxelizeStats {
        triangles: triangles.len() as u32,
        ..VoxelizeStats::default()
    };
    for (map, brick_stats) in bricks {
        voxels.extend(map);
        stats.merge(&brick_stats);
    }

    (voxels, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Rgb, Vec3};
    use crate::reference_cpu::voxelize_surface_cpu;
    use rand::{Rng, SeedableRng};

    fn random_triangles(seed: u64, count: usize) -> Vec<Triangle> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                let mut vertex = || {
                    Vec3::new(
                        rng.gen_range(0.0..10.0),
                        rng.gen_range(0.0..10.0),
                        rng.gen_range(0.0..10.0),
                    )
                };
                let (a, b, c) = (vertex(), vertex(), vertex());
                let color = Rgb::new(rng.gen(), rng.gen(), rng.gen());
                Triangle::new(a, b, c, color)
            })
            .collect()
    }

    #[test]
    fn parallel_matches_sequential() {
        let triangles = random_triangles(3, 60);
        let grid = VoxelGridSpec {
            origin_world: Vec3::ZERO,
            voxel_size: 0.5,
            dims: [20, 20, 20],
        };
        for brick_dim in [1, 3, 8, 32] {
            let opts = VoxelizeOpts {
                brick_dim,
                parallel: true,
                ..VoxelizeOpts::default()
            };
            let (seq, seq_stats) = voxelize_surface_cpu(&triangles, &grid, &opts);
            let (par, par_stats) = voxelize_surface_parallel(&triangles, &grid, &opts);
            assert_eq!(seq, par, "brick_dim {brick_dim}");
            assert_eq!(seq_stats.hits, par_stats.hits);
            assert_eq!(par_stats.triangles, 60);
        }
    }

    #[test]
    fn parallel_keeps_first_hit() {
        let grid = VoxelGridSpec {
            origin_world: Vec3::ZERO,
            voxel_size: 1.0,
            dims: [6, 6, 1],
        };
        let make = |color| {
            Triangle::new(
                Vec3::new(0.0, 0.0, 0.5),
                Vec3::new(6.0, 0.0, 0.5),
                Vec3::new(0.0, 6.0, 0.5),
                color,
            )
        };
        let red = Rgb::new(255, 0, 0);
        let blue = Rgb::new(0, 0, 255);
        let opts = VoxelizeOpts {
            brick_dim: 2,
            ..VoxelizeOpts::default()
        };
        let (voxels, _) = voxelize_surface_parallel(&[make(red), make(blue)], &grid, &opts);
        assert!(!voxels.is_empty());
        assert!(voxels.values().all(|&c| c == red));
        let (voxels, _) = voxelize_surface_parallel(&[make(blue), make(red)], &grid, &opts);
        assert!(voxels.values().all(|&c| c == blue));
    }
}
