//! Shell extraction.
//!
//! A voxel survives when at least one of its six face neighbours is empty.
//! Cells on the low edge of the grid treat their out-of-range neighbour as
//! empty. The decision only looks at the input map, so sealed cavities are
//! removed too and running the pass twice changes nothing.

use crate::core::{VoxelCoord, VoxelMap};

/// Offsets to the six face neighbours: +X, -X, +Y, -Y, +Z, -Z.
pub const FACE_NEIGHBORS: [[i64; 3]; 6] = [
    [1, 0, 0],
    [-1, 0, 0],
    [0, 1, 0],
    [0, -1, 0],
    [0, 0, 1],
    [0, 0, -1],
];

fn neighbor(coord: VoxelCoord, offset: [i64; 3]) -> Option<VoxelCoord> {
    let step = |c: u32, d: i64| u32::try_from(c as i64 + d).ok();
    Some([
        step(coord[0], offset[0])?,
        step(coord[1], offset[1])?,
        step(coord[2], offset[2])?,
    ])
}

/// `true` if any face neighbour of `coord` is missing from `voxels`.
pub fn is_surface(voxels: &VoxelMap, coord: VoxelCoord) -> bool {
    FACE_NEIGHBORS.iter().any(|&offset| match neighbor(coord, offset) {
        Some(n) => !voxels.contains_key(&n),
        None => true,
    })
}

/// Keeps only surface voxels, with their colors unchanged.
pub fn hollow(voxels: &VoxelMap) -> VoxelMap {
    voxels
        .iter()
        .filter(|(&coord, _)| is_surface(voxels, coord))
        .map(|(&coord, &color)| (coord, color))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rgb;
    use rand::{Rng, SeedableRng};

    fn solid_cube(n: u32, origin: u32) -> VoxelMap {
        let mut voxels = VoxelMap::new();
        for x in 0..n {
            for y in 0..n {
                for z in 0..n {
                    voxels.insert([x + origin, y + origin, z + origin], Rgb::new(x as u8, y as u8, z as u8));
                }
            }
        }
        voxels
    }

    #[test]
    fn solid_cube_keeps_shell() {
        for n in 3..=7u32 {
            for origin in [0, 5] {
                let shell = hollow(&solid_cube(n, origin));
                let expected = n.pow(3) - (n - 2).pow(3);
                assert_eq!(shell.len() as u32, expected, "n = {n}, origin = {origin}");
            }
        }
    }

    #[test]
    fn thin_cubes_have_no_interior() {
        for n in 1..=2u32 {
            let cube = solid_cube(n, 3);
            assert_eq!(hollow(&cube), cube);
        }
    }

    #[test]
    fn colors_survive_hollowing() {
        let cube = solid_cube(4, 0);
        let shell = hollow(&cube);
        for (coord, color) in &shell {
            assert_eq!(cube.get(coord), Some(color));
        }
        assert!(!shell.contains_key(&[1, 1, 1]));
        assert!(!shell.contains_key(&[2, 2, 2]));
    }

    #[test]
    fn sealed_cavity_walls_are_kept() {
        // 5^3 cube with its centre removed: cells around the cavity become
        // surface cells even though the cavity is unreachable from outside.
        let mut voxels = solid_cube(5, 0);
        voxels.remove(&[2, 2, 2]);
        let shell = hollow(&voxels);
        assert_eq!(shell.len(), 98 + 6);
        assert!(shell.contains_key(&[2, 2, 1]));
        assert!(!shell.contains_key(&[1, 1, 1]));
    }

    #[test]
    fn empty_map_stays_empty() {
        assert!(hollow(&VoxelMap::new()).is_empty());
    }

    #[test]
    fn hollowing_is_idempotent() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let mut voxels = VoxelMap::new();
            for _ in 0..600 {
                let coord = [rng.gen_range(0..10), rng.gen_range(0..10), rng.gen_range(0..10)];
                voxels.insert(coord, Rgb::new(rng.gen(), rng.gen(), rng.gen()));
            }
            let once = hollow(&voxels);
            assert_eq!(hollow(&once), once);
        }
        let cube = solid_cube(6, 1);
        let once = hollow(&cube);
        assert_eq!(hollow(&once), once);
    }
}
