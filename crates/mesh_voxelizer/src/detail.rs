//! Two-tier voxelization: a base grid plus sub voxels where the base grid
//! would lose surface detail.
//!
//! The mesh is scanned once on a grid `subdivision` times finer than the base
//! grid. Sub voxels are then grouped by parent cell: a parent whose sub cube
//! is completely filled with a single color collapses into an ordinary voxel,
//! every other parent keeps its sub voxels as a [`DetailVoxel`].

use std::collections::HashMap;

use tracing::info;

use crate::core::{
    DetailVoxel, DetailVoxelizationOutput, MeshInput, SubVoxel, VoxelCoord, VoxelGridSpec,
    VoxelMap, VoxelizeOpts,
};
use crate::error::{Result, VoxelError};
use crate::voxelize::scan_surface;

pub fn voxelize_detail(mesh: &MeshInput, resolution: u32) -> Result<DetailVoxelizationOutput> {
    voxelize_detail_with_opts(mesh, resolution, &VoxelizeOpts::default())
}

pub fn voxelize_detail_with_opts(
    mesh: &MeshInput,
    resolution: u32,
    opts: &VoxelizeOpts,
) -> Result<DetailVoxelizationOutput> {
    mesh.validate()?;
    opts.validate()?;
    let grid = VoxelGridSpec::from_bounds(&mesh.bounds, resolution)?;
    let sub_grid = grid.subdivided(opts.subdivision)?;

    info!(
        triangles = mesh.triangles.len(),
        resolution,
        dims = ?grid.dims,
        subdivision = opts.subdivision,
        sub_dims = ?sub_grid.dims,
        "voxelizing mesh with detail"
    );
    let (sub_voxels, stats) = scan_surface(&mesh.triangles, &sub_grid, opts);
    let (voxels, detail) = split_sub_voxels(&sub_voxels, opts.subdivision)?;
    info!(
        sub_voxels = sub_voxels.len(),
        voxels = voxels.len(),
        detail_voxels = detail.len(),
        "detail voxelization finished"
    );

    Ok(DetailVoxelizationOutput {
        resolution,
        grid,
        subdivision: opts.subdivision,
        voxels,
        detail,
        stats,
    })
}

/// Groups a sub-grid map by parent cell and classifies each parent.
///
/// Detail voxels come back sorted by `(z, y, x)` with their sub voxels
/// sorted by local coordinate. `subdivision` must lie in `1..=255` so local
/// coordinates fit a byte.
pub fn split_sub_voxels(
    sub_voxels: &VoxelMap,
    subdivision: u32,
) -> Result<(VoxelMap, Vec<DetailVoxel>)> {
    if subdivision == 0 || subdivision > u8::MAX as u32 {
        return Err(VoxelError::InvalidParameter(format!(
            "subdivision must be in 1..={} (got {subdivision})",
            u8::MAX
        )));
    }
    let capacity = (subdivision as usize).pow(3);
    let mut parents: HashMap<VoxelCoord, Vec<SubVoxel>> = HashMap::new();
    for (sub, &color) in sub_voxels {
        let parent = [sub[0] / subdivision, sub[1] / subdivision, sub[2] / subdivision];
        let local = [
            (sub[0] % subdivision) as u8,
            (sub[1] % subdivision) as u8,
            (sub[2] % subdivision) as u8,
        ];
        parents
            .entry(parent)
            .or_default()
            .push(SubVoxel { local, color });
    }

    let mut voxels = VoxelMap::new();
    let mut detail = Vec::new();
    for (coord, mut subs) in parents {
        let first = subs[0].color;
        if subs.len() == capacity && subs.iter().all(|s| s.color == first) {
            voxels.insert(coord, first);
        } else {
            subs.sort_by_key(|s| (s.local[2], s.local[1], s.local[0]));
            detail.push(DetailVoxel {
                coord,
                sub_voxels: subs,
            });
        }
    }
    detail.sort_by_key(|d| (d.coord[2], d.coord[1], d.coord[0]));

    Ok((voxels, detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{BoundingBox, Rgb, Triangle, Vec3};
    use crate::voxelize::tests::box_mesh;

    const WOOD: Rgb = Rgb::new(139, 90, 43);
    const SAIL: Rgb = Rgb::new(240, 230, 210);

    #[test]
    fn filled_cell_collapses_to_regular_voxel() {
        let mesh = MeshInput::new(box_mesh(Vec3::ZERO, Vec3::ONE, WOOD)).expect("mesh");
        let opts = VoxelizeOpts {
            subdivision: 2,
            ..VoxelizeOpts::default()
        };
        let output = voxelize_detail_with_opts(&mesh, 1, &opts).expect("detail");
        assert_eq!(output.grid.dims, [1, 1, 1]);
        assert!(output.detail.is_empty());
        assert_eq!(output.voxels.len(), 1);
        assert_eq!(output.voxels.get(&[0, 0, 0]), Some(&WOOD));
    }

    #[test]
    fn hollow_sub_cube_stays_detailed() {
        let mesh = MeshInput::new(box_mesh(Vec3::ZERO, Vec3::ONE, WOOD)).expect("mesh");
        let output = voxelize_detail(&mesh, 1).expect("detail");
        assert_eq!(output.subdivision, 4);
        assert!(output.voxels.is_empty());
        assert_eq!(output.detail.len(), 1);
        // The surface touches the outer shell of the 4^3 sub cube only.
        assert_eq!(output.detail[0].sub_voxels.len(), 64 - 8);
    }

    #[test]
    fn half_covered_cell_is_detail() {
        // A wall at x = 0.375 inside a base grid of two 1-unit cells.
        let bounds = BoundingBox {
            min: Vec3::ZERO,
            max: Vec3::new(2.0, 1.0, 1.0),
        };
        let wall = vec![
            Triangle::new(
                Vec3::new(0.375, 0.0, 0.0),
                Vec3::new(0.375, 1.0, 0.0),
                Vec3::new(0.375, 1.0, 0.5),
                SAIL,
            ),
            Triangle::new(
                Vec3::new(0.375, 0.0, 0.0),
                Vec3::new(0.375, 1.0, 0.5),
                Vec3::new(0.375, 0.0, 0.5),
                SAIL,
            ),
        ];
        let mesh = MeshInput::with_bounds(wall, bounds);
        let output = voxelize_detail(&mesh, 2).expect("detail");
        assert_eq!(output.grid.dims, [2, 1, 1]);
        assert!(output.voxels.is_empty());
        assert_eq!(output.detail.len(), 1);

        let cell = &output.detail[0];
        assert_eq!(cell.coord, [0, 0, 0]);
        assert!(cell.sub_voxels.len() < 64);
        assert!(cell.sub_voxels.iter().all(|s| s.color == SAIL));
        assert!(cell.sub_voxels.iter().all(|s| s.local[0] == 1));
        // Lower half in z only: sub layers 0, 1 and the touching layer 2.
        assert!(cell.sub_voxels.iter().all(|s| s.local[2] <= 2));
        assert_eq!(cell.sub_voxels.len(), 4 * 3);
    }

    #[test]
    fn mixed_colors_stay_detailed() {
        let mut sub_voxels = VoxelMap::new();
        for x in 0..2 {
            for y in 0..2 {
                for z in 0..2 {
                    let color = if x == 0 { WOOD } else { SAIL };
                    sub_voxels.insert([x, y, z], color);
                }
            }
        }
        let (voxels, detail) = split_sub_voxels(&sub_voxels, 2).expect("split");
        assert!(voxels.is_empty());
        assert_eq!(detail.len(), 1);
        assert_eq!(detail[0].sub_voxels.len(), 8);
    }

    #[test]
    fn split_groups_by_parent() {
        let mut sub_voxels = VoxelMap::new();
        for x in 0..2 {
            for y in 0..2 {
                for z in 0..2 {
                    sub_voxels.insert([x + 2, y, z], WOOD);
                }
            }
        }
        sub_voxels.insert([5, 1, 0], SAIL);
        sub_voxels.insert([0, 0, 3], SAIL);

        let (voxels, detail) = split_sub_voxels(&sub_voxels, 2).expect("split");
        assert_eq!(voxels.len(), 1);
        assert_eq!(voxels.get(&[1, 0, 0]), Some(&WOOD));
        let coords: Vec<_> = detail.iter().map(|d| d.coord).collect();
        assert_eq!(coords, vec![[2, 0, 0], [0, 0, 1]]);
        assert_eq!(detail[0].sub_voxels[0].local, [1, 1, 0]);
        assert_eq!(detail[1].sub_voxels[0].local, [0, 0, 1]);
    }

    #[test]
    fn split_rejects_out_of_range_subdivision() {
        let mut sub_voxels = VoxelMap::new();
        sub_voxels.insert([300, 0, 0], WOOD);
        for subdivision in [0, 256] {
            assert!(matches!(
                split_sub_voxels(&sub_voxels, subdivision),
                Err(VoxelError::InvalidParameter(_))
            ));
        }
        let (voxels, detail) = split_sub_voxels(&sub_voxels, 255).expect("split");
        assert!(voxels.is_empty());
        assert_eq!(detail[0].coord, [1, 0, 0]);
        assert_eq!(detail[0].sub_voxels[0].local, [45, 0, 0]);
    }
}
