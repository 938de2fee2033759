use std::collections::HashMap;

use crate::core::VoxelGridSpec;
use crate::geometry::Triangle;

/// Triangle lists per brick in compressed sparse row form.
///
/// Brick `i` covers the cells `brick_origins[i] .. brick_origins[i] + brick_dim`
/// and its triangles are `tri_indices[brick_offsets[i]..brick_offsets[i + 1]]`,
/// in ascending input order.
#[derive(Debug, Clone)]
pub struct BrickTriangleCsr {
    pub brick_dim: u32,
    pub brick_origins: Vec<[u32; 3]>,
    pub brick_offsets: Vec<u32>,
    pub tri_indices: Vec<u32>,
}

impl BrickTriangleCsr {
    pub fn num_bricks(&self) -> usize {
        self.brick_origins.len()
    }

    pub fn triangles_in(&self, brick: usize) -> &[u32] {
        let start = self.brick_offsets[brick] as usize;
        let end = self.brick_offsets[brick + 1] as usize;
        &self.tri_indices[start..end]
    }
}

pub fn build_brick_csr(
    triangles: &[Triangle],
    grid: &VoxelGridSpec,
    brick_dim: u32,
    epsilon: f32,
) -> BrickTriangleCsr {
    let mut brick_map: HashMap<(u32, u32, u32), Vec<u32>> = HashMap::new();

    for (tri_index, tri) in triangles.iter().enumerate() {
        let Some([xs, ys, zs]) = grid.candidate_range(tri, epsilon) else {
            continue;
        };
        let min_brick = [
            xs.start() / brick_dim,
            ys.start() / brick_dim,
            zs.start() / brick_dim,
        ];
        let max_brick = [xs.end() / brick_dim, ys.end() / brick_dim, zs.end() / brick_dim];

        for bz in min_brick[2]..=max_brick[2] {
            for by in min_brick[1]..=max_brick[1] {
                for bx in min_brick[0]..=max_brick[0] {
                    brick_map
                        .entry((bx, by, bz))
                        .or_default()
                        .push(tri_index as u32);
                }
            }
        }
    }

    let mut brick_origins: Vec<[u32; 3]> = brick_map
        .keys()
        .map(|(x, y, z)| [x * brick_dim, y * brick_dim, z * brick_dim])
        .collect();
    brick_origins.sort_by_key(|origin| (origin[2], origin[1], origin[0]));

    let mut brick_offsets = Vec::with_capacity(brick_origins.len() + 1);
    let mut tri_indices = Vec::new();
    brick_offsets.push(0);
    for origin in &brick_origins {
        let key = (origin[0] / brick_dim, origin[1] / brick_dim, origin[2] / brick_dim);
        if let Some(list) = brick_map.get(&key) {
            tri_indices.extend(list.iter().copied());
        }
        brick_offsets.push(tri_indices.len() as u32);
    }

    BrickTriangleCsr {
        brick_dim,
        brick_origins,
        brick_offsets,
        tri_indices,
    }
}
