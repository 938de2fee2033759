//! Interchange formats for voxelization results.
//!
//! [`VoxelSet`] is the JSON record consumed by the voxel engine and the
//! post-processing scripts. Voxels are written either as keyed objects
//! `{x, y, z, r, g, b}` or, in the compact variant, as `[x, y, z, r, g, b]`
//! tuples. Entries are sorted by `(z, y, x)` so identical runs produce
//! identical files.
//!
//! [`DenseVolume`] is the flat layout for engines that upload whole volumes.

use std::io::Write;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::core::{DetailVoxelizationOutput, VoxelCoord, VoxelGridSpec, VoxelMap, VoxelizationOutput};
use crate::error::{Result, VoxelError};
use crate::geometry::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoxelFormat {
    #[default]
    Keyed,
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl From<[u32; 3]> for GridSize {
    fn from(dims: [u32; 3]) -> Self {
        Self {
            x: dims[0],
            y: dims[1],
            z: dims[2],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoxelRecord {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Voxel list in one of the two layouts. On input the layout follows the
/// shape of the first entry; an empty list reads back as keyed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum VoxelEntries {
    Compact(Vec<[u32; 6]>),
    Keyed(Vec<VoxelRecord>),
}

impl<'de> Deserialize<'de> for VoxelEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Arrays first: a keyed record would also accept a 6-element array.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Entry {
            Compact([u32; 6]),
            Keyed(VoxelRecord),
        }

        let entries = Vec::<Entry>::deserialize(deserializer)?;
        let mixed = || {
            <D::Error as serde::de::Error>::custom("voxel entries mix keyed and compact layouts")
        };
        match entries.first() {
            Some(Entry::Compact(_)) => entries
                .into_iter()
                .map(|e| match e {
                    Entry::Compact(tuple) => Ok(tuple),
                    Entry::Keyed(_) => Err(mixed()),
                })
                .collect::<std::result::Result<_, _>>()
                .map(Self::Compact),
            _ => entries
                .into_iter()
                .map(|e| match e {
                    Entry::Keyed(record) => Ok(record),
                    Entry::Compact(_) => Err(mixed()),
                })
                .collect::<std::result::Result<_, _>>()
                .map(Self::Keyed),
        }
    }
}

impl VoxelEntries {
    fn from_map(voxels: &VoxelMap, format: VoxelFormat) -> Self {
        let mut sorted: Vec<(&VoxelCoord, &Rgb)> = voxels.iter().collect();
        sorted.sort_by_key(|(c, _)| (c[2], c[1], c[0]));
        match format {
            VoxelFormat::Keyed => Self::Keyed(
                sorted
                    .into_iter()
                    .map(|(c, color)| VoxelRecord {
                        x: c[0],
                        y: c[1],
                        z: c[2],
                        r: color.r(),
                        g: color.g(),
                        b: color.b(),
                    })
                    .collect(),
            ),
            VoxelFormat::Compact => Self::Compact(
                sorted
                    .into_iter()
                    .map(|(c, color)| {
                        [
                            c[0],
                            c[1],
                            c[2],
                            color.r() as u32,
                            color.g() as u32,
                            color.b() as u32,
                        ]
                    })
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Keyed(v) => v.len(),
            Self::Compact(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuilds the sparse map. Compact color channels above 255 saturate.
    pub fn to_map(&self) -> VoxelMap {
        match self {
            Self::Keyed(v) => v
                .iter()
                .map(|e| ([e.x, e.y, e.z], Rgb::new(e.r, e.g, e.b)))
                .collect(),
            Self::Compact(v) => v
                .iter()
                .map(|e| {
                    let channel = |c: u32| c.min(255) as u8;
                    (
                        [e[0], e[1], e[2]],
                        Rgb::new(channel(e[3]), channel(e[4]), channel(e[5])),
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubVoxelRecord {
    pub sx: u8,
    pub sy: u8,
    pub sz: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecord {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub sub_voxels: Vec<SubVoxelRecord>,
}

/// Persisted voxel set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoxelSet {
    pub resolution: u32,
    pub grid_size: GridSize,
    pub voxel_count: usize,
    pub voxels: VoxelEntries,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub has_detail: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdivision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_voxel_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_voxels: Option<Vec<DetailRecord>>,
}

impl VoxelSet {
    pub fn from_output(output: &VoxelizationOutput, format: VoxelFormat) -> Self {
        let voxels = VoxelEntries::from_map(&output.voxels, format);
        Self {
            resolution: output.resolution,
            grid_size: output.grid.dims.into(),
            voxel_count: voxels.len(),
            voxels,
            has_detail: false,
            subdivision: None,
            detail_voxel_count: None,
            detail_voxels: None,
        }
    }

    pub fn from_detail(output: &DetailVoxelizationOutput, format: VoxelFormat) -> Self {
        let voxels = VoxelEntries::from_map(&output.voxels, format);
        let detail: Vec<DetailRecord> = output
            .detail
            .iter()
            .map(|d| DetailRecord {
                x: d.coord[0],
                y: d.coord[1],
                z: d.coord[2],
                sub_voxels: d
                    .sub_voxels
                    .iter()
                    .map(|s| SubVoxelRecord {
                        sx: s.local[0],
                        sy: s.local[1],
                        sz: s.local[2],
                        r: s.color.r(),
                        g: s.color.g(),
                        b: s.color.b(),
                    })
                    .collect(),
            })
            .collect();
        Self {
            resolution: output.resolution,
            grid_size: output.grid.dims.into(),
            voxel_count: voxels.len(),
            voxels,
            has_detail: true,
            subdivision: Some(output.subdivision),
            detail_voxel_count: Some(detail.len()),
            detail_voxels: Some(detail),
        }
    }

    pub fn is_compact(&self) -> bool {
        matches!(self.voxels, VoxelEntries::Compact(_))
    }

    /// Keyed sets are pretty-printed; compact sets stay on one line.
    pub fn to_json(&self) -> Result<String> {
        let json = if self.is_compact() {
            serde_json::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        Ok(json)
    }

    pub fn write_json<W: Write>(&self, mut writer: W) -> Result<()> {
        if self.is_compact() {
            serde_json::to_writer(&mut writer, self)?;
        } else {
            serde_json::to_writer_pretty(&mut writer, self)?;
        }
        writer.flush()?;
        debug!(
            voxels = self.voxel_count,
            detail = self.detail_voxel_count.unwrap_or(0),
            "voxel set written"
        );
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Largest grid [`DenseVolume`] will allocate, 1 GiB of colors.
pub const MAX_DENSE_VOXELS: u64 = 1 << 28;

/// Dense occupancy bitset plus packed RGBA8 colors, indexed
/// `x + dims.x * (y + dims.y * z)`.
#[derive(Debug, Clone)]
pub struct DenseVolume {
    pub dims: [u32; 3],
    pub occupancy: Vec<u32>,
    pub color_rgba: Vec<u32>,
}

impl DenseVolume {
    pub fn from_map(grid: &VoxelGridSpec, voxels: &VoxelMap) -> Result<Self> {
        let dims = grid.dims;
        if grid.num_voxels() > MAX_DENSE_VOXELS {
            return Err(VoxelError::InvalidParameter(format!(
                "dense volume {dims:?} exceeds {MAX_DENSE_VOXELS} voxels"
            )));
        }
        let num_voxels = grid.num_voxels() as usize;
        let word_count = (num_voxels + 31) / 32;
        let mut occupancy = vec![0u32; word_count];
        let mut color_rgba = vec![0u32; num_voxels];

        for (&coord, &color) in voxels {
            if !grid.contains(coord) {
                continue;
            }
            let linear = Self::linear_index(dims, coord);
            occupancy[linear >> 5] |= 1u32 << (linear & 31);
            color_rgba[linear] = color.pack_rgba();
        }

        Ok(Self {
            dims,
            occupancy,
            color_rgba,
        })
    }

    pub fn from_output(output: &VoxelizationOutput) -> Result<Self> {
        Self::from_map(&output.grid, &output.voxels)
    }

    fn linear_index(dims: [u32; 3], coord: VoxelCoord) -> usize {
        (coord[0] as usize)
            + (dims[0] as usize) * ((coord[1] as usize) + (dims[1] as usize) * (coord[2] as usize))
    }

    fn in_bounds(&self, coord: VoxelCoord) -> bool {
        coord[0] < self.dims[0] && coord[1] < self.dims[1] && coord[2] < self.dims[2]
    }

    pub fn is_occupied(&self, coord: VoxelCoord) -> bool {
        if !self.in_bounds(coord) {
            return false;
        }
        let linear = Self::linear_index(self.dims, coord);
        (self.occupancy[linear >> 5] >> (linear & 31)) & 1 != 0
    }

    pub fn color_at(&self, coord: VoxelCoord) -> Option<Rgb> {
        self.is_occupied(coord)
            .then(|| Rgb::unpack_rgba(self.color_rgba[Self::linear_index(self.dims, coord)]))
    }

    pub fn occupied_count(&self) -> usize {
        self.occupancy.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn occupancy_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.occupancy)
    }

    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.color_rgba)
    }
}
