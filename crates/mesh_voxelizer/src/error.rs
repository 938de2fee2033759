use thiserror::Error;

/// Errors produced while preparing or exporting a voxelization run.
///
/// Numerical degeneracies inside the triangle/box test are not errors; a
/// degenerate axis simply never separates.
#[derive(Debug, Error)]
pub enum VoxelError {
    #[error("mesh has no triangles")]
    EmptyMesh,
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VoxelError>;
