use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("surface {index} references out-of-range portal {portal}")]
    InvalidPortalIndex { index: usize, portal: usize },

    #[error("surface {index} has lightmapTileIndex {tile} out of range")]
    InvalidTileIndex { index: usize, tile: i32 },

    #[error("tile {index} has zero-area atlas location ({w}x{h})")]
    DegenerateTile { index: usize, w: u32, h: u32 },
}
