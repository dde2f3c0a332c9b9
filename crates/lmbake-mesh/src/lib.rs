pub mod atlas;
pub mod bvh;
pub mod error;
pub mod levelmesh;
pub mod packer;
pub mod tile;

pub use bvh::{Bvh, TraceHit};
pub use error::MeshError;
pub use levelmesh::{LevelMesh, LevelMeshTileStats, Light, MeshLocation, Portal, Surface, Vertex};
pub use packer::{pack_rects, PackedRect, RectPacker};
pub use tile::{derive_tile_transform, AtlasLocation, LightmapTile};
