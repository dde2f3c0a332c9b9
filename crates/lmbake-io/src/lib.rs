pub mod debug_atlas;
pub mod error;
pub mod level;
pub mod lightmap;

pub use error::IoError;
pub use level::{read_level, write_level};
pub use lightmap::{read_lightmap_output, write_lightmap_output, LightmapOutput, LightmapPage, TileRecord};
