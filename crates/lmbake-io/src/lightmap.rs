//! Lightmap output container: one half-float RGB image per atlas page plus
//! a small header recording page geometry and per-tile placement.

use half::f16;
use lmbake_mesh::LevelMesh;

use crate::error::IoError;

/// One atlas page of baked radiance, row-major, `size * size` RGB texels.
#[derive(Debug, Clone)]
pub struct LightmapPage {
    pub texels: Vec<[f32; 3]>,
}

impl LightmapPage {
    pub fn blank(size: u32) -> Self {
        Self {
            texels: vec![[0.0; 3]; (size as usize) * (size as usize)],
        }
    }
}

fn primary_surface_of_tile(mesh: &LevelMesh, tile_index: usize) -> i32 {
    mesh.surfaces
        .iter()
        .position(|s| s.lightmap_tile_index == tile_index as i32)
        .map(|i| i as i32)
        .unwrap_or(-1)
}

/// Serializes `pages` (one per atlas array slice) alongside `mesh`'s tile
/// table into the on-disk lightmap format: header, then one packed f16 RGB
/// blob per page, in page order.
pub fn write_lightmap_output(mesh: &LevelMesh, pages: &[LightmapPage]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&mesh.lm_texture_size.to_le_bytes());
    out.extend_from_slice(&mesh.lm_texture_count.to_le_bytes());
    out.extend_from_slice(&(mesh.lightmap_tiles.len() as u32).to_le_bytes());

    for (i, tile) in mesh.lightmap_tiles.iter().enumerate() {
        let surface_id = primary_surface_of_tile(mesh, i);
        out.extend_from_slice(&surface_id.to_le_bytes());
        out.extend_from_slice(&tile.atlas_location.array_index.to_le_bytes());
        out.extend_from_slice(&tile.atlas_location.x.to_le_bytes());
        out.extend_from_slice(&tile.atlas_location.y.to_le_bytes());
        out.extend_from_slice(&tile.atlas_location.w.to_le_bytes());
        out.extend_from_slice(&tile.atlas_location.h.to_le_bytes());
    }

    for page in pages {
        for texel in &page.texels {
            for &channel in texel {
                out.extend_from_slice(&f16::from_f32(channel).to_le_bytes());
            }
        }
    }

    out
}

/// Per-tile placement record as read back from a lightmap output blob.
#[derive(Debug, Clone, Copy)]
pub struct TileRecord {
    pub surface_id: i32,
    pub array_index: i32,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

pub struct LightmapOutput {
    pub texture_size: u32,
    pub texture_count: u32,
    pub tiles: Vec<TileRecord>,
    pub pages: Vec<LightmapPage>,
}

pub fn read_lightmap_output(bytes: &[u8]) -> Result<LightmapOutput, IoError> {
    let mut cursor = 0usize;
    let take_u32 = |bytes: &[u8], cursor: &mut usize| -> Result<u32, IoError> {
        let slice = bytes.get(*cursor..*cursor + 4).ok_or(IoError::Truncated {
            offset: *cursor,
            expected: 4,
        })?;
        *cursor += 4;
        Ok(u32::from_le_bytes(slice.try_into().unwrap()))
    };
    let take_i32 = |bytes: &[u8], cursor: &mut usize| -> Result<i32, IoError> {
        let slice = bytes.get(*cursor..*cursor + 4).ok_or(IoError::Truncated {
            offset: *cursor,
            expected: 4,
        })?;
        *cursor += 4;
        Ok(i32::from_le_bytes(slice.try_into().unwrap()))
    };

    let texture_size = take_u32(bytes, &mut cursor)?;
    let texture_count = take_u32(bytes, &mut cursor)?;
    let tile_count = take_u32(bytes, &mut cursor)?;

    let mut tiles = Vec::with_capacity(tile_count as usize);
    for _ in 0..tile_count {
        tiles.push(TileRecord {
            surface_id: take_i32(bytes, &mut cursor)?,
            array_index: take_i32(bytes, &mut cursor)?,
            x: take_u32(bytes, &mut cursor)?,
            y: take_u32(bytes, &mut cursor)?,
            w: take_u32(bytes, &mut cursor)?,
            h: take_u32(bytes, &mut cursor)?,
        });
    }

    let texels_per_page = texture_size as usize * texture_size as usize;
    let mut pages = Vec::with_capacity(texture_count as usize);
    for _ in 0..texture_count {
        let mut texels = Vec::with_capacity(texels_per_page);
        for _ in 0..texels_per_page {
            let mut channels = [0.0f32; 3];
            for c in channels.iter_mut() {
                let slice = bytes.get(cursor..cursor + 2).ok_or(IoError::Truncated {
                    offset: cursor,
                    expected: 2,
                })?;
                cursor += 2;
                *c = f16::from_le_bytes(slice.try_into().unwrap()).to_f32();
            }
            texels.push(channels);
        }
        pages.push(LightmapPage { texels });
    }

    Ok(LightmapOutput {
        texture_size,
        texture_count,
        tiles,
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lmbake_mesh::LevelMesh;

    #[test]
    fn round_trip_preserves_header_and_tile_table() {
        let mut mesh = LevelMesh::new(64);
        mesh.lm_texture_count = 1;
        let page = LightmapPage {
            texels: vec![[0.25, 0.5, 0.75]; 64 * 64],
        };
        let bytes = write_lightmap_output(&mesh, &[page]);
        let parsed = read_lightmap_output(&bytes).unwrap();

        assert_eq!(parsed.texture_size, 64);
        assert_eq!(parsed.pages.len(), 1);
        assert!((parsed.pages[0].texels[0][0] - 0.25).abs() < 1e-3);
        assert!((parsed.pages[0].texels[0][1] - 0.5).abs() < 1e-3);
    }
}
