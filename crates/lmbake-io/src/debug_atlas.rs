//! Optional `--debug-atlas` visualization: writes each lightmap page as a
//! tone-mapped PNG next to the binary output, grounded on the same idea as
//! the engine's commented-out atlas-tile-location debug dump.

use image::{ImageBuffer, Rgb};
use lmbake_mesh::LevelMesh;

use crate::lightmap::LightmapPage;

/// Simple Reinhard tonemap (`c / (1 + c)`) followed by sRGB gamma, since the
/// stored radiance is unbounded HDR and PNG is 8-bit.
fn tonemap(c: f32) -> u8 {
    let mapped = (c / (1.0 + c)).clamp(0.0, 1.0);
    (mapped.powf(1.0 / 2.2) * 255.0).round() as u8
}

pub fn page_to_png(page: &LightmapPage, size: u32) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
    let mut img = ImageBuffer::new(size, size);
    for y in 0..size {
        for x in 0..size {
            let texel = page.texels[(y * size + x) as usize];
            img.put_pixel(
                x,
                y,
                Rgb([tonemap(texel[0]), tonemap(texel[1]), tonemap(texel[2])]),
            );
        }
    }
    img
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
    let c = v * s;
    let hh = (h / 60.0).rem_euclid(6.0);
    let x = c * (1.0 - (hh % 2.0 - 1.0).abs());
    let (r1, g1, b1) = if hh < 1.0 {
        (c, x, 0.0)
    } else if hh < 2.0 {
        (x, c, 0.0)
    } else if hh < 3.0 {
        (0.0, c, x)
    } else if hh < 4.0 {
        (0.0, x, c)
    } else if hh < 5.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };
    let m = v - c;
    [
        ((r1 + m) * 255.0).round() as u8,
        ((g1 + m) * 255.0).round() as u8,
        ((b1 + m) * 255.0).round() as u8,
    ]
}

/// Deterministic, well-spread color per tile type index, via a golden-angle
/// hue step rather than a fixed palette so it scales to any tile count.
fn tile_color(type_index: i32) -> Rgb<u8> {
    let hue = (type_index as f32 * 137.508).rem_euclid(360.0);
    Rgb(hsv_to_rgb(hue, 0.6, 0.85))
}

/// Flat-shades each tile on atlas page `array_index` by its `type_index`,
/// for visually sanity-checking tile packing and boundaries. Mirrors the
/// original's compile-time-gated debug visualization.
pub fn page_tile_coloring_png(mesh: &LevelMesh, array_index: i32, size: u32) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
    let mut img = ImageBuffer::from_pixel(size, size, Rgb([0, 0, 0]));
    for tile in &mesh.lightmap_tiles {
        if tile.atlas_location.array_index != array_index {
            continue;
        }
        let color = tile_color(tile.type_index);
        let loc = tile.atlas_location;
        for y in loc.y..(loc.y + loc.h).min(size) {
            for x in loc.x..(loc.x + loc.w).min(size) {
                img.put_pixel(x, y, color);
            }
        }
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tonemap_clamps_to_byte_range() {
        assert_eq!(tonemap(0.0), 0);
        assert!(tonemap(1000.0) <= 255);
    }

    #[test]
    fn page_to_png_produces_expected_dimensions() {
        let page = LightmapPage {
            texels: vec![[0.5, 0.5, 0.5]; 4 * 4],
        };
        let img = page_to_png(&page, 4);
        assert_eq!(img.width(), 4);
        assert_eq!(img.height(), 4);
    }

    fn tile(array_index: i32, x: u32, y: u32, w: u32, h: u32, type_index: i32) -> lmbake_mesh::LightmapTile {
        lmbake_mesh::LightmapTile {
            atlas_location: lmbake_mesh::AtlasLocation { array_index, x, y, w, h },
            transform: lmbake_math::TileTransform {
                origin: lmbake_math::Vec3::ZERO,
                u_axis: lmbake_math::Vec3::X,
                v_axis: lmbake_math::Vec3::Y,
            },
            surfaces: Vec::new(),
            needs_update: true,
            type_index,
        }
    }

    #[test]
    fn tile_coloring_only_paints_matching_page() {
        let mut mesh = LevelMesh::new(8);
        mesh.lightmap_tiles.push(tile(0, 0, 0, 4, 4, 0));
        mesh.lightmap_tiles.push(tile(1, 0, 0, 4, 4, 1));

        let img = page_tile_coloring_png(&mesh, 0, 8);
        assert_ne!(img.get_pixel(1, 1), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(6, 6), &Rgb([0, 0, 0]));
    }

    #[test]
    fn tile_coloring_gives_distinct_colors_to_distinct_type_indices() {
        assert_ne!(tile_color(0), tile_color(1));
    }
}
