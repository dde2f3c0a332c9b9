//! Binary level container: a header of 32-bit LE block offsets, each
//! pointing to a length-prefixed (entry count, then records) block.

use lmbake_math::{AffineTransform, Mat3, Plane, Vec2, Vec3};
use lmbake_mesh::levelmesh::{Light, MeshLocation, Portal, Surface};
use lmbake_mesh::{LevelMesh, Vertex};
use nom::{
    IResult, Parser,
    multi::count,
    number::complete::{le_f32, le_i32, le_u8, le_u32},
};

use crate::error::IoError;

const HEADER_BLOCK_COUNT: usize = 5;
const HEADER_SIZE: usize = HEADER_BLOCK_COUNT * 4;

struct Header {
    vertices: u32,
    indices: u32,
    surfaces: u32,
    lights: u32,
    portals: u32,
}

fn parse_vec3(i: &[u8]) -> IResult<&[u8], Vec3> {
    (le_f32, le_f32, le_f32)
        .map(|(x, y, z)| Vec3::new(x, y, z))
        .parse(i)
}

fn parse_header(i: &[u8]) -> IResult<&[u8], Header> {
    (le_u32, le_u32, le_u32, le_u32, le_u32)
        .map(|(vertices, indices, surfaces, lights, portals)| Header {
            vertices,
            indices,
            surfaces,
            lights,
            portals,
        })
        .parse(i)
}

fn parse_vertex(i: &[u8]) -> IResult<&[u8], Vertex> {
    (parse_vec3, parse_vec3, le_f32, le_f32)
        .map(|(pos, normal, u, v)| Vertex::new(pos, Vec2::new(u, v), normal))
        .parse(i)
}

fn parse_surface(i: &[u8]) -> IResult<&[u8], Surface> {
    (
        (le_u32, le_u32, le_u32, le_u32),
        parse_vec3,
        le_f32,
        parse_vec3,
        parse_vec3,
        le_i32,
        le_i32,
        le_u8,
        le_f32,
        le_i32,
        le_u8,
        (le_f32, parse_vec3, le_f32),
    )
        .map(
            |(
                (start_vert, num_verts, start_index, num_indices),
                plane_normal,
                plane_d,
                bounds_min,
                bounds_max,
                sector_group,
                portal_index,
                is_sky,
                alpha,
                texture_id,
                always_update,
                (emissive_distance, emissive_color, emissive_intensity),
            )| {
                let mut surface = Surface::new(
                    MeshLocation {
                        start_vert,
                        num_verts,
                        start_index,
                        num_indices,
                    },
                    Plane {
                        normal: plane_normal,
                        d: plane_d,
                    },
                    {
                        let mut b = lmbake_math::BBox::from_point(bounds_min);
                        b.add_point(bounds_max);
                        b
                    },
                    sector_group,
                );
                surface.portal_index = portal_index as usize;
                surface.is_sky = is_sky != 0;
                surface.alpha = alpha;
                surface.texture_id = texture_id as u32;
                surface.always_update = always_update != 0;
                surface.emissive_distance = emissive_distance;
                surface.emissive_color = emissive_color;
                surface.emissive_intensity = emissive_intensity;
                surface
            },
        )
        .parse(i)
}

fn parse_light(i: &[u8]) -> IResult<&[u8], Light> {
    (parse_vec3, le_f32, parse_vec3, le_f32, le_f32, parse_vec3)
        .map(
            |(origin, radius, intensity, inner_angle_cos, outer_angle_cos, spot_dir)| Light {
                origin,
                radius,
                intensity,
                inner_angle_cos,
                outer_angle_cos,
                spot_dir,
            },
        )
        .parse(i)
}

fn parse_mat3_rows(i: &[u8]) -> IResult<&[u8], Mat3> {
    (parse_vec3, parse_vec3, parse_vec3)
        .map(|(r0, r1, r2)| Mat3::from_cols(r0, r1, r2).transpose())
        .parse(i)
}

fn parse_portal(i: &[u8]) -> IResult<&[u8], Portal> {
    (parse_mat3_rows, parse_vec3)
        .map(|(rotation, translation)| Portal {
            transform: AffineTransform {
                rotation,
                translation,
            },
        })
        .parse(i)
}

fn parse_block<'a, T>(
    i: &'a [u8],
    offset: u32,
    parse_item: impl Fn(&'a [u8]) -> IResult<&'a [u8], T>,
) -> Result<Vec<T>, IoError> {
    let offset = offset as usize;
    let bytes = i.get(offset..).ok_or(IoError::OffsetOutOfRange { offset: offset as u32 })?;

    let (rest, entry_count): (&[u8], u32) = le_u32(bytes).map_err(|_: nom::Err<nom::error::Error<&[u8]>>| {
        IoError::MalformedBlock {
            offset,
            reason: "missing entry count".into(),
        }
    })?;

    let (_, items) = count(parse_item, entry_count as usize)
        .parse(rest)
        .map_err(|_| IoError::MalformedBlock {
            offset,
            reason: format!("failed to parse {entry_count} entries"),
        })?;

    Ok(items)
}

/// Reads a level container into a fresh [`LevelMesh`] plus its lights.
/// `lm_texture_size` seeds the mesh's atlas page size (not stored in the
/// container; it is a bake-time parameter).
pub fn read_level(bytes: &[u8], lm_texture_size: u32) -> Result<(LevelMesh, Vec<Light>), IoError> {
    if bytes.len() < HEADER_SIZE {
        return Err(IoError::Truncated {
            offset: 0,
            expected: HEADER_SIZE,
        });
    }

    let (_, header) = parse_header(bytes).map_err(|_| IoError::MalformedBlock {
        offset: 0,
        reason: "bad header".into(),
    })?;

    let vertices = parse_block(bytes, header.vertices, parse_vertex)?;
    let indices = parse_block(bytes, header.indices, le_u32)?;
    let surfaces = parse_block(bytes, header.surfaces, parse_surface)?;
    let lights = parse_block(bytes, header.lights, parse_light)?;
    let portals = parse_block(bytes, header.portals, parse_portal)?;

    let mut mesh = LevelMesh::new(lm_texture_size);
    mesh.vertices = vertices;
    mesh.indices = indices;
    mesh.surfaces = surfaces;
    mesh.portals = portals;
    if mesh.portals.is_empty() {
        mesh.portals.push(Portal::default());
    }
    mesh.add_empty_mesh_if_needed();
    mesh.update_collision();

    Ok((mesh, lights))
}

fn write_vec3(out: &mut Vec<u8>, v: Vec3) {
    out.extend_from_slice(&v.x.to_le_bytes());
    out.extend_from_slice(&v.y.to_le_bytes());
    out.extend_from_slice(&v.z.to_le_bytes());
}

fn write_block_header(out: &mut Vec<u8>, count: usize) {
    out.extend_from_slice(&(count as u32).to_le_bytes());
}

/// Serializes `mesh`/`lights` back into the container format `read_level`
/// understands. Block order and layout exactly mirror the parsers above so
/// the round trip is byte-for-byte stable.
pub fn write_level(mesh: &LevelMesh, lights: &[Light]) -> Vec<u8> {
    let mut vertex_block = Vec::new();
    write_block_header(&mut vertex_block, mesh.vertices.len());
    for v in &mesh.vertices {
        write_vec3(&mut vertex_block, v.pos);
        write_vec3(&mut vertex_block, v.normal);
        vertex_block.extend_from_slice(&v.uv.x.to_le_bytes());
        vertex_block.extend_from_slice(&v.uv.y.to_le_bytes());
    }

    let mut index_block = Vec::new();
    write_block_header(&mut index_block, mesh.indices.len());
    for &idx in &mesh.indices {
        index_block.extend_from_slice(&idx.to_le_bytes());
    }

    let mut surface_block = Vec::new();
    write_block_header(&mut surface_block, mesh.surfaces.len());
    for s in &mesh.surfaces {
        surface_block.extend_from_slice(&s.mesh_location.start_vert.to_le_bytes());
        surface_block.extend_from_slice(&s.mesh_location.num_verts.to_le_bytes());
        surface_block.extend_from_slice(&s.mesh_location.start_index.to_le_bytes());
        surface_block.extend_from_slice(&s.mesh_location.num_indices.to_le_bytes());
        write_vec3(&mut surface_block, s.plane.normal);
        surface_block.extend_from_slice(&s.plane.d.to_le_bytes());
        write_vec3(&mut surface_block, s.bounds.min);
        write_vec3(&mut surface_block, s.bounds.max);
        surface_block.extend_from_slice(&s.sector_group.to_le_bytes());
        surface_block.extend_from_slice(&(s.portal_index as i32).to_le_bytes());
        surface_block.push(s.is_sky as u8);
        surface_block.extend_from_slice(&s.alpha.to_le_bytes());
        surface_block.extend_from_slice(&(s.texture_id as i32).to_le_bytes());
        surface_block.push(s.always_update as u8);
        surface_block.extend_from_slice(&s.emissive_distance.to_le_bytes());
        write_vec3(&mut surface_block, s.emissive_color);
        surface_block.extend_from_slice(&s.emissive_intensity.to_le_bytes());
    }

    let mut light_block = Vec::new();
    write_block_header(&mut light_block, lights.len());
    for l in lights {
        write_vec3(&mut light_block, l.origin);
        light_block.extend_from_slice(&l.radius.to_le_bytes());
        write_vec3(&mut light_block, l.intensity);
        light_block.extend_from_slice(&l.inner_angle_cos.to_le_bytes());
        light_block.extend_from_slice(&l.outer_angle_cos.to_le_bytes());
        write_vec3(&mut light_block, l.spot_dir);
    }

    let mut portal_block = Vec::new();
    write_block_header(&mut portal_block, mesh.portals.len());
    for p in &mesh.portals {
        let m = p.transform.rotation.transpose();
        write_vec3(&mut portal_block, m.x_axis);
        write_vec3(&mut portal_block, m.y_axis);
        write_vec3(&mut portal_block, m.z_axis);
        write_vec3(&mut portal_block, p.transform.translation);
    }

    let vertex_offset = HEADER_SIZE as u32;
    let index_offset = vertex_offset + vertex_block.len() as u32;
    let surface_offset = index_offset + index_block.len() as u32;
    let light_offset = surface_offset + surface_block.len() as u32;
    let portal_offset = light_offset + light_block.len() as u32;

    let mut out = Vec::with_capacity(
        HEADER_SIZE + vertex_block.len() + index_block.len() + surface_block.len() + light_block.len() + portal_block.len(),
    );
    out.extend_from_slice(&vertex_offset.to_le_bytes());
    out.extend_from_slice(&index_offset.to_le_bytes());
    out.extend_from_slice(&surface_offset.to_le_bytes());
    out.extend_from_slice(&light_offset.to_le_bytes());
    out.extend_from_slice(&portal_offset.to_le_bytes());
    out.extend_from_slice(&vertex_block);
    out.extend_from_slice(&index_block);
    out.extend_from_slice(&surface_block);
    out.extend_from_slice(&light_block);
    out.extend_from_slice(&portal_block);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lmbake_mesh::levelmesh::MeshLocation as ML;

    fn sample_mesh() -> (LevelMesh, Vec<Light>) {
        let mut mesh = LevelMesh::new(256);
        mesh.vertices.clear();
        mesh.indices.clear();
        mesh.vertices.push(Vertex::new(Vec3::new(-1.0, -1.0, 0.0), Vec2::ZERO, Vec3::Z));
        mesh.vertices.push(Vertex::new(Vec3::new(1.0, -1.0, 0.0), Vec2::ZERO, Vec3::Z));
        mesh.vertices.push(Vertex::new(Vec3::new(1.0, 1.0, 0.0), Vec2::ZERO, Vec3::Z));
        mesh.indices.extend_from_slice(&[0, 1, 2]);

        let plane = Plane::from_points(
            mesh.vertices[0].pos,
            mesh.vertices[1].pos,
            mesh.vertices[2].pos,
        )
        .unwrap();
        let bounds = {
            let mut b = lmbake_math::BBox::from_point(mesh.vertices[0].pos);
            b.add_point(mesh.vertices[2].pos);
            b
        };
        let mut surface = Surface::new(
            ML {
                start_vert: 0,
                num_verts: 3,
                start_index: 0,
                num_indices: 3,
            },
            plane,
            bounds,
            0,
        );
        surface.emissive_distance = 64.0;
        surface.emissive_color = Vec3::new(1.0, 0.0, 0.0);
        surface.emissive_intensity = 2.0;
        mesh.surfaces.push(surface);
        mesh.update_collision();

        let lights = vec![Light {
            origin: Vec3::new(0.0, 0.0, 50.0),
            radius: 100.0,
            intensity: Vec3::ONE,
            inner_angle_cos: -1.0,
            outer_angle_cos: -1.0,
            spot_dir: Vec3::Z,
        }];
        (mesh, lights)
    }

    #[test]
    fn round_trip_preserves_vertices_indices_surfaces_lights_portals() {
        let (mesh, lights) = sample_mesh();
        let bytes = write_level(&mesh, &lights);
        let (loaded, loaded_lights) = read_level(&bytes, 256).unwrap();

        assert_eq!(loaded.vertices.len(), mesh.vertices.len());
        for (a, b) in loaded.vertices.iter().zip(mesh.vertices.iter()) {
            assert_eq!(a.pos, b.pos);
            assert_eq!(a.normal, b.normal);
        }
        assert_eq!(loaded.indices, mesh.indices);
        assert_eq!(loaded.surfaces.len(), mesh.surfaces.len());
        assert_eq!(loaded.surfaces[0].sector_group, mesh.surfaces[0].sector_group);
        assert_eq!(loaded.surfaces[0].emissive_distance, mesh.surfaces[0].emissive_distance);
        assert_eq!(loaded.surfaces[0].emissive_color, mesh.surfaces[0].emissive_color);
        assert_eq!(loaded.surfaces[0].emissive_intensity, mesh.surfaces[0].emissive_intensity);
        assert_eq!(loaded_lights.len(), lights.len());
        assert_eq!(loaded_lights[0].radius, lights[0].radius);
        assert!(loaded.portals[0].transform.is_identity());
    }

    #[test]
    fn truncated_header_is_an_error() {
        let result = read_level(&[0u8; 4], 256);
        assert!(result.is_err());
    }
}
