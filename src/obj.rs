use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use glam::{Vec2, Vec3};

use crate::mesh::Mesh;
use crate::shader_types::Vertex;

/// Parses a Wavefront OBJ file from memory into an indexed [`Mesh`].
///
/// Supported statements: `v x y z [w] [r g b]` (trailing vertex colors
/// default to white), `vt u v`, `vn x y z`, and `f` in the `v`, `v/vt`,
/// `v//vn` and `v/vt/vn` forms with 1-based or negative indices. Polygons
/// are fan-triangulated. Vertices are deduplicated on their index triple,
/// and normals are computed from the faces when the file has none.
pub fn load_obj_from_str(data: &str) -> Result<Mesh> {
    let mut positions = Vec::new();
    let mut colors = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    let mut faces: Vec<[FaceIndex; 3]> = Vec::new();

    for (line_no, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let Some(tag) = parts.next() else {
            continue;
        };
        match tag {
            "v" => {
                let (position, color) = parse_vertex(parts)
                    .with_context(|| format!("invalid vertex on line {}", line_no + 1))?;
                positions.push(position);
                colors.push(color);
            }
            "vn" => normals.push(
                parse_vec3(parts)
                    .with_context(|| format!("invalid normal on line {}", line_no + 1))?,
            ),
            "vt" => uvs.push(
                parse_vec2(parts)
                    .with_context(|| format!("invalid texture coord on line {}", line_no + 1))?,
            ),
            "f" => {
                let polygon = parse_face(parts)
                    .with_context(|| format!("invalid face on line {}", line_no + 1))?;
                triangulate_face(&polygon, &mut faces);
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(anyhow!("OBJ file does not define any vertices"));
    }

    let mut mesh = build_mesh(&positions, &colors, &normals, &uvs, &faces)?;
    if mesh.needs_normals() {
        mesh.compute_normals();
    }
    Ok(mesh)
}

/// Position plus the optional trailing color; the `w` component, when
/// present, is ignored.
fn parse_vertex<'a>(parts: impl Iterator<Item = &'a str>) -> Result<(Vec3, [f32; 4])> {
    let values = parts
        .map(|part| part.parse::<f32>())
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() < 3 {
        return Err(anyhow!("vertex needs at least 3 components"));
    }
    let position = Vec3::new(values[0], values[1], values[2]);
    let color = match values.len() {
        7 => [values[4], values[5], values[6], 1.0],
        6 => [values[3], values[4], values[5], 1.0],
        _ => [1.0, 1.0, 1.0, 1.0],
    };
    Ok((position, color))
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec3> {
    let x = next_component(&mut parts)?;
    let y = next_component(&mut parts)?;
    let z = next_component(&mut parts)?;
    Ok(Vec3::new(x, y, z))
}

fn parse_vec2<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<Vec2> {
    let u = next_component(&mut parts)?;
    let v = next_component(&mut parts)?;
    Ok(Vec2::new(u, v))
}

fn next_component<'a>(parts: &mut impl Iterator<Item = &'a str>) -> Result<f32> {
    Ok(parts
        .next()
        .ok_or_else(|| anyhow!("missing vector component"))?
        .parse::<f32>()?)
}

fn parse_face<'a>(parts: impl Iterator<Item = &'a str>) -> Result<Vec<FaceIndex>> {
    let mut indices = Vec::new();
    for part in parts {
        let mut segments = part.split('/');
        let v = segments
            .next()
            .ok_or_else(|| anyhow!("missing vertex index"))?
            .parse::<i32>()?;
        let vt = parse_optional_index(segments.next());
        let vn = parse_optional_index(segments.next());
        indices.push(FaceIndex { v, vt, vn });
    }
    if indices.len() < 3 {
        return Err(anyhow!("faces must reference at least 3 vertices"));
    }
    Ok(indices)
}

fn parse_optional_index(segment: Option<&str>) -> i32 {
    segment
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<i32>().ok())
        .unwrap_or(0)
}

fn triangulate_face(polygon: &[FaceIndex], faces: &mut Vec<[FaceIndex; 3]>) {
    if polygon.len() < 3 {
        return;
    }
    for i in 1..(polygon.len() - 1) {
        faces.push([polygon[0], polygon[i], polygon[i + 1]]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Key {
    position: usize,
    uv: Option<usize>,
    normal: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct FaceIndex {
    v: i32,
    vt: i32,
    vn: i32,
}

fn build_mesh(
    positions: &[Vec3],
    colors: &[[f32; 4]],
    normals: &[Vec3],
    uvs: &[Vec2],
    faces: &[[FaceIndex; 3]],
) -> Result<Mesh> {
    let mut lookup: HashMap<Key, u32> = HashMap::new();
    let mut vertices: Vec<Vertex> = Vec::new();
    let mut indices = Vec::new();

    for face in faces {
        for idx in face {
            let pos_index =
                fix_index(idx.v, positions.len()).ok_or_else(|| anyhow!("invalid vertex index"))?;
            let uv_index = fix_index(idx.vt, uvs.len());
            let normal_index = fix_index(idx.vn, normals.len());
            let key = Key {
                position: pos_index,
                uv: uv_index,
                normal: normal_index,
            };
            let next_index = vertices.len() as u32;
            let entry = lookup.entry(key).or_insert_with(|| {
                vertices.push(Vertex {
                    position: positions[pos_index].to_array(),
                    color: colors[pos_index],
                    normal: normal_index
                        .map(|i| normals[i].to_array())
                        .unwrap_or([0.0; 3]),
                    uvs: uv_index.map(|i| uvs[i].to_array()).unwrap_or([0.0; 2]),
                });
                next_index
            });
            indices.push(*entry);
        }
    }

    Ok(Mesh::new(vertices, indices))
}

fn fix_index(index: i32, len: usize) -> Option<usize> {
    if index > 0 {
        let zero_based = index as usize - 1;
        (zero_based < len).then_some(zero_based)
    } else if index < 0 {
        let abs = (-index) as usize;
        (abs <= len).then_some(len - abs)
    } else {
        None
    }
}
