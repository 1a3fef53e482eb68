use glam::Vec3;

use crate::shader_types::Vertex;

/// Indexed triangle mesh holding GPU-ready vertex records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True when any vertex still carries a zero normal.
    pub fn needs_normals(&self) -> bool {
        self.vertices
            .iter()
            .any(|vertex| vertex.normal == [0.0, 0.0, 0.0])
    }

    /// Recomputes vertex normals from the triangle list.
    ///
    /// Face normals are accumulated unnormalized so larger triangles weigh
    /// more, then each vertex normal is normalized. Degenerate triangles
    /// contribute nothing.
    pub fn compute_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertices.len()];

        for triangle in self.indices.chunks_exact(3) {
            let i0 = triangle[0] as usize;
            let i1 = triangle[1] as usize;
            let i2 = triangle[2] as usize;
            let p0 = Vec3::from_array(self.vertices[i0].position);
            let p1 = Vec3::from_array(self.vertices[i1].position);
            let p2 = Vec3::from_array(self.vertices[i2].position);
            let normal = (p1 - p0).cross(p2 - p0);
            if normal.length_squared() > f32::EPSILON {
                accum[i0] += normal;
                accum[i1] += normal;
                accum[i2] += normal;
            }
        }

        for (vertex, normal) in self.vertices.iter_mut().zip(accum) {
            vertex.normal = normal.normalize_or_zero().to_array();
        }
    }
}

/// Unit cube centered on the origin with per-face normals and uvs; the
/// fallback mesh when a scene references geometry that fails to load.
pub fn cube() -> Mesh {
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        // normal, tangent, bitangent
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
    ];
    const CORNERS: [([f32; 2], [f32; 2]); 4] = [
        ([-0.5, -0.5], [0.0, 0.0]),
        ([0.5, -0.5], [1.0, 0.0]),
        ([0.5, 0.5], [1.0, 1.0]),
        ([-0.5, 0.5], [0.0, 1.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, tangent, bitangent) in FACES {
        let n = Vec3::from_array(normal);
        let t = Vec3::from_array(tangent);
        let b = Vec3::from_array(bitangent);
        let base = vertices.len() as u32;
        for (offset, uvs) in CORNERS {
            let position = n * 0.5 + t * offset[0] + b * offset[1];
            vertices.push(Vertex {
                position: position.to_array(),
                color: [1.0, 1.0, 1.0, 1.0],
                normal,
                uvs,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Mesh::new(vertices, indices)
}
