// Face mesh types and triangulation.
//
// Two-layer architecture:
//   face::build_face() → PolyMesh → FaceMesh::from_poly() → FaceMesh → GPU
//
// FaceMesh keeps positions and normals as glam vectors so the deformation engine
// can rewrite them every frame; GpuVertex is only produced at upload time.

use bevy_ecs::prelude::*;
use glam::Vec3;

// ============================================================================
// GPU VERTEX
// ============================================================================

/// GPU-ready vertex with position and normal.
///   @location(0) position: vec3<f32>
///   @location(1) normal:   vec3<f32>
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal:   [f32; 3],
}

impl GpuVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

// ============================================================================
// POLY MESH
// ============================================================================

/// Intermediate polygon mesh produced by the face builder.
/// Supports n-gon faces (arbitrary vertex count per face).
/// Faces use CCW winding when viewed from outside (consistent with back-face culling).
pub struct PolyMesh {
    pub positions: Vec<Vec3>,
    pub faces:     Vec<Vec<usize>>,  // each face = CCW-ordered vertex index list
}

impl PolyMesh {
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            faces:     Vec::new(),
        }
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, pos: Vec3) -> usize {
        let idx = self.positions.len();
        self.positions.push(pos);
        idx
    }

    /// Add a face by vertex indices (CCW order).
    pub fn add_face(&mut self, indices: Vec<usize>) {
        debug_assert!(indices.len() >= 3, "Face must have at least 3 vertices");
        self.faces.push(indices);
    }

    pub fn vertex_count(&self) -> usize { self.positions.len() }
    pub fn face_count(&self) -> usize { self.faces.len() }
}

impl Default for PolyMesh {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// FACE MESH
// ============================================================================

/// Triangulated, deformable mesh with shared vertices and smooth normals.
///
/// `changed` is raised whenever positions are rewritten; the renderer takes it
/// with [`FaceMesh::take_changed`] to decide whether to re-upload the vertex buffer.
#[derive(Component, Debug, Clone)]
pub struct FaceMesh {
    pub positions: Vec<Vec3>,
    pub normals:   Vec<Vec3>,
    pub indices:   Vec<u32>,
    changed: bool,
}

impl FaceMesh {
    /// Build from triangle-list indices. Normals are computed immediately.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        debug_assert!(indices.len() % 3 == 0, "Index count must be a multiple of 3");
        let mut mesh = Self {
            normals: vec![Vec3::ZERO; positions.len()],
            positions,
            indices,
            changed: true,
        };
        mesh.recompute_normals();
        mesh
    }

    /// Fan-triangulate every face of a PolyMesh (from its vertex 0).
    pub fn from_poly(poly: &PolyMesh) -> Self {
        let mut indices: Vec<u32> = Vec::new();
        for face in &poly.faces {
            let n = face.len();
            for i in 1..(n - 1) {
                indices.push(face[0]     as u32);
                indices.push(face[i]     as u32);
                indices.push(face[i + 1] as u32);
            }
        }
        Self::new(poly.positions.clone(), indices)
    }

    /// Recompute area-weighted smooth normals from current positions.
    ///
    /// The unnormalized cross product has magnitude 2×triangle_area, so summing
    /// it per vertex weights each incident triangle by its area.
    pub fn recompute_normals(&mut self) {
        self.normals.clear();
        self.normals.resize(self.positions.len(), Vec3::ZERO);

        for tri in self.indices.chunks_exact(3) {
            let (ia, ib, ic) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let a = self.positions[ia];
            let b = self.positions[ib];
            let c = self.positions[ic];
            let weighted_normal = (b - a).cross(c - a);
            self.normals[ia] += weighted_normal;
            self.normals[ib] += weighted_normal;
            self.normals[ic] += weighted_normal;
        }

        for n in &mut self.normals {
            *n = n.normalize_or_zero();
        }
    }

    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Return and clear the change flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn vertex_count(&self) -> usize { self.positions.len() }
    pub fn index_count(&self) -> usize  { self.indices.len() }

    pub fn gpu_vertices(&self) -> Vec<GpuVertex> {
        self.positions.iter()
            .zip(self.normals.iter())
            .map(|(pos, n)| GpuVertex {
                position: pos.to_array(),
                normal:   n.to_array(),
            })
            .collect()
    }

    /// Cast index slice to raw bytes for wgpu buffer upload.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
