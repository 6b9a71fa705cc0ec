// Parametric face mesh.
//
// A UV ellipsoid (Y up, face looking down +Z) with a Gaussian nose bump.
// Latitude rings share a single vertex at each pole and no seam column is
// duplicated, so smooth normals stay continuous everywhere.
//
// Vertex layout:
//   0                      north pole (+Y)
//   1 + r*W + s            ring r (0 = just below the north pole), segment s
//   1 + (H-1)*W            south pole (-Y)
// where W = width_segments, H = height_segments.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::mesh::{FaceMesh, PolyMesh};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceParams {
    pub radius: f32,
    /// Segments around the Y axis (min 3).
    pub width_segments: u32,
    /// Segments from pole to pole (min 2).
    pub height_segments: u32,
    /// Per-axis stretch applied after the sphere is built.
    pub scale: [f32; 3],
    /// Forward (+Z) height of the nose bump. 0 disables it.
    pub nose_height: f32,
}

impl Default for FaceParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            width_segments: 64,
            height_segments: 64,
            scale: [0.9, 1.1, 1.0],
            nose_height: 0.12,
        }
    }
}

/// Nose centre on the front of the face, in pre-bump coordinates (x, y).
const NOSE_CENTER: (f32, f32) = (0.0, 0.08);
/// Gaussian falloff widths of the nose bump (x, y).
const NOSE_WIDTH: (f32, f32) = (0.10, 0.18);

pub fn build_face_poly(params: &FaceParams) -> PolyMesh {
    let w = params.width_segments.max(3) as usize;
    let h = params.height_segments.max(2) as usize;
    let scale = Vec3::from_array(params.scale);

    let mut poly = PolyMesh::new();
    let shape = |unit: Vec3| shape_vertex(unit * params.radius * scale, params.nose_height);

    let north = poly.add_vertex(shape(Vec3::Y));

    // Rings between the poles
    for r in 1..h {
        let theta = r as f32 / h as f32 * PI;
        let (ring_sin, ring_cos) = theta.sin_cos();
        for s in 0..w {
            // phi = 0 points at +Z so the face front sits mid-ring, away from index wrap
            let phi = s as f32 / w as f32 * TAU;
            let (phi_sin, phi_cos) = phi.sin_cos();
            poly.add_vertex(shape(Vec3::new(ring_sin * phi_sin, ring_cos, ring_sin * phi_cos)));
        }
    }

    let south = poly.add_vertex(shape(Vec3::NEG_Y));

    let ring = |r: usize, s: usize| 1 + r * w + (s % w);
    let rings = h - 1;

    // North cap: triangles fanning from the pole.
    for s in 0..w {
        poly.add_face(vec![north, ring(0, s), ring(0, s + 1)]);
    }

    // Body quads, CCW from outside.
    for r in 0..rings - 1 {
        for s in 0..w {
            poly.add_face(vec![ring(r, s), ring(r + 1, s), ring(r + 1, s + 1), ring(r, s + 1)]);
        }
    }

    // South cap.
    for s in 0..w {
        poly.add_face(vec![south, ring(rings - 1, s + 1), ring(rings - 1, s)]);
    }

    poly
}

/// Build the rest-pose face mesh.
pub fn build_face(params: &FaceParams) -> FaceMesh {
    FaceMesh::from_poly(&build_face_poly(params))
}

fn shape_vertex(p: Vec3, nose_height: f32) -> Vec3 {
    if nose_height == 0.0 || p.z <= 0.0 {
        return p;
    }
    let dx = (p.x - NOSE_CENTER.0) / NOSE_WIDTH.0;
    let dy = (p.y - NOSE_CENTER.1) / NOSE_WIDTH.1;
    let bump = nose_height * (-(dx * dx + dy * dy)).exp();
    Vec3::new(p.x, p.y, p.z + bump)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_sphere(w: u32, h: u32) -> FaceParams {
        FaceParams {
            radius: 1.0,
            width_segments: w,
            height_segments: h,
            scale: [1.0, 1.0, 1.0],
            nose_height: 0.0,
        }
    }

    #[test]
    fn vertex_and_face_counts() {
        let poly = build_face_poly(&plain_sphere(8, 6));
        assert_eq!(poly.vertex_count(), 2 + 5 * 8);
        // 2 caps of 8 triangles + 4 bands of 8 quads
        assert_eq!(poly.face_count(), 16 + 32);
    }

    #[test]
    fn plain_sphere_lies_on_unit_radius() {
        let mesh = build_face(&plain_sphere(16, 12));
        for p in &mesh.positions {
            assert!((p.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn normals_point_outward() {
        let mesh = build_face(&FaceParams::default());
        for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
            assert!(p.dot(*n) > 0.0, "inward normal at {p:?}");
        }
    }

    #[test]
    fn nose_bump_only_on_front() {
        let params = FaceParams::default();
        let flat = FaceParams { nose_height: 0.0, ..params.clone() };
        let with_nose = build_face(&params);
        let without = build_face(&flat);
        let front = with_nose.positions.iter().map(|p| p.z).fold(f32::MIN, f32::max);
        let front_flat = without.positions.iter().map(|p| p.z).fold(f32::MIN, f32::max);
        assert!(front > front_flat + 0.05);
        for (a, b) in with_nose.positions.iter().zip(&without.positions) {
            if b.z <= 0.0 {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn front_has_mouth_region_vertices() {
        let mesh = build_face(&FaceParams::default());
        let mouth = mesh
            .positions
            .iter()
            .filter(|p| p.y > -0.5 && p.y < 0.1 && p.z > 0.3)
            .count();
        assert!(mouth > 50, "only {mouth} mouth vertices");
    }
}
