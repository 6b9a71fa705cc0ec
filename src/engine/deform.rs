// Deformation engine: smoothed blend weights → vertex displacement.
//
// Per render tick:
//   1. smoothed += (target - smoothed) * smoothing      (first-order low-pass)
//   2. ensure_baseline(): capture rest positions once per mesh
//   3. apply_pose(): reset to rest pose, run the regional rules, recompute normals
//
// Displacement is always computed from the rest pose, never accumulated, so
// repeated passes cannot drift.

use bevy_ecs::prelude::*;
use glam::Vec3;
use log::{debug, warn};

use super::blendshape::BlendWeightSet;
use super::mesh::FaceMesh;
use crate::error::{FaceError, Result};

/// Fraction of the remaining distance covered per render tick.
pub const DEFAULT_SMOOTHING: f32 = 0.2;

// ============================================================================
// DEFORMATION RULES
// ============================================================================

/// Lower face, moved by jawOpen.
fn in_lower_face(rest: Vec3) -> bool {
    rest.y < -0.2
}

/// Lip band, shared by mouthClose, mouthPucker and mouthFunnel.
fn in_mouth_band(rest: Vec3) -> bool {
    rest.y > -0.5 && rest.y < 0.1 && rest.z > 0.3
}

/// Mouth corners, moved by mouthSmile.
fn in_mouth_corners(rest: Vec3) -> bool {
    rest.y > -0.4 && rest.y < -0.1 && rest.z > 0.2
}

/// Sign that maps 0 (and NaN) to 0, unlike `f32::signum`.
fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Displace one rest-pose vertex by `w`.
///
/// Region predicates read the rest position; displacements read the running
/// position, so each rule sees the rules before it. Rule order is fixed:
/// jawOpen, mouthClose, mouthPucker, mouthSmile, mouthFunnel.
pub fn deform_vertex(rest: Vec3, w: &BlendWeightSet) -> Vec3 {
    let mut p = rest;
    let mouth = in_mouth_band(rest);

    if in_lower_face(rest) {
        p.y -= w.jaw_open * 0.3;
    }
    if mouth {
        p.z -= w.mouth_close * 0.2;
    }
    if mouth {
        p.x *= 1.0 - w.mouth_pucker * 0.3;
        p.z += w.mouth_pucker * 0.15;
    }
    if in_mouth_corners(rest) {
        p.x += sign(p.x) * w.mouth_smile * 0.1;
        p.y += w.mouth_smile * 0.15;
    }
    if mouth {
        p.z += w.mouth_funnel * 0.1;
        p.y -= w.mouth_funnel * 0.1;
    }
    p
}

// ============================================================================
// BASE GEOMETRY
// ============================================================================

/// Rest-pose vertex positions, captured once per mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseGeometry {
    positions: Vec<Vec3>,
}

impl BaseGeometry {
    pub fn capture(mesh: &FaceMesh) -> Self {
        Self { positions: mesh.positions.clone() }
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Reset `mesh` to the rest pose, apply `weights`, recompute normals and
    /// flag the mesh as changed.
    pub fn apply_pose(&self, mesh: &mut FaceMesh, weights: &BlendWeightSet) -> Result<()> {
        if mesh.vertex_count() != self.vertex_count() {
            return Err(FaceError::TopologyMismatch {
                baseline: self.vertex_count(),
                mesh: mesh.vertex_count(),
            });
        }
        for (out, &rest) in mesh.positions.iter_mut().zip(&self.positions) {
            *out = deform_vertex(rest, weights);
        }
        mesh.recompute_normals();
        mesh.mark_changed();
        Ok(())
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// What one [`DeformationEngine::advance`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// No mesh attached; nothing happened.
    NoMesh,
    /// First pass on this mesh: rest pose captured, no deformation.
    BaselineCaptured,
    Deformed,
    /// Mesh vertex count no longer matches the baseline; pass skipped.
    Skipped,
}

#[derive(Component, Debug, Clone)]
pub struct DeformationEngine {
    target: BlendWeightSet,
    smoothed: BlendWeightSet,
    smoothing: f32,
    baseline: Option<BaseGeometry>,
}

impl DeformationEngine {
    pub fn new() -> Self {
        Self::with_smoothing(DEFAULT_SMOOTHING)
    }

    /// `smoothing` is clamped to (0, 1]; 1 snaps straight to the target.
    pub fn with_smoothing(smoothing: f32) -> Self {
        let smoothing = if smoothing.is_finite() { smoothing.clamp(f32::EPSILON, 1.0) } else { DEFAULT_SMOOTHING };
        Self {
            target: BlendWeightSet::NEUTRAL,
            smoothed: BlendWeightSet::NEUTRAL,
            smoothing,
            baseline: None,
        }
    }

    /// Record the desired pose. `None` relaxes toward neutral. Weights are
    /// applied as given, without clamping.
    pub fn set_target(&mut self, weights: Option<BlendWeightSet>) {
        self.target = weights.unwrap_or_default();
    }

    pub fn target(&self) -> BlendWeightSet {
        self.target
    }

    pub fn smoothed(&self) -> BlendWeightSet {
        self.smoothed
    }

    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    pub fn baseline(&self) -> Option<&BaseGeometry> {
        self.baseline.as_ref()
    }

    /// Capture the rest pose if none is held yet. Returns true if it captured.
    pub fn ensure_baseline(&mut self, mesh: &FaceMesh) -> bool {
        if self.baseline.is_some() {
            return false;
        }
        debug!("Captured base geometry ({} vertices)", mesh.vertex_count());
        self.baseline = Some(BaseGeometry::capture(mesh));
        true
    }

    /// Forget the rest pose so the next pass captures a new mesh.
    /// Smoothed weights are kept, so expression changes stay eased.
    pub fn detach_baseline(&mut self) -> Option<BaseGeometry> {
        self.baseline.take()
    }

    /// One render tick. See module docs for the sequence.
    pub fn advance(&mut self, mesh: Option<&mut FaceMesh>) -> AdvanceOutcome {
        let Some(mesh) = mesh else {
            return AdvanceOutcome::NoMesh;
        };

        self.smoothed.approach(&self.target, self.smoothing);

        if self.ensure_baseline(mesh) {
            return AdvanceOutcome::BaselineCaptured;
        }
        let Some(base) = &self.baseline else {
            return AdvanceOutcome::Skipped;
        };
        match base.apply_pose(mesh, &self.smoothed) {
            Ok(()) => AdvanceOutcome::Deformed,
            Err(e) => {
                warn!("Skipping deformation pass: {e}");
                AdvanceOutcome::Skipped
            }
        }
    }
}

impl Default for DeformationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::face::{FaceParams, build_face};

    fn jaw(v: f32) -> BlendWeightSet {
        BlendWeightSet { jaw_open: v, ..BlendWeightSet::NEUTRAL }
    }

    #[test]
    fn first_advance_smooths_to_a_fifth() {
        let mut mesh = build_face(&FaceParams::default());
        let mut engine = DeformationEngine::new();
        let w = BlendWeightSet::new(0.7, 1.0, 0.5, 0.3, 0.4);
        engine.set_target(Some(w));
        engine.advance(Some(&mut mesh));
        let s = engine.smoothed();
        assert_eq!(s.jaw_open, 0.7 * 0.2);
        assert_eq!(s.mouth_close, 1.0 * 0.2);
        assert_eq!(s.mouth_pucker, 0.5 * 0.2);
        assert_eq!(s.mouth_smile, 0.3 * 0.2);
        assert_eq!(s.mouth_funnel, 0.4 * 0.2);
    }

    #[test]
    fn converges_monotonically() {
        let mut mesh = build_face(&FaceParams { width_segments: 8, height_segments: 8, ..Default::default() });
        let mut engine = DeformationEngine::new();
        let w = BlendWeightSet::new(0.7, 1.0, 0.7, 0.7, 0.4);
        engine.set_target(Some(w));
        let mut last = engine.smoothed().max_distance(&w);
        for _ in 0..30 {
            engine.advance(Some(&mut mesh));
            let d = engine.smoothed().max_distance(&w);
            assert!(d < last, "distance {d} did not shrink from {last}");
            last = d;
        }
        assert!(last < 1e-2);
    }

    #[test]
    fn no_mesh_is_a_no_op() {
        let mut engine = DeformationEngine::new();
        engine.set_target(Some(jaw(0.7)));
        assert_eq!(engine.advance(None), AdvanceOutcome::NoMesh);
        assert_eq!(engine.smoothed(), BlendWeightSet::NEUTRAL);
        assert!(engine.baseline().is_none());
    }

    #[test]
    fn first_pass_captures_without_deforming() {
        let mut mesh = build_face(&FaceParams::default());
        let rest = mesh.positions.clone();
        let mut engine = DeformationEngine::new();
        engine.set_target(Some(jaw(0.7)));
        assert_eq!(engine.advance(Some(&mut mesh)), AdvanceOutcome::BaselineCaptured);
        assert_eq!(mesh.positions, rest);
        assert_eq!(engine.advance(Some(&mut mesh)), AdvanceOutcome::Deformed);
        assert_ne!(mesh.positions, rest);
    }

    #[test]
    fn baseline_is_never_recaptured() {
        let mut mesh = build_face(&FaceParams::default());
        let rest = mesh.positions.clone();
        let mut engine = DeformationEngine::new();
        engine.advance(Some(&mut mesh));
        engine.set_target(Some(jaw(0.7)));
        for _ in 0..5 {
            engine.advance(Some(&mut mesh));
        }
        engine.set_target(Some(BlendWeightSet::new(0.0, 1.0, 0.0, 0.7, 0.0)));
        engine.advance(Some(&mut mesh));
        assert_eq!(engine.baseline().unwrap().positions(), rest.as_slice());
    }

    #[test]
    fn deformation_does_not_accumulate() {
        let mut mesh = build_face(&FaceParams::default());
        let mut engine = DeformationEngine::with_smoothing(1.0);
        engine.advance(Some(&mut mesh));
        engine.set_target(Some(jaw(0.5)));
        engine.advance(Some(&mut mesh));
        let once = mesh.positions.clone();
        engine.advance(Some(&mut mesh));
        assert_eq!(mesh.positions, once);

        engine.set_target(None);
        engine.advance(Some(&mut mesh));
        assert_eq!(mesh.positions, engine.baseline().unwrap().positions());
    }

    #[test]
    fn pass_recomputes_normals_and_flags_change() {
        let mut mesh = build_face(&FaceParams::default());
        let mut engine = DeformationEngine::with_smoothing(1.0);
        engine.advance(Some(&mut mesh));
        mesh.take_changed();
        let rest_normals = mesh.normals.clone();
        engine.set_target(Some(jaw(0.7)));
        engine.advance(Some(&mut mesh));
        assert!(mesh.take_changed());
        assert_ne!(mesh.normals, rest_normals);
    }

    #[test]
    fn topology_mismatch_skips_pass() {
        let mut mesh = build_face(&FaceParams::default());
        let mut engine = DeformationEngine::new();
        engine.advance(Some(&mut mesh));
        let mut other = build_face(&FaceParams { width_segments: 8, height_segments: 8, ..Default::default() });
        assert_eq!(engine.advance(Some(&mut other)), AdvanceOutcome::Skipped);
        engine.detach_baseline();
        assert_eq!(engine.advance(Some(&mut other)), AdvanceOutcome::BaselineCaptured);
    }

    #[test]
    fn jaw_only_moves_lower_face() {
        let w = jaw(0.5);
        let chin = Vec3::new(0.0, -0.8, 0.5);
        assert_eq!(deform_vertex(chin, &w), Vec3::new(0.0, -0.8 - 0.5 * 0.3, 0.5));
        let brow = Vec3::new(0.0, 0.5, 0.8);
        assert_eq!(deform_vertex(brow, &w), brow);
    }

    #[test]
    fn rules_chain_in_order() {
        // in lower face, mouth band and corners at once
        let rest = Vec3::new(0.2, -0.3, 0.8);
        let w = BlendWeightSet::new(0.5, 1.0, 0.5, 0.5, 0.4);
        let p = deform_vertex(rest, &w);

        let mut x = 0.2_f32;
        let mut y = -0.3_f32;
        let mut z = 0.8_f32;
        y -= 0.5 * 0.3;
        z -= 1.0 * 0.2;
        x *= 1.0 - 0.5 * 0.3;
        z += 0.5 * 0.15;
        x += 1.0 * 0.5 * 0.1;
        y += 0.5 * 0.15;
        z += 0.4 * 0.1;
        y -= 0.4 * 0.1;
        assert_eq!(p, Vec3::new(x, y, z));
    }

    #[test]
    fn regions_use_rest_pose() {
        // jaw pushes y below -0.5, but the mouth band still applies
        let rest = Vec3::new(0.0, -0.45, 0.8);
        let w = BlendWeightSet::new(0.7, 1.0, 0.0, 0.0, 0.0);
        let p = deform_vertex(rest, &w);
        assert!((p.z - (0.8 - 0.2)).abs() < 1e-6);
    }

    #[test]
    fn smile_leaves_centre_line_x_alone() {
        let rest = Vec3::new(0.0, -0.25, 0.9);
        let w = BlendWeightSet { mouth_smile: 0.7, ..BlendWeightSet::NEUTRAL };
        let p = deform_vertex(rest, &w);
        assert_eq!(p.x, 0.0);
        let left = deform_vertex(Vec3::new(-0.2, -0.25, 0.9), &w);
        assert!(left.x < -0.2);
    }
}
