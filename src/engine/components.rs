// ECS components and spawning helpers for the face rig.
// FaceMesh and DeformationEngine are components themselves (see mesh.rs and
// deform.rs); the playback controller lives in the world as a resource.

use bevy_ecs::prelude::*;

use super::deform::DeformationEngine;
use super::face::{FaceParams, build_face};

/// Marks the entity the viewer draws.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Face;

/// Spawn a face entity with a freshly built rest-pose mesh.
pub fn spawn_face(world: &mut World, params: &FaceParams, smoothing: f32) -> Entity {
    let mesh = build_face(params);
    log::info!(
        "Built face mesh: {} vertices, {} triangles",
        mesh.vertex_count(),
        mesh.index_count() / 3
    );
    world
        .spawn((Face, mesh, DeformationEngine::with_smoothing(smoothing)))
        .id()
}
