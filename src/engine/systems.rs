// ECS systems driving playback and deformation.
//
// Two independent clocks:
//   playback_system:    moves the controller's virtual clock by dt; frame
//                       increments happen on the track's fps cadence
//   deformation_system: one smoothing + deformation pass per call, i.e. per
//                       rendered frame
// They share no timing state; pose_target_system only copies the active frame's
// weights into each engine.

use std::time::Duration;

use bevy_ecs::prelude::*;

use super::deform::{AdvanceOutcome, DeformationEngine};
use super::mesh::FaceMesh;
use super::playback::PlaybackController;

/// Advance the playback controller's clock.
pub fn playback_system(world: &mut World, dt: Duration) {
    if let Some(mut controller) = world.get_resource_mut::<PlaybackController>() {
        controller.update(dt);
    }
}

/// Hand the active frame's weights to every engine. No track → neutral.
pub fn pose_target_system(world: &mut World) {
    let target = world
        .get_resource::<PlaybackController>()
        .and_then(PlaybackController::target_weights);

    let mut query = world.query::<&mut DeformationEngine>();
    for mut engine in query.iter_mut(world) {
        engine.set_target(target);
    }
}

/// Run one render tick on every engine. Engines without a mesh do nothing.
/// Returns how many meshes were deformed.
pub fn deformation_system(world: &mut World) -> usize {
    let mut query = world.query::<(&mut DeformationEngine, Option<&mut FaceMesh>)>();
    let mut deformed = 0;
    for (mut engine, mesh) in query.iter_mut(world) {
        if engine.advance(mesh.map(Mut::into_inner)) == AdvanceOutcome::Deformed {
            deformed += 1;
        }
    }
    deformed
}

/// One full frame: playback clock, target hand-off, deformation.
pub fn frame_update(world: &mut World, dt: Duration) -> usize {
    playback_system(world, dt);
    pose_target_system(world);
    deformation_system(world)
}
