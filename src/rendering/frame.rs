//! Per-frame systems: camera motion and the outline pass.

use std::mem::discriminant;

use bevy::prelude::*;

use crate::outline::FrameOutcome;
use crate::world::{orbit_transform, ORBIT_SPEED};

use super::host::GpuHost;
use super::plugin::{OutlineMainCamera, OutlineView};

/// Move the main camera along its orbit.
pub fn orbit_main_camera(
    time: Res<Time>,
    mut camera_query: Query<&mut Transform, With<OutlineMainCamera>>,
) {
    let Ok(mut transform) = camera_query.get_single_mut() else {
        return;
    };
    *transform = orbit_transform(time.elapsed_secs() * ORBIT_SPEED);
}

/// Run the outline effect on the main camera's view.
///
/// Runs once transforms and cameras are up to date for this frame, and before
/// frusta and visibility are computed, so the mask camera is culled with what
/// the effect set.
pub fn run_outline_frame(mut host: GpuHost, view: Option<ResMut<OutlineView>>) {
    let Some(mut view) = view else {
        return;
    };
    let view = &mut *view;

    host.begin_frame();
    view.effect.pre_cull(&mut host);
    let outcome = view
        .effect
        .render_image(&mut host, view.source, view.destination);

    let changed = view
        .last_outcome
        .as_ref()
        .map_or(true, |last| discriminant(last) != discriminant(&outcome));
    if changed {
        match &outcome {
            FrameOutcome::Composited { affected, anchors } => info!(
                "Outline active: {} renderers, {} anchors",
                affected.len(),
                anchors.len()
            ),
            FrameOutcome::Passthrough(reason) => info!("Outline passthrough: {:?}", reason),
        }
    }
    view.last_outcome = Some(outcome);

    host.sync_readbacks(view.effect.settings().debugging && view.effect.is_enabled());
}
