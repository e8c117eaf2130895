//! Screen-space anchors: where the outlined objects are on screen.

use bevy::math::{UVec2, Vec3};

use super::handles::{CameraId, RendererId, TargetMaterialSet};
use super::host::{CameraRig, SceneRenderers};
use super::mask::classify_renderers;

/// Anchor slots in the composite shader.
pub const MAX_ANCHORS: usize = 8;

/// Normalised screen positions of every renderer using a target material.
///
/// Each bounds centre is projected through `camera` and x/y are divided by
/// `screen_size`. The projection is in pixels of the camera's own target, so
/// the anchors only line up with the mask when that target is the screen.
/// Off-screen points land outside `0..1`; nothing is clamped.
/// At most `min(cap, MAX_ANCHORS)` entries, in enumeration order.
pub fn collect_anchors<H: SceneRenderers + CameraRig>(
    host: &H,
    camera: CameraId,
    targets: &TargetMaterialSet,
    renderers: &[RendererId],
    screen_size: UVec2,
    cap: usize,
) -> Vec<Vec3> {
    let cap = cap.min(MAX_ANCHORS);
    if cap == 0 || screen_size.x == 0 || screen_size.y == 0 {
        return Vec::new();
    }
    let screen = screen_size.as_vec2();

    classify_renderers(host, targets, renderers)
        .into_iter()
        .filter_map(|renderer| host.bounds_center(renderer))
        .filter_map(|center| host.world_to_screen(camera, center))
        .map(|point| Vec3::new(point.x / screen.x, point.y / screen.y, point.z))
        .take(cap)
        .collect()
}
