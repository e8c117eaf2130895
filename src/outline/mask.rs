//! Mask pass: draw every outlined renderer into the mask target with the
//! stencil-write material swapped in, then put the original materials back.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use bevy::color::LinearRgba;
use bevy::log::{debug, warn};

use super::error::HostError;
use super::handles::{CameraId, MaterialId, RendererId, TargetMaterialSet, TextureId};
use super::host::{CameraRig, ClearMode, OutlineHost, SceneRenderers};

/// Renderers with at least one slot using a target material, in enumeration order.
///
/// Renderers that no longer exist or have no material slots are skipped.
pub fn classify_renderers<S: SceneRenderers + ?Sized>(
    scene: &S,
    targets: &TargetMaterialSet,
    renderers: &[RendererId],
) -> Vec<RendererId> {
    renderers
        .iter()
        .copied()
        .filter(|&renderer| {
            scene
                .materials(renderer)
                .is_some_and(|slots| !slots.is_empty() && targets.matches_any(slots))
        })
        .collect()
}

/// Material substitution that is undone when dropped.
///
/// Holds the backup of every swapped renderer's original slots. The scene is
/// reachable through `Deref`, so the substituted state can be rendered while
/// the guard is alive.
pub struct MaterialSwap<'a, S: SceneRenderers> {
    scene: &'a mut S,
    backup: HashMap<RendererId, Vec<MaterialId>>,
    order: Vec<RendererId>,
}

impl<'a, S: SceneRenderers> MaterialSwap<'a, S> {
    /// Overwrite every slot of each renderer with `substitute`.
    pub fn apply(scene: &'a mut S, renderers: &[RendererId], substitute: MaterialId) -> Self {
        let mut swap = Self {
            scene,
            backup: HashMap::with_capacity(renderers.len()),
            order: Vec::with_capacity(renderers.len()),
        };

        for &renderer in renderers {
            if swap.backup.contains_key(&renderer) {
                continue;
            }
            let Some(original) = swap.scene.materials(renderer).map(<[MaterialId]>::to_vec) else {
                continue;
            };
            let replacement = vec![substitute; original.len()];
            if swap.scene.set_materials(renderer, replacement).is_err() {
                continue;
            }
            if let Some(name) = swap.scene.renderer_name(renderer) {
                debug!("Swapped material on: {}", name);
            }
            swap.backup.insert(renderer, original);
            swap.order.push(renderer);
        }

        swap
    }

    /// Renderers currently holding the substitute material.
    pub fn swapped(&self) -> &[RendererId] {
        &self.order
    }

    /// Put the original materials back now. Dropping the guard does the same.
    pub fn restore(self) {
        drop(self);
    }
}

impl<S: SceneRenderers> Deref for MaterialSwap<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.scene
    }
}

impl<S: SceneRenderers> DerefMut for MaterialSwap<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.scene
    }
}

impl<S: SceneRenderers> Drop for MaterialSwap<'_, S> {
    fn drop(&mut self) {
        for renderer in self.order.drain(..) {
            let Some(original) = self.backup.remove(&renderer) else {
                continue;
            };
            match self.scene.set_materials(renderer, original) {
                Ok(()) => {}
                // Destroyed while swapped: nothing to restore.
                Err(HostError::RendererDestroyed(_)) => {
                    debug!("Renderer {:?} destroyed before restore", renderer);
                }
                Err(e) => warn!("Failed to restore materials on {:?}: {}", renderer, e),
            }
        }
        self.backup.clear();
    }
}

/// Inputs for one mask pass.
#[derive(Debug, Clone, Copy)]
pub struct MaskPass<'a> {
    pub main_camera: CameraId,
    pub mask_camera: CameraId,
    pub targets: &'a TargetMaterialSet,
    pub stencil_material: MaterialId,
    pub mask_target: TextureId,
}

/// Result of a mask pass.
#[derive(Debug)]
pub struct MaskOutput {
    /// Renderers that were drawn into the mask.
    pub affected: Vec<RendererId>,
    /// Outcome of the camera render. Materials are restored either way.
    pub render: Result<(), HostError>,
}

/// Render the mask of every renderer using a target material.
///
/// No material stays swapped after this returns, whatever the render result.
pub fn render_mask<H: OutlineHost>(
    host: &mut H,
    pass: MaskPass<'_>,
    renderers: &[RendererId],
) -> Result<MaskOutput, HostError> {
    host.copy_camera(pass.main_camera, pass.mask_camera)?;
    // Transparent black, so the alpha tag written by the stencil shader stands out.
    host.set_clear_mode(
        pass.mask_camera,
        ClearMode::SolidColor(LinearRgba::new(0.0, 0.0, 0.0, 0.0)),
    )?;
    host.set_camera_target(pass.mask_camera, Some(pass.mask_target))?;

    let matched = classify_renderers(&*host, pass.targets, renderers);

    let mut swap = MaterialSwap::apply(host, &matched, pass.stencil_material);
    let affected = swap.swapped().to_vec();
    let render = swap.render_camera(pass.mask_camera);
    swap.restore();

    Ok(MaskOutput { affected, render })
}
