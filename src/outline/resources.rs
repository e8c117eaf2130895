//! Lifetime of the effect's GPU-side objects: mask camera, materials and mask target.

use bevy::log::{debug, info};
use bevy::math::UVec2;
use bevy::transform::components::Transform;

use super::config::ShaderNames;
use super::error::{HostError, OutlineError};
use super::handles::{CameraId, MaterialId, TextureId};
use super::host::{CameraRig, GraphicsDevice, ObjectFlags, OutlineHost, RenderTargetDesc};

pub const MASK_CAMERA_NAME: &str = "OutlineEffect_MaskCamera";
pub const MASK_TARGET_NAME: &str = "OutlineEffect_Mask";

const MASK_DEPTH_BITS: u8 = 24;

/// The mask render target currently held, with the size it was created at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskTarget {
    pub texture: TextureId,
    pub size: UVec2,
}

/// Handles owned by the effect while enabled. Every field is `None` after teardown.
#[derive(Debug, Default)]
pub struct OutlineResources {
    pub mask_camera: Option<CameraId>,
    pub stencil_material: Option<MaterialId>,
    pub composite_material: Option<MaterialId>,
    pub mask_target: Option<MaskTarget>,
}

impl OutlineResources {
    /// Create whatever is missing. Existing resources are kept as they are.
    ///
    /// The mask camera is created even when a shader cannot be resolved, so a
    /// missing shader only disables compositing.
    pub fn ensure_resources<H: OutlineHost>(
        &mut self,
        host: &mut H,
        main_camera: CameraId,
        shaders: &ShaderNames,
    ) -> Result<(), OutlineError> {
        if let Some(camera) = self.mask_camera {
            if !host.camera_exists(camera) {
                self.mask_camera = None;
            }
        }

        if self.mask_camera.is_none() {
            let camera = host.create_camera(MASK_CAMERA_NAME, ObjectFlags::HIDE_AND_DONT_SAVE);
            if let Err(e) = attach_mask_camera(host, camera, main_camera) {
                host.destroy_camera(camera);
                return Err(e.into());
            }
            debug!("Created outline mask camera {:?}", camera);
            self.mask_camera = Some(camera);
        }

        let stencil = ensure_material(host, &mut self.stencil_material, shaders.stencil());
        let composite = ensure_material(host, &mut self.composite_material, shaders.composite());
        stencil.and(composite)
    }

    /// Make sure a mask target of exactly `size` exists.
    ///
    /// A target of a different size is released before the new one is created.
    /// Returns `None` for a zero-sized request; the caller should pass the image
    /// through untouched.
    pub fn ensure_render_target<D: GraphicsDevice>(
        &mut self,
        device: &mut D,
        size: UVec2,
    ) -> Result<Option<TextureId>, OutlineError> {
        if let Some(target) = self.mask_target {
            if target.size == size && device.texture_size(target.texture) == Some(size) {
                return Ok(Some(target.texture));
            }
            self.release_render_target(device);
        }

        if size.x == 0 || size.y == 0 {
            return Ok(None);
        }

        let texture = device.create_render_target(&RenderTargetDesc {
            name: MASK_TARGET_NAME.to_string(),
            size,
            depth_bits: MASK_DEPTH_BITS,
            flags: ObjectFlags::HIDE_AND_DONT_SAVE,
        })?;
        debug!("Created outline mask target {}x{}", size.x, size.y);
        self.mask_target = Some(MaskTarget { texture, size });
        Ok(Some(texture))
    }

    pub fn release_render_target<D: GraphicsDevice>(&mut self, device: &mut D) {
        if let Some(target) = self.mask_target.take() {
            device.release_render_target(target.texture);
        }
    }

    /// Release everything. Safe to call any number of times.
    pub fn teardown<H: GraphicsDevice + CameraRig>(&mut self, host: &mut H) {
        self.release_render_target(host);
        if let Some(camera) = self.mask_camera.take() {
            host.destroy_camera(camera);
        }
        if let Some(material) = self.stencil_material.take() {
            host.destroy_material(material);
        }
        if let Some(material) = self.composite_material.take() {
            host.destroy_material(material);
        }
        info!("Outline resources released");
    }

    pub fn is_empty(&self) -> bool {
        self.mask_camera.is_none()
            && self.stencil_material.is_none()
            && self.composite_material.is_none()
            && self.mask_target.is_none()
    }
}

/// Park a fresh mask camera under the main camera, disabled.
fn attach_mask_camera<R: CameraRig>(
    rig: &mut R,
    camera: CameraId,
    main_camera: CameraId,
) -> Result<(), HostError> {
    let main_transform = rig
        .camera_transform(main_camera)
        .unwrap_or(Transform::IDENTITY);
    rig.set_camera_parent(camera, Some(main_camera))?;
    rig.set_camera_transform(camera, main_transform)?;
    rig.set_camera_enabled(camera, false)
}

fn ensure_material<D: GraphicsDevice>(
    device: &mut D,
    slot: &mut Option<MaterialId>,
    shader_name: &str,
) -> Result<(), OutlineError> {
    if slot.is_some() {
        return Ok(());
    }
    let shader = device
        .find_shader(shader_name)
        .ok_or_else(|| OutlineError::ShaderNotFound(shader_name.to_string()))?;
    *slot = Some(device.create_material(shader, ObjectFlags::HIDE_AND_DONT_SAVE)?);
    Ok(())
}
