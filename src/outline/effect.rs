//! The outline effect: lifecycle plus the per-frame image callback.
//!
//! A frame runs the mask pass, an optional debug dump, anchor collection and
//! the composite. Any missing prerequisite turns the frame into a plain copy of
//! the source so the scene still renders, just without outlines.

use bevy::log::{debug, warn};
use bevy::math::Vec3;

use super::anchors::collect_anchors;
use super::compositor::{composite, CompositeParams};
use super::config::OutlineSettings;
use super::debug_dump::MaskDumper;
use super::handles::{CameraId, RendererId, TextureId};
use super::host::OutlineHost;
use super::mask::{render_mask, MaskPass};
use super::resources::OutlineResources;

/// Lifecycle state. Disabled holds no resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectState {
    #[default]
    Disabled,
    Enabled,
}

/// Why a frame was copied through without the effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    Disabled,
    /// The target material set is empty.
    NoTargets,
    /// Mask camera, a material, or the source image is unavailable.
    MissingResources,
    /// The source image has a zero dimension.
    InvalidSize,
    MaskRenderFailed,
    CompositeFailed,
}

/// What a call to `render_image` wrote into the destination.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Passthrough(PassthroughReason),
    Composited {
        affected: Vec<RendererId>,
        anchors: Vec<Vec3>,
    },
}

/// Outline post-process attached to one main camera.
#[derive(Debug)]
pub struct OutlineEffect {
    main_camera: CameraId,
    settings: OutlineSettings,
    state: EffectState,
    resources: OutlineResources,
    dumper: MaskDumper,
    affected: Vec<RendererId>,
    anchors: Vec<Vec3>,
}

impl OutlineEffect {
    /// A disabled effect. Call `enable` before rendering.
    pub fn new(main_camera: CameraId, settings: OutlineSettings) -> Self {
        Self {
            main_camera,
            settings,
            state: EffectState::Disabled,
            resources: OutlineResources::default(),
            dumper: MaskDumper::new(),
            affected: Vec::new(),
            anchors: Vec::new(),
        }
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state == EffectState::Enabled
    }

    pub fn main_camera(&self) -> CameraId {
        self.main_camera
    }

    pub fn settings(&self) -> &OutlineSettings {
        &self.settings
    }

    pub fn resources(&self) -> &OutlineResources {
        &self.resources
    }

    /// Renderers outlined in the last composited frame.
    pub fn affected(&self) -> &[RendererId] {
        &self.affected
    }

    /// Anchors passed to the last composite.
    pub fn anchors(&self) -> &[Vec3] {
        &self.anchors
    }

    pub fn enable<H: OutlineHost>(&mut self, host: &mut H) {
        if self.is_enabled() {
            return;
        }
        self.state = EffectState::Enabled;
        self.init_resources(host);
    }

    /// Release everything. Calling it while already disabled is harmless.
    pub fn disable<H: OutlineHost>(&mut self, host: &mut H) {
        self.resources.teardown(host);
        self.affected.clear();
        self.anchors.clear();
        self.state = EffectState::Disabled;
    }

    /// Re-run resource creation after a settings change. Valid resources are kept.
    pub fn validate<H: OutlineHost>(&mut self, host: &mut H) {
        if self.is_enabled() {
            self.init_resources(host);
        }
    }

    /// Swap in new settings between frames.
    ///
    /// Materials built from a shader that is no longer configured are dropped
    /// so `validate` rebuilds them.
    pub fn set_settings<H: OutlineHost>(&mut self, host: &mut H, settings: OutlineSettings) {
        if settings.shaders.stencil() != self.settings.shaders.stencil() {
            if let Some(material) = self.resources.stencil_material.take() {
                host.destroy_material(material);
            }
        }
        if settings.shaders.composite() != self.settings.shaders.composite() {
            if let Some(material) = self.resources.composite_material.take() {
                host.destroy_material(material);
            }
        }
        self.settings = settings;
        self.validate(host);
    }

    /// Dump the mask on the next frame that has one (only while debugging).
    pub fn request_mask_dump(&mut self) {
        self.dumper.request();
    }

    pub fn mask_dump_pending(&self) -> bool {
        self.dumper.is_requested()
    }

    /// Keep the mask camera on top of the main camera. Call before culling.
    pub fn pre_cull<H: OutlineHost>(&mut self, host: &mut H) {
        let Some(mask_camera) = self.resources.mask_camera else {
            return;
        };
        let Some(transform) = host.camera_transform(self.main_camera) else {
            return;
        };
        if let Err(e) = host.set_camera_transform(mask_camera, transform) {
            debug!("Failed to sync mask camera: {}", e);
        }
    }

    /// Per-frame image callback. Always writes `destination`.
    pub fn render_image<H: OutlineHost>(
        &mut self,
        host: &mut H,
        source: TextureId,
        destination: TextureId,
    ) -> FrameOutcome {
        if !self.is_enabled() {
            return pass_through(host, source, destination, PassthroughReason::Disabled);
        }

        if let Err(e) =
            self.resources
                .ensure_resources(host, self.main_camera, &self.settings.shaders)
        {
            debug!("Outline resources unavailable: {}", e);
        }

        if self.settings.targets.is_empty() {
            return pass_through(host, source, destination, PassthroughReason::NoTargets);
        }

        let (Some(mask_camera), Some(stencil_material), Some(composite_material)) = (
            self.resources.mask_camera,
            self.resources.stencil_material,
            self.resources.composite_material,
        ) else {
            return pass_through(host, source, destination, PassthroughReason::MissingResources);
        };

        let Some(size) = host.texture_size(source) else {
            return pass_through(host, source, destination, PassthroughReason::MissingResources);
        };

        let mask_target = match self.resources.ensure_render_target(host, size) {
            Ok(Some(texture)) => texture,
            Ok(None) => {
                return pass_through(host, source, destination, PassthroughReason::InvalidSize)
            }
            Err(e) => {
                warn!("Failed to create outline mask target: {}", e);
                return pass_through(
                    host,
                    source,
                    destination,
                    PassthroughReason::MissingResources,
                );
            }
        };

        self.affected.clear();
        self.anchors.clear();
        let renderers = host.renderers();

        let pass = MaskPass {
            main_camera: self.main_camera,
            mask_camera,
            targets: &self.settings.targets,
            stencil_material,
            mask_target,
        };
        let output = match render_mask(host, pass, &renderers) {
            Ok(output) => output,
            Err(e) => {
                warn!("Outline mask pass failed: {}", e);
                return pass_through(
                    host,
                    source,
                    destination,
                    PassthroughReason::MaskRenderFailed,
                );
            }
        };
        if let Err(e) = output.render {
            warn!("Outline mask camera render failed: {}", e);
            return pass_through(host, source, destination, PassthroughReason::MaskRenderFailed);
        }
        self.affected = output.affected;

        if self.settings.debugging {
            self.dumper
                .dump_if_requested(&*host, mask_target, &self.settings.dump_path);
        }

        let screen_size = host.screen_size();
        self.anchors = collect_anchors(
            &*host,
            self.main_camera,
            &self.settings.targets,
            &renderers,
            screen_size,
            self.settings.anchor_cap,
        );

        let params = CompositeParams {
            falloff_distance: self.settings.falloff_distance,
            falloff_power: self.settings.falloff_power,
            edge_color: self.settings.edge_color,
        };
        if let Err(e) = composite(
            host,
            composite_material,
            source,
            mask_target,
            destination,
            &params,
            &self.anchors,
        ) {
            warn!("Outline composite failed: {}", e);
            return pass_through(host, source, destination, PassthroughReason::CompositeFailed);
        }

        FrameOutcome::Composited {
            affected: self.affected.clone(),
            anchors: self.anchors.clone(),
        }
    }

    fn init_resources<H: OutlineHost>(&mut self, host: &mut H) {
        if let Err(e) =
            self.resources
                .ensure_resources(host, self.main_camera, &self.settings.shaders)
        {
            warn!("Outline effect is missing resources: {}", e);
        }
    }
}

fn pass_through<H: OutlineHost>(
    host: &mut H,
    source: TextureId,
    destination: TextureId,
    reason: PassthroughReason,
) -> FrameOutcome {
    debug!("Outline passthrough: {:?}", reason);
    if let Err(e) = host.blit(source, destination, None) {
        warn!("Passthrough blit failed: {}", e);
    }
    FrameOutcome::Passthrough(reason)
}
