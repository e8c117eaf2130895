//! Material drawn by the mask camera.
//!
//! Outlined renderers draw opaque white, everything else draws transparent
//! black with depth, so other geometry still hides the outlined parts.

use bevy::{
    asset::load_internal_asset,
    prelude::*,
    render::render_resource::{AsBindGroup, ShaderRef},
};

/// Handle to the mask shader.
const MASK_SHADER_HANDLE: Handle<Shader> =
    Handle::weak_from_u128(0x2f86_c4b1_0d5a_4e73_9b28_e61f_5a0c_73d4);

/// Render layer only the mask camera sees.
pub const MASK_LAYER: usize = 1;

/// Loads the mask shader and registers the material.
pub struct OutlineMaskMaterialPlugin;

impl Plugin for OutlineMaskMaterialPlugin {
    fn build(&self, app: &mut App) {
        load_internal_asset!(
            app,
            MASK_SHADER_HANDLE,
            "../../assets/shaders/outline_mask.wgsl",
            Shader::from_wgsl
        );

        app.add_plugins(MaterialPlugin::<OutlineMaskMaterial>::default());
    }
}

/// Unlit flat colour written straight into the mask.
#[derive(Asset, TypePath, AsBindGroup, Clone, Debug, PartialEq)]
pub struct OutlineMaskMaterial {
    /// Alpha 1 marks a pixel as outlined.
    #[uniform(0)]
    pub tag: LinearRgba,
}

impl OutlineMaskMaterial {
    /// Marks covered pixels as outlined.
    pub fn marked() -> Self {
        Self {
            tag: LinearRgba::WHITE,
        }
    }

    /// Writes depth and nothing else visible.
    pub fn occluder() -> Self {
        Self {
            tag: LinearRgba::NONE,
        }
    }

    pub fn is_marked(&self) -> bool {
        self.tag.alpha > 0.5
    }
}

impl Material for OutlineMaskMaterial {
    fn fragment_shader() -> ShaderRef {
        MASK_SHADER_HANDLE.into()
    }
}

/// Stand-in drawn on the mask layer for a scene renderer.
#[derive(Component, Debug, Clone, Copy)]
pub struct OutlineMaskProxy {
    pub source: Entity,
}
