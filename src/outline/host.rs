//! Host interface the outline effect runs against.
//!
//! The effect never touches a scene graph or a GPU API directly. A host
//! exposes its renderers, graphics device and cameras through these traits,
//! which keeps the orchestration independent of any particular engine.

use bevy::color::LinearRgba;
use bevy::math::{UVec2, Vec3, Vec4};
use bevy::transform::components::Transform;

use super::error::HostError;
use super::handles::{CameraId, MaterialId, RendererId, ShaderId, TextureId};

/// Lifecycle flags for objects the effect creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectFlags {
    /// Not listed in editors or scene hierarchies.
    pub hide_in_hierarchy: bool,
    /// Never written into saved scene state.
    pub dont_save: bool,
}

impl ObjectFlags {
    pub const NONE: Self = Self {
        hide_in_hierarchy: false,
        dont_save: false,
    };

    pub const HIDE_AND_DONT_SAVE: Self = Self {
        hide_in_hierarchy: true,
        dont_save: true,
    };
}

/// How a camera clears its target before drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearMode {
    SolidColor(LinearRgba),
    DepthOnly,
    Nothing,
}

/// A value bound to a named shader uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Color(LinearRgba),
    Vector(Vec4),
    Texture(TextureId),
}

/// Parameters for an off-screen render target.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetDesc {
    pub name: String,
    pub size: UVec2,
    /// Depth buffer precision in bits (0 = no depth).
    pub depth_bits: u8,
    pub flags: ObjectFlags,
}

/// Texture contents copied to CPU memory, tightly packed RGBA8 rows, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelReadback {
    pub size: UVec2,
    pub rgba: Vec<u8>,
}

/// Scene-side access: which renderers exist and what they draw with.
pub trait SceneRenderers {
    /// All live renderers, in the host's enumeration order.
    fn renderers(&self) -> Vec<RendererId>;

    /// Material slots of a renderer, or `None` if it no longer exists.
    fn materials(&self, renderer: RendererId) -> Option<&[MaterialId]>;

    /// Replace every material slot of a renderer.
    fn set_materials(
        &mut self,
        renderer: RendererId,
        materials: Vec<MaterialId>,
    ) -> Result<(), HostError>;

    /// World-space centre of the renderer's bounding volume.
    fn bounds_center(&self, renderer: RendererId) -> Option<Vec3>;

    /// Display name, used for logging only.
    fn renderer_name(&self, renderer: RendererId) -> Option<&str>;
}

/// Graphics-side access: shaders, materials, textures, blits.
pub trait GraphicsDevice {
    fn find_shader(&self, name: &str) -> Option<ShaderId>;

    fn create_material(
        &mut self,
        shader: ShaderId,
        flags: ObjectFlags,
    ) -> Result<MaterialId, HostError>;

    /// Destroying an unknown material is a no-op.
    fn destroy_material(&mut self, material: MaterialId);

    fn set_uniform(
        &mut self,
        material: MaterialId,
        name: &str,
        value: UniformValue,
    ) -> Result<(), HostError>;

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<TextureId, HostError>;

    /// Releasing an unknown texture is a no-op.
    fn release_render_target(&mut self, texture: TextureId);

    fn texture_size(&self, texture: TextureId) -> Option<UVec2>;

    /// Full-screen copy of `source` into `destination`, optionally through a
    /// material's program. Without a material the copy is exact.
    fn blit(
        &mut self,
        source: TextureId,
        destination: TextureId,
        material: Option<MaterialId>,
    ) -> Result<(), HostError>;

    fn read_pixels(&self, texture: TextureId) -> Result<PixelReadback, HostError>;
}

/// Camera objects and the synchronous render entry point.
pub trait CameraRig {
    fn create_camera(&mut self, name: &str, flags: ObjectFlags) -> CameraId;

    /// Destroying an unknown camera is a no-op.
    fn destroy_camera(&mut self, camera: CameraId);

    fn camera_exists(&self, camera: CameraId) -> bool;

    /// Parent `camera` under `parent` with an identity local transform.
    fn set_camera_parent(
        &mut self,
        camera: CameraId,
        parent: Option<CameraId>,
    ) -> Result<(), HostError>;

    /// Disabled cameras are only drawn through `render_camera`.
    fn set_camera_enabled(&mut self, camera: CameraId, enabled: bool) -> Result<(), HostError>;

    /// World transform.
    fn camera_transform(&self, camera: CameraId) -> Option<Transform>;

    /// Set the world transform.
    fn set_camera_transform(
        &mut self,
        camera: CameraId,
        transform: Transform,
    ) -> Result<(), HostError>;

    /// Copy view, projection, clear and target settings from `from` onto `to`.
    fn copy_camera(&mut self, from: CameraId, to: CameraId) -> Result<(), HostError>;

    fn set_clear_mode(&mut self, camera: CameraId, clear: ClearMode) -> Result<(), HostError>;

    fn set_camera_target(
        &mut self,
        camera: CameraId,
        target: Option<TextureId>,
    ) -> Result<(), HostError>;

    /// Project a world point to screen pixels (origin bottom-left, z = view depth).
    fn world_to_screen(&self, camera: CameraId, point: Vec3) -> Option<Vec3>;

    /// Size of the output surface in pixels.
    fn screen_size(&self) -> UVec2;

    /// Draw the camera into its target now, blocking until done.
    fn render_camera(&mut self, camera: CameraId) -> Result<(), HostError>;
}

/// Everything the outline effect needs from its host.
pub trait OutlineHost: SceneRenderers + GraphicsDevice + CameraRig {}

impl<T: SceneRenderers + GraphicsDevice + CameraRig> OutlineHost for T {}
