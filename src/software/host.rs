//! The software host: scene, device and cameras in one resource.

use std::collections::HashMap;

use bevy::color::LinearRgba;
use bevy::math::{UVec2, Vec2, Vec3};
use bevy::transform::components::Transform;

use crate::outline::error::HostError;
use crate::outline::handles::{CameraId, MaterialId, RendererId, ShaderId, TextureId};
use crate::outline::host::{
    CameraRig, ClearMode, GraphicsDevice, ObjectFlags, PixelReadback, RenderTargetDesc,
    SceneRenderers, UniformValue,
};

use super::camera::{project_to_pixels, view_projection, SoftwareCamera};
use super::programs::{
    run_composite, CompositeInputs, ShaderProgram, SoftwareMaterial, BASE_COLOR,
};
use super::raster::{draw_renderer, Fragment};
use super::scene::{SceneRenderer, SoftwareScene};
use super::texture::SoftwareTexture;

/// Called with the scene right before a camera draws it.
pub type RenderHook = Box<dyn FnMut(&mut SoftwareScene, CameraId) + Send + Sync>;

const MAX_PARENT_DEPTH: usize = 16;

/// Counters for render target churn and camera renders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostStats {
    pub targets_created: usize,
    pub targets_released: usize,
    /// Most render targets alive at the same time.
    pub peak_live_targets: usize,
    pub camera_renders: usize,
}

/// CPU implementation of every outline host trait.
pub struct SoftwareHost {
    scene: SoftwareScene,
    shaders: HashMap<ShaderId, ShaderProgram>,
    shader_names: HashMap<String, ShaderId>,
    materials: HashMap<MaterialId, SoftwareMaterial>,
    textures: HashMap<TextureId, SoftwareTexture>,
    cameras: HashMap<CameraId, SoftwareCamera>,
    render_hooks: Vec<RenderHook>,
    screen_size: UVec2,
    next_id: u64,
    stats: HostStats,
}

impl SoftwareHost {
    /// A host with the built-in shaders registered.
    pub fn new(screen_size: UVec2) -> Self {
        let mut host = Self {
            scene: SoftwareScene::default(),
            shaders: HashMap::new(),
            shader_names: HashMap::new(),
            materials: HashMap::new(),
            textures: HashMap::new(),
            cameras: HashMap::new(),
            render_hooks: Vec::new(),
            screen_size,
            next_id: 0,
            stats: HostStats::default(),
        };
        for (name, program) in ShaderProgram::builtins() {
            host.register_shader(name, program);
        }
        host
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Register a program under a lookup name, replacing any previous entry.
    pub fn register_shader(&mut self, name: &str, program: ShaderProgram) -> ShaderId {
        let id = ShaderId(self.next_id());
        self.shaders.insert(id, program);
        self.shader_names.insert(name.to_string(), id);
        id
    }

    /// Forget a shader name. Existing materials keep working.
    pub fn unregister_shader(&mut self, name: &str) {
        self.shader_names.remove(name);
    }

    /// New unlit material with the given colour.
    pub fn add_standard_material(&mut self, color: LinearRgba) -> MaterialId {
        let id = MaterialId(self.next_id());
        let mut material = SoftwareMaterial::new(ShaderProgram::Standard, ObjectFlags::NONE);
        material
            .uniforms
            .insert(BASE_COLOR.to_string(), UniformValue::Color(color));
        self.materials.insert(id, material);
        id
    }

    pub fn material(&self, id: MaterialId) -> Option<&SoftwareMaterial> {
        self.materials.get(&id)
    }

    /// Plain colour target for camera output.
    pub fn create_texture(&mut self, name: &str, size: UVec2) -> Result<TextureId, HostError> {
        self.create_render_target(&RenderTargetDesc {
            name: name.to_string(),
            size,
            depth_bits: 24,
            flags: ObjectFlags::NONE,
        })
    }

    pub fn texture(&self, id: TextureId) -> Option<&SoftwareTexture> {
        self.textures.get(&id)
    }

    pub fn texture_mut(&mut self, id: TextureId) -> Option<&mut SoftwareTexture> {
        self.textures.get_mut(&id)
    }

    /// Resize a colour target in place, keeping its handle.
    pub fn resize_texture(&mut self, id: TextureId, size: UVec2) -> Result<(), HostError> {
        if size.x == 0 || size.y == 0 {
            return Err(HostError::InvalidSize {
                width: size.x,
                height: size.y,
            });
        }
        let texture = self
            .textures
            .get_mut(&id)
            .ok_or(HostError::UnknownTexture(id))?;
        if texture.size != size {
            *texture = SoftwareTexture::new(texture.name.clone(), size, texture.flags);
        }
        Ok(())
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn spawn_camera(&mut self, camera: SoftwareCamera) -> CameraId {
        let id = CameraId(self.next_id());
        self.cameras.insert(id, camera);
        id
    }

    pub fn camera(&self, id: CameraId) -> Option<&SoftwareCamera> {
        self.cameras.get(&id)
    }

    /// Live cameras carrying `name`.
    pub fn cameras_named(&self, name: &str) -> usize {
        self.cameras.values().filter(|camera| camera.name == name).count()
    }

    pub fn spawn_renderer(&mut self, renderer: SceneRenderer) -> RendererId {
        self.scene.spawn(renderer)
    }

    pub fn despawn_renderer(&mut self, id: RendererId) -> bool {
        self.scene.despawn(id)
    }

    /// Make `set_materials` fail for a renderer from now on.
    pub fn lock_materials(&mut self, id: RendererId) {
        if let Some(renderer) = self.scene.get_mut(id) {
            renderer.locked = true;
        }
    }

    /// Run `hook` before every camera render. Hooks may change the scene.
    pub fn on_camera_render(
        &mut self,
        hook: impl FnMut(&mut SoftwareScene, CameraId) + Send + Sync + 'static,
    ) {
        self.render_hooks.push(Box::new(hook));
    }

    pub fn set_screen_size(&mut self, size: UVec2) {
        self.screen_size = size;
    }

    pub fn stats(&self) -> HostStats {
        self.stats
    }

    fn world_transform(&self, id: CameraId) -> Option<Transform> {
        let mut camera = self.cameras.get(&id)?;
        let mut world = camera.local;
        for _ in 0..MAX_PARENT_DEPTH {
            let Some(parent) = camera.parent.and_then(|p| self.cameras.get(&p)) else {
                break;
            };
            world = parent.local.mul_transform(world);
            camera = parent;
        }
        Some(world)
    }

    fn surface_size(&self, camera: &SoftwareCamera) -> UVec2 {
        camera
            .target
            .and_then(|target| self.texture_size(target))
            .unwrap_or(self.screen_size)
    }

    fn copy_texture(&mut self, source: TextureId, destination: TextureId) -> Result<(), HostError> {
        if source == destination {
            return Ok(());
        }
        let src = self
            .textures
            .get(&source)
            .ok_or(HostError::UnknownTexture(source))?;
        let (src_size, src_color) = (src.size, src.color.clone());
        let dst = self
            .textures
            .get_mut(&destination)
            .ok_or(HostError::UnknownTexture(destination))?;

        if dst.size == src_size {
            dst.color = src_color;
            return Ok(());
        }

        let size = dst.size.as_vec2();
        for row in 0..dst.size.y {
            for col in 0..dst.size.x {
                let uv = Vec2::new(
                    (col as f32 + 0.5) / size.x,
                    1.0 - (row as f32 + 0.5) / size.y,
                );
                let sx = ((uv.x * src_size.x as f32) as u32).min(src_size.x - 1);
                let srow = (((1.0 - uv.y) * src_size.y as f32) as u32).min(src_size.y - 1);
                let index = dst.index(col, row);
                dst.color[index] = src_color[(srow * src_size.x + sx) as usize];
            }
        }
        Ok(())
    }
}

impl SceneRenderers for SoftwareHost {
    fn renderers(&self) -> Vec<RendererId> {
        self.scene.ids()
    }

    fn materials(&self, renderer: RendererId) -> Option<&[MaterialId]> {
        self.scene.get(renderer).map(|r| r.materials.as_slice())
    }

    fn set_materials(
        &mut self,
        renderer: RendererId,
        materials: Vec<MaterialId>,
    ) -> Result<(), HostError> {
        let entry = self
            .scene
            .get_mut(renderer)
            .ok_or(HostError::RendererDestroyed(renderer))?;
        if entry.locked {
            return Err(HostError::MaterialsLocked(renderer));
        }
        entry.materials = materials;
        Ok(())
    }

    fn bounds_center(&self, renderer: RendererId) -> Option<Vec3> {
        self.scene.get(renderer).map(|r| r.center)
    }

    fn renderer_name(&self, renderer: RendererId) -> Option<&str> {
        self.scene.get(renderer).map(|r| r.name.as_str())
    }
}

impl GraphicsDevice for SoftwareHost {
    fn find_shader(&self, name: &str) -> Option<ShaderId> {
        self.shader_names.get(name).copied()
    }

    fn create_material(
        &mut self,
        shader: ShaderId,
        flags: ObjectFlags,
    ) -> Result<MaterialId, HostError> {
        let program = *self
            .shaders
            .get(&shader)
            .ok_or(HostError::UnknownShader(shader))?;
        let id = MaterialId(self.next_id());
        self.materials
            .insert(id, SoftwareMaterial::new(program, flags));
        Ok(id)
    }

    fn destroy_material(&mut self, material: MaterialId) {
        self.materials.remove(&material);
    }

    fn set_uniform(
        &mut self,
        material: MaterialId,
        name: &str,
        value: UniformValue,
    ) -> Result<(), HostError> {
        self.materials
            .get_mut(&material)
            .ok_or(HostError::UnknownMaterial(material))?
            .uniforms
            .insert(name.to_string(), value);
        Ok(())
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<TextureId, HostError> {
        if desc.size.x == 0 || desc.size.y == 0 {
            return Err(HostError::InvalidSize {
                width: desc.size.x,
                height: desc.size.y,
            });
        }
        let id = TextureId(self.next_id());
        self.textures
            .insert(id, SoftwareTexture::new(desc.name.clone(), desc.size, desc.flags));
        self.stats.targets_created += 1;
        self.stats.peak_live_targets = self.stats.peak_live_targets.max(self.textures.len());
        Ok(id)
    }

    fn release_render_target(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_some() {
            self.stats.targets_released += 1;
        }
    }

    fn texture_size(&self, texture: TextureId) -> Option<UVec2> {
        self.textures.get(&texture).map(|t| t.size)
    }

    fn blit(
        &mut self,
        source: TextureId,
        destination: TextureId,
        material: Option<MaterialId>,
    ) -> Result<(), HostError> {
        let Some(material_id) = material else {
            return self.copy_texture(source, destination);
        };
        let material = self
            .materials
            .get(&material_id)
            .ok_or(HostError::UnknownMaterial(material_id))?;

        match material.program {
            ShaderProgram::MaskComposite => {
                let inputs = CompositeInputs::gather(material_id, material)?;
                let mut out = self
                    .textures
                    .get(&destination)
                    .ok_or(HostError::UnknownTexture(destination))?
                    .clone();
                let main = self
                    .textures
                    .get(&inputs.main)
                    .ok_or(HostError::UnknownTexture(inputs.main))?;
                let mask = self
                    .textures
                    .get(&inputs.mask)
                    .ok_or(HostError::UnknownTexture(inputs.mask))?;
                run_composite(&inputs, main, mask, &mut out);
                self.textures.insert(destination, out);
                Ok(())
            }
            ShaderProgram::Standard | ShaderProgram::StencilWrite => {
                self.copy_texture(source, destination)
            }
        }
    }

    fn read_pixels(&self, texture: TextureId) -> Result<PixelReadback, HostError> {
        let texture_ref = self
            .textures
            .get(&texture)
            .ok_or(HostError::UnknownTexture(texture))?;
        Ok(PixelReadback {
            size: texture_ref.size,
            rgba: texture_ref.to_rgba8(),
        })
    }
}

impl CameraRig for SoftwareHost {
    fn create_camera(&mut self, name: &str, flags: ObjectFlags) -> CameraId {
        let mut camera = SoftwareCamera::new(name);
        camera.flags = flags;
        self.spawn_camera(camera)
    }

    fn destroy_camera(&mut self, camera: CameraId) {
        if self.cameras.remove(&camera).is_none() {
            return;
        }
        for child in self.cameras.values_mut() {
            if child.parent == Some(camera) {
                child.parent = None;
            }
        }
    }

    fn camera_exists(&self, camera: CameraId) -> bool {
        self.cameras.contains_key(&camera)
    }

    fn set_camera_parent(
        &mut self,
        camera: CameraId,
        parent: Option<CameraId>,
    ) -> Result<(), HostError> {
        if let Some(parent) = parent {
            if parent == camera || !self.cameras.contains_key(&parent) {
                return Err(HostError::UnknownCamera(parent));
            }
        }
        let entry = self
            .cameras
            .get_mut(&camera)
            .ok_or(HostError::UnknownCamera(camera))?;
        entry.parent = parent;
        entry.local = Transform::IDENTITY;
        Ok(())
    }

    fn set_camera_enabled(&mut self, camera: CameraId, enabled: bool) -> Result<(), HostError> {
        self.cameras
            .get_mut(&camera)
            .ok_or(HostError::UnknownCamera(camera))?
            .enabled = enabled;
        Ok(())
    }

    fn camera_transform(&self, camera: CameraId) -> Option<Transform> {
        self.world_transform(camera)
    }

    fn set_camera_transform(
        &mut self,
        camera: CameraId,
        transform: Transform,
    ) -> Result<(), HostError> {
        let parent = self
            .cameras
            .get(&camera)
            .ok_or(HostError::UnknownCamera(camera))?
            .parent;
        let parent_world = parent.and_then(|p| self.world_transform(p));
        let local = match parent_world {
            Some(parent_world) => Transform::from_matrix(
                parent_world.compute_matrix().inverse() * transform.compute_matrix(),
            ),
            None => transform,
        };
        if let Some(entry) = self.cameras.get_mut(&camera) {
            entry.local = local;
        }
        Ok(())
    }

    fn copy_camera(&mut self, from: CameraId, to: CameraId) -> Result<(), HostError> {
        let source = self
            .cameras
            .get(&from)
            .cloned()
            .ok_or(HostError::UnknownCamera(from))?;
        let world = self
            .world_transform(from)
            .ok_or(HostError::UnknownCamera(from))?;
        self.cameras
            .get_mut(&to)
            .ok_or(HostError::UnknownCamera(to))?
            .copy_settings_from(&source);
        self.set_camera_transform(to, world)
    }

    fn set_clear_mode(&mut self, camera: CameraId, clear: ClearMode) -> Result<(), HostError> {
        self.cameras
            .get_mut(&camera)
            .ok_or(HostError::UnknownCamera(camera))?
            .clear = clear;
        Ok(())
    }

    fn set_camera_target(
        &mut self,
        camera: CameraId,
        target: Option<TextureId>,
    ) -> Result<(), HostError> {
        self.cameras
            .get_mut(&camera)
            .ok_or(HostError::UnknownCamera(camera))?
            .target = target;
        Ok(())
    }

    fn world_to_screen(&self, camera: CameraId, point: Vec3) -> Option<Vec3> {
        let entry = self.cameras.get(&camera)?;
        let world = self.world_transform(camera)?;
        let size = self.surface_size(entry).as_vec2();
        if size.x <= 0.0 || size.y <= 0.0 {
            return None;
        }
        let vp = view_projection(entry, &world, size.x / size.y);
        Some(project_to_pixels(vp, point, size.x, size.y))
    }

    fn screen_size(&self) -> UVec2 {
        self.screen_size
    }

    fn render_camera(&mut self, camera: CameraId) -> Result<(), HostError> {
        let entry = self
            .cameras
            .get(&camera)
            .cloned()
            .ok_or(HostError::UnknownCamera(camera))?;
        let Some(target_id) = entry.target else {
            return Ok(());
        };

        for hook in &mut self.render_hooks {
            hook(&mut self.scene, camera);
        }

        let world = self
            .world_transform(camera)
            .ok_or(HostError::UnknownCamera(camera))?;

        let Self {
            scene,
            materials,
            textures,
            stats,
            ..
        } = self;
        let target = textures
            .get_mut(&target_id)
            .ok_or(HostError::UnknownTexture(target_id))?;

        match entry.clear {
            ClearMode::SolidColor(color) => {
                target.fill(color);
                target.clear_depth_stencil();
            }
            ClearMode::DepthOnly => target.clear_depth_stencil(),
            ClearMode::Nothing => {}
        }

        let size = target.size.as_vec2();
        let vp = view_projection(&entry, &world, size.x / size.y);
        for (_, renderer) in scene.iter() {
            let Some(material) = renderer.materials.first().and_then(|m| materials.get(m)) else {
                continue;
            };
            let fragment = match material.program {
                ShaderProgram::Standard => Fragment::Color(material.base_color()),
                ShaderProgram::StencilWrite => Fragment::Stencil(1),
                ShaderProgram::MaskComposite => continue,
            };
            draw_renderer(target, renderer, vp, entry.near, fragment);
        }

        stats.camera_renders += 1;
        Ok(())
    }
}

