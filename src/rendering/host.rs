//! Bevy implementation of the outline host traits.
//!
//! The effect runs inside a system, while Bevy draws only after every system
//! of the frame has finished. Host calls are therefore turned into entity and
//! asset changes picked up by this frame's render:
//!
//! - the mask camera is a `Camera3d` that renders into an `Image`, parented to
//!   the main camera and active only on frames where it is rendered;
//! - every scene renderer has a proxy child on the mask layer, and rendering
//!   the mask camera hands each proxy the mask material its renderer's slots
//!   hold at that moment;
//! - a composite blit configures the main camera's `OutlineComposite`, and a
//!   plain blit switches the composite off so the view is left as rendered.

use std::collections::{HashMap, HashSet};

use bevy::core_pipeline::tonemapping::{DebandDither, Tonemapping};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy::render::camera::{CameraProjection, RenderTarget};
use bevy::render::gpu_readback::{Readback, ReadbackComplete};
use bevy::render::primitives::Aabb;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat, TextureUsages};
use bevy::render::view::RenderLayers;

use crate::outline::compositor::MASK_TEXTURE;
use crate::outline::config::{DEFAULT_COMPOSITE_SHADER, DEFAULT_STENCIL_SHADER};
use crate::outline::host::{
    CameraRig, ClearMode, GraphicsDevice, ObjectFlags, PixelReadback, RenderTargetDesc,
    SceneRenderers, UniformValue,
};
use crate::outline::{CameraId, HostError, MaterialId, RendererId, ShaderId, TextureId};

use super::composite::{OutlineComposite, OutlineCompositeSettings};
use super::mask_material::{OutlineMaskMaterial, OutlineMaskProxy, MASK_LAYER};

/// Cameras created through the host draw before the cameras it was given.
const OWNED_CAMERA_ORDER: isize = -1;

const MAX_PARENT_DEPTH: usize = 16;

/// What a shader does on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GpuProgram {
    /// `OutlineMaskMaterial`, marked.
    MaskWrite,
    /// The `OutlineComposite` post-process pass.
    MaskComposite,
}

#[derive(Debug, Clone)]
enum GpuMaterial {
    Standard(Handle<StandardMaterial>),
    Mask(Handle<OutlineMaskMaterial>),
    Composite(HashMap<String, UniformValue>),
}

#[derive(Debug, Clone)]
enum TextureKind {
    /// Colour output of a registered camera.
    View(CameraId),
    Image(Handle<Image>),
}

/// A texture the host hands out.
#[derive(Debug, Clone)]
pub struct GpuTexture {
    pub name: String,
    pub size: UVec2,
    pub flags: ObjectFlags,
    kind: TextureKind,
    readback: Option<Entity>,
}

impl GpuTexture {
    pub fn image(&self) -> Option<&Handle<Image>> {
        match &self.kind {
            TextureKind::Image(handle) => Some(handle),
            TextureKind::View(_) => None,
        }
    }
}

/// A camera entity and the settings the host last gave it.
#[derive(Debug, Clone)]
pub struct GpuCamera {
    pub entity: Entity,
    pub name: String,
    pub flags: ObjectFlags,
    /// Spawned by the host; only these get their `Camera` rewritten.
    pub owned: bool,
    pub parent: Option<CameraId>,
    pub local: Transform,
    pub projection: Projection,
    pub clear: ClearMode,
    pub target: Option<TextureId>,
    pub enabled: bool,
    /// Drawn this frame through `render_camera`.
    pub rendering: bool,
}

#[derive(Debug, Clone)]
struct GpuRenderer {
    entity: Entity,
    name: String,
    materials: Vec<MaterialId>,
    center: Vec3,
}

#[derive(Debug, Clone, Copy)]
struct ProxyState {
    entity: Entity,
    shown: AssetId<OutlineMaskMaterial>,
}

/// Everything the host remembers between frames.
#[derive(Resource)]
pub struct GpuHostState {
    next_id: u64,
    shader_names: HashMap<String, ShaderId>,
    shaders: HashMap<ShaderId, GpuProgram>,
    materials: HashMap<MaterialId, GpuMaterial>,
    standard_ids: HashMap<AssetId<StandardMaterial>, MaterialId>,
    textures: HashMap<TextureId, GpuTexture>,
    cameras: HashMap<CameraId, GpuCamera>,
    renderers: Vec<(RendererId, GpuRenderer)>,
    proxies: HashMap<Entity, ProxyState>,
    occluder: Option<Handle<OutlineMaskMaterial>>,
    readbacks: HashMap<TextureId, PixelReadback>,
    view_camera: Option<CameraId>,
    view_size: UVec2,
}

impl Default for GpuHostState {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuHostState {
    /// A state with the built-in outline shaders registered.
    pub fn new() -> Self {
        let mut state = Self {
            next_id: 0,
            shader_names: HashMap::new(),
            shaders: HashMap::new(),
            materials: HashMap::new(),
            standard_ids: HashMap::new(),
            textures: HashMap::new(),
            cameras: HashMap::new(),
            renderers: Vec::new(),
            proxies: HashMap::new(),
            occluder: None,
            readbacks: HashMap::new(),
            view_camera: None,
            view_size: UVec2::ZERO,
        };
        state.register_shader(DEFAULT_STENCIL_SHADER, GpuProgram::MaskWrite);
        state.register_shader(DEFAULT_COMPOSITE_SHADER, GpuProgram::MaskComposite);
        state
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn register_shader(&mut self, name: &str, program: GpuProgram) -> ShaderId {
        let id = ShaderId(self.next_id());
        self.shaders.insert(id, program);
        self.shader_names.insert(name.to_string(), id);
        id
    }

    /// Identity of a scene material. The same handle always maps to the same id.
    pub fn register_standard(&mut self, material: &Handle<StandardMaterial>) -> MaterialId {
        self.standard_id(material)
    }

    fn standard_id(&mut self, material: &Handle<StandardMaterial>) -> MaterialId {
        if let Some(id) = self.standard_ids.get(&material.id()) {
            return *id;
        }
        let id = MaterialId(self.next_id());
        self.standard_ids.insert(material.id(), id);
        self.materials.insert(id, GpuMaterial::Standard(material.clone()));
        id
    }

    /// Track a camera entity the host did not spawn.
    pub fn register_camera(&mut self, entity: Entity, name: &str, transform: Transform) -> CameraId {
        let id = CameraId(self.next_id());
        self.cameras.insert(
            id,
            GpuCamera {
                entity,
                name: name.to_string(),
                flags: ObjectFlags::NONE,
                owned: false,
                parent: None,
                local: transform,
                projection: Projection::default(),
                clear: ClearMode::DepthOnly,
                target: None,
                enabled: true,
                rendering: false,
            },
        );
        id
    }

    /// Source and destination handles standing for `camera`'s view target.
    pub fn register_view(&mut self, camera: CameraId, size: UVec2) -> (TextureId, TextureId) {
        self.view_camera = Some(camera);
        self.view_size = size;
        let view_texture = |state: &mut Self, name: &str| {
            let id = TextureId(state.next_id());
            state.textures.insert(
                id,
                GpuTexture {
                    name: name.to_string(),
                    size,
                    flags: ObjectFlags::NONE,
                    kind: TextureKind::View(camera),
                    readback: None,
                },
            );
            id
        };
        let source = view_texture(self, "main_color");
        let destination = view_texture(self, "outline_output");
        (source, destination)
    }

    pub fn camera(&self, id: CameraId) -> Option<&GpuCamera> {
        self.cameras.get(&id)
    }

    /// Live cameras carrying `name`.
    pub fn cameras_named(&self, name: &str) -> usize {
        self.cameras.values().filter(|c| c.name == name).count()
    }

    pub fn texture(&self, id: TextureId) -> Option<&GpuTexture> {
        self.textures.get(&id)
    }

    /// Mask-layer stand-in of a scene renderer.
    pub fn mask_proxy(&self, renderer: Entity) -> Option<Entity> {
        self.proxies.get(&renderer).map(|proxy| proxy.entity)
    }

    pub fn renderer_id(entity: Entity) -> RendererId {
        RendererId(entity.to_bits())
    }

    /// Keep the newest readback of `texture`.
    pub fn store_readback(&mut self, texture: TextureId, data: &[u8]) {
        let Some(size) = self.textures.get(&texture).map(|t| t.size) else {
            return;
        };
        match unpad_rows(data, size) {
            Some(rgba) => {
                self.readbacks.insert(texture, PixelReadback { size, rgba });
            }
            None => debug!(
                "Discarding readback of {:?}: {} bytes for {}x{}",
                texture,
                data.len(),
                size.x,
                size.y
            ),
        }
    }

    fn renderer(&self, id: RendererId) -> Option<&GpuRenderer> {
        self.renderers
            .iter()
            .find(|(rid, _)| *rid == id)
            .map(|(_, renderer)| renderer)
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

    fn surface_size(&self, camera: &GpuCamera) -> UVec2 {
        camera
            .target
            .and_then(|target| self.textures.get(&target))
            .and_then(|texture| texture.image().map(|_| texture.size))
            .unwrap_or(self.view_size)
    }

    fn camera_component(&self, camera: &GpuCamera) -> Camera {
        let target = camera
            .target
            .and_then(|target| self.textures.get(&target))
            .and_then(GpuTexture::image)
            .map(|handle| RenderTarget::Image(handle.clone()))
            .unwrap_or_default();
        Camera {
            order: OWNED_CAMERA_ORDER,
            is_active: camera.enabled || camera.rendering,
            target,
            clear_color: clear_color(camera.clear),
            ..default()
        }
    }
}

fn clear_color(clear: ClearMode) -> ClearColorConfig {
    match clear {
        ClearMode::SolidColor(color) => ClearColorConfig::Custom(color.into()),
        ClearMode::DepthOnly | ClearMode::Nothing => ClearColorConfig::None,
    }
}

/// Strip row padding from a texture readback, leaving tight RGBA8 rows.
///
/// GPU copies pad every row to the copy alignment, so the stride is whatever
/// the buffer holds per row. `None` if the data is too short for `size`.
pub fn unpad_rows(data: &[u8], size: UVec2) -> Option<Vec<u8>> {
    let row = size.x as usize * 4;
    let rows = size.y as usize;
    if rows == 0 || row == 0 || data.len() < row * rows {
        return None;
    }
    let stride = data.len() / rows;
    Some(
        data.chunks(stride)
            .take(rows)
            .flat_map(|chunk| &chunk[..row])
            .copied()
            .collect(),
    )
}

/// Project `point` into pixels of a `size` surface seen through `projection`
/// from `camera`. Origin bottom-left; z is the depth along the view direction.
pub fn project_point(
    projection: &Projection,
    camera: &Transform,
    point: Vec3,
    size: Vec2,
) -> Option<Vec3> {
    if size.x <= 0.0 || size.y <= 0.0 {
        return None;
    }
    let mut projection = projection.clone();
    projection.update(size.x, size.y);

    let view_point = camera.compute_matrix().inverse().transform_point3(point);
    let clip = projection.get_clip_from_view() * view_point.extend(1.0);
    let w = if clip.w.abs() < f32::EPSILON {
        f32::EPSILON.copysign(clip.w)
    } else {
        clip.w
    };
    let ndc = clip.truncate() / w;
    Some(Vec3::new(
        (ndc.x * 0.5 + 0.5) * size.x,
        (ndc.y * 0.5 + 0.5) * size.y,
        -view_point.z,
    ))
}

type SceneRendererQuery = (
    Entity,
    &'static Mesh3d,
    &'static MeshMaterial3d<StandardMaterial>,
    &'static GlobalTransform,
    Option<&'static Aabb>,
    Option<&'static Name>,
);

/// The outline host as a system parameter.
///
/// Call `begin_frame` once before handing it to the effect.
#[derive(SystemParam)]
pub struct GpuHost<'w, 's> {
    state: ResMut<'w, GpuHostState>,
    commands: Commands<'w, 's>,
    images: ResMut<'w, Assets<Image>>,
    mask_materials: ResMut<'w, Assets<OutlineMaskMaterial>>,
    scene: Query<'w, 's, SceneRendererQuery>,
    views: Query<'w, 's, (&'static GlobalTransform, &'static Camera, &'static Projection)>,
}

impl GpuHost<'_, '_> {
    /// Pick up camera poses and scene renderers as they stand this frame.
    pub fn begin_frame(&mut self) {
        self.sync_cameras();
        self.sync_renderers();
    }

    /// Copy the mask back to the CPU every frame while `capture` is set.
    pub fn sync_readbacks(&mut self, capture: bool) {
        let state = &mut *self.state;
        for (&id, texture) in state.textures.iter_mut() {
            let TextureKind::Image(handle) = &texture.kind else {
                continue;
            };
            match (capture, texture.readback) {
                (true, None) => {
                    let entity = self
                        .commands
                        .spawn((
                            Readback::texture(handle.clone()),
                            Name::new(format!("{}_readback", texture.name)),
                        ))
                        .observe(
                            move |trigger: Trigger<ReadbackComplete>,
                                  mut state: ResMut<GpuHostState>| {
                                state.store_readback(id, &trigger.event().0);
                            },
                        )
                        .id();
                    texture.readback = Some(entity);
                }
                (false, Some(entity)) => {
                    if let Some(entity) = self.commands.get_entity(entity) {
                        entity.despawn_recursive();
                    }
                    texture.readback = None;
                    state.readbacks.remove(&id);
                }
                _ => {}
            }
        }
    }

    fn sync_cameras(&mut self) {
        let state = &mut *self.state;
        let mut gone = Vec::new();
        let mut rendered = Vec::new();

        for (&id, camera) in state.cameras.iter_mut() {
            let Ok((global, bevy_camera, projection)) = self.views.get(camera.entity) else {
                gone.push(id);
                continue;
            };
            if camera.rendering {
                camera.rendering = false;
                rendered.push(id);
            }
            if camera.owned {
                continue;
            }
            if camera.parent.is_none() {
                camera.local = global.compute_transform();
            }
            camera.projection = projection.clone();
            if state.view_camera == Some(id) {
                if let Some(size) = bevy_camera.physical_target_size() {
                    state.view_size = size;
                }
            }
        }

        for id in gone {
            debug!("Camera {:?} was despawned", id);
            state.cameras.remove(&id);
        }
        for id in rendered {
            self.write_camera(id);
        }
    }

    fn sync_renderers(&mut self) {
        let occluder = self.occluder();
        let state = &mut *self.state;
        state.renderers.clear();
        let mut live = HashSet::new();

        for (entity, mesh, material, transform, aabb, name) in &self.scene {
            let material = state.standard_id(&material.0);
            let center = aabb.map_or(transform.translation(), |aabb| {
                transform.transform_point(Vec3::from(aabb.center))
            });
            let name = name.map_or_else(|| entity.to_string(), |name| name.as_str().to_string());

            if !state.proxies.contains_key(&entity) {
                let proxy = self
                    .commands
                    .spawn((
                        mesh.clone(),
                        MeshMaterial3d(occluder.clone()),
                        Transform::IDENTITY,
                        RenderLayers::layer(MASK_LAYER),
                        OutlineMaskProxy { source: entity },
                        Name::new(format!("{}_mask", name)),
                    ))
                    .set_parent(entity)
                    .id();
                state.proxies.insert(
                    entity,
                    ProxyState {
                        entity: proxy,
                        shown: occluder.id(),
                    },
                );
            }

            live.insert(entity);
            state.renderers.push((
                GpuHostState::renderer_id(entity),
                GpuRenderer {
                    entity,
                    name,
                    materials: vec![material],
                    center,
                },
            ));
        }

        state.renderers.sort_by_key(|(id, _)| *id);
        let commands = &mut self.commands;
        state.proxies.retain(|source, proxy| {
            let keep = live.contains(source);
            if !keep {
                if let Some(entity) = commands.get_entity(proxy.entity) {
                    entity.despawn_recursive();
                }
            }
            keep
        });
    }

    fn occluder(&mut self) -> Handle<OutlineMaskMaterial> {
        if let Some(handle) = &self.state.occluder {
            return handle.clone();
        }
        let handle = self.mask_materials.add(OutlineMaskMaterial::occluder());
        self.state.occluder = Some(handle.clone());
        handle
    }

    /// Give every proxy the mask material its renderer's first slot holds now.
    fn capture_mask_materials(&mut self) {
        let occluder = self.occluder();
        let state = &mut *self.state;
        for (_, renderer) in &state.renderers {
            let handle = renderer
                .materials
                .first()
                .and_then(|material| match state.materials.get(material) {
                    Some(GpuMaterial::Mask(handle)) => Some(handle.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| occluder.clone());
            let Some(proxy) = state.proxies.get_mut(&renderer.entity) else {
                continue;
            };
            if proxy.shown == handle.id() {
                continue;
            }
            if let Some(mut entity) = self.commands.get_entity(proxy.entity) {
                entity.insert(MeshMaterial3d(handle.clone()));
                proxy.shown = handle.id();
            }
        }
    }

    /// Push a camera record onto its entity.
    ///
    /// The rewritten `Camera` keeps the values Bevy computed for it, and the
    /// reinserted `Projection` has them recomputed on the next camera update.
    fn write_camera(&mut self, id: CameraId) {
        let Some(camera) = self.state.cameras.get(&id) else {
            return;
        };
        let computed = self
            .views
            .get(camera.entity)
            .map(|(_, bevy_camera, _)| bevy_camera.computed.clone())
            .unwrap_or_default();
        let Some(mut entity) = self.commands.get_entity(camera.entity) else {
            return;
        };
        entity.insert(camera.local);
        if camera.owned {
            entity.insert((
                Camera {
                    computed,
                    ..self.state.camera_component(camera)
                },
                camera.projection.clone(),
            ));
        }
    }

    fn camera_mut(&mut self, id: CameraId) -> Result<&mut GpuCamera, HostError> {
        self.state
            .cameras
            .get_mut(&id)
            .ok_or(HostError::UnknownCamera(id))
    }

    fn view_camera_entity(
        &self,
        source: TextureId,
        destination: TextureId,
    ) -> Result<Entity, HostError> {
        let view_of = |id: TextureId| match self.state.textures.get(&id) {
            Some(GpuTexture {
                kind: TextureKind::View(camera),
                ..
            }) => Ok(Some(*camera)),
            Some(_) => Ok(None),
            None => Err(HostError::UnknownTexture(id)),
        };
        match (view_of(source)?, view_of(destination)?) {
            (Some(a), Some(b)) if a == b => self
                .state
                .cameras
                .get(&a)
                .map(|camera| camera.entity)
                .ok_or(HostError::UnknownCamera(a)),
            _ => Err(HostError::UnsupportedBlit {
                from: source,
                to: destination,
            }),
        }
    }

    fn set_composite(&mut self, entity: Entity, composite: OutlineComposite) {
        if let Some(mut entity) = self.commands.get_entity(entity) {
            entity.insert(composite);
        }
    }
}

impl SceneRenderers for GpuHost<'_, '_> {
    fn renderers(&self) -> Vec<RendererId> {
        self.state.renderers.iter().map(|(id, _)| *id).collect()
    }

    fn materials(&self, renderer: RendererId) -> Option<&[MaterialId]> {
        self.state.renderer(renderer).map(|r| r.materials.as_slice())
    }

    fn set_materials(
        &mut self,
        renderer: RendererId,
        materials: Vec<MaterialId>,
    ) -> Result<(), HostError> {
        let entry = self
            .state
            .renderers
            .iter_mut()
            .find(|(id, _)| *id == renderer)
            .map(|(_, entry)| entry)
            .ok_or(HostError::RendererDestroyed(renderer))?;
        entry.materials = materials;
        Ok(())
    }

    fn bounds_center(&self, renderer: RendererId) -> Option<Vec3> {
        self.state.renderer(renderer).map(|r| r.center)
    }

    fn renderer_name(&self, renderer: RendererId) -> Option<&str> {
        self.state.renderer(renderer).map(|r| r.name.as_str())
    }
}

impl GraphicsDevice for GpuHost<'_, '_> {
    fn find_shader(&self, name: &str) -> Option<ShaderId> {
        self.state.shader_names.get(name).copied()
    }

    fn create_material(
        &mut self,
        shader: ShaderId,
        _flags: ObjectFlags,
    ) -> Result<MaterialId, HostError> {
        let program = *self
            .state
            .shaders
            .get(&shader)
            .ok_or(HostError::UnknownShader(shader))?;
        let material = match program {
            GpuProgram::MaskWrite => {
                GpuMaterial::Mask(self.mask_materials.add(OutlineMaskMaterial::marked()))
            }
            GpuProgram::MaskComposite => GpuMaterial::Composite(HashMap::new()),
        };
        let id = MaterialId(self.state.next_id());
        self.state.materials.insert(id, material);
        Ok(id)
    }

    fn destroy_material(&mut self, material: MaterialId) {
        if let Some(GpuMaterial::Standard(handle)) = self.state.materials.remove(&material) {
            self.state.standard_ids.remove(&handle.id());
        }
    }

    fn set_uniform(
        &mut self,
        material: MaterialId,
        name: &str,
        value: UniformValue,
    ) -> Result<(), HostError> {
        match self.state.materials.get_mut(&material) {
            Some(GpuMaterial::Composite(uniforms)) => {
                uniforms.insert(name.to_string(), value);
                Ok(())
            }
            // Scene and mask materials take nothing from the effect.
            Some(_) => Ok(()),
            None => Err(HostError::UnknownMaterial(material)),
        }
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<TextureId, HostError> {
        if desc.size.x == 0 || desc.size.y == 0 {
            return Err(HostError::InvalidSize {
                width: desc.size.x,
                height: desc.size.y,
            });
        }

        // Depth comes from the camera's own main pass, so `depth_bits` is not needed here.
        let mut image = Image::new_fill(
            Extent3d {
                width: desc.size.x,
                height: desc.size.y,
                depth_or_array_layers: 1,
            },
            TextureDimension::D2,
            &[0, 0, 0, 0],
            TextureFormat::Rgba8UnormSrgb,
            RenderAssetUsages::default(),
        );
        image.texture_descriptor.usage = TextureUsages::TEXTURE_BINDING
            | TextureUsages::COPY_DST
            | TextureUsages::COPY_SRC
            | TextureUsages::RENDER_ATTACHMENT;
        let handle = self.images.add(image);

        let id = TextureId(self.state.next_id());
        self.state.textures.insert(
            id,
            GpuTexture {
                name: desc.name.clone(),
                size: desc.size,
                flags: desc.flags,
                kind: TextureKind::Image(handle),
                readback: None,
            },
        );
        Ok(id)
    }

    fn release_render_target(&mut self, texture: TextureId) {
        let Some(released) = self.state.textures.remove(&texture) else {
            return;
        };
        self.state.readbacks.remove(&texture);
        if let Some(entity) = released.readback.and_then(|e| self.commands.get_entity(e)) {
            entity.despawn_recursive();
        }
        if let TextureKind::Image(handle) = released.kind {
            self.images.remove(&handle);
        }
    }

    fn texture_size(&self, texture: TextureId) -> Option<UVec2> {
        self.state.textures.get(&texture).map(|t| match t.kind {
            TextureKind::View(_) => self.state.view_size,
            TextureKind::Image(_) => t.size,
        })
    }

    fn blit(
        &mut self,
        source: TextureId,
        destination: TextureId,
        material: Option<MaterialId>,
    ) -> Result<(), HostError> {
        let camera = self.view_camera_entity(source, destination)?;
        let Some(material_id) = material else {
            self.set_composite(camera, OutlineComposite::default());
            return Ok(());
        };

        let composite = match self.state.materials.get(&material_id) {
            Some(GpuMaterial::Composite(uniforms)) => {
                let mask = match uniforms.get(MASK_TEXTURE) {
                    Some(UniformValue::Texture(mask)) => *mask,
                    _ => {
                        return Err(HostError::MissingUniform {
                            material: material_id,
                            uniform: MASK_TEXTURE,
                        })
                    }
                };
                let mask = self
                    .state
                    .textures
                    .get(&mask)
                    .ok_or(HostError::UnknownTexture(mask))?
                    .image()
                    .cloned()
                    .ok_or(HostError::NotRenderable(mask))?;
                OutlineComposite {
                    settings: OutlineCompositeSettings::from_uniforms(material_id, uniforms)?,
                    mask: Some(mask),
                }
            }
            // Only the composite program draws anything in a blit.
            Some(_) => OutlineComposite::default(),
            None => return Err(HostError::UnknownMaterial(material_id)),
        };
        self.set_composite(camera, composite);
        Ok(())
    }

    fn read_pixels(&self, texture: TextureId) -> Result<PixelReadback, HostError> {
        if !self.state.textures.contains_key(&texture) {
            return Err(HostError::UnknownTexture(texture));
        }
        self.state
            .readbacks
            .get(&texture)
            .cloned()
            .ok_or(HostError::ReadbackPending(texture))
    }
}

impl CameraRig for GpuHost<'_, '_> {
    fn create_camera(&mut self, name: &str, flags: ObjectFlags) -> CameraId {
        let mut camera = GpuCamera {
            entity: Entity::PLACEHOLDER,
            name: name.to_string(),
            flags,
            owned: true,
            parent: None,
            local: Transform::IDENTITY,
            projection: Projection::default(),
            clear: ClearMode::DepthOnly,
            target: None,
            enabled: true,
            rendering: false,
        };
        camera.entity = self
            .commands
            .spawn((
                Camera3d::default(),
                self.state.camera_component(&camera),
                camera.projection.clone(),
                Transform::IDENTITY,
                RenderLayers::layer(MASK_LAYER),
                Tonemapping::None,
                DebandDither::Disabled,
                Msaa::Off,
                Name::new(name.to_string()),
            ))
            .id();

        let id = CameraId(self.state.next_id());
        self.state.cameras.insert(id, camera);
        id
    }

    fn destroy_camera(&mut self, camera: CameraId) {
        let Some(removed) = self.state.cameras.remove(&camera) else {
            return;
        };
        let mut orphans = Vec::new();
        for child in self.state.cameras.values_mut() {
            if child.parent == Some(camera) {
                child.parent = None;
                orphans.push(child.entity);
            }
        }
        for orphan in orphans {
            if let Some(mut entity) = self.commands.get_entity(orphan) {
                entity.remove_parent();
            }
        }
        if let Some(entity) = self.commands.get_entity(removed.entity) {
            entity.despawn_recursive();
        }
    }

    fn camera_exists(&self, camera: CameraId) -> bool {
        self.state.cameras.contains_key(&camera)
    }

    fn set_camera_parent(
        &mut self,
        camera: CameraId,
        parent: Option<CameraId>,
    ) -> Result<(), HostError> {
        let parent_entity = match parent {
            Some(parent) => {
                let entity = self
                    .state
                    .cameras
                    .get(&parent)
                    .filter(|_| parent != camera)
                    .map(|p| p.entity)
                    .ok_or(HostError::UnknownCamera(parent))?;
                Some(entity)
            }
            None => None,
        };
        let entry = self.camera_mut(camera)?;
        entry.parent = parent;
        entry.local = Transform::IDENTITY;
        let child = entry.entity;

        if let Some(mut entity) = self.commands.get_entity(child) {
            match parent_entity {
                Some(parent) => entity.set_parent(parent),
                None => entity.remove_parent(),
            };
        }
        self.write_camera(camera);
        Ok(())
    }

    fn set_camera_enabled(&mut self, camera: CameraId, enabled: bool) -> Result<(), HostError> {
        self.camera_mut(camera)?.enabled = enabled;
        self.write_camera(camera);
        Ok(())
    }

    fn camera_transform(&self, camera: CameraId) -> Option<Transform> {
        self.state.world_transform(camera)
    }

    fn set_camera_transform(
        &mut self,
        camera: CameraId,
        transform: Transform,
    ) -> Result<(), HostError> {
        let parent = self
            .state
            .cameras
            .get(&camera)
            .ok_or(HostError::UnknownCamera(camera))?
            .parent;
        let local = match parent.and_then(|p| self.state.world_transform(p)) {
            Some(parent_world) => Transform::from_matrix(
                parent_world.compute_matrix().inverse() * transform.compute_matrix(),
            ),
            None => transform,
        };
        self.camera_mut(camera)?.local = local;
        self.write_camera(camera);
        Ok(())
    }

    fn copy_camera(&mut self, from: CameraId, to: CameraId) -> Result<(), HostError> {
        let source = self
            .state
            .cameras
            .get(&from)
            .cloned()
            .ok_or(HostError::UnknownCamera(from))?;
        let world = self
            .state
            .world_transform(from)
            .ok_or(HostError::UnknownCamera(from))?;
        let entry = self.camera_mut(to)?;
        entry.projection = source.projection;
        entry.clear = source.clear;
        entry.target = source.target;
        self.set_camera_transform(to, world)
    }

    fn set_clear_mode(&mut self, camera: CameraId, clear: ClearMode) -> Result<(), HostError> {
        self.camera_mut(camera)?.clear = clear;
        self.write_camera(camera);
        Ok(())
    }

    fn set_camera_target(
        &mut self,
        camera: CameraId,
        target: Option<TextureId>,
    ) -> Result<(), HostError> {
        if let Some(texture) = target {
            let texture_ref = self
                .state
                .textures
                .get(&texture)
                .ok_or(HostError::UnknownTexture(texture))?;
            if texture_ref.image().is_none() {
                return Err(HostError::NotRenderable(texture));
            }
        }
        self.camera_mut(camera)?.target = target;
        self.write_camera(camera);
        Ok(())
    }

    fn world_to_screen(&self, camera: CameraId, point: Vec3) -> Option<Vec3> {
        let entry = self.state.cameras.get(&camera)?;
        let world = self.state.world_transform(camera)?;
        let size = self.state.surface_size(entry).as_vec2();
        project_point(&entry.projection, &world, point, size)
    }

    fn screen_size(&self) -> UVec2 {
        self.state.view_size
    }

    /// Host cameras draw on this frame's render; cameras the host was given
    /// draw every frame anyway.
    fn render_camera(&mut self, camera: CameraId) -> Result<(), HostError> {
        let entry = self.camera_mut(camera)?;
        if !entry.owned || entry.target.is_none() {
            return Ok(());
        }
        entry.rendering = true;
        self.write_camera(camera);
        self.capture_mask_materials();
        Ok(())
    }
}
