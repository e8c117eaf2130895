//! Mask composite: a fullscreen post-process pass on the main camera.
//!
//! Reads the main view, the outline mask and the anchor uniforms, and writes
//! the outlined image back into the view target. Runs only on cameras whose
//! `OutlineComposite` carries a mask; otherwise the view is left untouched.

use std::collections::HashMap;

use bevy::{
    asset::load_internal_asset,
    core_pipeline::{
        core_3d::graph::{Core3d, Node3d},
        fullscreen_vertex_shader::fullscreen_shader_vertex_state,
    },
    ecs::query::QueryItem,
    prelude::*,
    render::{
        extract_component::{
            ComponentUniforms, DynamicUniformIndex, ExtractComponent, ExtractComponentPlugin,
            UniformComponentPlugin,
        },
        render_asset::RenderAssets,
        render_graph::{
            NodeRunError, RenderGraphApp, RenderGraphContext, RenderLabel, ViewNode, ViewNodeRunner,
        },
        render_resource::{
            binding_types::{sampler, texture_2d, uniform_buffer},
            BindGroupEntries, BindGroupLayout, BindGroupLayoutEntries, CachedRenderPipelineId,
            ColorTargetState, ColorWrites, FragmentState, MultisampleState, Operations,
            PipelineCache, PrimitiveState, RenderPassColorAttachment, RenderPassDescriptor,
            RenderPipelineDescriptor, Sampler, SamplerBindingType, SamplerDescriptor, ShaderStages,
            ShaderType, TextureFormat, TextureSampleType,
        },
        renderer::{RenderContext, RenderDevice},
        texture::GpuImage,
        view::ViewTarget,
        RenderApp,
    },
};

use crate::outline::compositor::{
    EDGE_COLOR, FALLOFF_DISTANCE, FALLOFF_POWER, OBJECT_COUNT, OBJECT_POSITIONS,
};
use crate::outline::host::UniformValue;
use crate::outline::{HostError, MaterialId, MAX_ANCHORS};

/// Handle to the composite shader.
const COMPOSITE_SHADER_HANDLE: Handle<Shader> =
    Handle::weak_from_u128(0x5c1e_7a40_93d2_4b8f_a6e1_0f3c_28d7_b914);

/// Plugin that adds the mask composite pass to the 3D render graph.
pub struct OutlineCompositePlugin;

impl Plugin for OutlineCompositePlugin {
    fn build(&self, app: &mut App) {
        load_internal_asset!(
            app,
            COMPOSITE_SHADER_HANDLE,
            "../../assets/shaders/outline_composite.wgsl",
            Shader::from_wgsl
        );

        app.add_plugins((
            ExtractComponentPlugin::<OutlineComposite>::default(),
            UniformComponentPlugin::<OutlineCompositeSettings>::default(),
        ));

        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app
            .add_render_graph_node::<ViewNodeRunner<OutlineCompositeNode>>(
                Core3d,
                OutlineCompositeLabel,
            )
            .add_render_graph_edges(
                Core3d,
                (
                    Node3d::Tonemapping,
                    OutlineCompositeLabel,
                    Node3d::EndMainPassPostProcessing,
                ),
            );
    }

    fn finish(&self, app: &mut App) {
        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };

        render_app.init_resource::<OutlineCompositePipeline>();
    }
}

/// Label for the composite render node.
#[derive(Debug, Hash, PartialEq, Eq, Clone, RenderLabel)]
struct OutlineCompositeLabel;

/// Uniform block of the composite shader. Field order matches the WGSL struct.
#[derive(Component, Clone, Copy, Debug, PartialEq, ShaderType)]
pub struct OutlineCompositeSettings {
    /// Linear RGBA; alpha is the tint strength.
    pub edge_color: Vec4,
    /// Normalised screen positions, origin bottom-left. Only `xy` is read.
    pub object_positions: [Vec4; MAX_ANCHORS],
    pub falloff_distance: f32,
    pub falloff_power: f32,
    pub object_count: u32,
}

impl Default for OutlineCompositeSettings {
    fn default() -> Self {
        Self {
            edge_color: Vec4::ONE,
            object_positions: [Vec4::ZERO; MAX_ANCHORS],
            falloff_distance: 0.0,
            falloff_power: 1.0,
            object_count: 0,
        }
    }
}

impl OutlineCompositeSettings {
    /// Build the uniform block from the values bound on a composite material.
    ///
    /// The edge colour is required. Falloff values default like the shader's
    /// unset uniforms would, and the object count is clamped to the slots.
    pub fn from_uniforms(
        material: MaterialId,
        uniforms: &HashMap<String, UniformValue>,
    ) -> Result<Self, HostError> {
        let edge = match uniforms.get(EDGE_COLOR) {
            Some(UniformValue::Color(c)) => Vec4::new(c.red, c.green, c.blue, c.alpha),
            _ => {
                return Err(HostError::MissingUniform {
                    material,
                    uniform: EDGE_COLOR,
                })
            }
        };
        let float = |name: &str, fallback: f32| match uniforms.get(name) {
            Some(UniformValue::Float(v)) => *v,
            Some(UniformValue::Int(v)) => *v as f32,
            _ => fallback,
        };
        let count = match uniforms.get(OBJECT_COUNT) {
            Some(UniformValue::Int(n)) => (*n).clamp(0, MAX_ANCHORS as i32) as usize,
            _ => 0,
        };

        let mut settings = Self {
            edge_color: edge,
            falloff_distance: float(FALLOFF_DISTANCE, 0.0),
            falloff_power: float(FALLOFF_POWER, 1.0),
            object_count: count as u32,
            ..default()
        };
        for (slot, name) in settings.object_positions[..count]
            .iter_mut()
            .zip(OBJECT_POSITIONS)
        {
            if let Some(UniformValue::Vector(v)) = uniforms.get(name) {
                *slot = *v;
            }
        }
        Ok(settings)
    }
}

/// Composite state of a camera. Without a mask the pass does not run.
#[derive(Component, Clone, Debug, Default)]
pub struct OutlineComposite {
    pub settings: OutlineCompositeSettings,
    pub mask: Option<Handle<Image>>,
}

impl OutlineComposite {
    pub fn is_active(&self) -> bool {
        self.mask.is_some()
    }
}

impl ExtractComponent for OutlineComposite {
    type QueryData = &'static Self;
    type QueryFilter = ();
    type Out = (OutlineCompositeSettings, ExtractedOutlineMask);

    fn extract_component(item: QueryItem<'_, Self::QueryData>) -> Option<Self::Out> {
        let mask = item.mask.clone()?;
        Some((item.settings, ExtractedOutlineMask(mask)))
    }
}

/// Mask image of a view, in the render world.
#[derive(Component, Clone, Debug)]
pub struct ExtractedOutlineMask(pub Handle<Image>);

/// The render node for the mask composite.
#[derive(Default)]
struct OutlineCompositeNode;

impl ViewNode for OutlineCompositeNode {
    type ViewQuery = (
        &'static ViewTarget,
        &'static ExtractedOutlineMask,
        &'static DynamicUniformIndex<OutlineCompositeSettings>,
    );

    fn run(
        &self,
        _graph: &mut RenderGraphContext,
        render_context: &mut RenderContext,
        (view_target, mask, settings_index): QueryItem<Self::ViewQuery>,
        world: &World,
    ) -> Result<(), NodeRunError> {
        let composite_pipeline = world.resource::<OutlineCompositePipeline>();
        let pipeline_cache = world.resource::<PipelineCache>();

        let Some(pipeline) = pipeline_cache.get_render_pipeline(composite_pipeline.pipeline_id)
        else {
            return Ok(());
        };

        let settings_uniforms = world.resource::<ComponentUniforms<OutlineCompositeSettings>>();
        let Some(settings_binding) = settings_uniforms.uniforms().binding() else {
            return Ok(());
        };

        // The mask camera has not produced an image yet.
        let gpu_images = world.resource::<RenderAssets<GpuImage>>();
        let Some(mask_image) = gpu_images.get(&mask.0) else {
            return Ok(());
        };

        let post_process = view_target.post_process_write();

        let bind_group = render_context.render_device().create_bind_group(
            "outline_composite_bind_group",
            &composite_pipeline.layout,
            &BindGroupEntries::sequential((
                post_process.source,
                &composite_pipeline.sampler,
                &mask_image.texture_view,
                settings_binding.clone(),
            )),
        );

        let mut render_pass = render_context.begin_tracked_render_pass(RenderPassDescriptor {
            label: Some("outline_composite_pass"),
            color_attachments: &[Some(RenderPassColorAttachment {
                view: post_process.destination,
                resolve_target: None,
                ops: Operations::default(),
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_render_pipeline(pipeline);
        render_pass.set_bind_group(0, &bind_group, &[settings_index.index()]);
        render_pass.draw(0..3, 0..1);

        Ok(())
    }
}

/// Resource containing the composite pipeline.
#[derive(Resource)]
struct OutlineCompositePipeline {
    layout: BindGroupLayout,
    sampler: Sampler,
    pipeline_id: CachedRenderPipelineId,
}

impl FromWorld for OutlineCompositePipeline {
    fn from_world(world: &mut World) -> Self {
        let render_device = world.resource::<RenderDevice>();

        let layout = render_device.create_bind_group_layout(
            "outline_composite_bind_group_layout",
            &BindGroupLayoutEntries::sequential(
                ShaderStages::FRAGMENT,
                (
                    texture_2d(TextureSampleType::Float { filterable: true }),
                    sampler(SamplerBindingType::Filtering),
                    texture_2d(TextureSampleType::Float { filterable: true }),
                    uniform_buffer::<OutlineCompositeSettings>(true),
                ),
            ),
        );

        let sampler = render_device.create_sampler(&SamplerDescriptor::default());

        let pipeline_id =
            world
                .resource_mut::<PipelineCache>()
                .queue_render_pipeline(RenderPipelineDescriptor {
                    label: Some("outline_composite_pipeline".into()),
                    layout: vec![layout.clone()],
                    vertex: fullscreen_shader_vertex_state(),
                    fragment: Some(FragmentState {
                        shader: COMPOSITE_SHADER_HANDLE,
                        shader_defs: vec![],
                        entry_point: "fragment".into(),
                        targets: vec![Some(ColorTargetState {
                            format: TextureFormat::Rgba8UnormSrgb,
                            blend: None,
                            write_mask: ColorWrites::ALL,
                        })],
                    }),
                    primitive: PrimitiveState::default(),
                    depth_stencil: None,
                    multisample: MultisampleState::default(),
                    push_constant_ranges: vec![],
                    zero_initialize_workgroup_memory: false,
                });

        Self {
            layout,
            sampler,
            pipeline_id,
        }
    }
}
