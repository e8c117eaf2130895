//! Outline plugin - drives the outline effect once per frame.
//!
//! The main camera renders the demo scene as usual. Each frame the effect
//! runs against the Bevy host: the mask camera draws the outlined props into
//! an off-screen image and the main camera's composite pass blends the edge
//! colour over its own output.

use bevy::prelude::*;
use bevy::render::camera::CameraUpdateSystem;
use bevy::render::view::VisibilitySystems;
use bevy::window::PrimaryWindow;

use crate::outline::{CameraId, FrameOutcome, OutlineConfig, OutlineEffect, TextureId};
use crate::world::{orbit_transform, spawn_demo_scene, MaterialRegistry};

use super::composite::OutlineCompositePlugin;
use super::frame::{orbit_main_camera, run_outline_frame};
use super::host::{GpuHost, GpuHostState};
use super::input::handle_outline_input;
use super::mask_material::OutlineMaskMaterialPlugin;

/// Background colour of the main camera.
const SKY_COLOR: Color = Color::srgb(0.12, 0.11, 0.10);

/// Used until the window reports its size.
const FALLBACK_VIEW_SIZE: UVec2 = UVec2::new(1280, 720);

/// Outline plugin - sets up the demo scene and the per-frame outline pass.
pub struct OutlinePlugin;

impl Plugin for OutlinePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((OutlineCompositePlugin, OutlineMaskMaterialPlugin))
            .init_resource::<GpuHostState>()
            .add_systems(Startup, (setup_outline_view, enable_outline_effect).chain())
            .add_systems(Update, (handle_outline_input, orbit_main_camera))
            .add_systems(
                PostUpdate,
                run_outline_frame
                    .after(TransformSystem::TransformPropagate)
                    .after(CameraUpdateSystem)
                    .before(VisibilitySystems::UpdateFrusta),
            );
    }
}

/// Marker for the camera the outline is composited onto.
#[derive(Component)]
pub struct OutlineMainCamera;

/// The effect and the handles it renders between.
#[derive(Resource)]
pub struct OutlineView {
    pub effect: OutlineEffect,
    pub main_camera: CameraId,
    /// Main camera output, the effect's source image.
    pub source: TextureId,
    /// Where the composite writes, the same view target.
    pub destination: TextureId,
    /// Outcome of the last frame, for logging changes.
    pub last_outcome: Option<FrameOutcome>,
}

/// Spawn the demo scene and the main camera, and build the effect.
fn setup_outline_view(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut standard_materials: ResMut<Assets<StandardMaterial>>,
    mut host: ResMut<GpuHostState>,
    window_query: Query<&Window, With<PrimaryWindow>>,
) {
    let config = OutlineConfig::load();

    let materials = MaterialRegistry::new(&mut standard_materials, &mut host);
    spawn_demo_scene(&mut commands, &mut meshes, &materials);

    let transform = orbit_transform(0.0);
    let camera = commands
        .spawn((
            Camera3d::default(),
            Camera {
                clear_color: ClearColorConfig::Custom(SKY_COLOR),
                ..default()
            },
            transform,
            OutlineMainCamera,
            Name::new("main_camera"),
        ))
        .id();

    let size = window_query
        .get_single()
        .map(|w| UVec2::new(w.physical_width(), w.physical_height()))
        .unwrap_or(FALLBACK_VIEW_SIZE);
    let main_camera = host.register_camera(camera, "main", transform);
    let (source, destination) = host.register_view(main_camera, size);

    let settings = config.resolve(|name| materials.get(name));
    info!(
        "Outline view ready at {}x{} ({} target materials)",
        size.x,
        size.y,
        settings.targets.len()
    );

    commands.insert_resource(OutlineView {
        effect: OutlineEffect::new(main_camera, settings),
        main_camera,
        source,
        destination,
        last_outcome: None,
    });
    commands.insert_resource(materials);
    commands.insert_resource(config);
}

fn enable_outline_effect(mut host: GpuHost, view: Option<ResMut<OutlineView>>) {
    let Some(mut view) = view else {
        return;
    };
    view.effect.enable(&mut host);
}
