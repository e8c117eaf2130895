//! Demo scene construction and the orbiting main camera.

use bevy::prelude::*;

use super::materials::MaterialRegistry;

/// Radius of the main camera's orbit around the origin.
pub const ORBIT_RADIUS: f32 = 12.0;
/// Height of the main camera above the floor.
pub const ORBIT_HEIGHT: f32 = 5.0;
/// Orbit speed in radians per second.
pub const ORBIT_SPEED: f32 = 0.25;

/// A box in the demo scene.
struct Prop {
    name: &'static str,
    material: &'static str,
    center: Vec3,
    half_extents: Vec3,
}

const PROPS: &[Prop] = &[
    Prop {
        name: "floor",
        material: "stone",
        center: Vec3::new(0.0, -0.5, 0.0),
        half_extents: Vec3::new(10.0, 0.5, 10.0),
    },
    Prop {
        name: "pillar_north",
        material: "stone",
        center: Vec3::new(0.0, 2.0, -6.0),
        half_extents: Vec3::new(0.6, 2.0, 0.6),
    },
    Prop {
        name: "table",
        material: "wood",
        center: Vec3::new(-3.0, 0.5, 1.0),
        half_extents: Vec3::new(1.2, 0.5, 0.8),
    },
    Prop {
        name: "anvil",
        material: "metal",
        center: Vec3::new(3.5, 0.4, -2.0),
        half_extents: Vec3::new(0.6, 0.4, 0.4),
    },
    Prop {
        name: "crate_a",
        material: "crate",
        center: Vec3::new(2.0, 0.5, 2.5),
        half_extents: Vec3::splat(0.5),
    },
    Prop {
        name: "crate_b",
        material: "crate",
        center: Vec3::new(-4.5, 0.75, -3.0),
        half_extents: Vec3::splat(0.75),
    },
    Prop {
        name: "crate_decoy",
        material: "crate_copy",
        center: Vec3::new(5.0, 0.5, 4.0),
        half_extents: Vec3::splat(0.5),
    },
    Prop {
        name: "lantern",
        material: "lantern",
        center: Vec3::new(-3.0, 1.3, 1.0),
        half_extents: Vec3::new(0.2, 0.3, 0.2),
    },
];

/// Marker for entities belonging to the demo scene.
#[derive(Component)]
pub struct DemoProp;

/// Spawn the demo props and the lights that show them.
pub fn spawn_demo_scene(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &MaterialRegistry,
) -> usize {
    for prop in PROPS {
        commands.spawn((
            Mesh3d(meshes.add(Cuboid::from_size(prop.half_extents * 2.0))),
            MeshMaterial3d(materials.handle_or_default(prop.material)),
            Transform::from_translation(prop.center),
            Name::new(prop.name),
            DemoProp,
        ));
    }

    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.6, 0.6, 0.7),
        brightness: 200.0,
    });

    commands.spawn((
        DirectionalLight {
            color: Color::srgb(0.9, 0.85, 0.8),
            illuminance: 4000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::XYZ,
            -std::f32::consts::FRAC_PI_3,
            std::f32::consts::FRAC_PI_6,
            0.0,
        )),
        DemoProp,
    ));

    // Warm light over the table, next to the lantern
    commands.spawn((
        PointLight {
            color: Color::srgb(1.0, 0.8, 0.5),
            intensity: 80_000.0,
            range: 12.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(-3.0, 3.0, 1.0),
        DemoProp,
    ));

    info!("Spawned {} demo props", PROPS.len());
    PROPS.len()
}

/// Main camera pose at `angle` radians around the orbit, looking at the origin.
pub fn orbit_transform(angle: f32) -> Transform {
    Transform::from_xyz(
        ORBIT_RADIUS * angle.cos(),
        ORBIT_HEIGHT,
        ORBIT_RADIUS * angle.sin(),
    )
    .looking_at(Vec3::new(0.0, 0.5, 0.0), Vec3::Y)
}
