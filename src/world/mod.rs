//! World module - the demo scene the outline effect runs on.

mod materials;
mod spawning;

pub use materials::MaterialRegistry;
pub use spawning::{orbit_transform, DemoProp, spawn_demo_scene, ORBIT_HEIGHT, ORBIT_RADIUS, ORBIT_SPEED};
