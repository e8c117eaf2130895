//! Rendering module - Bevy integration of the outline effect.

mod composite;
mod frame;
mod host;
mod input;
mod mask_material;
mod plugin;

pub use composite::{OutlineComposite, OutlineCompositePlugin, OutlineCompositeSettings};
pub use frame::{orbit_main_camera, run_outline_frame};
pub use host::{project_point, unpad_rows, GpuCamera, GpuHost, GpuHostState, GpuTexture};
pub use input::{handle_outline_input, DUMP_KEY, RELOAD_KEY, TOGGLE_KEY};
pub use mask_material::{OutlineMaskMaterial, OutlineMaskMaterialPlugin, OutlineMaskProxy, MASK_LAYER};
pub use plugin::{OutlineMainCamera, OutlinePlugin, OutlineView};
