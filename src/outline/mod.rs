//! Selection outline post-process.
//!
//! Renderers that use one of the target materials are drawn into an
//! off-screen mask by an auxiliary camera, with a stencil-write material
//! swapped in for the duration of that render. A composite pass then blends
//! the main image with an edge colour that falls off with distance from the
//! outlined objects' screen positions.

pub mod anchors;
pub mod compositor;
pub mod config;
pub mod debug_dump;
mod effect;
pub mod error;
pub mod handles;
pub mod host;
pub mod mask;
pub mod resources;

pub use anchors::{collect_anchors, MAX_ANCHORS};
pub use config::{OutlineConfig, OutlineSettings, ShaderNames};
pub use effect::{EffectState, FrameOutcome, OutlineEffect, PassthroughReason};
pub use error::{DumpError, HostError, OutlineError};
pub use handles::{CameraId, MaterialId, RendererId, ShaderId, TargetMaterialSet, TextureId};
pub use host::{CameraRig, GraphicsDevice, ObjectFlags, OutlineHost, SceneRenderers};
pub use mask::{render_mask, MaskPass};
pub use resources::OutlineResources;
