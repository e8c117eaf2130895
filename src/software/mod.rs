//! Software host: a CPU implementation of the outline host traits.
//!
//! Renderers are axis-aligned boxes drawn as their projected screen
//! rectangles. Good enough to exercise the outline effect end to end, headless
//! and deterministic.

mod host;
mod programs;

pub use camera::SoftwareCamera;
pub use host::SoftwareHost;
pub use programs::ShaderProgram;
pub use scene::SceneRenderer;
