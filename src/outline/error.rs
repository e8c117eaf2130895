//! Error types for the outline effect and its host.

use std::path::PathBuf;

use thiserror::Error;

use super::handles::{CameraId, MaterialId, RendererId, ShaderId, TextureId};

/// Errors reported by a host implementation.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Unknown texture {0:?}")]
    UnknownTexture(TextureId),

    #[error("Unknown material {0:?}")]
    UnknownMaterial(MaterialId),

    #[error("Unknown shader {0:?}")]
    UnknownShader(ShaderId),

    #[error("Unknown camera {0:?}")]
    UnknownCamera(CameraId),

    #[error("Renderer {0:?} no longer exists")]
    RendererDestroyed(RendererId),

    /// The renderer exists but its material slots cannot be changed.
    #[error("Materials of renderer {0:?} are locked")]
    MaterialsLocked(RendererId),

    /// Texture contents have not been copied back from the GPU yet.
    #[error("No readback available for texture {0:?}")]
    ReadbackPending(TextureId),

    /// The host cannot draw into this texture.
    #[error("Texture {0:?} is not a render target")]
    NotRenderable(TextureId),

    /// The host has no way to copy between these two textures.
    #[error("Cannot blit {from:?} into {to:?}")]
    UnsupportedBlit { from: TextureId, to: TextureId },

    /// A texture was requested with a zero dimension.
    #[error("Invalid texture size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    /// A shader program ran without one of its required inputs.
    #[error("Material {material:?} is missing uniform '{uniform}'")]
    MissingUniform {
        material: MaterialId,
        uniform: &'static str,
    },
}

/// Errors raised while preparing or running the outline effect.
#[derive(Debug, Error)]
pub enum OutlineError {
    /// Neither the configured nor the fallback shader could be found.
    #[error("Shader '{0}' not found")]
    ShaderNotFound(String),

    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

/// Errors from writing a debug mask dump.
#[derive(Debug, Error)]
pub enum DumpError {
    #[error("Failed to read back mask: {0}")]
    Readback(#[from] HostError),

    #[error("Failed to create directory for '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode mask to '{path}': {source}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },
}
