//! Mask dumps to PNG for inspecting what the mask camera saw.

use std::fs;
use std::path::{Path, PathBuf};

use bevy::log::{debug, error, info};
use image::ExtendedColorType;

use super::error::{DumpError, HostError};
use super::handles::TextureId;
use super::host::GraphicsDevice;

/// Writes the mask target to disk once per request.
#[derive(Debug, Clone, Default)]
pub struct MaskDumper {
    requested: bool,
}

impl MaskDumper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a dump the next time a mask is available.
    pub fn request(&mut self) {
        self.requested = true;
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }

    /// Write the mask if a dump was requested. Never fails: errors are logged
    /// and clear the request. A readback that has not arrived yet keeps it.
    pub fn dump_if_requested<D: GraphicsDevice>(
        &mut self,
        device: &D,
        mask: TextureId,
        path: &Path,
    ) -> Option<PathBuf> {
        if !std::mem::take(&mut self.requested) {
            return None;
        }

        match write_mask(device, mask, path) {
            Ok(()) => {
                info!("Mask saved to: {}", path.display());
                Some(path.to_path_buf())
            }
            Err(DumpError::Readback(HostError::ReadbackPending(_))) => {
                debug!("Mask readback not ready, dumping on a later frame");
                self.requested = true;
                None
            }
            Err(e) => {
                error!("Failed to save mask: {}", e);
                None
            }
        }
    }
}

/// Read `mask` back and encode it as an RGBA PNG at `path`, overwriting.
pub fn write_mask<D: GraphicsDevice>(
    device: &D,
    mask: TextureId,
    path: &Path,
) -> Result<(), DumpError> {
    let pixels = device.read_pixels(mask)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| DumpError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    image::save_buffer(
        path,
        &pixels.rgba,
        pixels.size.x,
        pixels.size.y,
        ExtendedColorType::Rgba8,
    )
    .map_err(|source| DumpError::Encode {
        path: path.to_path_buf(),
        source,
    })
}
