//! Outline configuration loaded from an external RON file.
//!
//! Allows tweaking the effect without recompilation.

use std::fs;
use std::path::{Path, PathBuf};

use bevy::color::LinearRgba;
use bevy::log::{error, info, warn};
use bevy::prelude::Resource;
use serde::Deserialize;

use super::anchors::MAX_ANCHORS;
use super::handles::{MaterialId, TargetMaterialSet};

/// Default config location, relative to the working directory.
pub const CONFIG_PATH: &str = "assets/data/rendering/outline.ron";

/// Shader looked up when no stencil-write shader is configured.
pub const DEFAULT_STENCIL_SHADER: &str = "hidden/outline_mask";
/// Shader looked up when no composite shader is configured.
pub const DEFAULT_COMPOSITE_SHADER: &str = "hidden/mask_composite";

/// Outline configuration as written in assets/data/rendering/outline.ron.
#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    /// Names of materials whose renderers get outlined.
    pub target_materials: Vec<String>,
    /// Stencil-write shader name. `None` uses the built-in mask shader.
    pub stencil_shader: Option<String>,
    /// Composite shader name. `None` uses the built-in composite shader.
    pub composite_shader: Option<String>,
    pub falloff_distance: f32,
    /// Exponent applied to the falloff curve.
    pub falloff_power: f32,
    /// RGBA, linear.
    pub edge_color: (f32, f32, f32, f32),
    /// Enables mask dumps.
    pub debugging: bool,
    /// 1 tracks a single object, up to 8 tracks several.
    pub max_anchors: usize,
    pub dump_path: String,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            target_materials: Vec::new(),
            stencil_shader: None,
            composite_shader: None,
            falloff_distance: 0.1,
            falloff_power: 2.0,
            edge_color: (1.0, 0.92, 0.016, 1.0),
            debugging: false,
            max_anchors: MAX_ANCHORS,
            dump_path: "assets/mask_debug.png".to_string(),
        }
    }
}

impl OutlineConfig {
    /// Load from the default path, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(Path::new(CONFIG_PATH))
    }

    /// Load from a RON file, falling back to defaults on any error.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!("Loaded outline config from {}", path.display());
                    config
                }
                Err(e) => {
                    error!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Could not read {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(contents)
    }

    pub fn shader_names(&self) -> ShaderNames {
        ShaderNames {
            stencil: self.stencil_shader.clone(),
            composite: self.composite_shader.clone(),
        }
    }

    /// Resolve material names to handles. Unknown names are skipped with a warning.
    pub fn resolve(&self, lookup: impl Fn(&str) -> Option<MaterialId>) -> OutlineSettings {
        let mut targets = TargetMaterialSet::new();
        for name in &self.target_materials {
            match lookup(name) {
                Some(material) => {
                    targets.insert(material);
                }
                None => warn!("Outline target material '{}' is not registered", name),
            }
        }

        let (r, g, b, a) = self.edge_color;
        OutlineSettings {
            targets,
            shaders: self.shader_names(),
            falloff_distance: self.falloff_distance,
            falloff_power: self.falloff_power,
            edge_color: LinearRgba::new(r, g, b, a),
            debugging: self.debugging,
            anchor_cap: self.max_anchors.clamp(1, MAX_ANCHORS),
            dump_path: PathBuf::from(&self.dump_path),
        }
    }
}

/// Explicitly assigned shader names; unset entries fall back to the built-ins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderNames {
    pub stencil: Option<String>,
    pub composite: Option<String>,
}

impl ShaderNames {
    pub fn stencil(&self) -> &str {
        self.stencil.as_deref().unwrap_or(DEFAULT_STENCIL_SHADER)
    }

    pub fn composite(&self) -> &str {
        self.composite.as_deref().unwrap_or(DEFAULT_COMPOSITE_SHADER)
    }
}

/// Runtime settings with material names resolved to handles.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineSettings {
    pub targets: TargetMaterialSet,
    pub shaders: ShaderNames,
    pub falloff_distance: f32,
    pub falloff_power: f32,
    pub edge_color: LinearRgba,
    pub debugging: bool,
    /// Anchors passed to the composite, 1..=8.
    pub anchor_cap: usize,
    pub dump_path: PathBuf,
}

impl Default for OutlineSettings {
    fn default() -> Self {
        OutlineConfig::default().resolve(|_| None)
    }
}
