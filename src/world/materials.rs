//! Material definitions and registry for the demo scene.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::outline::MaterialId;
use crate::rendering::GpuHostState;

/// Material registry mapping material names to handles.
#[derive(Resource)]
pub struct MaterialRegistry {
    materials: HashMap<String, (Handle<StandardMaterial>, MaterialId)>,
    fallback: String,
}

impl MaterialRegistry {
    pub fn new(materials: &mut Assets<StandardMaterial>, host: &mut GpuHostState) -> Self {
        let mut registry = HashMap::new();
        let mut add = |name: &str, material: StandardMaterial| {
            let handle = materials.add(material);
            let id = host.register_standard(&handle);
            registry.insert(name.to_string(), (handle, id));
        };

        // Stone (default) - desaturated grey-brown
        add(
            "stone",
            StandardMaterial {
                base_color: Color::srgb(0.28, 0.27, 0.26),
                perceptual_roughness: 0.9,
                ..default()
            },
        );

        // Wood - muted brown
        add(
            "wood",
            StandardMaterial {
                base_color: Color::srgb(0.35, 0.30, 0.25),
                perceptual_roughness: 0.7,
                ..default()
            },
        );

        // Metal - desaturated grey
        add(
            "metal",
            StandardMaterial {
                base_color: Color::srgb(0.42, 0.42, 0.44),
                perceptual_roughness: 0.3,
                metallic: 0.8,
                ..default()
            },
        );

        // Crate - warm planks, outlined by the default config
        let crate_planks = StandardMaterial {
            base_color: Color::srgb(0.55, 0.40, 0.22),
            perceptual_roughness: 0.8,
            ..default()
        };
        add("crate", crate_planks.clone());

        // Lantern - bright brass, outlined by the default config
        add(
            "lantern",
            StandardMaterial {
                base_color: Color::srgb(0.85, 0.70, 0.30),
                emissive: LinearRgba::rgb(0.6, 0.45, 0.15),
                perceptual_roughness: 0.4,
                metallic: 0.6,
                ..default()
            },
        );

        // Looks exactly like "crate" but is a separate asset, so it never
        // matches a "crate" target.
        add("crate_copy", crate_planks);

        Self {
            materials: registry,
            fallback: "stone".to_string(),
        }
    }

    /// Outline identity of a material.
    pub fn get(&self, name: &str) -> Option<MaterialId> {
        self.materials.get(name).map(|(_, id)| *id)
    }

    /// Material handle by name, or stone if unknown.
    pub fn handle_or_default(&self, name: &str) -> Handle<StandardMaterial> {
        match self.materials.get(name) {
            Some((handle, _)) => handle.clone(),
            None => {
                warn!("Unknown material '{}', using {}", name, self.fallback);
                self.materials
                    .get(&self.fallback)
                    .map(|(handle, _)| handle.clone())
                    .unwrap_or_default()
            }
        }
    }
}
