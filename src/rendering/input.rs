//! Keyboard controls for the outline effect.
//!
//! - Space: dump the mask to PNG (needs `debugging: true` in the config)
//! - E: toggle the effect on and off
//! - R: reload the config file and re-validate

use bevy::prelude::*;

use crate::outline::OutlineConfig;
use crate::world::MaterialRegistry;

use super::host::GpuHost;
use super::plugin::OutlineView;

pub const DUMP_KEY: KeyCode = KeyCode::Space;
pub const TOGGLE_KEY: KeyCode = KeyCode::KeyE;
pub const RELOAD_KEY: KeyCode = KeyCode::KeyR;

/// Handle the outline key bindings.
pub fn handle_outline_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    materials: Option<Res<MaterialRegistry>>,
    config: Option<ResMut<OutlineConfig>>,
    view: Option<ResMut<OutlineView>>,
    mut host: GpuHost,
) {
    let (Some(materials), Some(mut config), Some(mut view)) = (materials, config, view) else {
        return;
    };
    let host = &mut host;

    if keyboard.just_pressed(DUMP_KEY) {
        if view.effect.settings().debugging {
            view.effect.request_mask_dump();
        } else {
            info!("Mask dumps are off; set `debugging: true` in the outline config");
        }
    }

    if keyboard.just_pressed(TOGGLE_KEY) {
        if view.effect.is_enabled() {
            view.effect.disable(host);
            info!("Outline effect disabled");
        } else {
            view.effect.enable(host);
            info!("Outline effect enabled");
        }
    }

    if keyboard.just_pressed(RELOAD_KEY) {
        let reloaded = OutlineConfig::load();
        let settings = reloaded.resolve(|name| materials.get(name));
        view.effect.set_settings(host, settings);
        *config = reloaded;
        info!("Outline config reloaded");
    }
}
