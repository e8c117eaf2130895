//! Selection Outline - Entry Point
//!
//! Orbits a small scene and outlines the objects whose materials are listed
//! in assets/data/rendering/outline.ron.
//!
//! Controls:
//! - Space: Save the mask to PNG (with `debugging: true`)
//! - E: Toggle the effect
//! - R: Reload the outline config

use bevy::prelude::*;

fn main() {
    App::new()
        // Bevy default plugins
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Selection Outline".to_string(),
                resolution: (1280.0, 720.0).into(),
                ..default()
            }),
            ..default()
        }))

        // Our plugin
        .add_plugins(selection_outline::SelectionOutlinePlugin)

        .run();
}
