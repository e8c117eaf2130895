//! Selection Outline - a screen-space outline post-process.
//!
//! Objects using one of a configured set of materials are rendered into an
//! off-screen mask by an auxiliary camera, then a full-screen composite blends
//! an edge colour over the main image with a falloff around the outlined
//! objects' screen positions.
//!
//! # Architecture
//!
//! - **Outline**: the effect itself, written against host traits
//! - **Rendering**: the Bevy host for those traits, the mask material, the
//!   composite pass and the plugin driving the effect each frame
//! - **World**: the demo scene and its materials
//!
//! Tests also run the effect on a CPU host that rasterises bounding boxes.

pub mod outline;
pub mod rendering;
pub mod world;

#[cfg(test)]
mod software;

use bevy::prelude::*;

/// Main plugin that adds all sub-plugins.
pub struct SelectionOutlinePlugin;

impl Plugin for SelectionOutlinePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(rendering::OutlinePlugin);
    }
}
