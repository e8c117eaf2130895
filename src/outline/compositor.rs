//! Final full-screen pass: source image + mask + anchors -> destination.

use bevy::color::LinearRgba;
use bevy::math::Vec3;

use super::anchors::MAX_ANCHORS;
use super::error::HostError;
use super::handles::{MaterialId, TextureId};
use super::host::{GraphicsDevice, UniformValue};

// Uniform names read by the composite shader.
pub const MAIN_TEXTURE: &str = "main_texture";
pub const MASK_TEXTURE: &str = "mask_texture";
pub const FALLOFF_DISTANCE: &str = "falloff_distance";
pub const FALLOFF_POWER: &str = "falloff_power";
pub const EDGE_COLOR: &str = "edge_color";
pub const OBJECT_COUNT: &str = "object_count";
pub const OBJECT_POSITIONS: [&str; MAX_ANCHORS] = [
    "object_pos_0",
    "object_pos_1",
    "object_pos_2",
    "object_pos_3",
    "object_pos_4",
    "object_pos_5",
    "object_pos_6",
    "object_pos_7",
];

/// Falloff parameters and edge colour for one composite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeParams {
    pub falloff_distance: f32,
    pub falloff_power: f32,
    pub edge_color: LinearRgba,
}

/// Bind every composite uniform on `material`, then blit `source` into
/// `destination` through it. Anchors past `MAX_ANCHORS` are ignored.
pub fn composite<D: GraphicsDevice>(
    device: &mut D,
    material: MaterialId,
    source: TextureId,
    mask: TextureId,
    destination: TextureId,
    params: &CompositeParams,
    anchors: &[Vec3],
) -> Result<(), HostError> {
    device.set_uniform(material, MAIN_TEXTURE, UniformValue::Texture(source))?;
    device.set_uniform(material, MASK_TEXTURE, UniformValue::Texture(mask))?;
    device.set_uniform(
        material,
        FALLOFF_DISTANCE,
        UniformValue::Float(params.falloff_distance),
    )?;
    device.set_uniform(material, FALLOFF_POWER, UniformValue::Float(params.falloff_power))?;
    device.set_uniform(material, EDGE_COLOR, UniformValue::Color(params.edge_color))?;

    let count = anchors.len().min(MAX_ANCHORS);
    device.set_uniform(material, OBJECT_COUNT, UniformValue::Int(count as i32))?;
    for (name, anchor) in OBJECT_POSITIONS.iter().zip(&anchors[..count]) {
        device.set_uniform(material, name, UniformValue::Vector(anchor.extend(0.0)))?;
    }

    device.blit(source, destination, Some(material))
}
