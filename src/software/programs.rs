//! Built-in shader programs of the software host.

use std::collections::HashMap;

use bevy::color::LinearRgba;
use bevy::math::{Vec2, Vec4};

use crate::outline::compositor::{
    EDGE_COLOR, FALLOFF_DISTANCE, FALLOFF_POWER, MAIN_TEXTURE, MASK_TEXTURE, OBJECT_COUNT,
    OBJECT_POSITIONS,
};
use crate::outline::config::{DEFAULT_COMPOSITE_SHADER, DEFAULT_STENCIL_SHADER};
use crate::outline::error::HostError;
use crate::outline::handles::{MaterialId, TextureId};
use crate::outline::host::{ObjectFlags, UniformValue};

use super::texture::{decode, encode, encode_color, SoftwareTexture};

pub const STANDARD_SHADER: &str = "standard";
/// Uniform read by the standard program.
pub const BASE_COLOR: &str = "base_color";

/// What a shader does when drawn or blitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderProgram {
    /// Unlit `base_color`, writes colour and depth.
    Standard,
    /// Writes stencil 1 and an alpha tag; colour writes are masked off.
    StencilWrite,
    /// Full-screen mask composite with anchor falloff.
    MaskComposite,
}

impl ShaderProgram {
    /// Programs registered under their lookup names at startup.
    pub fn builtins() -> [(&'static str, ShaderProgram); 3] {
        [
            (STANDARD_SHADER, ShaderProgram::Standard),
            (DEFAULT_STENCIL_SHADER, ShaderProgram::StencilWrite),
            (DEFAULT_COMPOSITE_SHADER, ShaderProgram::MaskComposite),
        ]
    }
}

/// A material instance: a program plus its uniform values.
#[derive(Debug, Clone, PartialEq)]
pub struct SoftwareMaterial {
    pub program: ShaderProgram,
    pub flags: ObjectFlags,
    pub uniforms: HashMap<String, UniformValue>,
}

impl SoftwareMaterial {
    pub fn new(program: ShaderProgram, flags: ObjectFlags) -> Self {
        Self {
            program,
            flags,
            uniforms: HashMap::new(),
        }
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.uniforms.get(name)? {
            UniformValue::Float(v) => Some(*v),
            UniformValue::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        match self.uniforms.get(name)? {
            UniformValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn color(&self, name: &str) -> Option<LinearRgba> {
        match self.uniforms.get(name)? {
            UniformValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn vector(&self, name: &str) -> Option<Vec4> {
        match self.uniforms.get(name)? {
            UniformValue::Vector(v) => Some(*v),
            _ => None,
        }
    }

    pub fn texture(&self, name: &str) -> Option<TextureId> {
        match self.uniforms.get(name)? {
            UniformValue::Texture(t) => Some(*t),
            _ => None,
        }
    }

    /// Colour the standard program draws with.
    pub fn base_color(&self) -> [u8; 4] {
        encode_color(self.color(BASE_COLOR).unwrap_or(LinearRgba::WHITE))
    }
}

/// Uniform inputs of the composite program, gathered from a material.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeInputs {
    pub main: TextureId,
    pub mask: TextureId,
    pub falloff_distance: f32,
    pub falloff_power: f32,
    pub edge_color: Vec4,
    pub anchors: Vec<Vec2>,
}

impl CompositeInputs {
    pub fn gather(id: MaterialId, material: &SoftwareMaterial) -> Result<Self, HostError> {
        let missing = |uniform| HostError::MissingUniform {
            material: id,
            uniform,
        };
        let main = material.texture(MAIN_TEXTURE).ok_or(missing(MAIN_TEXTURE))?;
        let mask = material.texture(MASK_TEXTURE).ok_or(missing(MASK_TEXTURE))?;
        let edge = encode_color(
            material
                .color(EDGE_COLOR)
                .ok_or(missing(EDGE_COLOR))?,
        );

        let count = material
            .int(OBJECT_COUNT)
            .unwrap_or(0)
            .clamp(0, OBJECT_POSITIONS.len() as i32) as usize;
        let anchors = OBJECT_POSITIONS[..count]
            .iter()
            .filter_map(|name| material.vector(name))
            .map(|v| v.truncate().truncate())
            .collect();

        Ok(Self {
            main,
            mask,
            falloff_distance: material.float(FALLOFF_DISTANCE).unwrap_or(0.0),
            falloff_power: material.float(FALLOFF_POWER).unwrap_or(1.0),
            edge_color: decode(edge),
            anchors,
        })
    }

    /// Edge weight at `uv`: 1 on an anchor, fading to 0 at `falloff_distance`.
    pub fn falloff(&self, uv: Vec2) -> f32 {
        let Some(nearest) = self
            .anchors
            .iter()
            .map(|anchor| anchor.distance(uv))
            .reduce(f32::min)
        else {
            return 0.0;
        };
        if self.falloff_distance <= 0.0 {
            return 0.0;
        }
        let t = (nearest / self.falloff_distance).min(1.0);
        (1.0 - t).powf(self.falloff_power.max(0.0))
    }
}

/// Run the composite over every destination pixel.
///
/// Marked mask pixels keep the source colour. Everything else is the source
/// tinted towards the edge colour, darkened to black by the falloff.
pub fn run_composite(
    inputs: &CompositeInputs,
    main: &SoftwareTexture,
    mask: &SoftwareTexture,
    destination: &mut SoftwareTexture,
) {
    let size = destination.size.as_vec2();
    let edge = inputs.edge_color;
    for row in 0..destination.size.y {
        for col in 0..destination.size.x {
            let uv = Vec2::new((col as f32 + 0.5) / size.x, 1.0 - (row as f32 + 0.5) / size.y);
            let source = main.sample(uv);
            let out = if mask.stencil_at(uv) != 0 {
                source
            } else {
                let tinted = source.lerp(edge, edge.w);
                let weight = inputs.falloff(uv);
                (tinted * weight).truncate().extend(1.0)
            };
            let index = destination.index(col, row);
            destination.color[index] = encode(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(anchors: Vec<Vec2>) -> CompositeInputs {
        CompositeInputs {
            main: TextureId(1),
            mask: TextureId(2),
            falloff_distance: 0.5,
            falloff_power: 1.0,
            edge_color: Vec4::ONE,
            anchors,
        }
    }

    #[test]
    fn falloff_peaks_on_anchor_and_fades() {
        let inputs = inputs(vec![Vec2::new(0.5, 0.5)]);
        assert!((inputs.falloff(Vec2::new(0.5, 0.5)) - 1.0).abs() < 1e-6);
        assert!((inputs.falloff(Vec2::new(0.75, 0.5)) - 0.5).abs() < 1e-6);
        assert_eq!(inputs.falloff(Vec2::new(0.0, 0.0)), 0.0);
    }

    #[test]
    fn no_anchors_means_no_edge() {
        assert_eq!(inputs(Vec::new()).falloff(Vec2::new(0.5, 0.5)), 0.0);
    }

    #[test]
    fn nearest_anchor_wins() {
        let inputs = inputs(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)]);
        assert!((inputs.falloff(Vec2::new(0.9, 0.9)) - inputs.falloff(Vec2::new(0.1, 0.1))).abs()
            < 1e-6);
    }
}
