//! Final composite of density, gradient highlight and speed tint.

use glam::{Vec3, Vec4};
use rayon::prelude::*;

use crate::grid::Field;

pub const FRAGMENT: &str = r#"
struct Params {
    background: vec4<f32>,
    // rgb, gain
    highlight: vec4<f32>,
    // rgb, gain
    speed_tint: vec4<f32>,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var density: texture_2d<f32>;
@group(0) @binding(2) var gradient: texture_2d<f32>;
@group(0) @binding(3) var field_sampler: sampler;

@fragment
fn fs_main(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let d = textureSample(density, field_sampler, in.uv);
    let g = textureSample(gradient, field_sampler, in.uv);
    let base = params.background.rgb * (1.0 - min(d.a, 1.0)) + d.rgb;
    let edge = params.highlight.rgb * min(g.z * params.highlight.a, 1.0);
    let tint = params.speed_tint.rgb * min(g.w * params.speed_tint.a, 1.0);
    return vec4<f32>(clamp(base + edge + tint, vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
}
"#;

/// Colours and gains for the composite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutputStyle {
    pub background: Vec3,
    pub highlight: Vec3,
    /// Gradient magnitude multiplier before saturating the highlight.
    pub highlight_gain: f32,
    pub speed_tint: Vec3,
    /// Speed multiplier before saturating the tint.
    pub speed_gain: f32,
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self {
            background: Vec3::new(0.02, 0.02, 0.04),
            highlight: Vec3::new(0.6, 0.7, 0.9),
            highlight_gain: 4.0,
            speed_tint: Vec3::new(0.05, 0.12, 0.25),
            speed_gain: 2.0,
        }
    }
}

impl OutputStyle {
    pub fn composite(&self, density: Vec4, gradient: Vec4) -> Vec3 {
        let base = self.background * (1.0 - density.w.min(1.0)) + density.truncate();
        let edge = self.highlight * (gradient.z * self.highlight_gain).min(1.0);
        let tint = self.speed_tint * (gradient.w * self.speed_gain).min(1.0);
        (base + edge + tint).clamp(Vec3::ZERO, Vec3::ONE)
    }
}

/// Composite every cell into tightly packed RGBA8, row 0 first.
pub fn render_rgba8(style: &OutputStyle, density: &Field<Vec4>, gradient: &Field<Vec4>, out: &mut Vec<u8>) {
    out.resize(density.data().len() * 4, 0);
    out.par_chunks_mut(4)
        .zip(density.data().par_iter().zip(gradient.data().par_iter()))
        .for_each(|(px, (d, g))| {
            let c = style.composite(*d, *g);
            px[0] = (c.x * 255.0).round() as u8;
            px[1] = (c.y * 255.0).round() as u8;
            px[2] = (c.z * 255.0).round() as u8;
            px[3] = 255;
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridSize;

    #[test]
    fn test_empty_field_shows_background() {
        let style = OutputStyle::default();
        assert_eq!(style.composite(Vec4::ZERO, Vec4::ZERO), style.background);
    }

    #[test]
    fn test_full_density_hides_background() {
        let style = OutputStyle::default();
        let c = style.composite(Vec4::new(0.5, 0.0, 0.0, 1.0), Vec4::ZERO);
        assert_eq!(c, Vec3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_rgba8_layout() {
        let grid = GridSize::new(3, 2);
        let mut density = Field::new(grid);
        density.set(2, 1, Vec4::new(1.0, 1.0, 1.0, 1.0));
        let gradient = Field::new(grid);
        let mut out = Vec::new();
        render_rgba8(&OutputStyle::default(), &density, &gradient, &mut out);
        assert_eq!(out.len(), 3 * 2 * 4);
        assert_eq!(&out[20..24], &[255, 255, 255, 255]);
        assert_eq!(out[3], 255);
    }
}
