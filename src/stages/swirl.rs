//! Rotational impulse between two paired sources.

use glam::Vec2;

use super::StageContext;
use crate::grid::Field;
use crate::pass::ShaderPass;
use crate::source::SwirlImpulse;

pub const FRAGMENT: &str = r#"
struct Params {
    header: PassHeader,
    center: vec2<f32>,
    extent: vec2<f32>,
    strength: f32,
    _pad0: f32,
    _pad1: vec2<f32>,
};

@group(0) @binding(0) var<uniform> params: Params;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let r = length(in.local);
    if (r >= 1.0 || r <= 0.0) {
        return vec4<f32>(0.0);
    }
    let tangent = vec2<f32>(-in.local.y, in.local.x) / r;
    let v = tangent * params.strength * 4.0 * r * (1.0 - r) * (1.0 - r);
    return vec4<f32>(v.x, -v.y, 0.0, 0.0);
}
"#;

/// Tangential velocity (NDC orientation, y up) at a quad-local position.
///
/// Peaks at a third of the radius and vanishes at the center and rim.
pub fn tangential(local: Vec2, strength: f32) -> Vec2 {
    let r = local.length();
    if r >= 1.0 || r <= 0.0 {
        return Vec2::ZERO;
    }
    let tangent = local.perp() / r;
    tangent * strength * 4.0 * r * (1.0 - r) * (1.0 - r)
}

/// Add one swirl into `velocity`.
pub fn apply_swirl(ctx: &StageContext, impulse: &SwirlImpulse, velocity: &mut Field<Vec2>) {
    ShaderPass::quad("swirl", impulse.center, impulse.extent).render(ctx.grid, velocity, |frag| {
        let v = tangential(frag.local, impulse.strength);
        Vec2::new(v.x, -v.y)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridSize;
    use crate::pass::uv_to_ndc;

    #[test]
    fn test_kernel_is_purely_tangential() {
        for local in [Vec2::new(0.3, 0.1), Vec2::new(-0.5, 0.5), Vec2::new(0.0, -0.9)] {
            let v = tangential(local, 2.0);
            assert!(v.dot(local).abs() < 1e-6);
            assert!(v.length() > 0.0);
        }
        assert_eq!(tangential(Vec2::ZERO, 1.0), Vec2::ZERO);
        assert_eq!(tangential(Vec2::new(1.0, 0.0), 1.0), Vec2::ZERO);
    }

    #[test]
    fn test_positive_strength_turns_counter_clockwise() {
        // To the right of center the flow points up.
        let v = tangential(Vec2::new(0.5, 0.0), 1.0);
        assert!(v.y > 0.0);
    }

    #[test]
    fn test_swirl_field_is_tangential_around_center() {
        let grid = GridSize::new(48, 48);
        let ctx = StageContext::new(grid, false, 0.016);
        let impulse = SwirlImpulse {
            center: Vec2::ZERO,
            extent: Vec2::splat(0.5),
            strength: 3.0,
        };
        let mut velocity = Field::new(grid);
        apply_swirl(&ctx, &impulse, &mut velocity);

        let cs = grid.cell_scale().0;
        let mut touched = 0;
        for y in 0..48 {
            for x in 0..48 {
                let v = velocity.get(x, y);
                let uv = (Vec2::new(x as f32, y as f32) + 0.5) * cs;
                let ndc = uv_to_ndc(uv);
                let v_ndc = Vec2::new(v.x, -v.y);
                assert!(v_ndc.dot(ndc).abs() < 1e-5, "radial leak at ({}, {})", x, y);
                if ndc.length() > 0.55 {
                    assert_eq!(v, Vec2::ZERO);
                }
                if v != Vec2::ZERO {
                    touched += 1;
                }
            }
        }
        assert!(touched > 100);
    }
}
