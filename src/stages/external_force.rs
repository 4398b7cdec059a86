//! Localized force injection.
//!
//! One additive quad per active source. The kernel falls off quadratically
//! from the quad center to its rim, so overlapping impulses simply add.

use glam::Vec2;

use super::StageContext;
use crate::grid::Field;
use crate::pass::ShaderPass;
use crate::source::ForceImpulse;

pub const FRAGMENT: &str = r#"
struct Params {
    header: PassHeader,
    center: vec2<f32>,
    extent: vec2<f32>,
    force: vec2<f32>,
    _pad: vec2<f32>,
};

@group(0) @binding(0) var<uniform> params: Params;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let d = min(length(in.local), 1.0);
    let falloff = (1.0 - d) * (1.0 - d);
    return vec4<f32>(params.force * falloff, 0.0, 0.0);
}
"#;

/// Kernel weight at a quad-local position.
#[inline]
pub fn falloff(local: Vec2) -> f32 {
    let d = local.length().min(1.0);
    (1.0 - d) * (1.0 - d)
}

/// Add one impulse into `velocity`.
pub fn apply_force(ctx: &StageContext, impulse: &ForceImpulse, velocity: &mut Field<Vec2>) {
    ShaderPass::quad("external force", impulse.center, impulse.extent)
        .render(ctx.grid, velocity, |frag| impulse.force * falloff(frag.local));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::force_impulse;
    use crate::grid::GridSize;
    use crate::source::Source;

    #[test]
    fn test_falloff_profile() {
        assert_eq!(falloff(Vec2::ZERO), 1.0);
        assert!((falloff(Vec2::new(0.5, 0.0)) - 0.25).abs() < 1e-6);
        assert_eq!(falloff(Vec2::new(1.0, 1.0)), 0.0);
    }

    #[test]
    fn test_force_is_local() {
        let grid = GridSize::new(64, 64);
        let ctx = StageContext::new(grid, false, 0.016);
        let source = Source {
            coords: Vec2::ZERO,
            diff: Vec2::new(0.1, 0.0),
            moved: true,
        };
        let impulse = force_impulse(&source, 10.0, 6.0, grid.cell_scale());
        let mut velocity = Field::new(grid);
        apply_force(&ctx, &impulse, &mut velocity);

        assert!(velocity.get(32, 32).x > 0.3);
        for y in 0..64 {
            for x in 0..64 {
                let far = (x as i32 - 32).abs() > 7 || (y as i32 - 32).abs() > 7;
                if far {
                    assert_eq!(velocity.get(x, y), Vec2::ZERO, "cell ({}, {})", x, y);
                }
            }
        }
    }

    #[test]
    fn test_impulses_add() {
        let grid = GridSize::new(32, 32);
        let ctx = StageContext::new(grid, false, 0.016);
        let impulse = ForceImpulse {
            center: Vec2::ZERO,
            extent: Vec2::splat(0.25),
            force: Vec2::new(0.0, 1.0),
        };
        let mut once = Field::new(grid);
        apply_force(&ctx, &impulse, &mut once);
        let mut twice = Field::new(grid);
        apply_force(&ctx, &impulse, &mut twice);
        apply_force(&ctx, &impulse, &mut twice);
        for (a, b) in once.data().iter().zip(twice.data()) {
            assert!((*a * 2.0 - *b).length() < 1e-6);
        }
    }
}
