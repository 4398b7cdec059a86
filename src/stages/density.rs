//! Density transport and injection.
//!
//! Density is an RGBA field: `rgb` holds colour weighted by amount and `a`
//! holds the amount. One pass advects the previous field, adds material from
//! every point and line source, dissipates, and clamps to `[0, 1]`.

use glam::{Vec2, Vec4};

use super::StageContext;
use crate::grid::{CellScale, Field};
use crate::source::{LineSource, PointSource};

pub const FRAGMENT: &str = r#"
const MAX_SOURCES: u32 = 52u;

struct Params {
    header: PassHeader,
    ratio: vec2<f32>,
    dt: f32,
    dissipation: f32,
    counts: vec4<u32>,
    // uv.xy, radius, strength
    points: array<vec4<f32>, 52>,
    point_colors: array<vec4<f32>, 52>,
    // a.xy, b.xy
    lines: array<vec4<f32>, 52>,
    // radius, strength, unused, unused
    line_params: array<vec4<f32>, 52>,
    line_colors: array<vec4<f32>, 52>,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var velocity: texture_2d<f32>;
@group(0) @binding(2) var density: texture_2d<f32>;

fn disc(dist: f32, radius: f32) -> f32 {
    return 1.0 - smoothstep(radius * 0.5, radius, dist);
}

fn segment_distance(p: vec2<f32>, a: vec2<f32>, b: vec2<f32>) -> f32 {
    let pa = p - a;
    let ba = b - a;
    let len2 = dot(ba, ba);
    var h = 0.0;
    if (len2 > 0.0) {
        h = clamp(dot(pa, ba) / len2, 0.0, 1.0);
    }
    return length(pa - ba * h);
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let cell = frag_cell(in.position);
    let b = active_bounds(params.header);
    let uv = cell_uv(cell, params.header);
    let cells = vec2<f32>(grid_size(params.header));

    let v = load_cell(velocity, cell, b).xy;
    var value = sample_field(density, uv - v * params.ratio * params.dt, b, params.header);

    let p = uv * cells;
    for (var i = 0u; i < min(params.counts.x, MAX_SOURCES); i = i + 1u) {
        let s = params.points[i];
        let w = s.w * disc(length(p - s.xy * cells), s.z);
        value = value + vec4<f32>(params.point_colors[i].rgb * w, w);
    }
    for (var i = 0u; i < min(params.counts.y, MAX_SOURCES); i = i + 1u) {
        let l = params.lines[i];
        let lp = params.line_params[i];
        let w = lp.y * disc(segment_distance(p, l.xy * cells, l.zw * cells), lp.x);
        value = value + vec4<f32>(params.line_colors[i].rgb * w, w);
    }

    return clamp(value * params.dissipation, vec4<f32>(0.0), vec4<f32>(1.0));
}
"#;

/// Disc falloff: full strength inside half the radius, zero at the radius.
#[inline]
pub fn disc(dist: f32, radius: f32) -> f32 {
    1.0 - smoothstep(radius * 0.5, radius, dist)
}

fn smoothstep(lo: f32, hi: f32, x: f32) -> f32 {
    let t = ((x - lo) / (hi - lo)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Distance from `p` to the segment `ab`.
pub fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let pa = p - a;
    let ba = b - a;
    let len2 = ba.length_squared();
    let h = if len2 > 0.0 { (pa.dot(ba) / len2).clamp(0.0, 1.0) } else { 0.0 };
    (pa - ba * h).length()
}

/// Material injected at `uv` by every source, in `(rgb * w, w)` form.
pub fn injection(uv: Vec2, cell_scale: CellScale, points: &[PointSource], lines: &[LineSource]) -> Vec4 {
    let cells = Vec2::ONE / cell_scale.0;
    let p = uv * cells;
    let mut value = Vec4::ZERO;
    for s in points {
        let w = s.strength * disc((p - s.uv * cells).length(), s.radius);
        value += (s.color * w).extend(w);
    }
    for l in lines {
        let w = l.strength * disc(segment_distance(p, l.a * cells, l.b * cells), l.radius);
        value += (l.color * w).extend(w);
    }
    value
}

/// Advect `density` along `velocity`, inject sources, dissipate and clamp.
pub fn transport(
    ctx: &StageContext,
    dissipation: f32,
    points: &[PointSource],
    lines: &[LineSource],
    velocity: &Field<Vec2>,
    density: &Field<Vec4>,
    out: &mut Field<Vec4>,
) {
    let bounds = ctx.bounds();
    let step = ctx.backtrace_step();
    let cell_scale = ctx.cell_scale;
    ctx.face("density").render(ctx.grid, out, |frag| {
        let v = velocity.load(frag.cell, bounds);
        let carried = density.sample(frag.uv - v * step, bounds);
        let value = carried + injection(frag.uv, cell_scale, points, lines);
        (value * dissipation).clamp(Vec4::ZERO, Vec4::ONE)
    });
}
