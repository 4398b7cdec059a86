//! WGSL validation for every composed stage module.
//!
//! Each module is parsed and validated with naga, its entry points are
//! checked against what the GPU backend binds, and the `Params` struct size
//! is compared with the Rust uniform block uploaded for it.

use std::mem::size_of;

use bodyflow::gpu::{
    AdvectionParams, DensityParams, ForceParams, HeaderParams, OutputParams, StepParams, SwirlParams,
    VortexParams, ViscousParams,
};
use bodyflow::shaders;

fn parse(label: &str, source: &str) -> naga::Module {
    let module = naga::front::wgsl::parse_str(source)
        .unwrap_or_else(|e| panic!("{}: WGSL parse error: {}", label, e.emit_to_string(source)));

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .unwrap_or_else(|e| panic!("{}: WGSL validation error: {:?}", label, e));
    module
}

fn entry_points(module: &naga::Module) -> Vec<&str> {
    module.entry_points.iter().map(|e| e.name.as_str()).collect()
}

fn params_size(module: &naga::Module) -> u32 {
    module
        .types
        .iter()
        .find_map(|(_, ty)| match (&ty.name, &ty.inner) {
            (Some(name), naga::TypeInner::Struct { span, .. }) if name == "Params" => Some(*span),
            _ => None,
        })
        .expect("module declares Params")
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_all_shaders_validate() {
    let all = shaders::all();
    assert_eq!(all.len(), 12);
    for (label, source) in &all {
        parse(label, source);
    }
}

#[test]
fn test_face_stages_have_face_entry_points() {
    for (label, source) in [
        ("curl", shaders::curl()),
        ("vortex", shaders::vortex()),
        ("viscous", shaders::viscous()),
        ("divergence", shaders::divergence()),
        ("poisson", shaders::poisson()),
        ("pressure", shaders::pressure()),
        ("density", shaders::density()),
        ("gradient", shaders::gradient()),
    ] {
        let module = parse(label, &source);
        let names = entry_points(&module);
        assert!(names.contains(&"vs_face"), "{} lacks vs_face", label);
        assert!(names.contains(&"fs_main"), "{} lacks fs_main", label);
    }
}

#[test]
fn test_walled_stages_have_boundary_entry_points() {
    for (label, source) in [("advection", shaders::advection()), ("pressure", shaders::pressure())] {
        let module = parse(label, &source);
        let names = entry_points(&module);
        for name in ["vs_face", "fs_main", "vs_boundary", "fs_boundary"] {
            assert!(names.contains(&name), "{} lacks {}", label, name);
        }
    }
}

#[test]
fn test_impulse_stages_draw_quads() {
    for (label, source) in [("external_force", shaders::external_force()), ("swirl", shaders::swirl())] {
        let module = parse(label, &source);
        let names = entry_points(&module);
        assert!(names.contains(&"vs_quad"), "{} lacks vs_quad", label);
        assert!(!names.contains(&"vs_face"));
    }
}

#[test]
fn test_output_has_fullscreen_entry_points() {
    let source = shaders::output();
    let module = parse("output", &source);
    let names = entry_points(&module);
    assert!(names.contains(&"vs_fullscreen"));
    assert!(names.contains(&"fs_main"));
}

// ============================================================================
// Uniform layouts
// ============================================================================

#[test]
fn test_params_match_uniform_blocks() {
    let cases: [(&str, String, usize); 12] = [
        ("advection", shaders::advection(), size_of::<AdvectionParams>()),
        ("external_force", shaders::external_force(), size_of::<ForceParams>()),
        ("swirl", shaders::swirl(), size_of::<SwirlParams>()),
        ("curl", shaders::curl(), size_of::<HeaderParams>()),
        ("vortex", shaders::vortex(), size_of::<VortexParams>()),
        ("viscous", shaders::viscous(), size_of::<ViscousParams>()),
        ("divergence", shaders::divergence(), size_of::<StepParams>()),
        ("poisson", shaders::poisson(), size_of::<HeaderParams>()),
        ("pressure", shaders::pressure(), size_of::<StepParams>()),
        ("density", shaders::density(), size_of::<DensityParams>()),
        ("gradient", shaders::gradient(), size_of::<HeaderParams>()),
        ("output", shaders::output(), size_of::<OutputParams>()),
    ];
    for (label, source, rust_size) in cases {
        let module = parse(label, &source);
        assert_eq!(params_size(&module) as usize, rust_size, "{} Params size", label);
    }
}

#[test]
fn test_density_capacity_matches_source_limit() {
    let source = shaders::density();
    assert!(source.contains(&format!("array<vec4<f32>, {}>", bodyflow::MAX_SOURCES)));
    assert!(source.contains(&format!("MAX_SOURCES: u32 = {}u", bodyflow::MAX_SOURCES)));
}
