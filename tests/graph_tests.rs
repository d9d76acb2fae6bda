//! Pass Graph Tests
//!
//! Tests for:
//! - build_graph combine synthesis and declaration order
//! - Name validation (empty, reserved, duplicate, identifier)
//! - Uniform schema resolution from declarations and JSON
//! - ResourceManager allocation, scoped rollback and release

mod common;

use common::{MockDevice, PLAIN_FRAGMENT, init_logger, loader_for, shader_path, timed_pass};
use horizon::renderer::device::{DrawTarget, TargetKind};
use horizon::renderer::graph::{COMBINE_PASS_NAME, ProgramSource};
use horizon::renderer::pipeline::ShaderGenerator;
use horizon::renderer::resource_manager::ResourceManager;
use horizon::{
    HorizonError, MemorySourceLoader, PassDeclaration, UniformDeclaration, UniformKind, UniformValue,
    build_graph,
};

fn declarations(names: &[&str]) -> Vec<PassDeclaration> {
    names.iter().map(|n| timed_pass(n)).collect()
}

// ============================================================================
// Combine synthesis
// ============================================================================

#[test]
fn n_declarations_yield_n_plus_one_passes() {
    for n in 1..=4 {
        let names: Vec<String> = (0..n).map(|i| format!("layer{i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let graph = build_graph(&declarations(&refs)).unwrap();

        assert_eq!(graph.len(), n + 1);
        let combine = graph.combine();
        assert!(combine.is_combine());
        assert_eq!(combine.name, COMBINE_PASS_NAME);

        let slots: Vec<&str> = combine.uniforms.texture_slots().map(|s| s.name.as_str()).collect();
        let expected: Vec<String> = refs.iter().map(|n| format!("t{n}")).collect();
        assert_eq!(slots, expected);
    }
}

#[test]
fn combine_is_last_and_inputs_keep_declaration_order() {
    let graph = build_graph(&declarations(&["disk", "jet", "stars"])).unwrap();

    let names: Vec<&str> = graph.passes().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["disk", "jet", "stars", "combine"]);
    assert_eq!(graph.combine_id().index(), 3);
    assert_eq!(graph.passes().iter().filter(|p| p.is_combine()).count(), 1);

    let inputs: Vec<usize> = graph.inputs().map(|(id, _)| id.index()).collect();
    assert_eq!(inputs, [0, 1, 2]);
}

#[test]
fn combine_inputs_point_at_matching_slots() {
    let graph = build_graph(&declarations(&["disk", "jet"])).unwrap();
    let combine = graph.combine();

    for &(input, slot) in graph.combine_inputs() {
        let pass = graph.get(input).unwrap();
        assert_eq!(combine.uniforms.slots()[slot].name, format!("t{}", pass.name));
        assert_eq!(combine.uniforms.slots()[slot].kind, UniformKind::Texture);
    }
}

#[test]
fn combine_program_is_generated_inline() {
    let graph = build_graph(&declarations(&["disk", "jet"])).unwrap();

    match &graph.combine().program {
        ProgramSource::Inline(source) => {
            assert!(source.contains("tdisk"));
            assert!(source.contains("tjet"));
        }
        ProgramSource::Path(path) => panic!("combine should be inline, got path {path}"),
    }
    assert_eq!(
        graph.get(graph.inputs().next().unwrap().0).unwrap().program,
        ProgramSource::Path(shader_path("disk"))
    );
}

#[test]
fn find_by_name() {
    let graph = build_graph(&declarations(&["disk", "jet"])).unwrap();
    assert_eq!(graph.find("jet").map(|id| id.index()), Some(1));
    assert_eq!(graph.find("combine"), Some(graph.combine_id()));
    assert!(graph.find("missing").is_none());
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn empty_declarations_are_rejected() {
    assert!(matches!(build_graph(&[]), Err(HorizonError::Configuration(_))));
}

#[test]
fn reserved_name_is_rejected() {
    let result = build_graph(&declarations(&["disk", "combine"]));
    assert!(matches!(result, Err(HorizonError::Configuration(msg)) if msg.contains("reserved")));
}

#[test]
fn duplicate_name_is_rejected() {
    let result = build_graph(&declarations(&["disk", "disk"]));
    assert!(matches!(result, Err(HorizonError::Configuration(msg)) if msg.contains("duplicate")));
}

#[test]
fn non_identifier_name_is_rejected() {
    for bad in ["", "2disk", "accretion disk", "disk-1"] {
        let result = build_graph(&[PassDeclaration::new(bad, "/shaders/x.wgsl")]);
        assert!(
            matches!(result, Err(HorizonError::Configuration(_))),
            "'{bad}' should be rejected"
        );
    }
}

#[test]
fn shader_reserved_pass_names_are_rejected() {
    for bad in ["__glow", "fn", "loop", "pass", "uniforms", "linear_sampler", "in", "VertexOutput"] {
        let result = build_graph(&[PassDeclaration::new(bad, "/shaders/x.wgsl")]);
        assert!(
            matches!(result, Err(HorizonError::Configuration(_))),
            "'{bad}' should be rejected"
        );
    }
}

#[test]
fn shader_reserved_uniform_names_are_rejected() {
    for bad in ["__gain", "var", "struct", "uniforms", "linear_sampler"] {
        let pass = PassDeclaration::new("disk", "/shaders/disk.wgsl")
            .with_uniform(UniformDeclaration::with_value(bad, 1.0));
        match build_graph(&[pass]) {
            Err(HorizonError::Configuration(msg)) => assert!(msg.contains("disk"), "{msg}"),
            other => panic!("'{bad}' should be rejected, got {other:?}"),
        }
    }
}

#[test]
fn duplicate_uniform_is_rejected() {
    let pass = timed_pass("disk").with_uniform(UniformDeclaration::builtin("uTime"));
    assert!(matches!(build_graph(&[pass]), Err(HorizonError::Configuration(_))));
}

// ============================================================================
// Uniform declarations
// ============================================================================

#[test]
fn uniform_kinds_are_inferred() {
    let pass = PassDeclaration::new("disk", shader_path("disk"))
        .with_uniform(UniformDeclaration::builtin("uTime"))
        .with_uniform(UniformDeclaration::builtin("uInputTexture"))
        .with_uniform(UniformDeclaration::with_value("uThickDisk", true))
        .with_uniform(UniformDeclaration::with_value("uMaxSteps", 600))
        .with_uniform(UniformDeclaration::with_value("uCameraPosition", glam::Vec3::new(0.0, 0.0, -25.0)));
    let graph = build_graph(&[pass]).unwrap();
    let schema = &graph.passes()[0].uniforms;

    assert_eq!(schema.get("uTime").unwrap().kind, UniformKind::Float);
    assert_eq!(schema.get("uInputTexture").unwrap().kind, UniformKind::Texture);
    assert_eq!(schema.get("uThickDisk").unwrap().kind, UniformKind::Bool);
    assert_eq!(schema.get("uMaxSteps").unwrap().kind, UniformKind::Int);
    assert_eq!(schema.get("uCameraPosition").unwrap().kind, UniformKind::Vec3);

    let builtins = schema.builtins();
    assert!(builtins.time.is_some());
    assert!(builtins.input_texture.is_some());
    assert!(builtins.camera_position.is_some());
    assert!(builtins.resolution.is_none());
}

#[test]
fn declarations_parse_from_json() {
    let json = r#"[
        {
            "name": "disk",
            "fragmentShader": "/shaders/disk.wgsl",
            "uniforms": [
                { "name": "uTime" },
                { "name": "uBrightness", "value": 2.5 },
                { "name": "uTint", "type": "vec3", "value": [1.0, 0.5, 0.25] },
                { "name": "uEnabled", "value": false }
            ]
        }
    ]"#;
    let decls: Vec<PassDeclaration> = serde_json::from_str(json).unwrap();
    let graph = build_graph(&decls).unwrap();
    let schema = &graph.passes()[0].uniforms;

    assert_eq!(schema.value("uBrightness"), Some(UniformValue::Float(2.5)));
    assert_eq!(
        schema.value("uTint"),
        Some(UniformValue::Vec3(glam::Vec3::new(1.0, 0.5, 0.25)))
    );
    assert_eq!(schema.value("uEnabled"), Some(UniformValue::Bool(false)));
}

#[test]
fn custom_uniform_without_kind_or_value_is_rejected() {
    let pass = PassDeclaration::new("disk", shader_path("disk")).with_uniform(UniformDeclaration {
        name: "uMystery".to_string(),
        kind: None,
        value: None,
    });
    assert!(matches!(build_graph(&[pass]), Err(HorizonError::Configuration(_))));
}

// ============================================================================
// Resource allocation
// ============================================================================

#[test]
fn allocation_gives_inputs_targets_and_combine_the_display() {
    init_logger();
    let graph = build_graph(&declarations(&["disk", "jet"])).unwrap();
    let loader = loader_for(&["disk", "jet"]);
    let vertex = ShaderGenerator::fullscreen_vertex().unwrap();
    let mut device = MockDevice::new(8, 6);

    let resources = ResourceManager::allocate_graph(&mut device, &graph, &loader, &vertex, 8, 6).unwrap();

    assert_eq!(resources.len(), 3);
    assert_eq!(device.live_targets(), 2);
    assert_eq!(device.live_programs(), 3);

    for (id, pass) in graph.inputs() {
        let r = resources.get(id).unwrap();
        let target = r.target.unwrap();
        assert_eq!(device.target_label(target), Some(pass.name.as_str()));
        assert_eq!(device.program(r.program).unwrap().target, TargetKind::Offscreen);
    }

    let combine = resources.get(graph.combine_id()).unwrap();
    assert!(combine.target.is_none());
    assert_eq!(combine.draw_target(), DrawTarget::Display);
    let program = device.program(combine.program).unwrap();
    assert_eq!(program.target, TargetKind::Display);
    assert_eq!(program.texture_slots, 2);
}

#[test]
fn compile_failure_names_the_pass_and_releases_everything() {
    init_logger();
    let graph = build_graph(&declarations(&["disk", "jet", "stars"])).unwrap();
    let loader = loader_for(&["disk", "jet", "stars"]);
    let vertex = ShaderGenerator::fullscreen_vertex().unwrap();
    let mut device = MockDevice::new(8, 6);
    device.fail_compile = Some("jet".to_string());

    let result = ResourceManager::allocate_graph(&mut device, &graph, &loader, &vertex, 8, 6);

    match result {
        Err(HorizonError::ShaderCompile { pass, .. }) => assert_eq!(pass, "jet"),
        other => panic!("expected a compile error, got {other:?}"),
    }
    assert!(device.is_idle(), "partial allocations must be rolled back");
}

#[test]
fn invalid_wgsl_is_reported_with_a_diagnostic() {
    let graph = build_graph(&declarations(&["disk"])).unwrap();
    let loader = MemorySourceLoader::new().with(shader_path("disk"), "@fragment fn fs_main( -> {}");
    let vertex = ShaderGenerator::fullscreen_vertex().unwrap();
    let mut device = MockDevice::new(8, 6);

    match ResourceManager::allocate_graph(&mut device, &graph, &loader, &vertex, 8, 6) {
        Err(HorizonError::ShaderCompile { pass, diagnostic }) => {
            assert_eq!(pass, "disk");
            assert!(!diagnostic.is_empty());
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
    assert!(device.is_idle());
}

#[test]
fn missing_source_is_an_io_error_and_releases_earlier_passes() {
    let graph = build_graph(&declarations(&["disk", "jet"])).unwrap();
    let loader = MemorySourceLoader::new().with(shader_path("disk"), PLAIN_FRAGMENT);
    let vertex = ShaderGenerator::fullscreen_vertex().unwrap();
    let mut device = MockDevice::new(8, 6);

    match ResourceManager::allocate_graph(&mut device, &graph, &loader, &vertex, 8, 6) {
        Err(HorizonError::Io { path, status }) => {
            assert_eq!(path, shader_path("jet"));
            assert_eq!(status, 404);
        }
        other => panic!("expected an io error, got {other:?}"),
    }
    assert!(device.is_idle());
}

#[test]
fn release_is_idempotent() {
    let graph = build_graph(&declarations(&["disk"])).unwrap();
    let loader = loader_for(&["disk"]);
    let vertex = ShaderGenerator::fullscreen_vertex().unwrap();
    let mut device = MockDevice::new(8, 6);

    let mut resources = ResourceManager::allocate_graph(&mut device, &graph, &loader, &vertex, 8, 6).unwrap();
    resources.release(&mut device);
    assert!(resources.is_empty());
    assert!(device.is_idle());

    resources.release(&mut device);
    assert!(device.is_idle());
}

#[test]
fn single_pass_allocation_uses_the_generated_vertex_stage() {
    let graph = build_graph(&declarations(&["disk"])).unwrap();
    let mut device = MockDevice::new(8, 6);

    let pass = &graph.passes()[0];
    let resources = ResourceManager::allocate(&mut device, pass, PLAIN_FRAGMENT, 8, 6).unwrap();

    assert!(resources.target.is_some());
    assert_eq!(device.live_programs(), 1);
}
