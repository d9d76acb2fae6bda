//! Configuration Tests
//!
//! Tests for:
//! - Defaults and JSON parsing (camelCase, partial documents)
//! - Validation of resolution, duration, delay and time step
//! - Derived tick policy, step size, stop condition, capture settings
//! - The default black hole pass declaration

mod common;

use std::time::Duration;

use common::{EPSILON, approx};
use glam::Vec3;
use horizon::config::{BLACK_HOLE_PASS_NAME, default_black_hole_pass};
use horizon::{
    HorizonConfig, HorizonError, ImageEncoding, TickPolicy, UniformKind, UniformValue, build_graph,
};

const TEST_CONFIG: &str = r#"{
    "debug": false,
    "passes": [],
    "scene": {
        "initialTime": 2000,
        "duration": 0,
        "maxSteps": 5000,
        "speedScale": 5,
        "minStepSize": 0.001,
        "maxStepSize": 0.05,
        "maxDistance": 40,
        "gravitationalConstant": 1,
        "EPS": 1e-4,
        "relativisticPaths": true,
        "brightnessScale": 15000,
        "observerFrequency": 0.0009,
        "camera": {
            "position": [0, 0, -40],
            "rotation": [0.5, 0, 0]
        },
        "blackHole": {
            "diskHeight": 0.3,
            "schwarzschildRadius": 1,
            "useInputTexture": false,
            "thickDisk": false,
            "inputDataHeight": 0.2,
            "inputDataPath": "/inputs/grmhd_history.json",
            "baseTemperature": 10000,
            "emissionCoefficient": 20,
            "absorptionCoefficient": 0.001
        }
    },
    "rendering": {
        "logFactor": 5,
        "resolution": { "width": 1000, "height": 600 },
        "delayMs": 100,
        "shouldAnimate": false,
        "output": {
            "save": false,
            "image": { "type": "png" },
            "video": { "imageType": "jpeg" }
        }
    }
}"#;

fn uniform(config: &HorizonConfig, name: &str) -> Option<UniformValue> {
    default_black_hole_pass(config)
        .uniforms
        .iter()
        .find(|u| u.name == name)
        .and_then(|u| u.value)
}

fn float(config: &HorizonConfig, name: &str) -> f32 {
    match uniform(config, name) {
        Some(UniformValue::Float(v)) => v,
        other => panic!("{name}: expected a float, got {other:?}"),
    }
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn defaults() {
    let config = HorizonConfig::default();
    assert_eq!(config.scene.initial_time, 0.0);
    assert_eq!(config.scene.duration, 0.0);
    assert_eq!(config.scene.max_steps, 600);
    assert_eq!(config.rendering.delay_ms, 100.0);
    assert!(config.rendering.should_animate);
    assert!(!config.rendering.output.save);
    assert_eq!(config.rendering.output.image.encoding, ImageEncoding::Png);
    assert_eq!(config.rendering.output.video.encoding, ImageEncoding::Jpeg);
    assert_eq!(config.scene.camera.position, Vec3::new(0.0, 0.0, -25.0));
    assert!(config.validate().is_ok());
}

#[test]
fn full_document_parses() {
    let config = HorizonConfig::from_json_str(TEST_CONFIG).unwrap();

    assert_eq!(config.scene.initial_time, 2000.0);
    assert_eq!(config.scene.max_steps, 5000);
    assert!((config.scene.eps - 1e-4).abs() < 1e-9);
    assert_eq!(config.scene.camera.position, Vec3::new(0.0, 0.0, -40.0));
    assert_eq!(config.scene.camera.rotation, Vec3::new(0.5, 0.0, 0.0));
    assert_eq!(config.scene.black_hole.emission_coefficient, 20.0);
    assert_eq!(config.rendering.resolution.width, 1000);
    assert!(!config.rendering.should_animate);
}

#[test]
fn partial_document_falls_back_to_defaults() {
    let config = HorizonConfig::from_json_str(r#"{ "scene": { "blackHole": { "baseTemperature": 8000 } } }"#).unwrap();

    assert_eq!(config.scene.black_hole.base_temperature, 8000.0);
    assert_eq!(config.scene.black_hole.schwarzschild_radius, 1.0);
    assert_eq!(config.scene.black_hole.input_field_key, "rho");
    assert_eq!(config.scene.black_hole.input_time_key, "t");
    assert_eq!(config.rendering.resolution.width, 800);
}

#[test]
fn passes_and_camera_animation_parse() {
    let json = r#"{
        "passes": [
            { "name": "disk", "fragmentShader": "/shaders/disk.wgsl", "uniforms": [{ "name": "uTime" }] }
        ],
        "scene": {
            "duration": 2000,
            "camera": {
                "animation": {
                    "start": { "position": [0, 0, -25] },
                    "end": { "position": [0, 0, -20] }
                }
            }
        }
    }"#;
    let config = HorizonConfig::from_json_str(json).unwrap();
    assert_eq!(config.passes.len(), 1);
    assert_eq!(config.passes[0].fragment_shader, "/shaders/disk.wgsl");

    let camera = config.camera_animation().unwrap();
    assert_eq!(camera.sample(1000.0).position, Vec3::new(0.0, 0.0, -22.5));
}

#[test]
fn malformed_json_is_a_json_error() {
    assert!(matches!(HorizonConfig::from_json_str("{ \"scene\": "), Err(HorizonError::Json(_))));
}

#[test]
fn missing_file_is_not_found() {
    match HorizonConfig::from_json_file("/nonexistent/horizon/config.json") {
        Err(HorizonError::Io { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected an io error, got {other:?}"),
    }
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn zero_resolution_is_rejected() {
    let config = HorizonConfig::default().with_resolution(0, 600);
    assert!(matches!(config.validate(), Err(HorizonError::Configuration(_))));
}

#[test]
fn negative_duration_and_delay_are_rejected() {
    assert!(HorizonConfig::default().with_duration(-1.0).validate().is_err());
    assert!(HorizonConfig::default().with_delay_ms(-5.0).validate().is_err());
}

#[test]
fn non_positive_time_step_is_rejected() {
    let json = r#"{ "rendering": { "timeStepMs": 0 } }"#;
    assert!(matches!(
        HorizonConfig::from_json_str(json),
        Err(HorizonError::Configuration(_))
    ));
}

// ============================================================================
// Derived values
// ============================================================================

#[test]
fn fixed_delay_sets_policy_and_step() {
    let config = HorizonConfig::default().with_delay_ms(100.0);
    assert_eq!(config.tick_policy(), TickPolicy::FixedDelay(Duration::from_millis(100)));
    assert!(approx(config.step_ms(), 100.0));
}

#[test]
fn zero_delay_is_refresh_paced() {
    let config = HorizonConfig::default().with_delay_ms(0.0);
    assert!(matches!(config.tick_policy(), TickPolicy::RefreshPaced(_)));
    assert!((config.step_ms() - 1000.0 / 60.0).abs() < EPSILON);
}

#[test]
fn explicit_time_step_wins() {
    let config = HorizonConfig::from_json_str(r#"{ "rendering": { "delayMs": 100, "timeStepMs": 40 } }"#).unwrap();
    assert!(approx(config.step_ms(), 40.0));
}

#[test]
fn stop_condition_follows_scene_and_rendering() {
    let config = HorizonConfig::default()
        .with_duration(1000.0)
        .with_animation(true)
        .with_max_ticks(50);
    let stop = config.stop_condition();
    assert!(approx(stop.duration_ms, 1000.0));
    assert!(stop.animate);
    assert_eq!(stop.max_ticks, Some(50));
}

#[test]
fn display_preservation_follows_capture_unless_set() {
    assert!(!HorizonConfig::default().preserve_display());
    assert!(HorizonConfig::default().with_capture(true).preserve_display());
    assert!(
        !HorizonConfig::default()
            .with_capture(true)
            .with_preserve_drawing_buffer(false)
            .preserve_display()
    );

    let settings = HorizonConfig::default().with_capture(true).with_resolution(320, 200).render_settings();
    assert!(settings.preserve_display);
    assert_eq!((settings.width, settings.height), (320, 200));
}

#[test]
fn capture_encoding_depends_on_animation() {
    assert_eq!(HorizonConfig::default().with_animation(false).capture_encoding(), ImageEncoding::Png);
    assert_eq!(HorizonConfig::default().with_animation(true).capture_encoding(), ImageEncoding::Jpeg);
}

#[test]
fn initial_camera_comes_from_the_scene() {
    let config = HorizonConfig::from_json_str(TEST_CONFIG).unwrap();
    let camera = config.initial_camera();
    assert_eq!(camera.position, Vec3::new(0.0, 0.0, -40.0));
    assert_eq!(camera.rotation, Vec3::new(0.5, 0.0, 0.0));
}

#[test]
fn camera_animation_needs_a_positive_duration() {
    let json = r#"{ "scene": { "camera": { "animation": {
        "start": { "position": [0, 0, -25] }, "end": { "position": [0, 0, -20] }
    } } } }"#;
    let config = HorizonConfig::from_json_str(json).unwrap();
    assert!(config.camera_animation().is_none());
    assert!(config.with_duration(500.0).camera_animation().is_some());
}

// ============================================================================
// Default black hole pass
// ============================================================================

#[test]
fn default_pass_derives_uniforms_from_the_scene() {
    let config = HorizonConfig::from_json_str(TEST_CONFIG).unwrap();
    let pass = default_black_hole_pass(&config);
    assert_eq!(pass.name, BLACK_HOLE_PASS_NAME);

    assert!((float(&config, "uMass") - 0.5).abs() < 1e-6);
    assert!((float(&config, "uPhotonRingRadius") - 1.5).abs() < 1e-6);
    assert!((float(&config, "uInnerRadius") - (3.0 + 1e-4)).abs() < 1e-6);
    assert!((float(&config, "uOuterRadius") - 18.0).abs() < 1e-6);
    assert!((float(&config, "uSpeedScale") - 5.0).abs() < 1e-6);
    assert_eq!(uniform(&config, "uMaxSteps"), Some(UniformValue::Int(5000)));
    assert_eq!(uniform(&config, "uThickDisk"), Some(UniformValue::Bool(false)));
    assert_eq!(
        uniform(&config, "uCameraPosition"),
        Some(UniformValue::Vec3(Vec3::new(0.0, 0.0, -40.0)))
    );
}

#[test]
fn default_pass_builds_a_graph_with_builtins() {
    let config = HorizonConfig::default();
    let graph = build_graph(&[default_black_hole_pass(&config)]).unwrap();
    assert_eq!(graph.len(), 2);

    let schema = &graph.passes()[0].uniforms;
    let builtins = schema.builtins();
    assert!(builtins.time.is_some());
    assert!(builtins.resolution.is_some());
    assert!(builtins.input_texture.is_some());
    assert!(builtins.camera_position.is_some());
    assert!(builtins.camera_rotation.is_some());
    assert_eq!(schema.get("uMaxSteps").unwrap().kind, UniformKind::Int);
    assert_eq!(schema.texture_slots().count(), 1);
}
