//! Graph builder
//!
//! Turns user declarations into a [`PassGraph`] and synthesizes the combine
//! pass. Pure: nothing here touches a device, so a graph can be validated
//! before any GPU work starts.

use super::graph::PassGraph;
use super::pass::{Pass, PassDeclaration, PassId, ProgramSource};
use crate::errors::{HorizonError, Result};
use crate::renderer::pipeline::ShaderGenerator;
use crate::resources::uniforms::is_identifier;
use crate::resources::{UniformKind, UniformSchema, UniformSlot};

/// Reserved name of the synthesized display pass.
pub const COMBINE_PASS_NAME: &str = "combine";

/// Validates `declarations` and appends the combine pass.
///
/// # Errors
///
/// [`HorizonError::Configuration`] when the list is empty, a name is
/// duplicated, reserved, or not a valid identifier, or a uniform declaration
/// is malformed.
pub fn build_graph(declarations: &[PassDeclaration]) -> Result<PassGraph> {
    if declarations.is_empty() {
        return Err(HorizonError::config("at least one pass must be declared"));
    }

    let mut passes: Vec<Pass> = Vec::with_capacity(declarations.len() + 1);

    for declaration in declarations {
        let name = declaration.name.as_str();
        if name == COMBINE_PASS_NAME {
            return Err(HorizonError::config(format!(
                "pass name '{COMBINE_PASS_NAME}' is reserved"
            )));
        }
        if !is_identifier(name) {
            return Err(HorizonError::config(format!(
                "pass name '{name}' is not a valid identifier"
            )));
        }
        if passes.iter().any(|p| p.name == name) {
            return Err(HorizonError::config(format!("duplicate pass name '{name}'")));
        }

        passes.push(Pass {
            name: name.to_string(),
            program: ProgramSource::Path(declaration.fragment_shader.clone()),
            uniforms: UniformSchema::from_declarations(name, &declaration.uniforms)?,
            is_combine: false,
        });
    }

    let names: Vec<&str> = passes.iter().map(|p| p.name.as_str()).collect();
    let fragment = ShaderGenerator::combine_fragment(&names)?;

    let mut uniforms = UniformSchema::default();
    let mut combine_inputs = Vec::with_capacity(passes.len());
    for (index, name) in names.iter().enumerate() {
        let slot = uniforms.push(
            COMBINE_PASS_NAME,
            UniformSlot {
                name: ShaderGenerator::combine_texture_name(name),
                kind: UniformKind::Texture,
                value: None,
            },
        )?;
        combine_inputs.push((PassId(index), slot));
    }

    passes.push(Pass {
        name: COMBINE_PASS_NAME.to_string(),
        program: ProgramSource::Inline(fragment),
        uniforms,
        is_combine: true,
    });

    log::debug!(
        "Built pass graph: {} input pass(es) + {COMBINE_PASS_NAME}",
        combine_inputs.len()
    );

    Ok(PassGraph::from_passes(passes, combine_inputs))
}
