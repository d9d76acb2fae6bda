//! Pass Graph
//!
//! Describes what gets drawn each tick:
//! - [`PassDeclaration`]: a user-declared pass (name, fragment source path, uniforms)
//! - [`Pass`]: a resolved pass with a typed uniform schema
//! - [`PassGraph`]: the ordered passes plus the synthesized combine pass
//! - [`build_graph`]: validates declarations and synthesizes the combine pass
//!
//! Execution is linear: every input pass renders into its own off-screen
//! target, then the combine pass sums them onto the display.

pub mod builder;
#[allow(clippy::module_inception)]
pub mod graph;
pub mod pass;

pub use builder::{COMBINE_PASS_NAME, build_graph};
pub use graph::PassGraph;
pub use pass::{Pass, PassDeclaration, PassId, ProgramSource};
