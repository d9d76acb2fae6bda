//! Pass Resource Manager
//!
//! Owns the per-pass GPU resources: one off-screen color target per input
//! pass (the combine pass draws to the display) and one compiled program per
//! pass.
//!
//! Allocation goes through an [`AllocationScope`]. Every target and program
//! created inside the scope is released again if the scope is dropped without
//! [`AllocationScope::commit`], so a shader that fails to compile halfway
//! through the graph leaves nothing behind.

use crate::assets::SourceLoader;
use crate::errors::{HorizonError, Result};
use crate::renderer::device::{
    DrawTarget, ProgramDescriptor, ProgramId, RenderDevice, RenderTargetId, TargetKind,
};
use crate::renderer::graph::{Pass, PassGraph, PassId, ProgramSource};
use crate::renderer::pipeline::ShaderGenerator;

/// GPU resources owned by one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassResources {
    /// `None` for the combine pass, which renders to the display.
    pub target: Option<RenderTargetId>,
    pub program: ProgramId,
}

impl PassResources {
    #[must_use]
    pub fn draw_target(&self) -> DrawTarget {
        self.target.map_or(DrawTarget::Display, DrawTarget::Offscreen)
    }
}

/// Tracks partial allocations and releases them unless committed.
pub struct AllocationScope<'d, D: RenderDevice + ?Sized> {
    device: &'d mut D,
    targets: Vec<RenderTargetId>,
    programs: Vec<ProgramId>,
    committed: bool,
}

impl<'d, D: RenderDevice + ?Sized> AllocationScope<'d, D> {
    pub fn new(device: &'d mut D) -> Self {
        Self {
            device,
            targets: Vec::new(),
            programs: Vec::new(),
            committed: false,
        }
    }

    /// Allocates the target and program for `pass`.
    ///
    /// `fragment_source` is the pass's fragment stage; the uniform interface
    /// is generated by the device from the pass schema.
    pub fn allocate(
        &mut self,
        pass: &Pass,
        vertex_source: &str,
        fragment_source: &str,
        width: u32,
        height: u32,
    ) -> Result<PassResources> {
        let target = if pass.is_combine() {
            None
        } else {
            let id = self.device.create_render_target(&pass.name, width, height)?;
            self.targets.push(id);
            Some(id)
        };

        let program = self.device.compile_program(&ProgramDescriptor {
            pass_name: &pass.name,
            vertex_source,
            fragment_source,
            schema: &pass.uniforms,
            target: if pass.is_combine() {
                TargetKind::Display
            } else {
                TargetKind::Offscreen
            },
        })?;
        self.programs.push(program);

        log::debug!("Allocated resources for pass '{}'", pass.name);
        Ok(PassResources { target, program })
    }

    /// The device the scope allocates from.
    pub fn device(&mut self) -> &mut D {
        &mut *self.device
    }

    /// Keeps everything allocated so far.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl<D: RenderDevice + ?Sized> Drop for AllocationScope<'_, D> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if !self.targets.is_empty() || !self.programs.is_empty() {
            log::debug!(
                "Rolling back {} render target(s) and {} program(s)",
                self.targets.len(),
                self.programs.len()
            );
        }
        for program in self.programs.drain(..) {
            self.device.release_program(program);
        }
        for target in self.targets.drain(..) {
            self.device.release_render_target(target);
        }
    }
}

/// Per-pass resources for a whole graph, indexed by [`PassId`].
#[derive(Debug, Default)]
pub struct ResourceManager {
    passes: Vec<PassResources>,
}

impl ResourceManager {
    /// Allocates resources for every pass in `graph`, all sized `width`×`height`.
    ///
    /// Fragment sources of input passes are fetched through `loader`. On any
    /// failure (fetch, target creation, compile) all resources allocated by
    /// this call are released before the error is returned.
    pub fn allocate_graph<D: RenderDevice + ?Sized>(
        device: &mut D,
        graph: &PassGraph,
        loader: &dyn SourceLoader,
        vertex_source: &str,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let mut scope = AllocationScope::new(device);
        let mut passes = Vec::with_capacity(graph.len());

        for pass in graph.passes() {
            let fragment = match &pass.program {
                ProgramSource::Path(path) => loader.fetch_source(path)?,
                ProgramSource::Inline(source) => source.clone(),
            };
            passes.push(scope.allocate(pass, vertex_source, &fragment, width, height)?);
        }

        scope.commit();
        log::info!("Allocated {} pass(es) at {width}x{height}", passes.len());
        Ok(Self { passes })
    }

    /// Allocates resources for a single pass. Nothing leaks on failure.
    pub fn allocate<D: RenderDevice + ?Sized>(
        device: &mut D,
        pass: &Pass,
        fragment_source: &str,
        width: u32,
        height: u32,
    ) -> Result<PassResources> {
        let vertex = ShaderGenerator::fullscreen_vertex()?;
        let mut scope = AllocationScope::new(device);
        let resources = scope.allocate(pass, &vertex, fragment_source, width, height)?;
        scope.commit();
        Ok(resources)
    }

    #[must_use]
    pub fn get(&self, id: PassId) -> Option<&PassResources> {
        self.passes.get(id.index())
    }

    /// Looks up `id`, failing when the graph and manager disagree.
    pub fn require(&self, id: PassId) -> Result<&PassResources> {
        self.get(id)
            .ok_or_else(|| HorizonError::Device(format!("no resources allocated for pass #{}", id.index())))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Releases every resource. Safe to call more than once.
    pub fn release<D: RenderDevice + ?Sized>(&mut self, device: &mut D) {
        for resources in self.passes.drain(..) {
            device.release_program(resources.program);
            if let Some(target) = resources.target {
                device.release_render_target(target);
            }
        }
    }
}
