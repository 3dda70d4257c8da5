//! Local-step executor trait and CPU implementation.

use glam::Vec3;
use rayon::prelude::*;

use deform_types::{DeformError, DeformResult};

use crate::layout::ProjectionLayout;

/// Trait for local-step executors.
///
/// `prepare` uploads the (constant) incidence layout once per
/// precompute; `project` runs once per local/global iteration.
///
/// # Implementations
/// - [`CpuLocalSolver`] — rayon reference (always available)
/// - [`WgpuLocalSolver`](crate::WgpuLocalSolver) — wgpu compute shader
pub trait LocalSolver: Send {
    /// Returns the executor name (e.g., "cpu_rayon", "wgpu").
    fn name(&self) -> &str;

    /// Returns true if the executor runs on a GPU.
    fn is_gpu(&self) -> bool;

    /// Take ownership of a new layout, replacing any previous one.
    fn prepare(&mut self, layout: &ProjectionLayout) -> DeformResult<()>;

    /// Returns true once `prepare` has succeeded.
    fn is_prepared(&self) -> bool;

    /// Overwrite `b[i]` with the constraint contribution gathered by vertex
    /// `i` at positions `q`.
    fn project(&mut self, q: &[Vec3], b: &mut [Vec3]) -> DeformResult<()>;
}

/// Shared argument checks for `project`.
pub(crate) fn check_project_args(expected: usize, q: &[Vec3], b: &[Vec3]) -> DeformResult<()> {
    if q.len() != expected || b.len() != expected {
        return Err(DeformError::InvalidInput(format!(
            "local step expects {expected} vertices, got q = {}, b = {}",
            q.len(),
            b.len()
        )));
    }
    Ok(())
}

/// CPU local step — parallel gather over vertices.
#[derive(Debug, Default)]
pub struct CpuLocalSolver {
    layout: Option<ProjectionLayout>,
}

impl CpuLocalSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalSolver for CpuLocalSolver {
    fn name(&self) -> &str {
        "cpu_rayon"
    }

    fn is_gpu(&self) -> bool {
        false
    }

    fn prepare(&mut self, layout: &ProjectionLayout) -> DeformResult<()> {
        self.layout = Some(layout.clone());
        Ok(())
    }

    fn is_prepared(&self) -> bool {
        self.layout.is_some()
    }

    fn project(&mut self, q: &[Vec3], b: &mut [Vec3]) -> DeformResult<()> {
        let layout = self
            .layout
            .as_ref()
            .ok_or_else(|| DeformError::NotPrecomputed("local step layout missing".into()))?;
        check_project_args(layout.vertex_count(), q, b)?;

        b.par_iter_mut()
            .enumerate()
            .for_each(|(i, bi)| *bi = layout.gather(i, q));
        Ok(())
    }
}
