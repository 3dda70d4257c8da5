//! Projective Dynamics solver: model collection, precompute and step loop.
//!
//! Each step runs:
//! 1. **Predict** — `q_explicit = q + dt·v + dt²·M⁻¹·f_ext`
//! 2. **Local step** — project every constraint, `proj = Σ wc · Sᵗ p_c`
//! 3. **Global step** — solve `A x = M/dt² · q_explicit + proj` per axis
//! 4. **Repeat** 2–3 for the requested iteration count
//! 5. **Collide** — push every vertex out of the registered colliders
//! 6. **Finalize** — `v = (q_new - q)/dt`, commit positions and velocities
//!
//! Nothing is written back to the meshes until step 6, so a failing step
//! leaves every mesh at its previous state.

use std::collections::BTreeMap;
use std::time::Instant;

use glam::Vec3;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use deform_contact::{ColliderRegistry, Primitive};
use deform_gpu::{CpuLocalSolver, LocalSolver, WgpuLocalSolver};
use deform_math::sparse::CsrMatrix;
use deform_math::{LinearSolverKind, LinearSystemSolver};
use deform_mesh::DeformableMesh;
use deform_telemetry::{EventBus, EventKind, SimulationEvent};
use deform_types::{ColliderId, DeformError, DeformResult, ObjectId};

use crate::assembly::{self, Block};
use crate::config::{validate_dt, SolverConfig};
use crate::state::{SolverState, StaleReason};

/// External forces per object. Objects without an entry get zero force.
pub type ExternalForces = BTreeMap<ObjectId, Vec<Vec3>>;

/// Result of a solver step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Local/global iterations performed.
    pub iterations: u32,
    /// Whether the step had to precompute first.
    pub reprecomputed: bool,
    /// Vertices moved by the collision pass.
    pub collisions: usize,
    /// Seconds spent in local steps.
    pub local_time: f64,
    /// Seconds spent in global steps.
    pub global_time: f64,
    /// Wall-clock time for the whole step (seconds).
    pub wall_time: f64,
}

/// Projective Dynamics solver.
///
/// Owns the simulated meshes (keyed and assembled in [`ObjectId`] order),
/// the collider registry, the active linear solver and the active local
/// step executor.
pub struct Solver {
    config: SolverConfig,
    models: BTreeMap<ObjectId, DeformableMesh>,
    colliders: ColliderRegistry,

    linear_solver: Box<dyn LinearSystemSolver>,
    local_solver: Box<dyn LocalSolver>,

    a: Option<CsrMatrix>,
    blocks: Vec<Block>,
    unknowns: usize,
    state: SolverState,
    /// Mesh revisions `a` was assembled from.
    assembled_revisions: Vec<(ObjectId, u64)>,

    steps: u64,
    telemetry: Option<EventBus>,

    last_local_step_time: f64,
    last_global_step_time: f64,
    last_precomputation_time: f64,
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("config", &self.config)
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .field("colliders", &self.colliders)
            .field("linear_solver", &self.linear_solver.name())
            .field("local_solver", &self.local_solver.name())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Solver {
    /// Creates a solver with no models.
    pub fn new(config: SolverConfig) -> DeformResult<Self> {
        config.validate()?;
        info!(
            dt = config.dt,
            linear_solver = config.linear_solver.name(),
            gpu_local_step = config.use_gpu_for_local_step,
            "creating solver"
        );
        Ok(Self {
            linear_solver: config.linear_solver.build(),
            local_solver: Box::new(CpuLocalSolver::new()),
            config,
            models: BTreeMap::new(),
            colliders: ColliderRegistry::new(),
            a: None,
            blocks: Vec::new(),
            unknowns: 0,
            state: SolverState::Uninitialized,
            assembled_revisions: Vec::new(),
            steps: 0,
            telemetry: None,
            last_local_step_time: 0.0,
            last_global_step_time: 0.0,
            last_precomputation_time: 0.0,
        })
    }

    // --- Configuration ---

    /// Current settings (dt, strategy, local-step placement, default iteration counts).
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn dt(&self) -> f32 {
        self.config.dt
    }

    /// Sets the timestep. `A` depends on `dt`, so a change makes the solver stale.
    pub fn set_dt(&mut self, dt: f32) -> DeformResult<()> {
        validate_dt(dt)?;
        if dt != self.config.dt {
            self.config.dt = dt;
            self.mark_stale(StaleReason::TimestepChanged);
        }
        Ok(())
    }

    /// Selects the global-step strategy.
    ///
    /// A fresh instance is built, so no derived state of the previous
    /// strategy can leak into the next step.
    pub fn set_solver(&mut self, kind: LinearSolverKind) {
        if kind == self.config.linear_solver {
            return;
        }
        let from = self.config.linear_solver;
        info!(from = from.name(), to = kind.name(), "switching linear solver");

        self.config.linear_solver = kind;
        self.linear_solver = kind.build();
        self.mark_stale(StaleReason::AlgorithmChanged);
        self.emit(EventKind::SolverSwitched {
            from: from.name().into(),
            to: kind.name().into(),
        });
    }

    pub fn linear_solver_kind(&self) -> LinearSolverKind {
        self.config.linear_solver
    }

    /// Requests the GPU (or CPU) local step. Takes effect at the next precompute.
    pub fn set_use_gpu_for_local_step(&mut self, use_gpu: bool) {
        if use_gpu != self.config.use_gpu_for_local_step {
            self.config.use_gpu_for_local_step = use_gpu;
            self.mark_stale(StaleReason::LocalStepChanged);
        }
    }

    /// Name of the local-step executor currently in use.
    pub fn local_step_executor(&self) -> &str {
        self.local_solver.name()
    }

    /// Drops `A` and every piece of derived state.
    pub fn clear_solver(&mut self) {
        self.a = None;
        self.blocks.clear();
        self.unknowns = 0;
        self.assembled_revisions.clear();
        self.linear_solver.clear();
        self.local_solver = Box::new(CpuLocalSolver::new());
        self.state = SolverState::Uninitialized;
        debug!("solver cleared");
    }

    /// Attaches an event bus. Events are flushed at the end of every
    /// precompute and step.
    pub fn set_event_bus(&mut self, bus: Option<EventBus>) {
        self.telemetry = bus;
    }

    pub fn event_bus_mut(&mut self) -> Option<&mut EventBus> {
        self.telemetry.as_mut()
    }

    // --- State ---

    /// Current lifecycle state, including staleness caused by mesh
    /// mutations made through [`Self::model_mut`].
    pub fn state(&self) -> SolverState {
        match self.state {
            SolverState::MatrixAssembled | SolverState::Precomputed if self.models_changed() => {
                SolverState::Stale(StaleReason::ModelsChanged)
            }
            state => state,
        }
    }

    /// System matrix of the last `precompute_a`.
    pub fn system_matrix(&self) -> Option<&CsrMatrix> {
        self.a.as_ref()
    }

    /// Number of steps taken so far.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Seconds spent in local steps during the last step.
    pub fn last_local_step_time(&self) -> f64 {
        self.last_local_step_time
    }

    /// Seconds spent in global steps during the last step.
    pub fn last_global_step_time(&self) -> f64 {
        self.last_global_step_time
    }

    /// Seconds spent in the last `precompute`.
    pub fn last_precomputation_time(&self) -> f64 {
        self.last_precomputation_time
    }

    fn models_changed(&self) -> bool {
        self.assembled_revisions.len() != self.models.len()
            || self
                .assembled_revisions
                .iter()
                .zip(&self.models)
                .any(|(&(id, rev), (&mid, mesh))| id != mid || rev != mesh.revision())
    }

    fn mark_stale(&mut self, reason: StaleReason) {
        self.state = match self.state {
            SolverState::Uninitialized => SolverState::Uninitialized,
            SolverState::Stale(first) => SolverState::Stale(first),
            SolverState::MatrixAssembled | SolverState::Precomputed => SolverState::Stale(reason),
        };
    }

    // --- Models ---

    /// Adds a mesh under its own id, returning the mesh it replaced.
    pub fn add_model(&mut self, mesh: DeformableMesh) -> Option<DeformableMesh> {
        debug!(id = %mesh.id(), vertices = mesh.vertex_count(), "adding model");
        let replaced = self.models.insert(mesh.id(), mesh);
        self.mark_stale(StaleReason::ModelsChanged);
        replaced
    }

    pub fn remove_model(&mut self, id: ObjectId) -> DeformResult<DeformableMesh> {
        let mesh = self
            .models
            .remove(&id)
            .ok_or(DeformError::UnknownObject(id))?;
        self.mark_stale(StaleReason::ModelsChanged);
        Ok(mesh)
    }

    pub fn model(&self, id: ObjectId) -> DeformResult<&DeformableMesh> {
        self.models.get(&id).ok_or(DeformError::UnknownObject(id))
    }

    /// Mutable access to a mesh. Mutations that change the system matrix
    /// are detected through the mesh revision.
    pub fn model_mut(&mut self, id: ObjectId) -> DeformResult<&mut DeformableMesh> {
        self.models.get_mut(&id).ok_or(DeformError::UnknownObject(id))
    }

    /// Meshes in id order.
    pub fn models(&self) -> impl Iterator<Item = &DeformableMesh> {
        self.models.values()
    }

    pub fn toggle_vertices_fixed<I>(&mut self, id: ObjectId, vertices: I, wc: f32) -> DeformResult<()>
    where
        I: IntoIterator<Item = u32>,
    {
        self.model_mut(id)?.toggle_vertices_fixed(vertices, wc)
    }

    pub fn set_edge_strain_constraints(&mut self, id: ObjectId, wc: f32) -> DeformResult<()> {
        self.model_mut(id)?.set_edge_strain_constraints(wc)
    }

    pub fn apply_mass_per_vertex(&mut self, id: ObjectId, mass: f32) -> DeformResult<()> {
        self.model_mut(id)?.apply_mass_per_vertex(mass)
    }

    pub fn reset_constraints(&mut self, id: ObjectId) -> DeformResult<()> {
        self.model_mut(id)?.reset_constraints();
        Ok(())
    }

    // --- Colliders ---

    /// Registers a collider, returning the one it replaced.
    pub fn add_collider(
        &mut self,
        id: ColliderId,
        collider: Box<dyn Primitive>,
    ) -> Option<Box<dyn Primitive>> {
        self.colliders.insert(id, collider)
    }

    pub fn remove_collider(&mut self, id: ColliderId) -> Option<Box<dyn Primitive>> {
        self.colliders.remove(id)
    }

    pub fn colliders(&self) -> &ColliderRegistry {
        &self.colliders
    }

    pub fn colliders_mut(&mut self) -> &mut ColliderRegistry {
        &mut self.colliders
    }

    // --- Forces ---

    /// Per-object gravity forces `m · g`.
    pub fn gravity_forces(&self, g: Vec3) -> ExternalForces {
        self.models
            .iter()
            .map(|(&id, mesh)| (id, mesh.masses().iter().map(|&m| m * g).collect()))
            .collect()
    }

    // --- Precompute ---

    /// Assemble `A = M/dt² + Σ wc · SᵗS` over all meshes.
    pub fn precompute_a(&mut self) -> DeformResult<()> {
        let (blocks, unknowns) = assembly::layout_blocks(&self.models);
        if unknowns == 0 {
            return Err(DeformError::InvalidConfig(
                "no simulated vertices: add a non-empty model before precomputing".into(),
            ));
        }
        for mesh in self.models.values() {
            mesh.dimension_check();
        }

        let a = assembly::assemble_system_matrix(&self.models, &blocks, unknowns, self.config.dt);
        debug!(unknowns, nnz = a.nnz(), "system matrix assembled");

        self.linear_solver.clear();
        self.a = Some(a);
        self.blocks = blocks;
        self.unknowns = unknowns;
        self.assembled_revisions = self
            .models
            .iter()
            .map(|(&id, mesh)| (id, mesh.revision()))
            .collect();
        self.state = SolverState::MatrixAssembled;
        Ok(())
    }

    /// Assemble `A`, precompute the linear solver and prepare the local step.
    ///
    /// On failure the solver is left short of `Precomputed` and the next
    /// `step` retries.
    pub fn precompute(&mut self) -> DeformResult<()> {
        let start = Instant::now();
        self.precompute_a()?;

        let a = self
            .a
            .as_ref()
            .ok_or_else(|| DeformError::NotPrecomputed("system matrix missing".into()))?;
        if let Err(err) = self.linear_solver.precompute(a) {
            warn!(solver = self.linear_solver.name(), %err, "linear solver precompute failed");
            return Err(err);
        }

        let layout = assembly::projection_layout(&self.models, &self.blocks, self.unknowns);
        self.local_solver = self.build_local_solver(&layout)?;

        self.last_precomputation_time = start.elapsed().as_secs_f64();
        self.state = SolverState::Precomputed;

        info!(
            unknowns = self.unknowns,
            nnz = a.nnz(),
            solver = self.linear_solver.name(),
            local_step = self.local_solver.name(),
            seconds = self.last_precomputation_time,
            "precompute complete"
        );
        self.emit(EventKind::Precompute {
            unknowns: self.unknowns as u32,
            nnz: a.nnz() as u32,
            solver: self.linear_solver.name().into(),
            wall_time: self.last_precomputation_time,
        });
        self.flush_events();
        Ok(())
    }

    /// Builds and prepares the requested local-step executor, falling back
    /// to the CPU when the GPU cannot be used.
    fn build_local_solver(
        &self,
        layout: &deform_gpu::ProjectionLayout,
    ) -> DeformResult<Box<dyn LocalSolver>> {
        if self.config.use_gpu_for_local_step {
            let gpu = WgpuLocalSolver::new().and_then(|mut gpu| {
                gpu.prepare(layout)?;
                Ok(gpu)
            });
            match gpu {
                Ok(gpu) => {
                    if self.local_solver.is_gpu() != gpu.is_gpu() {
                        self.emit(EventKind::LocalStepSwitched {
                            executor: gpu.name().into(),
                        });
                    }
                    return Ok(Box::new(gpu));
                }
                Err(err) => warn!(%err, "GPU local step unavailable, falling back to CPU"),
            }
        }

        let mut cpu = CpuLocalSolver::new();
        cpu.prepare(layout)?;
        if self.local_solver.is_gpu() {
            self.emit(EventKind::LocalStepSwitched {
                executor: cpu.name().into(),
            });
        }
        Ok(Box::new(cpu))
    }

    // --- Step ---

    /// Step with the iteration counts from the config.
    pub fn advance(&mut self, f_exts: &ExternalForces) -> DeformResult<StepReport> {
        let (n_itr, inner) = (self.config.iterations, self.config.inner_iterations);
        self.step(f_exts, n_itr, inner)
    }

    /// Advance every mesh by one timestep.
    ///
    /// `n_itr` is the number of local/global iterations; `itr_solver_n_itr`
    /// the sweep budget of iterative linear solvers per global solve.
    ///
    /// # Errors
    ///
    /// - [`DeformError::UnknownObject`] / [`DeformError::InvalidInput`] for
    ///   forces addressed to a missing mesh or with the wrong length.
    /// - Numerical failures ([`DeformError::NonFinite`],
    ///   [`DeformError::SolverDivergence`], [`DeformError::Factorization`]).
    ///
    /// On error no mesh is modified.
    pub fn step(
        &mut self,
        f_exts: &ExternalForces,
        n_itr: u32,
        itr_solver_n_itr: u32,
    ) -> DeformResult<StepReport> {
        let start = Instant::now();

        let reprecomputed = !self.state().is_ready();
        if reprecomputed {
            debug!(state = %self.state(), "precomputing before step");
            self.precompute()?;
        }

        let dt = self.config.dt;
        let n = self.unknowns;

        // Gather the global state in block order.
        let mut q = Vec::with_capacity(n);
        let mut v = Vec::with_capacity(n);
        let mut masses = Vec::with_capacity(n);
        for block in &self.blocks {
            let mesh = self.model(block.id)?;
            q.extend_from_slice(mesh.positions());
            v.extend_from_slice(mesh.velocities());
            masses.extend_from_slice(mesh.masses());
        }
        let forces = self.gather_forces(f_exts)?;

        // 1. Predict
        let dt2 = dt * dt;
        let q_explicit: Vec<Vec3> = (0..n)
            .into_par_iter()
            .map(|i| q[i] + dt * v[i] + (dt2 / masses[i]) * forces[i])
            .collect();
        if q_explicit.iter().any(|p| !p.is_finite()) {
            return Err(DeformError::NonFinite {
                stage: "prediction",
            });
        }
        let inertia = assembly::inertia_rhs(&masses, &q_explicit, dt);

        // 2–4. Local/global iterations
        let mut x = q_explicit;
        let mut proj = vec![Vec3::ZERO; n];
        let mut rhs = vec![0.0f32; n];
        let mut sol = vec![0.0f32; n];
        let mut local_time = 0.0;
        let mut global_time = 0.0;

        for _ in 0..n_itr {
            let local_start = Instant::now();
            self.local_solver.project(&x, &mut proj)?;
            local_time += local_start.elapsed().as_secs_f64();

            let global_start = Instant::now();
            for axis in 0..3 {
                rhs.par_iter_mut()
                    .zip(sol.par_iter_mut())
                    .enumerate()
                    .for_each(|(i, (r, s))| {
                        *r = inertia[i][axis] + proj[i][axis];
                        *s = x[i][axis];
                    });
                self.linear_solver.solve(&rhs, itr_solver_n_itr, &mut sol)?;
                x.par_iter_mut()
                    .zip(sol.par_iter())
                    .for_each(|(xi, &s)| xi[axis] = s);
            }
            global_time += global_start.elapsed().as_secs_f64();
        }

        if x.iter().any(|p| !p.is_finite()) {
            return Err(DeformError::NonFinite { stage: "global step" });
        }

        // 5. Collision correction
        let mut collisions = 0;
        for block in &self.blocks {
            let mesh = self.model(block.id)?;
            collisions += mesh.resolve_collision(&self.colliders, &mut x[block.range()]);
        }

        // 6. Velocity update and commit
        let inv_dt = 1.0 / dt;
        let velocities: Vec<Vec3> = x
            .par_iter()
            .zip(q.par_iter())
            .map(|(&new, &old)| (new - old) * inv_dt)
            .collect();

        for block in &self.blocks {
            let range = block.range();
            let mesh = self
                .models
                .get_mut(&block.id)
                .ok_or(DeformError::UnknownObject(block.id))?;
            mesh.update_positions_and_velocities(
                x[range.clone()].to_vec(),
                velocities[range].to_vec(),
            )?;
        }

        self.last_local_step_time = local_time;
        self.last_global_step_time = global_time;
        self.steps += 1;

        let report = StepReport {
            iterations: n_itr,
            reprecomputed,
            collisions,
            local_time,
            global_time,
            wall_time: start.elapsed().as_secs_f64(),
        };
        debug!(
            step = self.steps,
            iterations = n_itr,
            collisions,
            local_time,
            global_time,
            "step complete"
        );
        self.emit(EventKind::Step {
            iterations: n_itr,
            local_time,
            global_time,
            collisions: collisions as u32,
            reprecomputed,
        });
        self.flush_events();
        Ok(report)
    }

    /// Flattens per-object forces in block order, zero-filling absent objects.
    fn gather_forces(&self, f_exts: &ExternalForces) -> DeformResult<Vec<Vec3>> {
        if let Some(&unknown) = f_exts.keys().find(|id| !self.models.contains_key(id)) {
            return Err(DeformError::UnknownObject(unknown));
        }

        let mut forces = Vec::with_capacity(self.unknowns);
        for block in &self.blocks {
            match f_exts.get(&block.id) {
                Some(f) if f.len() == block.len => forces.extend_from_slice(f),
                Some(f) => {
                    return Err(DeformError::InvalidInput(format!(
                        "force array for object {} has {} entries, expected {}",
                        block.id,
                        f.len(),
                        block.len
                    )));
                }
                None => forces.resize(forces.len() + block.len, Vec3::ZERO),
            }
        }
        Ok(forces)
    }

    fn emit(&self, kind: EventKind) {
        if let Some(bus) = &self.telemetry {
            bus.emit(SimulationEvent::new(self.steps, kind));
        }
    }

    fn flush_events(&mut self) {
        if let Some(bus) = &mut self.telemetry {
            bus.flush();
        }
    }
}
