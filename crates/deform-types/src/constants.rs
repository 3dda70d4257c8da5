//! Physical constants and simulation defaults.

/// Gravitational acceleration (m/s²).
pub const GRAVITY: f32 = 9.81;

/// Default simulation timestep (seconds). 1/60th of a second.
pub const DEFAULT_DT: f32 = 1.0 / 60.0;

/// Default number of local/global iterations per timestep.
pub const DEFAULT_PD_ITERATIONS: u32 = 10;

/// Default number of sweeps an iterative linear solver runs per global step.
pub const DEFAULT_INNER_ITERATIONS: u32 = 10;

/// Default per-vertex mass assigned at mesh construction (kg).
pub const DEFAULT_VERTEX_MASS: f32 = 1.0;

/// Clearance kept between a corrected vertex and a collider surface (meters).
pub const COLLISION_EPSILON: f32 = 0.01;

/// Below this length an edge has no usable direction.
pub const DEGENERATE_LENGTH_THRESHOLD: f32 = 1.0e-8;

/// Relative residual growth past which an iterative solve counts as diverged.
pub const DIVERGENCE_GROWTH_LIMIT: f64 = 1.0e3;
