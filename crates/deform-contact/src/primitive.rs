//! Collision primitive trait.

use glam::Vec3;

/// A static rigid collider.
///
/// Implementations are stateless with respect to the query: the same
/// input position always yields the same answer, and queries may run
/// from many threads at once.
pub trait Primitive: Send + Sync {
    /// Returns the corrected position if `pos` penetrates the collider
    /// (including its clearance band), or `None` if it is untouched.
    fn collision_handle(&self, pos: Vec3) -> Option<Vec3>;

    /// Reference point of the collider.
    fn center(&self) -> Vec3;

    /// Moves the collider. Primitives may ignore the components they
    /// are invariant along.
    fn set_center(&mut self, center: Vec3);

    /// Returns the primitive name (for logging).
    fn name(&self) -> &str;
}
