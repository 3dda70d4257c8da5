//! Collider registry.

use tracing::debug;

use deform_types::ColliderId;
use glam::Vec3;

use crate::primitive::Primitive;

/// Ordered collection of colliders keyed by [`ColliderId`].
///
/// Iteration follows registration order. Registering an id that is
/// already present replaces that collider in its original slot.
#[derive(Default)]
pub struct ColliderRegistry {
    entries: Vec<(ColliderId, Box<dyn Primitive>)>,
}

impl ColliderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `collider` under `id`, returning the collider it replaced.
    pub fn insert(
        &mut self,
        id: ColliderId,
        collider: Box<dyn Primitive>,
    ) -> Option<Box<dyn Primitive>> {
        debug!(%id, kind = collider.name(), "registering collider");
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => Some(std::mem::replace(slot, collider)),
            None => {
                self.entries.push((id, collider));
                None
            }
        }
    }

    /// Removes the collider registered under `id`.
    pub fn remove(&mut self, id: ColliderId) -> Option<Box<dyn Primitive>> {
        let index = self.entries.iter().position(|(existing, _)| *existing == id)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, id: ColliderId) -> Option<&dyn Primitive> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, collider)| collider.as_ref())
    }

    pub fn get_mut(&mut self, id: ColliderId) -> Option<&mut (dyn Primitive + 'static)> {
        self.entries
            .iter_mut()
            .find(|(existing, _)| *existing == id)
            .map(|(_, collider)| collider.as_mut())
    }

    /// Colliders in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ColliderId, &dyn Primitive)> {
        self.entries
            .iter()
            .map(|(id, collider)| (*id, collider.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Runs `pos` through every collider in order. Each collider sees the
    /// output of the previous one, so the last correction wins.
    ///
    /// Returns `None` if no collider claimed the position.
    pub fn resolve(&self, pos: Vec3) -> Option<Vec3> {
        let mut corrected = None;
        for (_, collider) in &self.entries {
            let candidate = corrected.unwrap_or(pos);
            if let Some(next) = collider.collision_handle(candidate) {
                corrected = Some(next);
            }
        }
        corrected
    }
}

impl std::fmt::Debug for ColliderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(id, c)| (id, c.name())))
            .finish()
    }
}
