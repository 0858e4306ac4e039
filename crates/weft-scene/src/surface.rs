//! Rendering surfaces
//!
//! Generation-checked handles to rendering surfaces. A surface may be
//! destroyed independently of anything holding its id; stale ids simply fail
//! the lookup. This replaces GC weak references with an arena plus an explicit
//! liveness check.

use crate::Affine;

/// Surface handle: arena index plus the generation it was created under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// One rendering surface slot
#[derive(Debug)]
pub struct SurfaceSlot {
    /// Unscaled node width; half of it is the pivot x
    pub width: f32,
    /// Unscaled node height; half of it is the pivot y
    pub height: f32,
    /// The surface-local transform last pushed by the transform registry
    pub applied: Option<Affine>,
    /// Entries on the surface's compound stack owned by someone else.
    /// Detach must leave these alone.
    pub external: Vec<Affine>,
    /// Set whenever the applied transform changes; cleared by the layout pass
    pub needs_layout: bool,
}

impl SurfaceSlot {
    fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            applied: None,
            external: Vec::new(),
            needs_layout: false,
        }
    }
}

#[derive(Debug)]
struct Entry {
    generation: u32,
    slot: Option<SurfaceSlot>,
}

/// Arena of rendering surfaces
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    entries: Vec<Entry>,
}

impl SurfaceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create a surface for a node of the given unscaled size
    pub fn create(&mut self, width: f32, height: f32) -> SurfaceId {
        // Reuse a freed slot if one exists
        if let Some(index) = self.entries.iter().position(|e| e.slot.is_none()) {
            let entry = &mut self.entries[index];
            entry.slot = Some(SurfaceSlot::new(width, height));
            return SurfaceId {
                index: index as u32,
                generation: entry.generation,
            };
        }
        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            slot: Some(SurfaceSlot::new(width, height)),
        });
        SurfaceId {
            index,
            generation: 0,
        }
    }

    /// Destroy a surface; all outstanding ids for it become stale
    pub fn destroy(&mut self, id: SurfaceId) {
        if let Some(entry) = self.entries.get_mut(id.index as usize) {
            if entry.generation == id.generation && entry.slot.is_some() {
                entry.slot = None;
                entry.generation = entry.generation.wrapping_add(1);
            }
        }
    }

    /// Get a surface if the handle is still live
    pub fn get(&self, id: SurfaceId) -> Option<&SurfaceSlot> {
        self.entries
            .get(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .and_then(|e| e.slot.as_ref())
    }

    /// Get a mutable surface if the handle is still live
    pub fn get_mut(&mut self, id: SurfaceId) -> Option<&mut SurfaceSlot> {
        self.entries
            .get_mut(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .and_then(|e| e.slot.as_mut())
    }

    /// Number of live surfaces
    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|e| e.slot.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let mut reg = SurfaceRegistry::new();
        let id = reg.create(100.0, 60.0);
        let slot = reg.get(id).unwrap();
        assert_eq!(slot.width, 100.0);
        assert_eq!(slot.height, 60.0);
        assert!(slot.applied.is_none());
    }

    #[test]
    fn test_destroy_invalidates_handle() {
        let mut reg = SurfaceRegistry::new();
        let id = reg.create(10.0, 10.0);
        reg.destroy(id);
        assert!(reg.get(id).is_none());
        assert_eq!(reg.live_count(), 0);
    }

    #[test]
    fn test_slot_reuse_keeps_old_handle_stale() {
        let mut reg = SurfaceRegistry::new();
        let old = reg.create(1.0, 1.0);
        reg.destroy(old);
        let new = reg.create(2.0, 2.0);
        assert_eq!(old.index, new.index);
        assert!(reg.get(old).is_none());
        assert!(reg.get(new).is_some());
    }

    #[test]
    fn test_double_destroy_is_harmless() {
        let mut reg = SurfaceRegistry::new();
        let id = reg.create(1.0, 1.0);
        reg.destroy(id);
        reg.destroy(id);
        let fresh = reg.create(3.0, 3.0);
        assert!(reg.get(fresh).is_some());
    }
}
