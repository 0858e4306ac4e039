//! Transform registry
//!
//! Stores one affine matrix per transformable node and keeps every attached
//! rendering surface synchronized to it. Surfaces are addressed by
//! generation-checked handles; a handle going stale between attach and apply
//! is pruned, never an error.

use tracing::{debug, trace, warn};

use crate::{Affine, SurfaceId, SurfaceRegistry};

/// Transform identifier (index into the registry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TransformId(pub u32);

#[derive(Debug)]
struct Transform {
    matrix: Affine,
    attachments: Vec<SurfaceId>,
}

/// Registry of node transforms and their surface attachments
#[derive(Debug)]
pub struct TransformRegistry {
    transforms: Vec<Transform>,
    display_scale: f32,
}

impl TransformRegistry {
    /// Create an empty registry at display scale 1.0
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
            display_scale: 1.0,
        }
    }

    /// Set the device display-scale factor used for translation derivation
    pub fn set_display_scale(&mut self, scale: f32) {
        self.display_scale = scale;
    }

    /// Allocate a transform initialized to identity
    pub fn create(&mut self) -> TransformId {
        let id = TransformId(self.transforms.len() as u32);
        self.transforms.push(Transform {
            matrix: Affine::IDENTITY,
            attachments: Vec::new(),
        });
        id
    }

    /// Current matrix of a transform
    pub fn matrix(&self, id: TransformId) -> Option<Affine> {
        self.transforms.get(id.0 as usize).map(|t| t.matrix)
    }

    /// Number of surfaces still attached (stale handles count until pruned)
    pub fn attachment_count(&self, id: TransformId) -> usize {
        self.transforms
            .get(id.0 as usize)
            .map(|t| t.attachments.len())
            .unwrap_or(0)
    }

    /// Store a new matrix and push the derived transform to every live
    /// attached surface, pruning stale handles along the way.
    pub fn set_matrix(&mut self, surfaces: &mut SurfaceRegistry, id: TransformId, matrix: Affine) {
        if !matrix.is_finite() {
            warn!(?id, "ignoring non-finite matrix");
            return;
        }
        let scale = self.display_scale;
        let Some(t) = self.transforms.get_mut(id.0 as usize) else {
            return;
        };
        t.matrix = matrix;
        t.attachments.retain(|&sid| {
            let Some(slot) = surfaces.get_mut(sid) else {
                trace!(?sid, "pruning stale surface attachment");
                return false;
            };
            apply_to_slot(slot, &matrix, scale);
            true
        });
    }

    /// Attach a surface and immediately apply the current matrix to it
    pub fn attach(&mut self, surfaces: &mut SurfaceRegistry, id: TransformId, surface: SurfaceId) {
        let scale = self.display_scale;
        let Some(t) = self.transforms.get_mut(id.0 as usize) else {
            return;
        };
        if t.attachments.contains(&surface) {
            return;
        }
        t.attachments.push(surface);
        if let Some(slot) = surfaces.get_mut(surface) {
            apply_to_slot(slot, &t.matrix, scale);
        }
    }

    /// Detach a surface, removing only this registry's portion of its
    /// compound transform stack. Unrelated entries are preserved.
    pub fn detach(&mut self, surfaces: &mut SurfaceRegistry, id: TransformId, surface: SurfaceId) {
        let Some(t) = self.transforms.get_mut(id.0 as usize) else {
            return;
        };
        let before = t.attachments.len();
        t.attachments.retain(|&sid| sid != surface);
        if t.attachments.len() == before {
            return;
        }
        debug!(?surface, "detaching surface from transform");
        if let Some(slot) = surfaces.get_mut(surface) {
            slot.applied = None;
            slot.needs_layout = true;
        }
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive and apply the surface-local transform.
///
/// The translation is scaled to device pixels and then adjusted so the linear
/// part pivots around the surface's center rather than its top-left origin:
///
/// ```text
/// tx' = tx*s - a*hw - c*hh + hw
/// ty' = ty*s - b*hw - a*hh + hh
/// ```
///
/// The `a` coefficient in the `ty'` term is intentional. The derivation is
/// empirical and known not to generalize to every matrix decomposition (skew,
/// non-uniform scale). The identity matrix yields zero net offset, which is
/// the invariant relied on here.
fn apply_to_slot(slot: &mut crate::SurfaceSlot, matrix: &Affine, scale: f32) {
    let hw = slot.width / 2.0;
    let hh = slot.height / 2.0;
    let tx = matrix.tx * scale - matrix.a * hw - matrix.c * hh + hw;
    let ty = matrix.ty * scale - matrix.b * hw - matrix.a * hh + hh;
    slot.applied = Some(Affine::new(
        matrix.a, matrix.b, matrix.c, matrix.d, tx, ty,
    ));
    slot.needs_layout = true;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_applies_zero_offset() {
        let mut surfaces = SurfaceRegistry::new();
        let mut reg = TransformRegistry::new();
        let t = reg.create();
        let s = surfaces.create(120.0, 80.0);

        reg.attach(&mut surfaces, t, s);
        reg.set_matrix(&mut surfaces, t, Affine::IDENTITY);

        let applied = surfaces.get(s).unwrap().applied.unwrap();
        assert_eq!(applied.tx, 0.0);
        assert_eq!(applied.ty, 0.0);
        assert_eq!((applied.a, applied.d), (1.0, 1.0));
    }

    #[test]
    fn test_attach_applies_current_matrix() {
        let mut surfaces = SurfaceRegistry::new();
        let mut reg = TransformRegistry::new();
        let t = reg.create();
        reg.set_matrix(&mut surfaces, t, Affine::translation(10.0, 5.0));

        let s = surfaces.create(100.0, 100.0);
        reg.attach(&mut surfaces, t, s);

        let slot = surfaces.get(s).unwrap();
        let applied = slot.applied.unwrap();
        // hw = hh = 50, identity linear part: tx' = 10 - 50 + 50 = 10
        assert_eq!(applied.tx, 10.0);
        assert_eq!(applied.ty, 5.0);
        assert!(slot.needs_layout);
    }

    #[test]
    fn test_display_scale_and_pivot_derivation() {
        let mut surfaces = SurfaceRegistry::new();
        let mut reg = TransformRegistry::new();
        reg.set_display_scale(2.0);
        let t = reg.create();
        let s = surfaces.create(100.0, 60.0);
        reg.attach(&mut surfaces, t, s);

        // Uniform 2x scale with translation (7, 3): hw = 50, hh = 30
        reg.set_matrix(&mut surfaces, t, Affine::new(2.0, 0.0, 0.0, 2.0, 7.0, 3.0));
        let applied = surfaces.get(s).unwrap().applied.unwrap();
        // tx' = 7*2 - 2*50 - 0*30 + 50 = -36
        assert_eq!(applied.tx, -36.0);
        // ty' = 3*2 - 0*50 - 2*30 + 30 = -24
        assert_eq!(applied.ty, -24.0);
    }

    #[test]
    fn test_non_finite_matrix_rejected() {
        let mut surfaces = SurfaceRegistry::new();
        let mut reg = TransformRegistry::new();
        let t = reg.create();
        let s = surfaces.create(50.0, 50.0);
        reg.attach(&mut surfaces, t, s);
        reg.set_matrix(&mut surfaces, t, Affine::translation(4.0, 4.0));

        reg.set_matrix(
            &mut surfaces,
            t,
            Affine::new(f32::NAN, 0.0, 0.0, 1.0, 0.0, 0.0),
        );

        // The stored matrix and the surface keep the last good values.
        assert_eq!(reg.matrix(t).unwrap(), Affine::translation(4.0, 4.0));
        assert_eq!(surfaces.get(s).unwrap().applied.unwrap().tx, 4.0);
    }

    #[test]
    fn test_dead_surface_is_pruned_silently() {
        let mut surfaces = SurfaceRegistry::new();
        let mut reg = TransformRegistry::new();
        let t = reg.create();
        let s1 = surfaces.create(10.0, 10.0);
        let s2 = surfaces.create(10.0, 10.0);
        reg.attach(&mut surfaces, t, s1);
        reg.attach(&mut surfaces, t, s2);

        surfaces.destroy(s1);
        reg.set_matrix(&mut surfaces, t, Affine::translation(1.0, 1.0));

        assert_eq!(reg.attachment_count(t), 1);
        assert!(surfaces.get(s2).unwrap().applied.is_some());
    }

    #[test]
    fn test_detach_preserves_external_entries() {
        let mut surfaces = SurfaceRegistry::new();
        let mut reg = TransformRegistry::new();
        let t = reg.create();
        let s = surfaces.create(40.0, 40.0);
        reg.attach(&mut surfaces, t, s);
        reg.set_matrix(&mut surfaces, t, Affine::scale(2.0, 2.0));

        // Someone else's entry on the surface's compound stack
        surfaces
            .get_mut(s)
            .unwrap()
            .external
            .push(Affine::rotation(1.0));

        reg.detach(&mut surfaces, t, s);

        let slot = surfaces.get(s).unwrap();
        assert!(slot.applied.is_none());
        assert_eq!(slot.external.len(), 1);
        assert!(slot.needs_layout);
        assert_eq!(reg.attachment_count(t), 0);
    }

    #[test]
    fn test_detach_unattached_surface_is_noop() {
        let mut surfaces = SurfaceRegistry::new();
        let mut reg = TransformRegistry::new();
        let t = reg.create();
        let s = surfaces.create(40.0, 40.0);
        reg.detach(&mut surfaces, t, s);
        assert!(!surfaces.get(s).unwrap().needs_layout);
    }
}
