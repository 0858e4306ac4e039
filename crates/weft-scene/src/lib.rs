//! Weft Scene - Retained visual tree
//!
//! Arena-based scene tree, rectangle geometry, and the transform registry
//! that keeps rendering surfaces synchronized with node matrices.

mod affine;
mod geometry;
mod surface;
mod transform;
mod tree;

pub use affine::Affine;
pub use geometry::Rect;
pub use surface::{SurfaceId, SurfaceRegistry, SurfaceSlot};
pub use transform::{TransformId, TransformRegistry};
pub use tree::{SceneNode, SceneTree};

/// Node identifier (index into the scene arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check whether this id refers to a node at all
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }
}
