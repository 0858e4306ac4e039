//! Scene tree (arena-based allocation)
//!
//! Retained tree of visual nodes. The core reads bounds and eligibility and
//! never owns node lifetime beyond the arena itself.

use crate::{NodeId, Rect, TransformId};

/// One node in the retained visual tree
#[derive(Debug)]
pub struct SceneNode {
    /// Parent node (NONE if root or detached)
    pub parent: NodeId,
    /// Children in z-order: last is topmost
    pub children: Vec<NodeId>,
    /// Bounds in the parent's coordinate space, device pixels
    pub bounds: Rect,
    /// Whether this node may be the target of pointer input
    pub hit_testable: bool,
    /// Whether this node routes events to its children itself
    pub dispatches_to_children: bool,
    /// Container scroll offset, added when translating into child space
    pub scroll_x: f32,
    /// Container scroll offset, added when translating into child space
    pub scroll_y: f32,
    /// Attached transform, if any
    pub transform: Option<TransformId>,
}

impl SceneNode {
    /// Create a hit-testable node with the given bounds
    pub fn new(bounds: Rect) -> Self {
        Self {
            parent: NodeId::NONE,
            children: Vec::new(),
            bounds,
            hit_testable: true,
            dispatches_to_children: false,
            scroll_x: 0.0,
            scroll_y: 0.0,
            transform: None,
        }
    }

    /// Check whether this node has children to route into
    #[inline]
    pub fn is_container(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Arena-based scene tree
#[derive(Debug, Default)]
pub struct SceneTree {
    nodes: Vec<SceneNode>,
}

impl SceneTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Add a node to the arena (not yet parented)
    pub fn insert(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Get a node by id
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        if !id.is_valid() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    /// Get a mutable node by id
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        if !id.is_valid() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    /// Append `child` as the topmost child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.node(child).is_none() {
            return;
        }
        self.detach(child);
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        } else {
            return;
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = parent;
        }
    }

    /// Remove `child` from its parent's child list, leaving it in the arena
    pub fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).map(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|&c| c != child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = NodeId::NONE;
        }
    }

    /// Children of `id` from topmost (last in z-order) to bottommost
    pub fn children_topmost_first(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .rev()
            .copied()
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the arena is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_z_order() {
        let mut tree = SceneTree::new();
        let root = tree.insert(SceneNode::new(Rect::from_xywh(0.0, 0.0, 200.0, 200.0)));
        let a = tree.insert(SceneNode::new(Rect::from_xywh(0.0, 0.0, 50.0, 50.0)));
        let b = tree.insert(SceneNode::new(Rect::from_xywh(10.0, 10.0, 50.0, 50.0)));
        tree.append_child(root, a);
        tree.append_child(root, b);

        let order: Vec<NodeId> = tree.children_topmost_first(root).collect();
        assert_eq!(order, vec![b, a]);
        assert_eq!(tree.node(a).unwrap().parent, root);
    }

    #[test]
    fn test_detach() {
        let mut tree = SceneTree::new();
        let root = tree.insert(SceneNode::new(Rect::default()));
        let a = tree.insert(SceneNode::new(Rect::default()));
        tree.append_child(root, a);
        tree.detach(a);

        assert!(tree.node(root).unwrap().children.is_empty());
        assert_eq!(tree.node(a).unwrap().parent, NodeId::NONE);
    }

    #[test]
    fn test_reparent_moves_child() {
        let mut tree = SceneTree::new();
        let p1 = tree.insert(SceneNode::new(Rect::default()));
        let p2 = tree.insert(SceneNode::new(Rect::default()));
        let a = tree.insert(SceneNode::new(Rect::default()));
        tree.append_child(p1, a);
        tree.append_child(p2, a);

        assert!(tree.node(p1).unwrap().children.is_empty());
        assert_eq!(tree.node(p2).unwrap().children, vec![a]);
    }

    #[test]
    fn test_invalid_id() {
        let tree = SceneTree::new();
        assert!(tree.node(NodeId::NONE).is_none());
        assert!(tree.node(NodeId(42)).is_none());
    }
}
