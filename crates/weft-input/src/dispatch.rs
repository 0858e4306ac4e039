//! Touch dispatch router
//!
//! Routes a pointer-event stream to the correct descendant of a container.
//! Once a pointer is claimed by a child, every further event for that pointer
//! routes to the claim regardless of coordinates, until a terminal action.
//! Unclaimed pointers are resolved by bounds search from the topmost child
//! down, with coordinates rewritten through the inverse of any active
//! transform before the bounds test.

use std::collections::HashMap;

use tracing::{debug, trace};
use weft_scene::{NodeId, SceneTree, TransformRegistry};

use crate::event::{EventSink, PointerAction, PointerEvent, PointerId, SampleKind};

/// One active pointer's claim on a child node
#[derive(Debug, Clone, Copy)]
pub struct TouchTarget {
    /// The claiming pointer
    pub pointer: PointerId,
    /// The claimed child (non-owning)
    pub child: NodeId,
    /// Last seen container-space coordinates for this pointer
    pub last_x: f32,
    pub last_y: f32,
}

/// Router state: per-container touch-target lists.
///
/// At most one target exists per pointer per container. Not reentrant: the
/// single-threaded input model delivers at most one dispatch per container at
/// a time.
#[derive(Debug, Default)]
pub struct TouchRouter {
    targets: HashMap<NodeId, Vec<TouchTarget>>,
}

impl TouchRouter {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets currently tracked for a container
    pub fn targets(&self, container: NodeId) -> &[TouchTarget] {
        self.targets.get(&container).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Route `event` (in `container`'s local space) to the container's
    /// children. Returns true when some descendant handled it.
    pub fn dispatch_to_children(
        &mut self,
        tree: &SceneTree,
        transforms: &TransformRegistry,
        container: NodeId,
        event: &PointerEvent,
        sink: &mut dyn EventSink,
    ) -> bool {
        let Some(node) = tree.node(container) else {
            return false;
        };

        // Leaf: the container handles its own events.
        if !node.is_container() {
            return match event.sample() {
                Some(sample) => sink.handle(container, sample),
                None => false,
            };
        }

        // A fresh gesture may arrive without terminal events for the previous
        // one ever being delivered (a parent can intercept without forwarding
        // them). Start from a clean slate.
        if event.action == PointerAction::Down {
            if let Some(old) = self.targets.remove(&container) {
                if !old.is_empty() {
                    debug!(?container, stale = old.len(), "clearing targets on new gesture");
                }
            }
        }

        // The per-pointer handler contract is single-pointer: report each
        // contact's movement independently.
        if event.contacts.len() > 1
            && matches!(event.action, PointerAction::Move | PointerAction::Cancel)
        {
            let mut handled = false;
            for sub in event.split_per_contact() {
                handled |= self.dispatch_single(tree, transforms, container, &sub, sink);
            }
            return handled;
        }

        self.dispatch_single(tree, transforms, container, event, sink)
    }

    fn dispatch_single(
        &mut self,
        tree: &SceneTree,
        transforms: &TransformRegistry,
        container: NodeId,
        event: &PointerEvent,
        sink: &mut dyn EventSink,
    ) -> bool {
        let Some(contact) = event.primary().copied() else {
            return false;
        };
        let pointer = contact.id;
        let kind = SampleKind::from(event.action);

        // Affinity path: an existing claim routes without hit-testing.
        if let Some(pos) = self
            .targets
            .get(&container)
            .and_then(|ts| ts.iter().position(|t| t.pointer == pointer))
        {
            let target = self.targets[&container][pos];
            let claimed_alive = tree
                .node(target.child)
                .map(|n| n.hit_testable)
                .unwrap_or(false);

            if claimed_alive {
                if event.action.is_terminal() {
                    let handled =
                        self.forward(tree, transforms, container, target.child, event, sink);
                    self.remove_target(container, pointer);
                    return handled;
                }
                if kind == SampleKind::Move
                    && contact.x == target.last_x
                    && contact.y == target.last_y
                {
                    // Split multi-pointer moves report every contact; only
                    // actual movement is worth a callback.
                    return true;
                }
                if let Some(ts) = self.targets.get_mut(&container) {
                    ts[pos].last_x = contact.x;
                    ts[pos].last_y = contact.y;
                }
                return self.forward(tree, transforms, container, target.child, event, sink);
            }

            // The claim went stale mid-gesture; drop it and let the bounds
            // search below reclaim the pointer immediately.
            trace!(?pointer, child = ?target.child, "dropping stale touch target");
            self.remove_target(container, pointer);
        }

        // Bounds search, topmost child first.
        let (scroll_x, scroll_y) = match tree.node(container) {
            Some(n) => (n.scroll_x, n.scroll_y),
            None => return false,
        };
        let children: Vec<NodeId> = tree.children_topmost_first(container).collect();
        for child_id in children {
            let Some(child) = tree.node(child_id) else {
                continue;
            };
            if !child.hit_testable {
                continue;
            }

            // Rewrite coordinates through the inverse of an active transform
            // before testing; a singular matrix falls back to raw coordinates.
            let corrected;
            let test_event = match child
                .transform
                .and_then(|tid| transforms.matrix(tid))
                .and_then(|m| m.inverse())
            {
                Some(inv) => {
                    corrected = event.transformed(&inv);
                    &corrected
                }
                None => event,
            };
            let Some(c) = test_event.primary() else {
                continue;
            };
            let lx = c.x - child.bounds.x + scroll_x;
            let ly = c.y - child.bounds.y + scroll_y;
            if !child.bounds.contains_local(lx, ly) {
                continue;
            }

            // First bounds hit wins; forwarding happens exactly once.
            if !event.action.is_terminal() {
                // Affinity comparisons happen in raw container space, so the
                // stored coordinates are the uncorrected ones.
                self.targets.entry(container).or_default().push(TouchTarget {
                    pointer,
                    child: child_id,
                    last_x: contact.x,
                    last_y: contact.y,
                });
                trace!(?pointer, child = ?child_id, "claimed");
            }
            return self.forward(tree, transforms, container, child_id, test_event, sink);
        }

        // Unclaimed movement outside every child is normal and not forwarded.
        false
    }

    /// Translate into the child's local space and deliver: containers that
    /// dispatch to their own children are entered recursively, everything
    /// else goes to the sink handler.
    fn forward(
        &mut self,
        tree: &SceneTree,
        transforms: &TransformRegistry,
        container: NodeId,
        child_id: NodeId,
        event: &PointerEvent,
        sink: &mut dyn EventSink,
    ) -> bool {
        let Some((dx, dy, recurse)) = tree.node(container).and_then(|parent| {
            let child = tree.node(child_id)?;
            Some((
                -child.bounds.x + parent.scroll_x,
                -child.bounds.y + parent.scroll_y,
                child.dispatches_to_children && child.is_container(),
            ))
        }) else {
            return false;
        };

        let local = event.offset(dx, dy);
        if recurse {
            return self.dispatch_to_children(tree, transforms, child_id, &local, sink);
        }
        match local.sample() {
            Some(sample) => sink.handle(child_id, sample),
            None => false,
        }
    }

    fn remove_target(&mut self, container: NodeId, pointer: PointerId) {
        if let Some(ts) = self.targets.get_mut(&container) {
            ts.retain(|t| t.pointer != pointer);
            if ts.is_empty() {
                self.targets.remove(&container);
            }
        }
    }
}
