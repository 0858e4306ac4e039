//! Pointer events
//!
//! Hardware pointer events carry one or more simultaneous contacts; the
//! per-node handler contract is single-pointer, so multi-contact events are
//! split before they reach a handler.

use weft_scene::{Affine, NodeId};

/// Opaque pointer identity, unique per active gesture contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct PointerId(pub u64);

/// Action carried by a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    /// First contact of a gesture went down
    Down,
    /// An additional contact went down; the index selects it
    PointerDown(usize),
    /// One or more contacts moved
    Move,
    /// The last contact lifted
    Up,
    /// One of several contacts lifted; the index selects it
    PointerUp(usize),
    /// The gesture was aborted; terminal like `Up`
    Cancel,
}

impl PointerAction {
    /// Terminal actions destroy the touch target for their pointer
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Up | Self::PointerUp(_) | Self::Cancel)
    }
}

/// One contact within a pointer event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub id: PointerId,
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
}

/// A pointer event: an action plus the simultaneous contacts it describes
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub action: PointerAction,
    pub contacts: Vec<Contact>,
    pub timestamp: f64,
}

impl PointerEvent {
    /// Single-contact convenience constructor
    pub fn single(action: PointerAction, id: PointerId, x: f32, y: f32) -> Self {
        Self {
            action,
            contacts: vec![Contact {
                id,
                x,
                y,
                pressure: 1.0,
            }],
            timestamp: 0.0,
        }
    }

    /// Index of the contact this action is about
    pub fn primary_index(&self) -> usize {
        match self.action {
            PointerAction::PointerDown(i) | PointerAction::PointerUp(i) => i,
            _ => 0,
        }
    }

    /// The contact this action is about
    pub fn primary(&self) -> Option<&Contact> {
        self.contacts.get(self.primary_index())
    }

    /// Split into one single-contact event per contact, preserving the
    /// action kind. Used for multi-contact move/cancel routing.
    pub fn split_per_contact(&self) -> Vec<PointerEvent> {
        self.contacts
            .iter()
            .map(|&c| PointerEvent {
                action: self.action,
                contacts: vec![c],
                timestamp: self.timestamp,
            })
            .collect()
    }

    /// Copy with every contact shifted by (dx, dy)
    pub fn offset(&self, dx: f32, dy: f32) -> PointerEvent {
        let mut ev = self.clone();
        for c in &mut ev.contacts {
            c.x += dx;
            c.y += dy;
        }
        ev
    }

    /// Copy with every contact mapped through a matrix (usually an inverse)
    pub fn transformed(&self, m: &Affine) -> PointerEvent {
        let mut ev = self.clone();
        for c in &mut ev.contacts {
            let (x, y) = m.apply(c.x, c.y);
            c.x = x;
            c.y = y;
        }
        ev
    }

    /// Single-pointer sample for the primary contact, if any
    pub fn sample(&self) -> Option<PointerSample> {
        let c = self.primary()?;
        Some(PointerSample {
            id: c.id,
            kind: SampleKind::from(self.action),
            x: c.x,
            y: c.y,
            pressure: c.pressure,
            timestamp: self.timestamp,
        })
    }
}

/// Collapsed action kind seen by per-node handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    Down,
    Move,
    Up,
    Cancel,
}

impl From<PointerAction> for SampleKind {
    fn from(action: PointerAction) -> Self {
        match action {
            PointerAction::Down | PointerAction::PointerDown(_) => Self::Down,
            PointerAction::Move => Self::Move,
            PointerAction::Up | PointerAction::PointerUp(_) => Self::Up,
            PointerAction::Cancel => Self::Cancel,
        }
    }
}

/// What a leaf node receives: one pointer, node-local coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub id: PointerId,
    pub kind: SampleKind,
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
    pub timestamp: f64,
}

/// Per-node single-pointer event handler
pub trait EventSink {
    /// Handle a sample addressed to `node`; return true when consumed
    fn handle(&mut self, node: NodeId, sample: PointerSample) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_index_follows_action() {
        let mut ev = PointerEvent::single(PointerAction::Down, PointerId(1), 0.0, 0.0);
        ev.contacts.push(Contact {
            id: PointerId(2),
            x: 5.0,
            y: 5.0,
            pressure: 1.0,
        });
        ev.action = PointerAction::PointerDown(1);
        assert_eq!(ev.primary().unwrap().id, PointerId(2));
    }

    #[test]
    fn test_split_per_contact() {
        let mut ev = PointerEvent::single(PointerAction::Move, PointerId(1), 1.0, 2.0);
        ev.contacts.push(Contact {
            id: PointerId(2),
            x: 3.0,
            y: 4.0,
            pressure: 1.0,
        });
        let parts = ev.split_per_contact();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].contacts.len(), 1);
        assert_eq!(parts[1].contacts[0].id, PointerId(2));
        assert_eq!(parts[1].action, PointerAction::Move);
    }

    #[test]
    fn test_offset_and_transform() {
        let ev = PointerEvent::single(PointerAction::Move, PointerId(1), 10.0, 10.0);
        let shifted = ev.offset(-4.0, 6.0);
        assert_eq!(shifted.contacts[0].x, 6.0);
        assert_eq!(shifted.contacts[0].y, 16.0);

        let halved = ev.transformed(&Affine::scale(0.5, 0.5));
        assert_eq!(halved.contacts[0].x, 5.0);
    }

    #[test]
    fn test_terminal_actions() {
        assert!(PointerAction::Cancel.is_terminal());
        assert!(PointerAction::PointerUp(3).is_terminal());
        assert!(!PointerAction::Move.is_terminal());
    }
}
