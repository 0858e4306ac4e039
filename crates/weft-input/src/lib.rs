//! Weft Input
//!
//! Pointer event model and the touch dispatch router that walks the scene
//! tree, claims pointers for children, and rewrites coordinates under active
//! transforms.

mod dispatch;
mod event;

pub use dispatch::{TouchRouter, TouchTarget};
pub use event::{
    Contact, EventSink, PointerAction, PointerEvent, PointerId, PointerSample, SampleKind,
};
