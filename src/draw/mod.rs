//! Recursive drawing of a document onto a [`crate::Backend`].
//!
//! [`context::DrawingCtx`] owns the per-render stacks. Every drawable node goes through the
//! layer manager in [`layer`], which decides isolation once and applies clips, masks, filters,
//! opacity and the compositing operator on the way out.

mod clip;
mod context;
mod layer;
mod marker;
mod mask;
mod node;
mod pattern;
mod viewport;

pub use context::DrawStats;
pub use layer::needs_isolation;

pub(crate) use context::{DrawResult, DrawSetup, DrawingCtx};
