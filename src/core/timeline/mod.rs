//! Timeline Compilation Module
//!
//! Plan building (flattening tracks into one renderable sequence) and
//! clip placement resolution.

mod placement;
mod plan;

pub use placement::{resolve_placement, Occupant, Placement, ShiftedClip, SNAP_TOLERANCE_MS};
pub use plan::{build_plan, plan_from_json, EditPlan, OverlayTransform, SeqClip};
