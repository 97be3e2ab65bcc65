//! Cutlist
//!
//! A timeline compilation and export engine. A caller hands over a full
//! project description (assets, tracks, clips, canvas transforms); the
//! engine compiles it into a linear edit plan, answers interactive
//! placement queries, and exports the plan to a single media file by
//! rendering normalized segments through external ffmpeg binaries and
//! concatenating them.
//!
//! The engine is stateless per call: nothing is persisted between
//! invocations, and every export run works in its own scratch directory.

pub mod core;

pub use crate::core::ffmpeg::{detect_system_ffmpeg, FFmpegInfo, FFmpegRunner, OutputProfile};
pub use crate::core::render::{
    CancelToken, ExportError, ExportOrchestrator, ExportProgress, ExportResult, ExportSettings,
};
pub use crate::core::sources::{LocalSources, SourceResolver};
pub use crate::core::timeline::{
    build_plan, plan_from_json, resolve_placement, EditPlan, Occupant, Placement,
};
pub use crate::core::{CoreError, CoreResult, TimeMs};
