//! Project Model Definitions
//!
//! The serialized project schema: assets, clips, tracks and canvas nodes,
//! keyed by id. A project is supplied whole per call; the engine never
//! persists it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{AssetId, ClipId, NodeId, ProjectId, TimeMs, TrackId};

// =============================================================================
// Asset
// =============================================================================

/// Asset media kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    Video,
    Audio,
    Image,
}

/// Imported media asset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: AssetId,
    pub kind: AssetKind,
    /// Source locator: local path, `file://` URI or remote URL
    pub src: String,
    /// Natural width in pixels, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Natural height in pixels, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl Asset {
    /// Creates a new asset with a generated id
    pub fn new(kind: AssetKind, src: &str) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            kind,
            src: src.to_string(),
            width: None,
            height: None,
        }
    }

    /// Sets the natural dimensions
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

// =============================================================================
// Clip
// =============================================================================

/// Clip (a trimmed slice of an asset placed on a track)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: ClipId,
    pub asset_id: AssetId,
    pub track_id: TrackId,
    /// Timeline start (ms)
    pub start_ms: TimeMs,
    /// Timeline end (ms)
    pub end_ms: TimeMs,
    /// Trim-in within the source (ms)
    pub in_ms: TimeMs,
    /// Trim-out within the source (ms)
    pub out_ms: TimeMs,
    #[serde(default)]
    pub z_index: i32,
}

impl Clip {
    /// Creates a clip with a generated id
    pub fn new(asset_id: &str, track_id: &str) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            asset_id: asset_id.to_string(),
            track_id: track_id.to_string(),
            start_ms: 0,
            end_ms: 0,
            in_ms: 0,
            out_ms: 0,
            z_index: 0,
        }
    }

    /// Sets the trim range within the source
    pub fn with_trim(mut self, in_ms: TimeMs, out_ms: TimeMs) -> Self {
        self.in_ms = in_ms;
        self.out_ms = out_ms;
        self
    }

    /// Places the clip on the timeline
    pub fn place_at(mut self, start_ms: TimeMs, end_ms: TimeMs) -> Self {
        self.start_ms = start_ms;
        self.end_ms = end_ms;
        self
    }

    /// Timeline duration in ms
    pub fn duration_ms(&self) -> TimeMs {
        self.end_ms - self.start_ms
    }
}

// =============================================================================
// Track
// =============================================================================

/// Track role on the timeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackRole {
    Main,
    Overlay,
}

/// Track media type
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackMedia {
    Video,
    Audio,
}

/// Track (ordered sequence of clip ids)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    pub role: TrackRole,
    pub media: TrackMedia,
    /// Clip ids in user-arranged order
    #[serde(default)]
    pub clip_order: Vec<ClipId>,
}

impl Track {
    /// Creates a new track with a generated id
    pub fn new(role: TrackRole, media: TrackMedia) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            role,
            media,
            clip_order: vec![],
        }
    }
}

// =============================================================================
// Canvas Node
// =============================================================================

/// Canvas transform bound to one clip, used for overlay tracks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasNode {
    pub id: NodeId,
    pub clip_id: ClipId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
}

fn default_opacity() -> f64 {
    1.0
}

// =============================================================================
// Project
// =============================================================================

/// Whole-project description, supplied per call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    #[serde(default)]
    pub assets: HashMap<AssetId, Asset>,
    #[serde(default)]
    pub clips: HashMap<ClipId, Clip>,
    #[serde(default)]
    pub tracks: HashMap<TrackId, Track>,
    #[serde(default)]
    pub canvas: HashMap<NodeId, CanvasNode>,
}

impl Project {
    /// Creates an empty project with a generated id
    pub fn new() -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            assets: HashMap::new(),
            clips: HashMap::new(),
            tracks: HashMap::new(),
            canvas: HashMap::new(),
        }
    }

    /// Registers an asset
    pub fn add_asset(&mut self, asset: Asset) -> AssetId {
        let id = asset.id.clone();
        self.assets.insert(id.clone(), asset);
        id
    }

    /// Registers a track
    pub fn add_track(&mut self, track: Track) -> TrackId {
        let id = track.id.clone();
        self.tracks.insert(id.clone(), track);
        id
    }

    /// Registers a clip and appends it to its track's clip order
    pub fn add_clip(&mut self, clip: Clip) -> ClipId {
        let id = clip.id.clone();
        if let Some(track) = self.tracks.get_mut(&clip.track_id) {
            track.clip_order.push(id.clone());
        }
        self.clips.insert(id.clone(), clip);
        id
    }

    /// Latest clip end across all tracks, in ms
    pub fn duration_ms(&self) -> TimeMs {
        self.clips.values().map(|c| c.end_ms).max().unwrap_or(0)
    }
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
