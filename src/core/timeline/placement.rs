//! Clip Placement Resolution
//!
//! Computes a non-overlapping target position for a clip being dropped or
//! moved on a track. This is the only place non-overlap is actively
//! enforced; the plan builder re-validates the invariant at build time but
//! never repairs it.

use serde::{Deserialize, Serialize};

use crate::core::{ClipId, TimeMs};

/// Snap band for touching an existing clip edge, in ms.
///
/// One frame at 30 fps, so a drop that lands a hair away from an edge never
/// leaves a sub-frame micro-gap.
pub const SNAP_TOLERANCE_MS: TimeMs = 34;

/// A clip already occupying the destination track
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occupant {
    pub clip_id: ClipId,
    pub start_ms: TimeMs,
    pub end_ms: TimeMs,
}

impl Occupant {
    pub fn new(clip_id: &str, start_ms: TimeMs, end_ms: TimeMs) -> Self {
        Self {
            clip_id: clip_id.to_string(),
            start_ms,
            end_ms,
        }
    }

    fn overlaps(&self, start_ms: TimeMs, end_ms: TimeMs) -> bool {
        start_ms < self.end_ms && end_ms > self.start_ms
    }
}

/// A clip displaced by an insert-before placement
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftedClip {
    pub clip_id: ClipId,
    pub new_start_ms: TimeMs,
}

/// Placement outcome. A structured result, never an error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Placement {
    /// Adjusted start time; no other clip is disturbed
    Place { start_ms: TimeMs },
    /// Adjusted start time plus a rigid shift of one occupant and every
    /// clip after it by exactly the inserted duration
    Shift {
        start_ms: TimeMs,
        shifted: Vec<ShiftedClip>,
    },
    /// The drop is rejected
    Cancel,
}

/// Resolves where a dropped clip lands on a track.
///
/// `occupants` must exclude the clip being moved, if any. `grab_offset_ms`
/// is the cursor-grab offset within the dragged clip, so the clip start is
/// `drop_ms - grab_offset`.
pub fn resolve_placement(
    drop_ms: TimeMs,
    duration_ms: TimeMs,
    occupants: &[Occupant],
    grab_offset_ms: Option<TimeMs>,
) -> Placement {
    if duration_ms <= 0 {
        return Placement::Cancel;
    }

    let mut start = (drop_ms - grab_offset_ms.unwrap_or(0)).max(0);

    let mut sorted: Vec<&Occupant> = occupants.iter().collect();
    sorted.sort_by_key(|o| o.start_ms);

    // Snap to touch the nearest existing clip edge within the tolerance band.
    for occ in &sorted {
        if (start - occ.end_ms).abs() <= SNAP_TOLERANCE_MS {
            start = occ.end_ms;
        } else if ((start + duration_ms) - occ.start_ms).abs() <= SNAP_TOLERANCE_MS {
            start = (occ.start_ms - duration_ms).max(0);
        }
    }

    let end = start + duration_ms;
    let conflict = sorted.iter().find(|o| o.overlaps(start, end));

    let Some(conflict) = conflict else {
        return Placement::Place { start_ms: start };
    };

    // Inside an occupied interval: nearer the occupant's leading edge means
    // the intent was "insert before"; past the midpoint we assume append and
    // reject rather than fracture the occupant.
    let midpoint = (conflict.start_ms + conflict.end_ms) / 2;
    if start > midpoint {
        return Placement::Cancel;
    }

    // Insert before: take the occupant's leading edge and translate the
    // whole suffix by the inserted duration so relative gaps are preserved.
    let insert_at = conflict.start_ms;
    let shifted = sorted
        .iter()
        .filter(|o| o.start_ms >= insert_at)
        .map(|o| ShiftedClip {
            clip_id: o.clip_id.clone(),
            new_start_ms: o.start_ms + duration_ms,
        })
        .collect();

    Placement::Shift {
        start_ms: insert_at,
        shifted,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_track_places_at_drop_point() {
        let placement = resolve_placement(5000, 3000, &[], None);
        assert_eq!(placement, Placement::Place { start_ms: 5000 });
    }

    #[test]
    fn test_negative_start_clamps_to_zero() {
        let placement = resolve_placement(100, 1000, &[], Some(500));
        assert_eq!(placement, Placement::Place { start_ms: 0 });
    }

    #[test]
    fn test_grab_offset_adjusts_start() {
        let placement = resolve_placement(5000, 1000, &[], Some(250));
        assert_eq!(placement, Placement::Place { start_ms: 4750 });
    }

    #[test]
    fn test_snap_to_trailing_edge() {
        let occupants = vec![Occupant::new("a", 0, 3000)];
        let placement = resolve_placement(3020, 1000, &occupants, None);
        assert_eq!(placement, Placement::Place { start_ms: 3000 });
    }

    #[test]
    fn test_snap_to_leading_edge() {
        let occupants = vec![Occupant::new("a", 5000, 8000)];
        // End would land at 5020, within the band of the leading edge.
        let placement = resolve_placement(4020, 1000, &occupants, None);
        assert_eq!(placement, Placement::Place { start_ms: 4000 });
    }

    #[test]
    fn test_drop_near_leading_edge_inserts_before() {
        let occupants = vec![Occupant::new("a", 0, 3000)];
        let placement = resolve_placement(1000, 2000, &occupants, None);
        assert_eq!(
            placement,
            Placement::Shift {
                start_ms: 0,
                shifted: vec![ShiftedClip {
                    clip_id: "a".to_string(),
                    new_start_ms: 2000,
                }],
            }
        );
    }

    #[test]
    fn test_drop_past_midpoint_cancels() {
        let occupants = vec![Occupant::new("a", 0, 3000)];
        let placement = resolve_placement(2500, 2000, &occupants, None);
        assert_eq!(placement, Placement::Cancel);
    }

    #[test]
    fn test_shift_translates_whole_suffix_rigidly() {
        let occupants = vec![
            Occupant::new("a", 0, 1000),
            Occupant::new("b", 1500, 2000),
            Occupant::new("c", 4000, 5000),
        ];
        let placement = resolve_placement(200, 500, &occupants, None);
        let Placement::Shift { start_ms, shifted } = placement else {
            panic!("expected shift");
        };
        assert_eq!(start_ms, 0);
        assert_eq!(
            shifted,
            vec![
                ShiftedClip {
                    clip_id: "a".to_string(),
                    new_start_ms: 500,
                },
                ShiftedClip {
                    clip_id: "b".to_string(),
                    new_start_ms: 2000,
                },
                ShiftedClip {
                    clip_id: "c".to_string(),
                    new_start_ms: 4500,
                },
            ]
        );
        // Start-to-start spacing between b and c survives the shift.
        assert_eq!(shifted[2].new_start_ms - shifted[1].new_start_ms, 2500);
    }

    #[test]
    fn test_clips_before_insert_point_are_untouched() {
        let occupants = vec![
            Occupant::new("a", 0, 1000),
            Occupant::new("b", 2000, 3000),
        ];
        let placement = resolve_placement(2100, 500, &occupants, None);
        let Placement::Shift { start_ms, shifted } = placement else {
            panic!("expected shift");
        };
        assert_eq!(start_ms, 2000);
        assert_eq!(shifted.len(), 1);
        assert_eq!(shifted[0].clip_id, "b");
    }

    #[test]
    fn test_zero_duration_cancels() {
        assert_eq!(resolve_placement(0, 0, &[], None), Placement::Cancel);
    }

    #[test]
    fn test_placement_between_clips_without_snap() {
        let occupants = vec![
            Occupant::new("a", 0, 1000),
            Occupant::new("b", 5000, 6000),
        ];
        let placement = resolve_placement(2500, 1000, &occupants, None);
        assert_eq!(placement, Placement::Place { start_ms: 2500 });
    }
}
