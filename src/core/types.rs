//! Cutlist Core Type Definitions
//!
//! Fundamental types shared across the engine.

// =============================================================================
// ID Types
// =============================================================================

/// Project unique identifier (ULID)
pub type ProjectId = String;

/// Asset unique identifier (ULID)
pub type AssetId = String;

/// Clip unique identifier (ULID)
pub type ClipId = String;

/// Track unique identifier (ULID)
pub type TrackId = String;

/// Canvas node unique identifier (ULID)
pub type NodeId = String;

// =============================================================================
// Time Types
// =============================================================================

/// Time in milliseconds (integer, so timeline math stays exact)
pub type TimeMs = i64;

/// Formats a millisecond timestamp as fractional seconds for ffmpeg arguments.
pub fn ms_to_secs_arg(ms: TimeMs) -> String {
    format!("{:.3}", ms as f64 / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms_to_secs_arg() {
        assert_eq!(ms_to_secs_arg(0), "0.000");
        assert_eq!(ms_to_secs_arg(1500), "1.500");
        assert_eq!(ms_to_secs_arg(33), "0.033");
        assert_eq!(ms_to_secs_arg(125_250), "125.250");
    }
}
