//! Collision and snap rules for placing blocks on a non-main layer.
//!
//! Intervals are half-open: `[0,5)` and `[5,8)` touch but do not overlap.

use std::fmt;

use uuid::Uuid;

use crate::model::{Block, LayerKind};

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PlacementRejection {
    /// The collision reached the snap threshold.
    OverlapTooLarge { overlap_px: f64 },
    /// Neither snap slot next to the colliders was free.
    NoFreeSlot,
    LayerLocked(Uuid),
    KindMismatch { block: LayerKind, layer: LayerKind },
}

impl fmt::Display for PlacementRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementRejection::OverlapTooLarge { overlap_px } => {
                write!(f, "Overlaps another block by {:.0}px", overlap_px)
            }
            PlacementRejection::NoFreeSlot => write!(f, "No free slot next to the overlapped block"),
            PlacementRejection::LayerLocked(id) => write!(f, "Layer {} is locked", id),
            PlacementRejection::KindMismatch { block, layer } => {
                write!(f, "Cannot place a {} block on a {} layer", block, layer)
            }
        }
    }
}

pub fn overlaps(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> bool {
    a_start < b_end && b_start < a_end
}

/// Blocks intersecting `[start, end)`, ignoring `exclude`.
pub fn colliders<'a>(
    blocks: &[&'a Block],
    start: f64,
    end: f64,
    exclude: Option<Uuid>,
) -> Vec<&'a Block> {
    blocks
        .iter()
        .copied()
        .filter(|b| Some(b.id) != exclude)
        .filter(|b| overlaps(start, end, b.start_time, b.end_time))
        .collect()
}

pub fn has_overlap(blocks: &[&Block], start: f64, end: f64, exclude: Option<Uuid>) -> bool {
    !colliders(blocks, start, end, exclude).is_empty()
}

/// Start time for a block of `duration` dropped at `start` on a layer holding
/// `blocks`.
///
/// A free interval is taken as is. A shallow collision snaps to the free slot
/// just before the leftmost collider or just after the rightmost one,
/// whichever is valid and closer to the drop time.
pub fn resolve_drop(
    blocks: &[&Block],
    exclude: Option<Uuid>,
    start: f64,
    duration: f64,
    pixels_per_second: f64,
    snap_threshold_px: f64,
) -> Result<f64, PlacementRejection> {
    let end = start + duration;
    let hits = colliders(blocks, start, end, exclude);
    if hits.is_empty() {
        return Ok(start);
    }

    let max_overlap = hits
        .iter()
        .map(|b| end.min(b.end_time) - start.max(b.start_time))
        .fold(0.0, f64::max);
    let overlap_px = max_overlap * pixels_per_second;
    if overlap_px >= snap_threshold_px {
        return Err(PlacementRejection::OverlapTooLarge { overlap_px });
    }

    let leftmost = hits.iter().map(|b| b.start_time).fold(f64::INFINITY, f64::min);
    let rightmost = hits.iter().map(|b| b.end_time).fold(f64::NEG_INFINITY, f64::max);
    let fits = |s: f64| s >= 0.0 && !has_overlap(blocks, s, s + duration, exclude);

    let before = Some(leftmost - duration).filter(|s| fits(*s));
    let after = Some(rightmost).filter(|s| fits(*s));
    match (before, after) {
        (Some(b), Some(a)) => {
            if (b - start).abs() <= (a - start).abs() {
                Ok(b)
            } else {
                Ok(a)
            }
        }
        (Some(s), None) | (None, Some(s)) => Ok(s),
        (None, None) => Err(PlacementRejection::NoFreeSlot),
    }
}

/// Ordering key for a layer inserted between `upper` and `lower` (z values of
/// the neighbouring rows; upper is drawn on top).
pub fn interpolate_z(upper: Option<f64>, lower: Option<f64>) -> f64 {
    match (upper, lower) {
        (Some(u), Some(l)) => (u + l) / 2.0,
        (Some(u), None) => u - 1.0,
        (None, Some(l)) => l + 1.0,
        (None, None) => 1.0,
    }
}

/// Earliest start a block may take without running into the previous
/// neighbour, and the latest end before the next one.
pub fn neighbour_bounds(blocks: &[&Block], block: &Block) -> (f64, f64) {
    let mut lower: f64 = 0.0;
    let mut upper = f64::INFINITY;
    for other in blocks.iter().filter(|b| b.id != block.id) {
        if other.end_time <= block.start_time {
            lower = lower.max(other.end_time);
        } else if other.start_time >= block.end_time {
            upper = upper.min(other.start_time);
        }
    }
    (lower, upper)
}
