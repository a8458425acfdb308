//! Optimistic per-block overlay and render resolution.
//!
//! Resolution order for every field:
//! 1. the pending overlay, if it carries the field;
//! 2. the interpolated keyframe value, if the field's group has keyframes;
//! 3. the block's base field.

use serde::Serialize;
use uuid::Uuid;

use crate::animation::Interpolator;
use crate::model::keyframe::group_track;
use crate::model::{Block, BlockPatch, Keyframe, KeyframeValue, Layer, PropertyGroup};

const RESOLVED_GROUPS: [PropertyGroup; 5] = [
    PropertyGroup::Pos,
    PropertyGroup::Scale,
    PropertyGroup::Rotation,
    PropertyGroup::Opacity,
    PropertyGroup::Blur,
];

/// Writes that have been shown to the user but not yet confirmed by storage.
#[derive(Clone, Default, PartialEq, Debug)]
pub struct PendingOverlay {
    patch: BlockPatch,
    writes: u64,
}

impl PendingOverlay {
    /// The only way values enter an overlay: later writes win per field.
    pub fn merge(&mut self, patch: &BlockPatch) {
        self.patch.absorb(patch);
        self.writes += 1;
    }

    pub fn patch(&self) -> &BlockPatch {
        &self.patch
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }
}

/// Block as it should be drawn at `time`.
pub fn resolve_block(
    block: &Block,
    keyframes: &[Keyframe],
    overlay: Option<&PendingOverlay>,
    interpolator: &dyn Interpolator,
    time: f64,
) -> Block {
    let mut effective = BlockPatch::default();
    for group in RESOLVED_GROUPS {
        let track = group_track(keyframes, group);
        if track.is_empty() {
            continue;
        }
        if let Some(base) = KeyframeValue::base_of(block, group) {
            interpolator
                .interpolate(base, &track, time)
                .write_into(&mut effective);
        }
    }
    if let Some(overlay) = overlay {
        effective.absorb(overlay.patch());
    }

    let mut resolved = block.clone();
    effective.apply_to(&mut resolved);
    resolved
}

#[derive(Serialize, Clone, Copy, PartialEq, Debug)]
pub struct RenderDescriptor {
    pub block_id: Uuid,
    pub pos_x: f64,
    pub pos_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub rotation: f64,
    pub opacity: f64,
    pub blur: f64,
    pub z_index: f64,
}

impl RenderDescriptor {
    pub fn new(resolved: &Block, layer: &Layer) -> Self {
        Self {
            block_id: resolved.id,
            pos_x: resolved.pos_x,
            pos_y: resolved.pos_y,
            scale_x: resolved.scale_x,
            scale_y: resolved.scale_y,
            rotation: resolved.rotation,
            opacity: resolved.opacity,
            blur: resolved.blur,
            z_index: layer.z(),
        }
    }
}
