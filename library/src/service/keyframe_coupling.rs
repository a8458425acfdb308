//! Routing of direct edits through keyframes.
//!
//! A block renders `interpolate(base, keyframes, t)`. When a property group
//! already has keyframes, writing the base field would be invisible, so the
//! edit goes to the keyframe at the playhead instead (updated if one lies
//! within the tolerance, created otherwise). Groups without keyframes are
//! written to the base fields.

use log::debug;
use uuid::Uuid;

use super::backend::StorageBackend;
use crate::error::LibraryError;
use crate::model::keyframe::group_track;
use crate::model::{Block, BlockPatch, Keyframe, KeyframePatch, KeyframeSpec, KeyframeValue};

pub const DEFAULT_KEYFRAME_TOLERANCE: f64 = 0.02;

#[derive(Clone, PartialEq, Debug)]
pub enum CoupledWrite {
    Base(BlockPatch),
    UpdateKeyframe { id: Uuid, value: KeyframeValue },
    CreateKeyframe(KeyframeSpec),
}

/// Splits `patch` into base and keyframe writes.
///
/// `current` is the block as the user currently sees it; fields the patch
/// leaves out of a keyframed group are taken from it.
pub fn plan_writes(
    current: &Block,
    patch: &BlockPatch,
    keyframes: &[Keyframe],
    playhead: f64,
    tolerance: f64,
) -> Vec<CoupledWrite> {
    let mut patched = current.clone();
    patch.apply_to(&mut patched);

    let mut base = patch.clone();
    let mut writes = Vec::new();
    for group in patch.groups() {
        let track = group_track(keyframes, group);
        if track.is_empty() {
            continue;
        }
        let Some(value) = KeyframeValue::base_of(&patched, group) else {
            continue;
        };
        base = base.without_group(group);

        let nearest = track
            .iter()
            .filter(|k| (k.time - playhead).abs() <= tolerance + f64::EPSILON)
            .min_by(|a, b| (a.time - playhead).abs().total_cmp(&(b.time - playhead).abs()));
        match nearest {
            Some(k) => writes.push(CoupledWrite::UpdateKeyframe { id: k.id, value }),
            None => writes.push(CoupledWrite::CreateKeyframe(KeyframeSpec {
                block_id: current.id,
                time: playhead,
                value,
            })),
        }
    }

    if !base.is_empty() {
        writes.insert(0, CoupledWrite::Base(base));
    }
    writes
}

/// Reads the block's keyframes at execution time, then applies the planned
/// writes in order.
pub fn apply_coupled(
    backend: &dyn StorageBackend,
    current: &Block,
    patch: &BlockPatch,
    playhead: f64,
    tolerance: f64,
) -> Result<(), LibraryError> {
    let keyframes = backend.get_keyframes(current.id)?;
    for write in plan_writes(current, patch, &keyframes, playhead, tolerance) {
        match write {
            CoupledWrite::Base(base) => backend.update_block(current.id, &base)?,
            CoupledWrite::UpdateKeyframe { id, value } => {
                debug!("Block {}: updating keyframe {} at {}", current.id, id, playhead);
                backend.update_keyframe(id, &KeyframePatch::value(value))?
            }
            CoupledWrite::CreateKeyframe(spec) => {
                debug!("Block {}: creating {:?} keyframe at {}", current.id, spec.value.group(), playhead);
                backend.create_keyframe(&spec)?;
            }
        }
    }
    Ok(())
}
