//! Decode boundary for the serialized per-block payloads.
//!
//! Storage hands these over as JSON strings. They are decoded once when a
//! scene is loaded; a malformed payload degrades to the default value for that
//! block only and never reaches render code as an error.

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::block::Block;

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct AnimationClip {
    pub kind: String,
    #[serde(default = "default_clip_duration")]
    pub duration: f64,
    #[serde(default)]
    pub delay: f64,
}

fn default_clip_duration() -> f64 {
    0.5
}

/// Entrance/exit/loop presets attached to a block. Opaque to the engines.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
pub struct AnimationConfig {
    #[serde(default)]
    pub enter: Option<AnimationClip>,
    #[serde(default)]
    pub exit: Option<AnimationClip>,
    #[serde(default, rename = "loop")]
    pub looped: Option<AnimationClip>,
}

/// Named visual state switched at a point in time (e.g. a character pose).
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct StateKeyframe {
    pub time: f64,
    pub state: String,
}

#[derive(Clone, Default, PartialEq, Debug)]
pub struct BlockPayloads {
    pub animation: AnimationConfig,
    pub state_keyframes: Vec<StateKeyframe>,
}

impl BlockPayloads {
    pub fn decode(block: &Block) -> Self {
        Self {
            animation: decode_or_default(block.id, "animation_config", block.animation_config.as_deref()),
            state_keyframes: decode_or_default(block.id, "state_keyframes", block.state_keyframes.as_deref()),
        }
    }
}

/// Parses `raw` as `T`; absent, blank or malformed input yields `T::default()`.
pub fn decode_or_default<T>(block_id: Uuid, field: &str, raw: Option<&str>) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(text) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return T::default();
    };
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            warn!("Block {}: malformed {} payload, using default: {}", block_id, field, e);
            T::default()
        }
    }
}
