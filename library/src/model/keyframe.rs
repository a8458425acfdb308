use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::block::{Block, BlockPatch};

/// Independent interpolation track on a block. Keyframes of different groups
/// are never mixed.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "lowercase")]
pub enum PropertyGroup {
    Pos,
    Scale,
    Rotation,
    Opacity,
    Blur,
    Color,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// A keyframe value. The variant determines the property group.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(tag = "property_group", content = "value", rename_all = "lowercase")]
pub enum KeyframeValue {
    Pos { x: f64, y: f64 },
    Scale { x: f64, y: f64 },
    Rotation(f64),
    Opacity(f64),
    Blur(f64),
    Color(Color),
}

impl KeyframeValue {
    pub fn group(&self) -> PropertyGroup {
        match self {
            KeyframeValue::Pos { .. } => PropertyGroup::Pos,
            KeyframeValue::Scale { .. } => PropertyGroup::Scale,
            KeyframeValue::Rotation(_) => PropertyGroup::Rotation,
            KeyframeValue::Opacity(_) => PropertyGroup::Opacity,
            KeyframeValue::Blur(_) => PropertyGroup::Blur,
            KeyframeValue::Color(_) => PropertyGroup::Color,
        }
    }

    /// The value of `group` as currently stored in the block's base fields.
    /// Color has no base field on a block.
    pub fn base_of(block: &Block, group: PropertyGroup) -> Option<Self> {
        match group {
            PropertyGroup::Pos => Some(KeyframeValue::Pos {
                x: block.pos_x,
                y: block.pos_y,
            }),
            PropertyGroup::Scale => Some(KeyframeValue::Scale {
                x: block.scale_x,
                y: block.scale_y,
            }),
            PropertyGroup::Rotation => Some(KeyframeValue::Rotation(block.rotation)),
            PropertyGroup::Opacity => Some(KeyframeValue::Opacity(block.opacity)),
            PropertyGroup::Blur => Some(KeyframeValue::Blur(block.blur)),
            PropertyGroup::Color => None,
        }
    }

    /// Writes this value into a patch, for merging resolved values back into
    /// a block-shaped result.
    pub fn write_into(&self, patch: &mut BlockPatch) {
        match *self {
            KeyframeValue::Pos { x, y } => {
                patch.pos_x = Some(x);
                patch.pos_y = Some(y);
            }
            KeyframeValue::Scale { x, y } => {
                patch.scale_x = Some(x);
                patch.scale_y = Some(y);
            }
            KeyframeValue::Rotation(v) => patch.rotation = Some(v),
            KeyframeValue::Opacity(v) => patch.opacity = Some(v),
            KeyframeValue::Blur(v) => patch.blur = Some(v),
            KeyframeValue::Color(_) => {}
        }
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Keyframe {
    pub id: Uuid,
    pub block_id: Uuid,
    pub time: f64,
    #[serde(flatten)]
    pub value: KeyframeValue,
}

impl Keyframe {
    pub fn from_spec(spec: &KeyframeSpec) -> Self {
        Self {
            id: Uuid::new_v4(),
            block_id: spec.block_id,
            time: spec.time,
            value: spec.value,
        }
    }

    pub fn group(&self) -> PropertyGroup {
        self.value.group()
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct KeyframeSpec {
    pub block_id: Uuid,
    pub time: f64,
    #[serde(flatten)]
    pub value: KeyframeValue,
}

#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
pub struct KeyframePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<KeyframeValue>,
}

impl KeyframePatch {
    pub fn value(value: KeyframeValue) -> Self {
        Self {
            time: None,
            value: Some(value),
        }
    }

    pub fn apply_to(&self, keyframe: &mut Keyframe) -> Result<(), crate::error::LibraryError> {
        if let Some(value) = self.value {
            if value.group() != keyframe.group() {
                return Err(crate::error::LibraryError::InvalidArgument(format!(
                    "keyframe {} belongs to {:?}, cannot store a {:?} value",
                    keyframe.id,
                    keyframe.group(),
                    value.group()
                )));
            }
            keyframe.value = value;
        }
        if let Some(time) = self.time {
            keyframe.time = time;
        }
        Ok(())
    }
}

/// Keyframes of one group, sorted by time.
pub fn group_track<'a>(keyframes: &'a [Keyframe], group: PropertyGroup) -> Vec<&'a Keyframe> {
    let mut track: Vec<&Keyframe> = keyframes.iter().filter(|k| k.group() == group).collect();
    track.sort_by(|a, b| a.time.total_cmp(&b.time));
    track
}
