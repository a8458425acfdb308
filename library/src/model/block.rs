use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::keyframe::PropertyGroup;

pub const SCALE_MIN: f64 = 0.01;
pub const SCALE_MAX: f64 = 2.0;

pub fn clamp_position(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

pub fn clamp_scale(value: f64) -> f64 {
    value.clamp(SCALE_MIN, SCALE_MAX)
}

fn default_center() -> f64 {
    0.5
}

fn default_scale() -> f64 {
    0.25
}

fn default_lock_aspect() -> bool {
    true
}

fn default_opacity() -> f64 {
    1.0
}

/// A timed visual or audio element on a layer.
///
/// Position is the block center as a fraction of the canvas, scale is the
/// block size as a fraction of the matching canvas dimension.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Block {
    pub id: Uuid,
    pub layer_id: Uuid,
    #[serde(default)]
    pub asset_id: Option<Uuid>,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default = "default_center")]
    pub pos_x: f64,
    #[serde(default = "default_center")]
    pub pos_y: f64,
    #[serde(default = "default_scale")]
    pub scale_x: f64,
    #[serde(default = "default_scale")]
    pub scale_y: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_lock_aspect")]
    pub lock_aspect: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub blur: f64,
    /// Serialized animation config, decoded through `model::payload`.
    #[serde(default)]
    pub animation_config: Option<String>,
    /// Serialized state-keyframe list, decoded through `model::payload`.
    #[serde(default)]
    pub state_keyframes: Option<String>,
}

impl Block {
    pub fn from_spec(layer_id: Uuid, spec: &BlockSpec) -> Self {
        Self {
            id: Uuid::new_v4(),
            layer_id,
            asset_id: spec.asset_id,
            start_time: spec.start_time,
            end_time: spec.end_time,
            pos_x: clamp_position(spec.pos_x),
            pos_y: clamp_position(spec.pos_y),
            scale_x: clamp_scale(spec.scale_x),
            scale_y: clamp_scale(spec.scale_y),
            rotation: spec.rotation,
            lock_aspect: spec.lock_aspect,
            opacity: spec.opacity.clamp(0.0, 1.0),
            blur: spec.blur.max(0.0),
            animation_config: None,
            state_keyframes: None,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Half-open `[start, end)` containment.
    pub fn is_active_at(&self, time: f64) -> bool {
        time >= self.start_time && time < self.end_time
    }

    pub fn transform(&self) -> BlockTransform {
        BlockTransform {
            pos_x: self.pos_x,
            pos_y: self.pos_y,
            scale_x: self.scale_x,
            scale_y: self.scale_y,
            rotation: self.rotation,
        }
    }
}

/// The spatial subset of a block that the canvas gizmo manipulates.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct BlockTransform {
    pub pos_x: f64,
    pub pos_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub rotation: f64,
}

/// Partial field update, the payload of `StorageBackend::update_block`.
///
/// Every write through a patch is clamped: position to `[0,1]`, scale to
/// `[SCALE_MIN, SCALE_MAX]`, opacity to `[0,1]` and blur to `>= 0`.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
pub struct BlockPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur: Option<f64>,
}

impl BlockPatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            pos_x: Some(clamp_position(x)),
            pos_y: Some(clamp_position(y)),
            ..Default::default()
        }
    }

    pub fn position_and_scale(x: f64, y: f64, sx: f64, sy: f64) -> Self {
        Self {
            pos_x: Some(clamp_position(x)),
            pos_y: Some(clamp_position(y)),
            scale_x: Some(clamp_scale(sx)),
            scale_y: Some(clamp_scale(sy)),
            ..Default::default()
        }
    }

    pub fn rotation(degrees: f64) -> Self {
        Self {
            rotation: Some(degrees),
            ..Default::default()
        }
    }

    pub fn timing(start_time: f64, end_time: f64) -> Self {
        Self {
            start_time: Some(start_time),
            end_time: Some(end_time),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Later values in `other` replace earlier ones field by field.
    pub fn absorb(&mut self, other: &BlockPatch) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        take!(layer_id, start_time, end_time, pos_x, pos_y, scale_x, scale_y, rotation, opacity, blur);
    }

    pub fn apply_to(&self, block: &mut Block) {
        if let Some(layer_id) = self.layer_id {
            block.layer_id = layer_id;
        }
        if let Some(v) = self.start_time {
            block.start_time = v;
        }
        if let Some(v) = self.end_time {
            block.end_time = v;
        }
        if let Some(v) = self.pos_x {
            block.pos_x = clamp_position(v);
        }
        if let Some(v) = self.pos_y {
            block.pos_y = clamp_position(v);
        }
        if let Some(v) = self.scale_x {
            block.scale_x = clamp_scale(v);
        }
        if let Some(v) = self.scale_y {
            block.scale_y = clamp_scale(v);
        }
        if let Some(v) = self.rotation {
            block.rotation = v;
        }
        if let Some(v) = self.opacity {
            block.opacity = v.clamp(0.0, 1.0);
        }
        if let Some(v) = self.blur {
            block.blur = v.max(0.0);
        }
    }

    /// Property groups this patch writes to.
    pub fn groups(&self) -> Vec<PropertyGroup> {
        let mut groups = Vec::new();
        if self.pos_x.is_some() || self.pos_y.is_some() {
            groups.push(PropertyGroup::Pos);
        }
        if self.scale_x.is_some() || self.scale_y.is_some() {
            groups.push(PropertyGroup::Scale);
        }
        if self.rotation.is_some() {
            groups.push(PropertyGroup::Rotation);
        }
        if self.opacity.is_some() {
            groups.push(PropertyGroup::Opacity);
        }
        if self.blur.is_some() {
            groups.push(PropertyGroup::Blur);
        }
        groups
    }

    /// Drops the fields that belong to `group`.
    pub fn without_group(mut self, group: PropertyGroup) -> Self {
        match group {
            PropertyGroup::Pos => {
                self.pos_x = None;
                self.pos_y = None;
            }
            PropertyGroup::Scale => {
                self.scale_x = None;
                self.scale_y = None;
            }
            PropertyGroup::Rotation => self.rotation = None,
            PropertyGroup::Opacity => self.opacity = None,
            PropertyGroup::Blur => self.blur = None,
            PropertyGroup::Color => {}
        }
        self
    }
}

/// Creation parameters for a new block.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct BlockSpec {
    #[serde(default)]
    pub asset_id: Option<Uuid>,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default = "default_center")]
    pub pos_x: f64,
    #[serde(default = "default_center")]
    pub pos_y: f64,
    #[serde(default = "default_scale")]
    pub scale_x: f64,
    #[serde(default = "default_scale")]
    pub scale_y: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_lock_aspect")]
    pub lock_aspect: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub blur: f64,
}

impl BlockSpec {
    pub fn new(asset_id: Option<Uuid>, start_time: f64, end_time: f64) -> Self {
        Self {
            asset_id,
            start_time,
            end_time,
            pos_x: default_center(),
            pos_y: default_center(),
            scale_x: default_scale(),
            scale_y: default_scale(),
            rotation: 0.0,
            lock_aspect: true,
            opacity: 1.0,
            blur: 0.0,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn at(mut self, start_time: f64) -> Self {
        let duration = self.duration();
        self.start_time = start_time;
        self.end_time = start_time + duration;
        self
    }

    pub fn validate(&self) -> Result<(), crate::error::LibraryError> {
        if !(self.end_time > self.start_time) {
            return Err(crate::error::LibraryError::InvalidArgument(format!(
                "block end {} must be after start {}",
                self.end_time, self.start_time
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_clamps_on_apply() {
        let mut block = Block::from_spec(Uuid::new_v4(), &BlockSpec::new(None, 0.0, 1.0));
        let patch = BlockPatch {
            pos_x: Some(1.4),
            pos_y: Some(-0.2),
            scale_x: Some(5.0),
            scale_y: Some(0.0),
            opacity: Some(3.0),
            blur: Some(-1.0),
            ..Default::default()
        };
        patch.apply_to(&mut block);
        assert_eq!(block.pos_x, 1.0);
        assert_eq!(block.pos_y, 0.0);
        assert_eq!(block.scale_x, SCALE_MAX);
        assert_eq!(block.scale_y, SCALE_MIN);
        assert_eq!(block.opacity, 1.0);
        assert_eq!(block.blur, 0.0);
    }

    #[test]
    fn absorb_keeps_latest_values() {
        let mut overlay = BlockPatch::position(0.1, 0.2);
        overlay.absorb(&BlockPatch::rotation(45.0));
        overlay.absorb(&BlockPatch::position(0.3, 0.4));
        assert_eq!(overlay.pos_x, Some(0.3));
        assert_eq!(overlay.pos_y, Some(0.4));
        assert_eq!(overlay.rotation, Some(45.0));
    }

    #[test]
    fn groups_reflect_written_fields() {
        let patch = BlockPatch::position_and_scale(0.5, 0.5, 0.2, 0.2);
        assert_eq!(patch.groups(), vec![PropertyGroup::Pos, PropertyGroup::Scale]);
        let base = patch.without_group(PropertyGroup::Pos);
        assert_eq!(base.groups(), vec![PropertyGroup::Scale]);
    }

    #[test]
    fn spec_rejects_empty_interval() {
        assert!(BlockSpec::new(None, 2.0, 2.0).validate().is_err());
        assert!(BlockSpec::new(None, 2.0, 3.0).validate().is_ok());
    }
}
