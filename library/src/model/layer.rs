use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    #[default]
    Video,
    Audio,
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LayerKind::Video => "video",
            LayerKind::Audio => "audio",
        };
        write!(f, "{}", s)
    }
}

/// A time-ordered track of blocks inside a scene.
///
/// `z_index` is an ordering key only. New layers are inserted between
/// neighbours at fractional values, so gaps and non-integers are normal.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Layer {
    pub id: Uuid,
    pub scene_id: Uuid,
    pub z_index: OrderedFloat<f64>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub is_main: bool,
    #[serde(rename = "type", default)]
    pub kind: LayerKind,
}

fn default_visible() -> bool {
    true
}

impl Layer {
    pub fn new(scene_id: Uuid, spec: &LayerSpec) -> Self {
        Self {
            id: Uuid::new_v4(),
            scene_id,
            z_index: OrderedFloat(spec.z_index),
            visible: true,
            locked: false,
            is_main: spec.is_main,
            kind: spec.kind,
        }
    }

    pub fn z(&self) -> f64 {
        self.z_index.into_inner()
    }
}

/// Creation parameters for `StorageBackend::create_layer`.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct LayerSpec {
    pub z_index: f64,
    #[serde(default)]
    pub is_main: bool,
    #[serde(rename = "type", default)]
    pub kind: LayerKind,
}

impl LayerSpec {
    pub fn main() -> Self {
        Self {
            z_index: 0.0,
            is_main: true,
            kind: LayerKind::Video,
        }
    }

    pub fn overlay(z_index: f64, kind: LayerKind) -> Self {
        Self {
            z_index,
            is_main: false,
            kind,
        }
    }
}
