pub mod block;
pub mod keyframe;
pub mod layer;
pub mod payload;

pub use block::{Block, BlockPatch, BlockSpec, BlockTransform};
pub use keyframe::{Color, Keyframe, KeyframePatch, KeyframeSpec, KeyframeValue, PropertyGroup};
pub use layer::{Layer, LayerKind, LayerSpec};
pub use payload::{AnimationConfig, BlockPayloads, StateKeyframe};
