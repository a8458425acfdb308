use uuid::Uuid;

use crate::error::LibraryError;
use crate::model::{
    Block, BlockPatch, BlockSpec, Keyframe, KeyframePatch, KeyframeSpec, Layer, LayerSpec,
};

/// Storage collaborator consumed by the engines.
///
/// Implementations are injected as `Arc<dyn StorageBackend>`; tests use
/// [`InMemoryBackend`](super::memory_backend::InMemoryBackend). The main-track
/// operations are opaque cascade contracts: the engines never assume how far
/// later blocks move. Their default bodies report a missing capability, which
/// the engines treat as a no-op.
pub trait StorageBackend: Send + Sync {
    fn get_layers(&self, scene_id: Uuid) -> Result<Vec<Layer>, LibraryError>;

    fn get_blocks(&self, layer_id: Uuid) -> Result<Vec<Block>, LibraryError>;

    fn create_block(&self, layer_id: Uuid, spec: &BlockSpec) -> Result<Block, LibraryError>;

    fn update_block(&self, block_id: Uuid, patch: &BlockPatch) -> Result<(), LibraryError>;

    /// Inserts a new block on the scene's main layer at `insert_at`, cascading
    /// later blocks.
    fn insert_block_at_main_track(
        &self,
        _scene_id: Uuid,
        _spec: &BlockSpec,
        _insert_at: f64,
    ) -> Result<Block, LibraryError> {
        Err(LibraryError::CapabilityMissing("insert_block_at_main_track"))
    }

    /// Moves an existing block onto the scene's main layer at `insert_at`,
    /// cascading later blocks.
    fn move_block_to_main_track(
        &self,
        _scene_id: Uuid,
        _block_id: Uuid,
        _insert_at: f64,
    ) -> Result<(), LibraryError> {
        Err(LibraryError::CapabilityMissing("move_block_to_main_track"))
    }

    /// Sets a main-layer block's end time, cascading later blocks.
    fn resize_block_with_cascade(
        &self,
        _block_id: Uuid,
        _new_end_time: f64,
    ) -> Result<(), LibraryError> {
        Err(LibraryError::CapabilityMissing("resize_block_with_cascade"))
    }

    fn create_layer(&self, scene_id: Uuid, spec: &LayerSpec) -> Result<Layer, LibraryError>;

    /// Deletes the layer and every block on it.
    fn delete_layer(&self, layer_id: Uuid) -> Result<(), LibraryError>;

    fn get_keyframes(&self, block_id: Uuid) -> Result<Vec<Keyframe>, LibraryError>;

    fn create_keyframe(&self, spec: &KeyframeSpec) -> Result<Keyframe, LibraryError>;

    fn update_keyframe(&self, keyframe_id: Uuid, patch: &KeyframePatch)
    -> Result<(), LibraryError>;
}
