use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use uuid::Uuid;

use super::overlay::{PendingOverlay, resolve_block};
use crate::animation::{Interpolator, LinearInterpolator};
use crate::error::LibraryError;
use crate::model::{Block, BlockPayloads, Keyframe, Layer, LayerKind};
use crate::service::StorageBackend;

/// Client-side cache of one scene: layers, blocks, keyframes, decoded
/// payloads and the optimistic overlays of blocks being edited.
pub struct SceneState {
    scene_id: Uuid,
    layers: Vec<Layer>,
    blocks: Vec<Block>,
    keyframes: HashMap<Uuid, Vec<Keyframe>>,
    payloads: HashMap<Uuid, BlockPayloads>,
    overlays: HashMap<Uuid, PendingOverlay>,
    interpolator: Arc<dyn Interpolator>,
}

impl SceneState {
    pub fn empty(scene_id: Uuid) -> Self {
        Self {
            scene_id,
            layers: Vec::new(),
            blocks: Vec::new(),
            keyframes: HashMap::new(),
            payloads: HashMap::new(),
            overlays: HashMap::new(),
            interpolator: Arc::new(LinearInterpolator),
        }
    }

    pub fn load(backend: &dyn StorageBackend, scene_id: Uuid) -> Result<Self, LibraryError> {
        let mut scene = Self::empty(scene_id);
        scene.reload(backend)?;
        Ok(scene)
    }

    pub fn set_interpolator(&mut self, interpolator: Arc<dyn Interpolator>) {
        self.interpolator = interpolator;
    }

    /// Replaces everything with storage's view. Pending overlays are dropped.
    pub fn reload(&mut self, backend: &dyn StorageBackend) -> Result<(), LibraryError> {
        let layers = backend.get_layers(self.scene_id)?;
        let mut blocks = Vec::new();
        for layer in &layers {
            blocks.extend(backend.get_blocks(layer.id)?);
        }
        let mut keyframes = HashMap::new();
        let mut payloads = HashMap::new();
        for block in &blocks {
            keyframes.insert(block.id, backend.get_keyframes(block.id)?);
            payloads.insert(block.id, BlockPayloads::decode(block));
        }

        info!(
            "Scene {} loaded: {} layers, {} blocks",
            self.scene_id,
            layers.len(),
            blocks.len()
        );
        self.layers = layers;
        self.blocks = blocks;
        self.keyframes = keyframes;
        self.payloads = payloads;
        self.overlays.clear();
        Ok(())
    }

    /// Refreshes one block and its keyframes. Its overlay is left alone.
    pub fn reload_block(
        &mut self,
        backend: &dyn StorageBackend,
        block_id: Uuid,
    ) -> Result<(), LibraryError> {
        let layer_id = self.block(block_id)?.layer_id;
        let fresh = backend
            .get_blocks(layer_id)?
            .into_iter()
            .find(|b| b.id == block_id)
            .ok_or(LibraryError::BlockNotFound(block_id))?;
        let keyframes = backend.get_keyframes(block_id)?;
        debug!("Reloaded block {} ({} keyframes)", block_id, keyframes.len());

        self.payloads.insert(block_id, BlockPayloads::decode(&fresh));
        self.keyframes.insert(block_id, keyframes);
        if let Some(slot) = self.blocks.iter_mut().find(|b| b.id == block_id) {
            *slot = fresh;
        }
        Ok(())
    }

    pub fn scene_id(&self) -> Uuid {
        self.scene_id
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn layer(&self, layer_id: Uuid) -> Result<&Layer, LibraryError> {
        self.layers
            .iter()
            .find(|l| l.id == layer_id)
            .ok_or(LibraryError::LayerNotFound(layer_id))
    }

    pub fn block(&self, block_id: Uuid) -> Result<&Block, LibraryError> {
        self.blocks
            .iter()
            .find(|b| b.id == block_id)
            .ok_or(LibraryError::BlockNotFound(block_id))
    }

    pub fn layer_of(&self, block_id: Uuid) -> Result<&Layer, LibraryError> {
        let layer_id = self.block(block_id)?.layer_id;
        self.layer(layer_id)
    }

    /// Blocks on `layer_id`, ordered by start time.
    pub fn layer_blocks(&self, layer_id: Uuid) -> Vec<&Block> {
        let mut blocks: Vec<&Block> = self
            .blocks
            .iter()
            .filter(|b| b.layer_id == layer_id)
            .collect();
        blocks.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        blocks
    }

    pub fn main_layer(&self) -> Option<&Layer> {
        self.layers.iter().find(|l| l.is_main)
    }

    /// Layers in timeline row order: highest z first.
    pub fn layers_top_down(&self) -> Vec<&Layer> {
        let mut layers: Vec<&Layer> = self.layers.iter().collect();
        layers.sort_by(|a, b| b.z_index.cmp(&a.z_index));
        layers
    }

    pub fn keyframes(&self, block_id: Uuid) -> &[Keyframe] {
        self.keyframes
            .get(&block_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn payloads(&self, block_id: Uuid) -> Option<&BlockPayloads> {
        self.payloads.get(&block_id)
    }

    pub fn overlay(&self, block_id: Uuid) -> Option<&PendingOverlay> {
        self.overlays.get(&block_id)
    }

    pub fn overlay_mut(&mut self, block_id: Uuid) -> &mut PendingOverlay {
        self.overlays.entry(block_id).or_default()
    }

    pub fn clear_overlay(&mut self, block_id: Uuid) {
        self.overlays.remove(&block_id);
    }

    /// Block with overlay and keyframes applied at `time`.
    pub fn resolved_block(&self, block_id: Uuid, time: f64) -> Result<Block, LibraryError> {
        let block = self.block(block_id)?;
        Ok(resolve_block(
            block,
            self.keyframes(block_id),
            self.overlay(block_id),
            self.interpolator.as_ref(),
            time,
        ))
    }

    /// End of the last block, i.e. the playable length of the scene.
    pub fn duration(&self) -> f64 {
        self.blocks
            .iter()
            .map(|b| b.end_time)
            .fold(0.0, f64::max)
    }

    /// Layers that take part in canvas rendering, lowest z first.
    pub fn visual_layers(&self) -> Vec<&Layer> {
        let mut layers: Vec<&Layer> = self
            .layers
            .iter()
            .filter(|l| l.visible && l.kind == LayerKind::Video)
            .collect();
        layers.sort_by(|a, b| a.z_index.cmp(&b.z_index));
        layers
    }
}
