//! In-memory `StorageBackend`, used by the integration tests and the CLI.
//!
//! The main-track cascade here is a fixture policy: main-layer blocks are kept
//! in start order and re-packed back to back from time 0 after every cascade
//! operation. Real storage may cascade differently; the engines do not depend
//! on this behavior.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::backend::StorageBackend;
use crate::error::LibraryError;
use crate::model::{
    Block, BlockPatch, BlockSpec, Keyframe, KeyframePatch, KeyframeSpec, Layer, LayerSpec,
};

/// Serializable dump of one scene's storage.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
pub struct SceneSnapshot {
    pub scene_id: Uuid,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

#[derive(Default, Debug)]
struct Store {
    layers: Vec<Layer>,
    blocks: Vec<Block>,
    keyframes: Vec<Keyframe>,
}

impl Store {
    fn layer(&self, layer_id: Uuid) -> Result<&Layer, LibraryError> {
        self.layers
            .iter()
            .find(|l| l.id == layer_id)
            .ok_or(LibraryError::LayerNotFound(layer_id))
    }

    fn block_mut(&mut self, block_id: Uuid) -> Result<&mut Block, LibraryError> {
        self.blocks
            .iter_mut()
            .find(|b| b.id == block_id)
            .ok_or(LibraryError::BlockNotFound(block_id))
    }

    fn main_layer_id(&self, scene_id: Uuid) -> Result<Uuid, LibraryError> {
        self.layers
            .iter()
            .find(|l| l.scene_id == scene_id && l.is_main)
            .map(|l| l.id)
            .ok_or_else(|| LibraryError::Storage(format!("Scene {} has no main layer", scene_id)))
    }

    /// Main-layer blocks in start order, optionally leaving one out.
    fn main_order(&self, main_id: Uuid, exclude: Option<Uuid>) -> Vec<Uuid> {
        let mut blocks: Vec<&Block> = self
            .blocks
            .iter()
            .filter(|b| b.layer_id == main_id && Some(b.id) != exclude)
            .collect();
        blocks.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        blocks.into_iter().map(|b| b.id).collect()
    }

    /// Position in `order` for something dropped at `insert_at`: before the
    /// first block whose midpoint lies after the drop time.
    fn insertion_index(&self, order: &[Uuid], insert_at: f64) -> usize {
        order
            .iter()
            .position(|id| {
                self.blocks
                    .iter()
                    .find(|b| b.id == *id)
                    .is_some_and(|b| (b.start_time + b.end_time) / 2.0 > insert_at)
            })
            .unwrap_or(order.len())
    }

    fn repack(&mut self, order: &[Uuid]) {
        let mut cursor = 0.0;
        for id in order {
            if let Some(block) = self.blocks.iter_mut().find(|b| b.id == *id) {
                let duration = block.duration();
                block.start_time = cursor;
                block.end_time = cursor + duration;
                cursor = block.end_time;
            }
        }
    }
}

pub struct InMemoryBackend {
    store: Arc<RwLock<Store>>,
    cascade_supported: bool,
    fail_writes: AtomicBool,
    write_count: AtomicUsize,
    rejected_count: AtomicUsize,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
            cascade_supported: true,
            fail_writes: AtomicBool::new(false),
            write_count: AtomicUsize::new(0),
            rejected_count: AtomicUsize::new(0),
        }
    }

    /// A backend whose main-track cascade operations are absent.
    pub fn without_cascade() -> Self {
        Self {
            cascade_supported: false,
            ..Self::new()
        }
    }

    pub fn from_snapshot(snapshot: SceneSnapshot) -> Self {
        let backend = Self::new();
        if let Ok(mut store) = backend.store.write() {
            store.layers = snapshot.layers;
            store.blocks = snapshot.blocks;
            store.keyframes = snapshot.keyframes;
        }
        backend
    }

    pub fn snapshot(&self, scene_id: Uuid) -> Result<SceneSnapshot, LibraryError> {
        let store = self.read_store()?;
        let layers: Vec<Layer> = store
            .layers
            .iter()
            .filter(|l| l.scene_id == scene_id)
            .cloned()
            .collect();
        let blocks: Vec<Block> = store
            .blocks
            .iter()
            .filter(|b| layers.iter().any(|l| l.id == b.layer_id))
            .cloned()
            .collect();
        let keyframes = store
            .keyframes
            .iter()
            .filter(|k| blocks.iter().any(|b| b.id == k.block_id))
            .cloned()
            .collect();
        Ok(SceneSnapshot {
            scene_id,
            layers,
            blocks,
            keyframes,
        })
    }

    /// Makes every subsequent write fail until switched off again.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of write calls that reached the store.
    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    /// Number of write calls turned away by `set_fail_writes`.
    pub fn rejected_count(&self) -> usize {
        self.rejected_count.load(Ordering::SeqCst)
    }

    pub fn block(&self, block_id: Uuid) -> Option<Block> {
        self.read_store()
            .ok()?
            .blocks
            .iter()
            .find(|b| b.id == block_id)
            .cloned()
    }

    fn read_store(&self) -> Result<RwLockReadGuard<'_, Store>, LibraryError> {
        self.store
            .read()
            .map_err(|_| LibraryError::Runtime("Lock Poisoned".to_string()))
    }

    fn write_store(&self) -> Result<RwLockWriteGuard<'_, Store>, LibraryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            self.rejected_count.fetch_add(1, Ordering::SeqCst);
            return Err(LibraryError::Storage("write rejected".to_string()));
        }
        self.write_count.fetch_add(1, Ordering::SeqCst);
        self.store
            .write()
            .map_err(|_| LibraryError::Runtime("Lock Poisoned".to_string()))
    }

    fn require_cascade(&self, name: &'static str) -> Result<(), LibraryError> {
        if self.cascade_supported {
            Ok(())
        } else {
            Err(LibraryError::CapabilityMissing(name))
        }
    }
}

impl StorageBackend for InMemoryBackend {
    fn get_layers(&self, scene_id: Uuid) -> Result<Vec<Layer>, LibraryError> {
        let store = self.read_store()?;
        Ok(store
            .layers
            .iter()
            .filter(|l| l.scene_id == scene_id)
            .cloned()
            .collect())
    }

    fn get_blocks(&self, layer_id: Uuid) -> Result<Vec<Block>, LibraryError> {
        let store = self.read_store()?;
        store.layer(layer_id)?;
        Ok(store
            .blocks
            .iter()
            .filter(|b| b.layer_id == layer_id)
            .cloned()
            .collect())
    }

    fn create_block(&self, layer_id: Uuid, spec: &BlockSpec) -> Result<Block, LibraryError> {
        spec.validate()?;
        let mut store = self.write_store()?;
        store.layer(layer_id)?;
        let block = Block::from_spec(layer_id, spec);
        store.blocks.push(block.clone());
        debug!("Created block {} on layer {}", block.id, layer_id);
        Ok(block)
    }

    fn update_block(&self, block_id: Uuid, patch: &BlockPatch) -> Result<(), LibraryError> {
        let mut store = self.write_store()?;
        if let Some(layer_id) = patch.layer_id {
            store.layer(layer_id)?;
        }
        let block = store.block_mut(block_id)?;
        patch.apply_to(block);
        Ok(())
    }

    fn insert_block_at_main_track(
        &self,
        scene_id: Uuid,
        spec: &BlockSpec,
        insert_at: f64,
    ) -> Result<Block, LibraryError> {
        self.require_cascade("insert_block_at_main_track")?;
        spec.validate()?;
        let mut store = self.write_store()?;
        let main_id = store.main_layer_id(scene_id)?;
        let mut order = store.main_order(main_id, None);
        let index = store.insertion_index(&order, insert_at);

        let block = Block::from_spec(main_id, spec);
        let id = block.id;
        store.blocks.push(block);
        order.insert(index, id);
        store.repack(&order);
        debug!("Inserted block {} into main track at slot {}", id, index);

        store
            .blocks
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or(LibraryError::BlockNotFound(id))
    }

    fn move_block_to_main_track(
        &self,
        scene_id: Uuid,
        block_id: Uuid,
        insert_at: f64,
    ) -> Result<(), LibraryError> {
        self.require_cascade("move_block_to_main_track")?;
        let mut store = self.write_store()?;
        let main_id = store.main_layer_id(scene_id)?;
        let source_layer = store.block_mut(block_id)?.layer_id;

        let mut order = store.main_order(main_id, Some(block_id));
        let index = store.insertion_index(&order, insert_at);
        store.block_mut(block_id)?.layer_id = main_id;
        order.insert(index, block_id);
        store.repack(&order);
        debug!(
            "Moved block {} from layer {} into main track at slot {}",
            block_id, source_layer, index
        );
        Ok(())
    }

    fn resize_block_with_cascade(
        &self,
        block_id: Uuid,
        new_end_time: f64,
    ) -> Result<(), LibraryError> {
        self.require_cascade("resize_block_with_cascade")?;
        let mut store = self.write_store()?;
        let block = store.block_mut(block_id)?;
        if !(new_end_time > block.start_time) {
            return Err(LibraryError::InvalidArgument(format!(
                "end {} must be after start {}",
                new_end_time, block.start_time
            )));
        }
        block.end_time = new_end_time;
        let layer_id = block.layer_id;
        let order = store.main_order(layer_id, None);
        store.repack(&order);
        Ok(())
    }

    fn create_layer(&self, scene_id: Uuid, spec: &LayerSpec) -> Result<Layer, LibraryError> {
        let mut store = self.write_store()?;
        if spec.is_main && store.main_layer_id(scene_id).is_ok() {
            return Err(LibraryError::Storage(format!(
                "Scene {} already has a main layer",
                scene_id
            )));
        }
        let layer = Layer::new(scene_id, spec);
        store.layers.push(layer.clone());
        debug!("Created layer {} at z {}", layer.id, spec.z_index);
        Ok(layer)
    }

    fn delete_layer(&self, layer_id: Uuid) -> Result<(), LibraryError> {
        let mut store = self.write_store()?;
        store.layer(layer_id)?;
        store.layers.retain(|l| l.id != layer_id);
        let removed: Vec<Uuid> = store
            .blocks
            .iter()
            .filter(|b| b.layer_id == layer_id)
            .map(|b| b.id)
            .collect();
        store.blocks.retain(|b| b.layer_id != layer_id);
        store.keyframes.retain(|k| !removed.contains(&k.block_id));
        Ok(())
    }

    fn get_keyframes(&self, block_id: Uuid) -> Result<Vec<Keyframe>, LibraryError> {
        let store = self.read_store()?;
        Ok(store
            .keyframes
            .iter()
            .filter(|k| k.block_id == block_id)
            .cloned()
            .collect())
    }

    fn create_keyframe(&self, spec: &KeyframeSpec) -> Result<Keyframe, LibraryError> {
        let mut store = self.write_store()?;
        store.block_mut(spec.block_id)?;
        let keyframe = Keyframe::from_spec(spec);
        store.keyframes.push(keyframe.clone());
        Ok(keyframe)
    }

    fn update_keyframe(
        &self,
        keyframe_id: Uuid,
        patch: &KeyframePatch,
    ) -> Result<(), LibraryError> {
        let mut store = self.write_store()?;
        let keyframe = store
            .keyframes
            .iter_mut()
            .find(|k| k.id == keyframe_id)
            .ok_or(LibraryError::KeyframeNotFound(keyframe_id))?;
        patch.apply_to(keyframe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with_main() -> (InMemoryBackend, Uuid, Layer) {
        let backend = InMemoryBackend::new();
        let scene_id = Uuid::new_v4();
        let main = backend.create_layer(scene_id, &LayerSpec::main()).unwrap();
        (backend, scene_id, main)
    }

    fn spans(backend: &InMemoryBackend, layer_id: Uuid) -> Vec<(f64, f64)> {
        let mut blocks = backend.get_blocks(layer_id).unwrap();
        blocks.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        blocks.iter().map(|b| (b.start_time, b.end_time)).collect()
    }

    #[test]
    fn main_track_insert_keeps_blocks_contiguous() {
        let (backend, scene_id, main) = scene_with_main();
        backend
            .insert_block_at_main_track(scene_id, &BlockSpec::new(None, 0.0, 4.0), 0.0)
            .unwrap();
        backend
            .insert_block_at_main_track(scene_id, &BlockSpec::new(None, 0.0, 3.0), 10.0)
            .unwrap();
        backend
            .insert_block_at_main_track(scene_id, &BlockSpec::new(None, 0.0, 1.0), 1.0)
            .unwrap();
        assert_eq!(spans(&backend, main.id), vec![(0.0, 1.0), (1.0, 5.0), (5.0, 8.0)]);
    }

    #[test]
    fn second_main_layer_is_refused() {
        let (backend, scene_id, _) = scene_with_main();
        assert!(backend.create_layer(scene_id, &LayerSpec::main()).is_err());
    }

    #[test]
    fn cascade_capability_can_be_absent() {
        let backend = InMemoryBackend::without_cascade();
        let err = backend
            .resize_block_with_cascade(Uuid::new_v4(), 3.0)
            .unwrap_err();
        assert!(err.is_capability_missing());
    }

    #[test]
    fn deleting_layer_removes_blocks_and_keyframes() {
        let (backend, scene_id, _) = scene_with_main();
        let layer = backend
            .create_layer(scene_id, &LayerSpec::overlay(1.0, Default::default()))
            .unwrap();
        let block = backend
            .create_block(layer.id, &BlockSpec::new(None, 0.0, 2.0))
            .unwrap();
        backend
            .create_keyframe(&KeyframeSpec {
                block_id: block.id,
                time: 1.0,
                value: crate::model::KeyframeValue::Rotation(5.0),
            })
            .unwrap();
        backend.delete_layer(layer.id).unwrap();
        assert!(backend.block(block.id).is_none());
        assert!(backend.get_keyframes(block.id).unwrap().is_empty());
    }

    #[test]
    fn failing_writes_leave_store_untouched() {
        let (backend, _, main) = scene_with_main();
        backend.set_fail_writes(true);
        assert!(backend.create_block(main.id, &BlockSpec::new(None, 0.0, 1.0)).is_err());
        backend.set_fail_writes(false);
        assert!(backend.get_blocks(main.id).unwrap().is_empty());
    }
}
