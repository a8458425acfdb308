use std::fmt;
use std::sync::Arc;

use log::{debug, info};
use uuid::Uuid;

use super::history::History;
use super::manipulation::{DragEnd, DragKind, ManipulationEngine};
use super::overlay::RenderDescriptor;
use super::playback::{PlaybackClock, TickOutcome, TimeSource};
use super::scene::SceneState;
use super::timeline::{DropCandidate, Edge, PlacementOutcome, TimelineEngine, TimelineScroll};
use crate::animation::{Interpolator, LinearInterpolator};
use crate::config::EditorConfig;
use crate::error::LibraryError;
use crate::geometry::{BoundingBox, CoordinateTransform, DesignSize, HandleHit, Point, Viewport};
use crate::model::{BlockPatch, BlockSpec, BlockTransform, LayerKind};
use crate::notice::{Notice, Notices};
use crate::service::StorageBackend;

/// What the editor is busy with. Canvas drags and playback exclude each
/// other.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum EditorMode {
    #[default]
    Idle,
    Manipulating,
    Playing,
}

impl EditorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditorMode::Idle => "idle",
            EditorMode::Manipulating => "manipulating",
            EditorMode::Playing => "playing",
        }
    }
}

impl fmt::Display for EditorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry point for a host UI: owns the scene cache, both engines, the
/// playback clock and the current mode.
pub struct EditorSession {
    config: EditorConfig,
    backend: Arc<dyn StorageBackend>,
    interpolator: Arc<dyn Interpolator>,
    scene: SceneState,
    manipulation: ManipulationEngine,
    timeline: TimelineEngine,
    clock: PlaybackClock,
    history: History,
    notices: Notices,
    mode: EditorMode,
    selected: Option<Uuid>,
    design: DesignSize,
    viewport: Viewport,
}

impl EditorSession {
    pub fn open(
        backend: Arc<dyn StorageBackend>,
        config: EditorConfig,
        scene_id: Uuid,
        time_source: Box<dyn TimeSource>,
    ) -> Result<Self, LibraryError> {
        let notices = Notices::new();
        let scene = SceneState::load(backend.as_ref(), scene_id)?;
        let design = DesignSize::for_orientation(config.canvas.orientation);
        let mut clock = PlaybackClock::new(time_source);
        clock.set_duration(scene.duration());

        Ok(Self {
            manipulation: ManipulationEngine::new(
                config.manipulation.clone(),
                backend.clone(),
                notices.clone(),
            ),
            timeline: TimelineEngine::new(config.timeline.clone(), backend.clone(), notices.clone()),
            interpolator: Arc::new(LinearInterpolator),
            history: History::new(),
            mode: EditorMode::Idle,
            selected: None,
            viewport: Viewport::fit(1280.0, 720.0, design),
            design,
            config,
            backend,
            scene,
            clock,
            notices,
        })
    }

    pub fn set_interpolator(&mut self, interpolator: Arc<dyn Interpolator>) {
        self.scene.set_interpolator(interpolator.clone());
        self.interpolator = interpolator;
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn drain_notices(&self) -> Vec<Notice> {
        self.notices.drain()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn transform(&self) -> CoordinateTransform {
        CoordinateTransform::new(self.design, self.viewport)
    }

    pub fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    pub fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn select(&mut self, block_id: Option<Uuid>) -> Result<(), LibraryError> {
        if let Some(id) = block_id {
            self.scene.block(id)?;
        }
        self.selected = block_id;
        Ok(())
    }

    // --- canvas ---

    pub fn bounding_box(&self, block_id: Uuid) -> Result<BoundingBox, LibraryError> {
        self.manipulation
            .bounding_box(&self.scene, block_id, &self.transform(), self.current_time())
    }

    /// Selects the block and starts a drag if the pointer hit it.
    pub fn pointer_down(
        &mut self,
        block_id: Uuid,
        pointer: Point,
    ) -> Result<Option<HandleHit>, LibraryError> {
        self.guard_not_playing("manipulate a block")?;
        if self.mode == EditorMode::Manipulating {
            self.pointer_up()?;
        }
        self.select(Some(block_id))?;
        let xf = self.transform();
        let time = self.current_time();
        let hit = self
            .manipulation
            .pointer_down(&mut self.scene, block_id, pointer, &xf, time)?;
        if hit.is_some() {
            self.mode = EditorMode::Manipulating;
        }
        Ok(hit)
    }

    /// Starts a drag of a specific kind without hit-testing, e.g. from a
    /// keyboard-initiated move.
    pub fn begin_drag(
        &mut self,
        block_id: Uuid,
        kind: DragKind,
        pointer: Point,
    ) -> Result<(), LibraryError> {
        self.guard_not_playing("manipulate a block")?;
        if self.mode == EditorMode::Manipulating {
            self.pointer_up()?;
        }
        self.select(Some(block_id))?;
        let xf = self.transform();
        let time = self.current_time();
        self.manipulation
            .begin(&mut self.scene, block_id, kind, pointer, &xf, time)?;
        self.mode = EditorMode::Manipulating;
        Ok(())
    }

    pub fn pointer_move(&mut self, pointer: Point) -> Result<Option<BlockPatch>, LibraryError> {
        if self.mode != EditorMode::Manipulating {
            return Ok(None);
        }
        let xf = self.transform();
        let time = self.current_time();
        self.manipulation
            .pointer_move(&mut self.scene, pointer, &xf, time)
    }

    pub fn pointer_up(&mut self) -> Result<DragEnd, LibraryError> {
        if self.mode != EditorMode::Manipulating {
            return Ok(DragEnd::NoDrag);
        }
        self.mode = EditorMode::Idle;
        self.manipulation.pointer_up(&mut self.scene)
    }

    /// The pointer left the canvas mid-drag; finish as if released.
    pub fn pointer_leave(&mut self) -> Result<DragEnd, LibraryError> {
        self.pointer_up()
    }

    pub fn cancel_drag(&mut self) {
        self.manipulation.cancel(&mut self.scene);
        if self.mode == EditorMode::Manipulating {
            self.mode = EditorMode::Idle;
        }
    }

    // --- timeline ---

    pub fn timeline_zoom(&self) -> f64 {
        self.timeline.zoom()
    }

    /// Changes the horizontal timeline zoom used for pointer mapping and
    /// snap distances.
    pub fn set_timeline_zoom(&mut self, h_zoom: f64) {
        self.timeline.set_zoom(h_zoom);
    }

    pub fn drop_candidate(
        &self,
        pointer: Point,
        scroll: TimelineScroll,
        grab_offset: f64,
    ) -> DropCandidate {
        self.timeline
            .drop_candidate(&self.scene, pointer, scroll, grab_offset)
    }

    pub fn move_block(
        &mut self,
        block_id: Uuid,
        candidate: &DropCandidate,
    ) -> Result<PlacementOutcome, LibraryError> {
        self.guard_not_manipulating("move a block on the timeline")?;
        let outcome = self.timeline.move_block(&mut self.scene, block_id, candidate)?;
        self.after_timeline_edit();
        Ok(outcome)
    }

    pub fn place_new_block(
        &mut self,
        spec: &BlockSpec,
        kind: LayerKind,
        candidate: &DropCandidate,
    ) -> Result<PlacementOutcome, LibraryError> {
        self.guard_not_manipulating("place a block")?;
        let outcome = self
            .timeline
            .place_new_block(&mut self.scene, spec, kind, candidate)?;
        self.after_timeline_edit();
        Ok(outcome)
    }

    pub fn resize_block(
        &mut self,
        block_id: Uuid,
        edge: Edge,
        time: f64,
    ) -> Result<PlacementOutcome, LibraryError> {
        self.guard_not_manipulating("resize a block")?;
        let outcome = self
            .timeline
            .resize_block(&mut self.scene, block_id, edge, time)?;
        self.after_timeline_edit();
        Ok(outcome)
    }

    fn after_timeline_edit(&mut self) {
        self.clock.set_duration(self.scene.duration());
        if let Some(id) = self.selected {
            if self.scene.block(id).is_err() {
                self.selected = None;
            }
        }
    }

    // --- playback ---

    /// Starts playback. An active drag is finished first.
    pub fn play(&mut self) -> Result<(), LibraryError> {
        if self.mode == EditorMode::Manipulating {
            self.pointer_up()?;
        }
        self.clock.set_duration(self.scene.duration());
        self.clock.play();
        self.mode = EditorMode::Playing;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.clock.stop();
        if self.mode == EditorMode::Playing {
            self.mode = EditorMode::Idle;
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        let outcome = self.clock.tick();
        if let TickOutcome::Ended(_) = outcome {
            self.mode = EditorMode::Idle;
        }
        outcome
    }

    pub fn scrub(&mut self, time: f64) {
        self.clock.set_duration(self.scene.duration());
        self.clock.scrub(time);
        if self.mode == EditorMode::Playing {
            self.mode = EditorMode::Idle;
        }
    }

    pub fn set_on_playback_end(&mut self, callback: impl FnMut() + 'static) {
        self.clock.set_on_end(callback);
    }

    // --- scene ---

    /// Drops any drag, stops playback and loads another scene.
    pub fn switch_scene(&mut self, scene_id: Uuid) -> Result<(), LibraryError> {
        self.manipulation.cancel(&mut self.scene);
        self.clock.stop();
        self.mode = EditorMode::Idle;
        self.selected = None;

        let mut scene = SceneState::load(self.backend.as_ref(), scene_id)?;
        scene.set_interpolator(self.interpolator.clone());
        self.scene = scene;
        self.clock.set_duration(self.scene.duration());
        self.clock.scrub(0.0);
        info!("Switched to scene {}", scene_id);
        Ok(())
    }

    /// Reloads the current scene from storage, discarding every overlay.
    pub fn reload(&mut self) -> Result<(), LibraryError> {
        self.cancel_drag();
        self.scene.reload(self.backend.as_ref())?;
        self.after_timeline_edit();
        Ok(())
    }

    // --- render ---

    pub fn render_descriptor(
        &self,
        block_id: Uuid,
        time: f64,
    ) -> Result<RenderDescriptor, LibraryError> {
        let resolved = self.scene.resolved_block(block_id, time)?;
        let layer = self.scene.layer(resolved.layer_id)?;
        Ok(RenderDescriptor::new(&resolved, layer))
    }

    /// Blocks active at `time` on visible video layers, bottom layer first.
    pub fn render_list(&self, time: f64) -> Vec<RenderDescriptor> {
        let mut list = Vec::new();
        for layer in self.scene.visual_layers() {
            for block in self.scene.layer_blocks(layer.id) {
                if !block.is_active_at(time) {
                    continue;
                }
                match self.scene.resolved_block(block.id, time) {
                    Ok(resolved) => list.push(RenderDescriptor::new(&resolved, layer)),
                    Err(e) => debug!("Skipping block {} in render list: {}", block.id, e),
                }
            }
        }
        list
    }

    /// Live transform of the selected block, including unsaved edits.
    pub fn inspector_transform(&self) -> Option<BlockTransform> {
        let id = self.selected?;
        self.scene
            .resolved_block(id, self.current_time())
            .ok()
            .map(|b| b.transform())
    }

    // --- history ---

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> Result<(), LibraryError> {
        self.history.undo()
    }

    pub fn redo(&mut self) -> Result<(), LibraryError> {
        self.history.redo()
    }

    fn guard_not_playing(&self, action: &'static str) -> Result<(), LibraryError> {
        if self.mode == EditorMode::Playing {
            return Err(LibraryError::ModeConflict {
                action,
                mode: self.mode.as_str(),
            });
        }
        Ok(())
    }

    fn guard_not_manipulating(&self, action: &'static str) -> Result<(), LibraryError> {
        if self.mode == EditorMode::Manipulating {
            return Err(LibraryError::ModeConflict {
                action,
                mode: self.mode.as_str(),
            });
        }
        Ok(())
    }
}
