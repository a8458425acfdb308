//! Timeline placement: dropping, moving and edge-resizing blocks across
//! layers.
//!
//! The main layer is a delegated track: anything that changes its time
//! layout goes through the backend's cascade operations, whose effect on
//! later blocks is not assumed here. Every other layer is checked locally for
//! collisions before a write is issued.

use std::sync::Arc;

use log::{debug, info};
use uuid::Uuid;

use super::placement::{PlacementRejection, interpolate_z, neighbour_bounds, resolve_drop};
use super::scene::SceneState;
use crate::config::TimelineConfig;
use crate::error::{LibraryError, tolerate_missing};
use crate::geometry::Point;
use crate::model::{BlockPatch, BlockSpec, Layer, LayerKind, LayerSpec};
use crate::notice::Notices;
use crate::service::StorageBackend;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DropTarget {
    Layer(Uuid),
    /// A new layer goes between two rows. `None` stands for "above the top
    /// row" or "below the bottom row".
    BetweenLayers {
        upper: Option<Uuid>,
        lower: Option<Uuid>,
    },
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct DropCandidate {
    pub time: f64,
    pub target: DropTarget,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Edge {
    Left,
    Right,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum PlacementOutcome {
    Placed {
        block_id: Uuid,
        layer_id: Uuid,
        start_time: f64,
        end_time: f64,
    },
    /// Nothing was written; a warning notice was raised.
    Rejected(PlacementRejection),
    /// The backend lacks the cascade operation this needed.
    Skipped,
}

/// Scroll state of the timeline view, in pixels.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct TimelineScroll {
    pub x: f64,
    pub y: f64,
}

pub const MIN_TIMELINE_ZOOM: f64 = 0.01;
pub const MAX_TIMELINE_ZOOM: f64 = 100.0;

pub struct TimelineEngine {
    config: TimelineConfig,
    backend: Arc<dyn StorageBackend>,
    notices: Notices,
    /// Horizontal zoom of the timeline view; scales `pixels_per_second`.
    h_zoom: f64,
}

impl TimelineEngine {
    pub fn new(config: TimelineConfig, backend: Arc<dyn StorageBackend>, notices: Notices) -> Self {
        Self {
            config,
            backend,
            notices,
            h_zoom: 1.0,
        }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn zoom(&self) -> f64 {
        self.h_zoom
    }

    pub fn set_zoom(&mut self, h_zoom: f64) {
        self.h_zoom = h_zoom.clamp(MIN_TIMELINE_ZOOM, MAX_TIMELINE_ZOOM);
        debug!("Timeline zoom set to {}", self.h_zoom);
    }

    /// Current time-to-pixel scale of the view.
    pub fn pixels_per_second(&self) -> f64 {
        self.config.pixels_per_second * self.h_zoom
    }

    /// Maps a pointer inside the clip area to a drop time and target row.
    /// `grab_offset` is how far (in seconds) into the block it was grabbed.
    pub fn drop_candidate(
        &self,
        scene: &SceneState,
        pointer: Point,
        scroll: TimelineScroll,
        grab_offset: f64,
    ) -> DropCandidate {
        let time = ((pointer.x + scroll.x) / self.pixels_per_second() - grab_offset).max(0.0);
        let rows = scene.layers_top_down();
        let pitch = self.config.row_height + self.config.track_spacing;
        let y = pointer.y + scroll.y;

        let target = if rows.is_empty() {
            DropTarget::BetweenLayers {
                upper: None,
                lower: None,
            }
        } else if y < 0.0 {
            DropTarget::BetweenLayers {
                upper: None,
                lower: Some(rows[0].id),
            }
        } else {
            let boundary = (y / pitch).round() as usize;
            let near_boundary = boundary >= 1
                && boundary < rows.len()
                && (y - boundary as f64 * pitch).abs() <= self.config.between_zone_px;
            let row = (y / pitch).floor() as usize;
            if near_boundary {
                DropTarget::BetweenLayers {
                    upper: Some(rows[boundary - 1].id),
                    lower: Some(rows[boundary].id),
                }
            } else if row >= rows.len() {
                DropTarget::BetweenLayers {
                    upper: rows.last().map(|l| l.id),
                    lower: None,
                }
            } else {
                DropTarget::Layer(rows[row].id)
            }
        };
        DropCandidate { time, target }
    }

    /// Returns the scene's main layer, creating it if the scene has none.
    pub fn ensure_main_layer(&self, scene: &mut SceneState) -> Result<Layer, LibraryError> {
        if let Some(main) = scene.main_layer() {
            return Ok(main.clone());
        }
        let layer = self
            .backend
            .create_layer(scene.scene_id(), &LayerSpec::main())?;
        info!("Created main layer {} for scene {}", layer.id, scene.scene_id());
        scene.reload(self.backend.as_ref())?;
        Ok(layer)
    }

    pub fn create_layer_between(
        &self,
        scene: &mut SceneState,
        upper: Option<Uuid>,
        lower: Option<Uuid>,
        kind: LayerKind,
    ) -> Result<Layer, LibraryError> {
        let upper_z = upper.map(|id| scene.layer(id).map(Layer::z)).transpose()?;
        let lower_z = lower.map(|id| scene.layer(id).map(Layer::z)).transpose()?;
        let z = interpolate_z(upper_z, lower_z);
        let layer = self
            .backend
            .create_layer(scene.scene_id(), &LayerSpec::overlay(z, kind))?;
        debug!("Created {} layer {} at z {}", kind, layer.id, z);
        scene.reload(self.backend.as_ref())?;
        Ok(layer)
    }

    /// Moves an existing block to the drop candidate.
    pub fn move_block(
        &self,
        scene: &mut SceneState,
        block_id: Uuid,
        candidate: &DropCandidate,
    ) -> Result<PlacementOutcome, LibraryError> {
        let block = scene.block(block_id)?.clone();
        let source = scene.layer(block.layer_id)?.clone();
        if source.locked {
            return Ok(self.reject(PlacementRejection::LayerLocked(source.id)));
        }
        let target = match self.target_layer(scene, &candidate.target, source.kind)? {
            Ok(layer) => layer,
            Err(rejection) => return Ok(self.reject(rejection)),
        };

        if target.is_main {
            let moved = self.backend.move_block_to_main_track(
                scene.scene_id(),
                block_id,
                candidate.time,
            );
            if tolerate_missing(moved)?.is_none() {
                return Ok(PlacementOutcome::Skipped);
            }
        } else {
            let layer_blocks = scene.layer_blocks(target.id);
            let start = match resolve_drop(
                &layer_blocks,
                Some(block_id),
                candidate.time,
                block.duration(),
                self.pixels_per_second(),
                self.config.snap_threshold_px,
            ) {
                Ok(start) => start,
                Err(rejection) => return Ok(self.reject(rejection)),
            };
            let mut patch = BlockPatch::timing(start, start + block.duration());
            if target.id != source.id {
                patch.layer_id = Some(target.id);
            }
            self.backend.update_block(block_id, &patch)?;
        }

        let source_left_empty = target.id != source.id
            && !source.is_main
            && scene
                .layer_blocks(source.id)
                .iter()
                .all(|b| b.id == block_id);
        if source_left_empty {
            info!("Deleting layer {} left empty by move", source.id);
            self.backend.delete_layer(source.id)?;
        }

        scene.reload(self.backend.as_ref())?;
        self.placed(scene, block_id)
    }

    /// Creates a block from `spec` (only its duration is used) at the drop
    /// candidate, e.g. when an asset is dropped onto the timeline.
    pub fn place_new_block(
        &self,
        scene: &mut SceneState,
        spec: &BlockSpec,
        kind: LayerKind,
        candidate: &DropCandidate,
    ) -> Result<PlacementOutcome, LibraryError> {
        spec.validate()?;
        let target = match self.target_layer(scene, &candidate.target, kind)? {
            Ok(layer) => layer,
            Err(rejection) => return Ok(self.reject(rejection)),
        };
        let duration = spec.duration();

        let block = if target.is_main {
            let inserted = self.backend.insert_block_at_main_track(
                scene.scene_id(),
                &spec.clone().at(candidate.time),
                candidate.time,
            );
            match tolerate_missing(inserted)? {
                Some(block) => block,
                None => return Ok(PlacementOutcome::Skipped),
            }
        } else {
            let layer_blocks = scene.layer_blocks(target.id);
            let start = match resolve_drop(
                &layer_blocks,
                None,
                candidate.time,
                duration,
                self.pixels_per_second(),
                self.config.snap_threshold_px,
            ) {
                Ok(start) => start,
                Err(rejection) => return Ok(self.reject(rejection)),
            };
            self.backend.create_block(target.id, &spec.clone().at(start))?
        };

        scene.reload(self.backend.as_ref())?;
        self.placed(scene, block.id)
    }

    /// Drags one edge of a block to `time`.
    pub fn resize_block(
        &self,
        scene: &mut SceneState,
        block_id: Uuid,
        edge: Edge,
        time: f64,
    ) -> Result<PlacementOutcome, LibraryError> {
        let block = scene.block(block_id)?.clone();
        let layer = scene.layer(block.layer_id)?.clone();
        if layer.locked {
            return Ok(self.reject(PlacementRejection::LayerLocked(layer.id)));
        }
        let min_duration = self.config.min_duration;

        if edge == Edge::Right && layer.is_main {
            let new_end = time.max(block.start_time + min_duration);
            let resized = self.backend.resize_block_with_cascade(block_id, new_end);
            if tolerate_missing(resized)?.is_none() {
                return Ok(PlacementOutcome::Skipped);
            }
        } else {
            let (lower, upper) = if layer.is_main {
                (0.0, f64::INFINITY)
            } else {
                neighbour_bounds(&scene.layer_blocks(layer.id), &block)
            };
            let patch = match edge {
                Edge::Left => {
                    let start = time.max(lower).min(block.end_time - min_duration);
                    BlockPatch::timing(start, block.end_time)
                }
                Edge::Right => {
                    let end = time.min(upper).max(block.start_time + min_duration);
                    BlockPatch::timing(block.start_time, end)
                }
            };
            self.backend.update_block(block_id, &patch)?;
        }

        scene.reload(self.backend.as_ref())?;
        self.placed(scene, block_id)
    }

    /// Resolves a drop target to an existing or newly created layer, or a
    /// rejection when the layer cannot take a block of `kind`.
    fn target_layer(
        &self,
        scene: &mut SceneState,
        target: &DropTarget,
        kind: LayerKind,
    ) -> Result<Result<Layer, PlacementRejection>, LibraryError> {
        let layer = match *target {
            DropTarget::Layer(id) => scene.layer(id)?.clone(),
            DropTarget::BetweenLayers {
                upper: None,
                lower: None,
            } if kind == LayerKind::Video => self.ensure_main_layer(scene)?,
            DropTarget::BetweenLayers { upper, lower } => {
                self.create_layer_between(scene, upper, lower, kind)?
            }
        };
        if layer.locked {
            return Ok(Err(PlacementRejection::LayerLocked(layer.id)));
        }
        if layer.kind != kind {
            return Ok(Err(PlacementRejection::KindMismatch {
                block: kind,
                layer: layer.kind,
            }));
        }
        Ok(Ok(layer))
    }

    fn reject(&self, rejection: PlacementRejection) -> PlacementOutcome {
        self.notices.warning(rejection.to_string());
        PlacementOutcome::Rejected(rejection)
    }

    fn placed(&self, scene: &SceneState, block_id: Uuid) -> Result<PlacementOutcome, LibraryError> {
        let block = scene.block(block_id)?;
        Ok(PlacementOutcome::Placed {
            block_id,
            layer_id: block.layer_id,
            start_time: block.start_time,
            end_time: block.end_time,
        })
    }
}
