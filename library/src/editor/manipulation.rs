use std::sync::Arc;

use log::{debug, warn};
use uuid::Uuid;

use super::scene::SceneState;
use crate::config::ManipulationConfig;
use crate::error::LibraryError;
use crate::geometry::bounds::{rotate, unrotate};
use crate::geometry::{BoundingBox, Corner, CoordinateTransform, HandleHit, Point};
use crate::model::block::{SCALE_MAX, SCALE_MIN, clamp_position};
use crate::model::{Block, BlockPatch};
use crate::notice::Notices;
use crate::service::keyframe_coupling::apply_coupled;
use crate::service::{StorageBackend, WriteQueue, WriteTicket};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DragKind {
    Move,
    Resize(Corner),
    Rotate,
}

impl From<HandleHit> for DragKind {
    fn from(hit: HandleHit) -> Self {
        match hit {
            HandleHit::Rotation => DragKind::Rotate,
            HandleHit::Corner(corner) => DragKind::Resize(corner),
            HandleHit::Body => DragKind::Move,
        }
    }
}

/// Values captured at pointer-down. They stay fixed for the whole drag.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum DragState {
    Moving {
        start_pointer: Point,
        start_x: f64,
        start_y: f64,
    },
    Resizing {
        corner: Corner,
        /// Opposite corner in design space.
        anchor: Point,
        cos: f64,
        sin: f64,
        /// Width over height, both in design units.
        aspect: f64,
        lock_aspect: bool,
    },
    Rotating {
        center: Point,
        start_angle: f64,
        start_rotation: f64,
    },
}

impl DragState {
    pub fn kind(&self) -> DragKind {
        match self {
            DragState::Moving { .. } => DragKind::Move,
            DragState::Resizing { corner, .. } => DragKind::Resize(*corner),
            DragState::Rotating { .. } => DragKind::Rotate,
        }
    }
}

struct ActiveDrag {
    block_id: Uuid,
    state: DragState,
    /// Resolved block at pointer-down.
    snapshot: Block,
    last_ticket: Option<WriteTicket>,
    /// Superseded writes whose outcome has not been seen yet.
    earlier: Vec<WriteTicket>,
}

/// Result of finishing a drag.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DragEnd {
    NoDrag,
    /// Storage confirmed the last write; the overlay has been cleared.
    Committed { block_id: Uuid },
    /// The last write failed; the overlay is kept until the next full reload.
    Failed { block_id: Uuid },
}

/// Pointer-driven move/resize/rotate of a single block on the canvas.
pub struct ManipulationEngine {
    config: ManipulationConfig,
    backend: Arc<dyn StorageBackend>,
    queue: WriteQueue,
    notices: Notices,
    drag: Option<ActiveDrag>,
}

impl ManipulationEngine {
    pub fn new(
        config: ManipulationConfig,
        backend: Arc<dyn StorageBackend>,
        notices: Notices,
    ) -> Self {
        let queue = WriteQueue::new(backend.clone(), notices.clone());
        Self {
            config,
            backend,
            queue,
            notices,
            drag: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.drag.is_some()
    }

    pub fn active_block(&self) -> Option<Uuid> {
        self.drag.as_ref().map(|d| d.block_id)
    }

    pub fn drag_state(&self) -> Option<DragState> {
        self.drag.as_ref().map(|d| d.state)
    }

    /// Screen geometry of a block at `time`, including pending edits.
    pub fn bounding_box(
        &self,
        scene: &SceneState,
        block_id: Uuid,
        xf: &CoordinateTransform,
        time: f64,
    ) -> Result<BoundingBox, LibraryError> {
        let resolved = scene.resolved_block(block_id, time)?;
        Ok(BoundingBox::compute(
            &resolved.transform(),
            xf,
            self.config.rotation_handle_offset_px,
        ))
    }

    /// Hit-tests `pointer` against the block and starts the matching drag.
    /// Returns `None` when the pointer missed the block.
    pub fn pointer_down(
        &mut self,
        scene: &mut SceneState,
        block_id: Uuid,
        pointer: Point,
        xf: &CoordinateTransform,
        time: f64,
    ) -> Result<Option<HandleHit>, LibraryError> {
        let bbox = self.bounding_box(scene, block_id, xf, time)?;
        let Some(hit) = bbox.hit_test(pointer, self.config.handle_radius_px) else {
            return Ok(None);
        };
        self.begin(scene, block_id, hit.into(), pointer, xf, time)?;
        Ok(Some(hit))
    }

    pub fn begin(
        &mut self,
        scene: &mut SceneState,
        block_id: Uuid,
        kind: DragKind,
        pointer: Point,
        xf: &CoordinateTransform,
        time: f64,
    ) -> Result<(), LibraryError> {
        if self.drag.is_some() {
            warn!("Starting a new drag while one is active; dropping the old one");
            self.cancel(scene);
        }
        let layer = scene.layer_of(block_id)?;
        if layer.locked {
            return Err(LibraryError::LayerLocked(layer.id));
        }

        let snapshot = scene.resolved_block(block_id, time)?;
        let bbox = BoundingBox::compute(
            &snapshot.transform(),
            xf,
            self.config.rotation_handle_offset_px,
        );
        let state = match kind {
            DragKind::Move => DragState::Moving {
                start_pointer: pointer,
                start_x: snapshot.pos_x,
                start_y: snapshot.pos_y,
            },
            DragKind::Resize(corner) => {
                let (sin, cos) = snapshot.rotation.to_radians().sin_cos();
                let aspect = if bbox.height() > 0.0 {
                    bbox.width() / bbox.height()
                } else {
                    1.0
                };
                DragState::Resizing {
                    corner,
                    anchor: bbox.corner(corner.opposite()),
                    cos,
                    sin,
                    aspect,
                    lock_aspect: snapshot.lock_aspect,
                }
            }
            DragKind::Rotate => {
                let center = bbox.center_viewport;
                DragState::Rotating {
                    center,
                    start_angle: angle_around(center, pointer),
                    start_rotation: snapshot.rotation,
                }
            }
        };
        debug!("Block {}: begin {:?}", block_id, kind);
        self.drag = Some(ActiveDrag {
            block_id,
            state,
            snapshot,
            last_ticket: None,
            earlier: Vec::new(),
        });
        Ok(())
    }

    /// Applies the pointer position to the overlay immediately and queues the
    /// matching storage write. Returns the patch that was applied.
    pub fn pointer_move(
        &mut self,
        scene: &mut SceneState,
        pointer: Point,
        xf: &CoordinateTransform,
        playhead: f64,
    ) -> Result<Option<BlockPatch>, LibraryError> {
        let Some(drag) = self.drag.as_mut() else {
            return Ok(None);
        };
        let patch = match drag.state {
            DragState::Moving {
                start_pointer,
                start_x,
                start_y,
            } => move_patch(xf, start_pointer, start_x, start_y, pointer),
            DragState::Resizing {
                corner,
                anchor,
                cos,
                sin,
                aspect,
                lock_aspect,
            } => {
                let min_half = (self.config.min_handle_px / xf.zoom())
                    .max(self.config.min_size_fraction * xf.design.min_side());
                let design = xf.design;
                let geometry = ResizeGeometry {
                    corner,
                    anchor,
                    cos,
                    sin,
                    aspect: lock_aspect.then_some(aspect),
                    min_half,
                    min_size: Point::new(SCALE_MIN * design.width, SCALE_MIN * design.height),
                    max_size: Point::new(SCALE_MAX * design.width, SCALE_MAX * design.height),
                };
                geometry.patch(xf, xf.viewport_to_design(pointer))
            }
            DragState::Rotating {
                center,
                start_angle,
                start_rotation,
            } => {
                let delta = normalize_delta(angle_around(center, pointer) - start_angle);
                BlockPatch::rotation(start_rotation + delta)
            }
        };

        scene.overlay_mut(drag.block_id).merge(&patch);

        let snapshot = drag.snapshot.clone();
        let write = patch.clone();
        let tolerance = self.config.keyframe_tolerance;
        let ticket = self.queue.submit(
            format!("{:?} block {}", drag.state.kind(), drag.block_id),
            Box::new(move |backend: &dyn StorageBackend| {
                apply_coupled(backend, &snapshot, &write, playhead, tolerance)
            }),
        );
        // Only the newest write is awaited; older ones are checked as they land.
        if let Some(previous) = drag.last_ticket.replace(ticket) {
            drag.earlier.push(previous);
        }
        settle(&mut drag.earlier, &self.notices, drag.block_id);
        Ok(Some(patch))
    }

    /// Ends the drag: waits for the newest write, reloads the block, then
    /// clears its overlay.
    pub fn pointer_up(&mut self, scene: &mut SceneState) -> Result<DragEnd, LibraryError> {
        let Some(drag) = self.drag.take() else {
            return Ok(DragEnd::NoDrag);
        };
        let ActiveDrag {
            block_id,
            last_ticket,
            mut earlier,
            ..
        } = drag;
        let Some(ticket) = last_ticket else {
            scene.clear_overlay(block_id);
            return Ok(DragEnd::Committed { block_id });
        };

        let outcome = ticket.wait();
        // Writes run in order, so every earlier one has finished by now.
        settle(&mut earlier, &self.notices, block_id);
        match outcome {
            Ok(()) => {
                scene.reload_block(self.backend.as_ref(), block_id)?;
                scene.clear_overlay(block_id);
                debug!("Block {}: drag committed", block_id);
                Ok(DragEnd::Committed { block_id })
            }
            Err(err) => {
                self.notices
                    .error(format!("Failed to save changes to block {}: {}", block_id, err));
                Ok(DragEnd::Failed { block_id })
            }
        }
    }

    /// Drops the active drag without waiting for its writes.
    pub fn cancel(&mut self, scene: &mut SceneState) -> Option<Uuid> {
        let mut drag = self.drag.take()?;
        drag.earlier.extend(drag.last_ticket.take());
        settle(&mut drag.earlier, &self.notices, drag.block_id);
        scene.clear_overlay(drag.block_id);
        debug!("Block {}: drag cancelled", drag.block_id);
        Some(drag.block_id)
    }
}

/// Raises a notice for every finished write that failed and keeps the ones
/// still in flight. Tickets dropped while in flight are reported by the queue.
fn settle(pending: &mut Vec<WriteTicket>, notices: &Notices, block_id: Uuid) {
    pending.retain(|ticket| match ticket.poll() {
        None => true,
        Some(Ok(())) => false,
        Some(Err(err)) => {
            notices.error(format!(
                "Failed to save changes to block {} ({}): {}",
                block_id,
                ticket.label(),
                err
            ));
            false
        }
    });
}

fn move_patch(
    xf: &CoordinateTransform,
    start_pointer: Point,
    start_x: f64,
    start_y: f64,
    pointer: Point,
) -> BlockPatch {
    let delta = xf.viewport_delta_to_normalized(pointer - start_pointer);
    BlockPatch::position(
        clamp_position(start_x + delta.x),
        clamp_position(start_y + delta.y),
    )
}

/// Degrees of `pointer` around `center`, in viewport space.
fn angle_around(center: Point, pointer: Point) -> f64 {
    let v = pointer - center;
    v.y.atan2(v.x).to_degrees()
}

/// Maps an angle difference into `(-180, 180]`.
pub fn normalize_delta(delta: f64) -> f64 {
    let wrapped = delta.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Opposite-corner-anchored resize in design space.
pub struct ResizeGeometry {
    pub corner: Corner,
    pub anchor: Point,
    pub cos: f64,
    pub sin: f64,
    /// Width over height to keep, if the aspect ratio is locked.
    pub aspect: Option<f64>,
    /// Smallest half extent, in design units.
    pub min_half: f64,
    /// Full-size bounds in design units, from the block scale limits.
    pub min_size: Point,
    pub max_size: Point,
}

impl ResizeGeometry {
    /// New center and full size for the dragged corner at `pointer`.
    pub fn solve(&self, pointer: Point) -> (Point, f64, f64) {
        let half = (pointer - self.anchor) * 0.5;
        let local = unrotate(half.x, half.y, self.cos, self.sin);

        let mut width = 2.0 * self.min_half.max(local.x.abs());
        let mut height = 2.0 * self.min_half.max(local.y.abs());
        match self.aspect.filter(|a| *a > 0.0) {
            Some(aspect) => {
                if width / aspect >= height {
                    height = width / aspect;
                } else {
                    width = height * aspect;
                }
                // One factor for both sides; the ceiling wins over the floor.
                let shrink = (self.max_size.x / width).min(self.max_size.y / height);
                let grow = (self.min_size.x / width).max(self.min_size.y / height);
                let factor = if shrink < 1.0 { shrink } else { grow.max(1.0) };
                width *= factor;
                height *= factor;
            }
            None => {
                width = width.clamp(self.min_size.x, self.max_size.x);
                height = height.clamp(self.min_size.y, self.max_size.y);
            }
        }

        let (natural_x, natural_y) = self.corner.local_sign();
        let sign_x = if local.x != 0.0 { local.x.signum() } else { natural_x };
        let sign_y = if local.y != 0.0 { local.y.signum() } else { natural_y };

        let new_corner = self.anchor + rotate(sign_x * width, sign_y * height, self.cos, self.sin);
        (self.anchor.midpoint(new_corner), width, height)
    }

    pub fn patch(&self, xf: &CoordinateTransform, pointer: Point) -> BlockPatch {
        let (center, width, height) = self.solve(pointer);
        let design = xf.design;
        BlockPatch::position_and_scale(
            center.x / design.width,
            center.y / design.height,
            width / design.width,
            height / design.height,
        )
    }
}
