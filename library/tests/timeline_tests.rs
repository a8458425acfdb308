//! Integration tests for timeline placement: drop resolution, cross-layer
//! moves, main-track delegation and edge resizing.

use std::sync::Arc;

use comic_editor_core::editor::{
    DropCandidate, DropTarget, Edge, ManualTimeSource, PlacementOutcome, PlacementRejection,
    TimelineScroll,
};
use comic_editor_core::geometry::Point;
use comic_editor_core::model::{BlockSpec, Layer, LayerKind, LayerSpec};
use comic_editor_core::notice::Severity;
use comic_editor_core::{EditorConfig, EditorSession, InMemoryBackend, StorageBackend};
use uuid::Uuid;

/// Helper: opens a session on `scene_id` with default config.
fn open(backend: &Arc<InMemoryBackend>, scene_id: Uuid) -> EditorSession {
    EditorSession::open(
        backend.clone(),
        EditorConfig::default(),
        scene_id,
        Box::new(ManualTimeSource::new()),
    )
    .unwrap()
}

fn video_layer(backend: &InMemoryBackend, scene_id: Uuid, z: f64) -> Layer {
    backend
        .create_layer(scene_id, &LayerSpec::overlay(z, LayerKind::Video))
        .unwrap()
}

fn at(time: f64, layer_id: Uuid) -> DropCandidate {
    DropCandidate {
        time,
        target: DropTarget::Layer(layer_id),
    }
}

fn placed(outcome: PlacementOutcome) -> (Uuid, Uuid, f64, f64) {
    match outcome {
        PlacementOutcome::Placed {
            block_id,
            layer_id,
            start_time,
            end_time,
        } => (block_id, layer_id, start_time, end_time),
        other => panic!("expected a placement, got {:?}", other),
    }
}

#[test]
fn test_shallow_overlap_snaps_to_adjacent_slot() {
    let backend = Arc::new(InMemoryBackend::new());
    let scene_id = Uuid::new_v4();
    let layer = video_layer(&backend, scene_id, 1.0);
    backend
        .create_block(layer.id, &BlockSpec::new(None, 0.0, 5.0))
        .unwrap();
    let mut session = open(&backend, scene_id);

    let outcome = session
        .place_new_block(&BlockSpec::new(None, 0.0, 3.0), LayerKind::Video, &at(4.5, layer.id))
        .unwrap();
    let (_, layer_id, start, end) = placed(outcome);
    assert_eq!(layer_id, layer.id);
    assert_eq!((start, end), (5.0, 8.0));
}

#[test]
fn test_deep_overlap_is_rejected_without_mutation() {
    let backend = Arc::new(InMemoryBackend::new());
    let scene_id = Uuid::new_v4();
    let layer = video_layer(&backend, scene_id, 1.0);
    backend
        .create_block(layer.id, &BlockSpec::new(None, 0.0, 5.0))
        .unwrap();
    let mut session = open(&backend, scene_id);
    let writes_before = backend.write_count();

    let outcome = session
        .place_new_block(&BlockSpec::new(None, 0.0, 3.0), LayerKind::Video, &at(2.0, layer.id))
        .unwrap();
    assert!(matches!(
        outcome,
        PlacementOutcome::Rejected(PlacementRejection::OverlapTooLarge { .. })
    ));
    assert_eq!(backend.write_count(), writes_before);
    assert_eq!(backend.get_blocks(layer.id).unwrap().len(), 1);

    let notices = session.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].severity, Severity::Warning);
}

#[test]
fn test_move_within_layer_ignores_itself() {
    let backend = Arc::new(InMemoryBackend::new());
    let scene_id = Uuid::new_v4();
    let layer = video_layer(&backend, scene_id, 1.0);
    let block = backend
        .create_block(layer.id, &BlockSpec::new(None, 0.0, 5.0))
        .unwrap();
    let mut session = open(&backend, scene_id);

    let outcome = session.move_block(block.id, &at(2.0, layer.id)).unwrap();
    let (_, layer_id, start, end) = placed(outcome);
    assert_eq!(layer_id, layer.id);
    assert_eq!((start, end), (2.0, 7.0));
}

#[test]
fn test_cross_layer_move_deletes_emptied_source_layer() {
    let backend = Arc::new(InMemoryBackend::new());
    let scene_id = Uuid::new_v4();
    let source = video_layer(&backend, scene_id, 1.0);
    let target = video_layer(&backend, scene_id, 2.0);
    let moving = backend
        .create_block(source.id, &BlockSpec::new(None, 0.0, 2.0))
        .unwrap();
    backend
        .create_block(target.id, &BlockSpec::new(None, 0.0, 2.0))
        .unwrap();
    let mut session = open(&backend, scene_id);

    let outcome = session.move_block(moving.id, &at(5.0, target.id)).unwrap();
    let (_, layer_id, start, _) = placed(outcome);
    assert_eq!(layer_id, target.id);
    assert_eq!(start, 5.0);

    let layers = backend.get_layers(scene_id).unwrap();
    assert!(layers.iter().all(|l| l.id != source.id));
    assert!(session.scene().layer(source.id).is_err());
}

#[test]
fn test_cross_layer_move_keeps_non_empty_source() {
    let backend = Arc::new(InMemoryBackend::new());
    let scene_id = Uuid::new_v4();
    let source = video_layer(&backend, scene_id, 1.0);
    let target = video_layer(&backend, scene_id, 2.0);
    let moving = backend
        .create_block(source.id, &BlockSpec::new(None, 0.0, 2.0))
        .unwrap();
    backend
        .create_block(source.id, &BlockSpec::new(None, 3.0, 4.0))
        .unwrap();
    let mut session = open(&backend, scene_id);

    session.move_block(moving.id, &at(0.0, target.id)).unwrap();
    assert_eq!(backend.get_blocks(source.id).unwrap().len(), 1);
}

#[test]
fn test_drop_on_main_layer_delegates_insert() {
    let backend = Arc::new(InMemoryBackend::new());
    let scene_id = Uuid::new_v4();
    let main = backend.create_layer(scene_id, &LayerSpec::main()).unwrap();
    backend
        .insert_block_at_main_track(scene_id, &BlockSpec::new(None, 0.0, 4.0), 0.0)
        .unwrap();
    backend
        .insert_block_at_main_track(scene_id, &BlockSpec::new(None, 0.0, 3.0), 10.0)
        .unwrap();
    let mut session = open(&backend, scene_id);

    let outcome = session
        .place_new_block(&BlockSpec::new(None, 0.0, 2.0), LayerKind::Video, &at(4.5, main.id))
        .unwrap();
    let (block_id, layer_id, _, _) = placed(outcome);
    assert_eq!(layer_id, main.id);
    assert_eq!(session.scene().layer_blocks(main.id).len(), 3);
    assert!(session.scene().block(block_id).is_ok());
}

#[test]
fn test_missing_cascade_capability_is_a_no_op() {
    let backend = Arc::new(InMemoryBackend::without_cascade());
    let scene_id = Uuid::new_v4();
    let main = backend.create_layer(scene_id, &LayerSpec::main()).unwrap();
    let block = backend
        .create_block(main.id, &BlockSpec::new(None, 0.0, 4.0))
        .unwrap();
    let mut session = open(&backend, scene_id);

    let outcome = session
        .place_new_block(&BlockSpec::new(None, 0.0, 2.0), LayerKind::Video, &at(1.0, main.id))
        .unwrap();
    assert_eq!(outcome, PlacementOutcome::Skipped);
    let outcome = session.resize_block(block.id, Edge::Right, 6.0).unwrap();
    assert_eq!(outcome, PlacementOutcome::Skipped);

    assert_eq!(backend.get_blocks(main.id).unwrap().len(), 1);
    assert_eq!(backend.block(block.id).unwrap().end_time, 4.0);
}

#[test]
fn test_main_right_edge_resize_delegates_cascade() {
    let backend = Arc::new(InMemoryBackend::new());
    let scene_id = Uuid::new_v4();
    let main = backend.create_layer(scene_id, &LayerSpec::main()).unwrap();
    let first = backend
        .insert_block_at_main_track(scene_id, &BlockSpec::new(None, 0.0, 4.0), 0.0)
        .unwrap();
    backend
        .insert_block_at_main_track(scene_id, &BlockSpec::new(None, 0.0, 3.0), 10.0)
        .unwrap();
    let mut session = open(&backend, scene_id);

    let outcome = session.resize_block(first.id, Edge::Right, 6.0).unwrap();
    let (_, _, start, end) = placed(outcome);
    assert_eq!((start, end), (0.0, 6.0));
    assert_eq!(session.scene().layer_blocks(main.id).len(), 2);
}

#[test]
fn test_non_main_resize_is_clamped_to_neighbours() {
    let backend = Arc::new(InMemoryBackend::new());
    let scene_id = Uuid::new_v4();
    let layer = video_layer(&backend, scene_id, 1.0);
    let left = backend
        .create_block(layer.id, &BlockSpec::new(None, 0.0, 2.0))
        .unwrap();
    let right = backend
        .create_block(layer.id, &BlockSpec::new(None, 3.0, 5.0))
        .unwrap();
    let mut session = open(&backend, scene_id);

    let (_, _, _, end) = placed(session.resize_block(left.id, Edge::Right, 4.0).unwrap());
    assert_eq!(end, 3.0);
    let (_, _, start, _) = placed(session.resize_block(right.id, Edge::Left, 1.0).unwrap());
    assert_eq!(start, 3.0);
    let (_, _, start, end) = placed(session.resize_block(right.id, Edge::Left, 4.99).unwrap());
    assert!((start - 4.9).abs() < 1e-9);
    assert_eq!(end, 5.0);
}

#[test]
fn test_left_edge_never_goes_negative() {
    let backend = Arc::new(InMemoryBackend::new());
    let scene_id = Uuid::new_v4();
    let layer = video_layer(&backend, scene_id, 1.0);
    let block = backend
        .create_block(layer.id, &BlockSpec::new(None, 1.0, 2.0))
        .unwrap();
    let mut session = open(&backend, scene_id);

    let (_, _, start, _) = placed(session.resize_block(block.id, Edge::Left, -3.0).unwrap());
    assert_eq!(start, 0.0);
}

#[test]
fn test_between_layers_drop_creates_layer_at_midpoint() {
    let backend = Arc::new(InMemoryBackend::new());
    let scene_id = Uuid::new_v4();
    let lower = video_layer(&backend, scene_id, 1.0);
    let upper = video_layer(&backend, scene_id, 2.0);
    let mut session = open(&backend, scene_id);

    let candidate = DropCandidate {
        time: 1.0,
        target: DropTarget::BetweenLayers {
            upper: Some(upper.id),
            lower: Some(lower.id),
        },
    };
    let outcome = session
        .place_new_block(&BlockSpec::new(None, 0.0, 2.0), LayerKind::Video, &candidate)
        .unwrap();
    let (_, layer_id, _, _) = placed(outcome);
    let created = session.scene().layer(layer_id).unwrap();
    assert_eq!(created.z(), 1.5);
    assert!(!created.is_main);
}

#[test]
fn test_drop_above_top_row_goes_one_unit_higher() {
    let backend = Arc::new(InMemoryBackend::new());
    let scene_id = Uuid::new_v4();
    let top = video_layer(&backend, scene_id, 3.0);
    let mut session = open(&backend, scene_id);

    let candidate = session.drop_candidate(Point::new(100.0, -10.0), TimelineScroll::default(), 0.0);
    assert_eq!(
        candidate.target,
        DropTarget::BetweenLayers {
            upper: None,
            lower: Some(top.id),
        }
    );
    let (_, layer_id, _, _) = placed(
        session
            .place_new_block(&BlockSpec::new(None, 0.0, 1.0), LayerKind::Video, &candidate)
            .unwrap(),
    );
    assert_eq!(session.scene().layer(layer_id).unwrap().z(), 4.0);
}

#[test]
fn test_drop_candidate_maps_pointer_to_rows() {
    let backend = Arc::new(InMemoryBackend::new());
    let scene_id = Uuid::new_v4();
    backend.create_layer(scene_id, &LayerSpec::main()).unwrap();
    let middle = video_layer(&backend, scene_id, 1.0);
    let top = video_layer(&backend, scene_id, 2.0);
    let session = open(&backend, scene_id);
    let main_id = session.scene().main_layer().unwrap().id;
    // rows: top, middle, main; pitch = 40 + 2
    let scroll = TimelineScroll { x: 150.0, y: 0.0 };

    let c = session.drop_candidate(Point::new(100.0, 10.0), scroll, 0.5);
    assert_eq!(c.time, 4.5);
    assert_eq!(c.target, DropTarget::Layer(top.id));

    let c = session.drop_candidate(Point::new(0.0, 63.0), scroll, 0.0);
    assert_eq!(c.target, DropTarget::Layer(middle.id));

    let c = session.drop_candidate(Point::new(0.0, 43.0), scroll, 0.0);
    assert_eq!(
        c.target,
        DropTarget::BetweenLayers {
            upper: Some(top.id),
            lower: Some(middle.id),
        }
    );

    let c = session.drop_candidate(Point::new(0.0, 146.0), scroll, 0.0);
    assert_eq!(
        c.target,
        DropTarget::BetweenLayers {
            upper: Some(main_id),
            lower: None,
        }
    );

    let c = session.drop_candidate(Point::new(10.0, 100.0), TimelineScroll::default(), 9.0);
    assert_eq!(c.time, 0.0);
    assert_eq!(c.target, DropTarget::Layer(main_id));
}

#[test]
fn test_kind_mismatch_is_rejected() {
    let backend = Arc::new(InMemoryBackend::new());
    let scene_id = Uuid::new_v4();
    let layer = video_layer(&backend, scene_id, 1.0);
    let mut session = open(&backend, scene_id);

    let outcome = session
        .place_new_block(&BlockSpec::new(None, 0.0, 1.0), LayerKind::Audio, &at(0.0, layer.id))
        .unwrap();
    assert_eq!(
        outcome,
        PlacementOutcome::Rejected(PlacementRejection::KindMismatch {
            block: LayerKind::Audio,
            layer: LayerKind::Video,
        })
    );
}

#[test]
fn test_first_drop_creates_main_layer_lazily() {
    let backend = Arc::new(InMemoryBackend::new());
    let scene_id = Uuid::new_v4();
    let mut session = open(&backend, scene_id);
    assert!(session.scene().main_layer().is_none());

    let candidate = session.drop_candidate(Point::new(50.0, 5.0), TimelineScroll::default(), 0.0);
    let outcome = session
        .place_new_block(&BlockSpec::new(None, 0.0, 2.0), LayerKind::Video, &candidate)
        .unwrap();
    let (_, layer_id, _, _) = placed(outcome);
    let main = session.scene().main_layer().unwrap();
    assert_eq!(main.id, layer_id);
    assert_eq!(backend.get_layers(scene_id).unwrap().len(), 1);
}

#[test]
fn test_snap_distance_follows_timeline_zoom() {
    let backend = Arc::new(InMemoryBackend::new());
    let scene_id = Uuid::new_v4();
    let layer = video_layer(&backend, scene_id, 1.0);
    backend
        .create_block(layer.id, &BlockSpec::new(None, 0.0, 5.0))
        .unwrap();
    let mut session = open(&backend, scene_id);
    let spec = BlockSpec::new(None, 0.0, 3.0);

    // 0.5s of overlap is 100px at 4x zoom
    session.set_timeline_zoom(4.0);
    let outcome = session
        .place_new_block(&spec, LayerKind::Video, &at(4.5, layer.id))
        .unwrap();
    assert_eq!(
        outcome,
        PlacementOutcome::Rejected(PlacementRejection::OverlapTooLarge { overlap_px: 100.0 })
    );

    session.set_timeline_zoom(1.0);
    let outcome = session
        .place_new_block(&spec, LayerKind::Video, &at(4.5, layer.id))
        .unwrap();
    let (_, _, start, end) = placed(outcome);
    assert_eq!((start, end), (5.0, 8.0));
}

#[test]
fn test_drop_time_follows_timeline_zoom() {
    let backend = Arc::new(InMemoryBackend::new());
    let scene_id = Uuid::new_v4();
    video_layer(&backend, scene_id, 1.0);
    let mut session = open(&backend, scene_id);

    session.set_timeline_zoom(2.0);
    let c = session.drop_candidate(Point::new(100.0, 10.0), TimelineScroll::default(), 0.0);
    assert_eq!(c.time, 1.0);

    session.set_timeline_zoom(0.0);
    assert_eq!(session.timeline_zoom(), 0.01);
}
