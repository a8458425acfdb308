pub mod animation;
pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod model;
pub mod notice;
pub mod service;

use std::fs;
use std::sync::Arc;

use log::info;

pub use config::EditorConfig;
pub use editor::{EditorMode, EditorSession, RenderDescriptor};
pub use error::LibraryError;
pub use service::{InMemoryBackend, SceneSnapshot, StorageBackend};

use editor::SystemTimeSource;

/// Headless entry point: `cli <scene.json> [time]`.
///
/// Loads a scene snapshot into the in-memory backend and prints the render
/// descriptors active at `time` (seconds, default 0) as JSON.
pub fn run(args: Vec<String>) -> Result<(), LibraryError> {
    let path = args.get(1).ok_or_else(|| {
        LibraryError::InvalidArgument("usage: cli <scene.json> [time]".to_string())
    })?;
    let time = match args.get(2) {
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|e| LibraryError::InvalidArgument(format!("bad time '{}': {}", raw, e)))?,
        None => 0.0,
    };

    let snapshot: SceneSnapshot = serde_json::from_str(&fs::read_to_string(path)?)?;
    let scene_id = snapshot.scene_id;
    let backend = Arc::new(InMemoryBackend::from_snapshot(snapshot));
    let session = EditorSession::open(
        backend,
        EditorConfig::load(),
        scene_id,
        Box::new(SystemTimeSource::default()),
    )?;

    let list = session.render_list(time);
    info!("{} blocks active at {:.3}s", list.len(), time);
    println!("{}", serde_json::to_string_pretty(&list)?);
    for notice in session.drain_notices() {
        eprintln!("{:?}: {}", notice.severity, notice.message);
    }
    Ok(())
}
