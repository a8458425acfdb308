pub mod backend;
pub mod keyframe_coupling;
pub mod memory_backend;
pub mod persistence;

pub use backend::StorageBackend;
pub use keyframe_coupling::{CoupledWrite, apply_coupled, plan_writes};
pub use memory_backend::{InMemoryBackend, SceneSnapshot};
pub use persistence::{WriteJob, WriteQueue, WriteTicket};
