pub mod history;
pub mod manipulation;
pub mod overlay;
pub mod placement;
pub mod playback;
pub mod scene;
pub mod session;
pub mod timeline;

pub use manipulation::{DragEnd, DragKind, DragState, ManipulationEngine};
pub use overlay::{PendingOverlay, RenderDescriptor};
pub use placement::PlacementRejection;
pub use playback::{ManualTimeSource, PlaybackClock, SystemTimeSource, TickOutcome, TimeSource};
pub use scene::SceneState;
pub use session::{EditorMode, EditorSession};
pub use timeline::{DropCandidate, DropTarget, Edge, PlacementOutcome, TimelineEngine, TimelineScroll};
