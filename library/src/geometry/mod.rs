pub mod bounds;
pub mod transform;

pub use bounds::{BoundingBox, Corner, HandleHit};
pub use transform::{CoordinateTransform, DesignSize, Orientation, Point, Viewport};
