use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 0.01;
pub const MAX_ZOOM: f64 = 1000.0;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

/// Fixed resolution of the virtual canvas block transforms are defined in.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct DesignSize {
    pub width: f64,
    pub height: f64,
}

impl DesignSize {
    pub fn for_orientation(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Landscape => Self {
                width: 1920.0,
                height: 1080.0,
            },
            Orientation::Portrait => Self {
                width: 1080.0,
                height: 1920.0,
            },
        }
    }

    pub fn min_side(&self) -> f64 {
        self.width.min(self.height)
    }
}

/// Measured on-screen size of the editing surface plus its zoom factor.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, zoom: f64) -> Self {
        Self {
            width,
            height,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        }
    }

    /// Largest zoom at which the whole design fits, as a "fit to window" default.
    pub fn fit(width: f64, height: f64, design: DesignSize) -> Self {
        let zoom = (width / design.width).min(height / design.height);
        Self::new(width, height, zoom)
    }
}

/// Maps between design space and viewport space. The canvas is drawn at
/// `zoom` and centered in the viewport.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct CoordinateTransform {
    pub design: DesignSize,
    pub viewport: Viewport,
}

impl CoordinateTransform {
    pub fn new(design: DesignSize, viewport: Viewport) -> Self {
        Self { design, viewport }
    }

    pub fn zoom(&self) -> f64 {
        self.viewport.zoom
    }

    /// Top-left of the canvas in viewport pixels.
    pub fn offset(&self) -> Point {
        let zoom = self.viewport.zoom;
        Point::new(
            (self.viewport.width - self.design.width * zoom) / 2.0,
            (self.viewport.height - self.design.height * zoom) / 2.0,
        )
    }

    pub fn design_to_viewport(&self, p: Point) -> Point {
        let offset = self.offset();
        Point::new(offset.x + p.x * self.viewport.zoom, offset.y + p.y * self.viewport.zoom)
    }

    pub fn viewport_to_design(&self, p: Point) -> Point {
        let offset = self.offset();
        Point::new(
            (p.x - offset.x) / self.viewport.zoom,
            (p.y - offset.y) / self.viewport.zoom,
        )
    }

    /// Converts a pixel delta into a normalized (fraction of canvas) delta.
    pub fn viewport_delta_to_normalized(&self, delta: Point) -> Point {
        let zoom = self.viewport.zoom;
        Point::new(
            delta.x / (zoom * self.design.width),
            delta.y / (zoom * self.design.height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn centers_canvas_in_viewport() {
        let xf = CoordinateTransform::new(
            DesignSize::for_orientation(Orientation::Landscape),
            Viewport::new(1200.0, 800.0, 0.5),
        );
        // canvas is 960x540 on screen
        let offset = xf.offset();
        assert!(approx(offset.x, 120.0));
        assert!(approx(offset.y, 130.0));
        let p = xf.design_to_viewport(Point::new(1920.0, 1080.0));
        assert!(approx(p.x, 1080.0));
        assert!(approx(p.y, 670.0));
    }

    #[test]
    fn round_trips_across_zoom_and_viewport_sizes() {
        let designs = [
            DesignSize::for_orientation(Orientation::Landscape),
            DesignSize::for_orientation(Orientation::Portrait),
        ];
        for design in designs {
            for zoom in [0.05, 0.3, 1.0, 2.75, 40.0] {
                for (vw, vh) in [(320.0, 240.0), (1920.0, 1080.0), (777.0, 1333.0)] {
                    let xf = CoordinateTransform::new(design, Viewport::new(vw, vh, zoom));
                    for (nx, ny) in [(0.0, 0.0), (0.5, 0.5), (1.0, 0.25), (0.137, 0.981)] {
                        let p = Point::new(nx * design.width, ny * design.height);
                        let back = xf.viewport_to_design(xf.design_to_viewport(p));
                        assert!((back.x - p.x).abs() < 1e-6, "x {} vs {}", back.x, p.x);
                        assert!((back.y - p.y).abs() < 1e-6, "y {} vs {}", back.y, p.y);
                    }
                }
            }
        }
    }

    #[test]
    fn zoom_is_clamped() {
        assert_eq!(Viewport::new(10.0, 10.0, 0.0).zoom, MIN_ZOOM);
        assert_eq!(Viewport::new(10.0, 10.0, 1e9).zoom, MAX_ZOOM);
    }

    #[test]
    fn fit_uses_limiting_axis() {
        let design = DesignSize::for_orientation(Orientation::Portrait);
        let vp = Viewport::fit(1080.0, 960.0, design);
        assert!(approx(vp.zoom, 0.5));
    }
}
