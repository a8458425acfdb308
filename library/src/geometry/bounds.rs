use serde::{Deserialize, Serialize};

use super::transform::{CoordinateTransform, Point};
use crate::model::BlockTransform;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    pub fn index(self) -> usize {
        match self {
            Corner::TopLeft => 0,
            Corner::TopRight => 1,
            Corner::BottomRight => 2,
            Corner::BottomLeft => 3,
        }
    }

    pub fn from_index(index: usize) -> Corner {
        Self::ALL[index % 4]
    }

    pub fn opposite(self) -> Corner {
        Self::from_index(self.index() + 2)
    }

    /// Unit offset of this corner from the center in the block's local frame.
    pub fn local_sign(self) -> (f64, f64) {
        match self {
            Corner::TopLeft => (-1.0, -1.0),
            Corner::TopRight => (1.0, -1.0),
            Corner::BottomRight => (1.0, 1.0),
            Corner::BottomLeft => (-1.0, 1.0),
        }
    }
}

/// What a pointer landed on, in priority order of classification.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HandleHit {
    Rotation,
    Corner(Corner),
    Body,
}

/// Rotates `(x, y)` by the angle whose cosine/sine are given. Viewport y
/// grows downward, so positive angles turn clockwise on screen.
pub fn rotate(x: f64, y: f64, cos: f64, sin: f64) -> Point {
    Point::new(x * cos - y * sin, x * sin + y * cos)
}

/// Inverse of [`rotate`]: brings a vector into the block's local frame.
pub fn unrotate(x: f64, y: f64, cos: f64, sin: f64) -> Point {
    Point::new(x * cos + y * sin, -x * sin + y * cos)
}

/// Screen-facing geometry of one block, derived from its normalized transform.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct BoundingBox {
    pub center: Point,
    pub half_width: f64,
    pub half_height: f64,
    pub rotation: f64,
    /// Design-space corners, ordered TL, TR, BR, BL.
    pub corners: [Point; 4],
    pub center_viewport: Point,
    /// Viewport-space corners, same order as `corners`.
    pub corners_viewport: [Point; 4],
    pub rotation_handle: Point,
}

impl BoundingBox {
    pub fn compute(
        transform: &BlockTransform,
        xf: &CoordinateTransform,
        handle_offset_px: f64,
    ) -> Self {
        let design = xf.design;
        let center = Point::new(transform.pos_x * design.width, transform.pos_y * design.height);
        let half_width = transform.scale_x * design.width / 2.0;
        let half_height = transform.scale_y * design.height / 2.0;
        let (sin, cos) = transform.rotation.to_radians().sin_cos();

        let corners = Corner::ALL.map(|corner| {
            let (sx, sy) = corner.local_sign();
            center + rotate(sx * half_width, sy * half_height, cos, sin)
        });
        let corners_viewport = corners.map(|p| xf.design_to_viewport(p));

        // Bottom-edge midpoint, pushed outward along the edge normal by a
        // constant on-screen distance so the handle reach ignores zoom.
        let bottom_mid = center + rotate(0.0, half_height, cos, sin);
        let normal = rotate(0.0, 1.0, cos, sin);
        let rotation_handle = xf.design_to_viewport(bottom_mid) + normal * handle_offset_px;

        Self {
            center,
            half_width,
            half_height,
            rotation: transform.rotation,
            corners,
            center_viewport: xf.design_to_viewport(center),
            corners_viewport,
            rotation_handle,
        }
    }

    pub fn corner(&self, corner: Corner) -> Point {
        self.corners[corner.index()]
    }

    pub fn width(&self) -> f64 {
        self.half_width * 2.0
    }

    pub fn height(&self) -> f64 {
        self.half_height * 2.0
    }

    /// Point-in-convex-polygon test against the viewport corners.
    pub fn contains_viewport(&self, p: Point) -> bool {
        let edge = |a: Point, b: Point| (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        let c = &self.corners_viewport;
        let d = [
            edge(c[0], c[1]),
            edge(c[1], c[2]),
            edge(c[2], c[3]),
            edge(c[3], c[0]),
        ];
        let has_pos = d.iter().any(|v| *v > 0.0);
        let has_neg = d.iter().any(|v| *v < 0.0);
        !(has_pos && has_neg)
    }

    /// Classifies a pointer position: rotation handle first, then corners,
    /// then the body.
    pub fn hit_test(&self, p: Point, handle_radius_px: f64) -> Option<HandleHit> {
        if p.distance(self.rotation_handle) <= handle_radius_px {
            return Some(HandleHit::Rotation);
        }
        if let Some(corner) = Corner::ALL
            .into_iter()
            .find(|c| p.distance(self.corners_viewport[c.index()]) <= handle_radius_px)
        {
            return Some(HandleHit::Corner(corner));
        }
        self.contains_viewport(p).then_some(HandleHit::Body)
    }
}
