//! Layout coordinates.
//!
//! Two coordinate systems travel with every rail point: the 2-D drawing
//! coordinates used by operator screens and the 3-D CAD coordinates of the
//! physical rail.  Both are in millimetres.

use serde::{Deserialize, Serialize};

/// A point on the 2-D layout drawing.
#[derive(Copy, Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct DrawPoint {
    pub x: f64,
    pub y: f64,
}

impl DrawPoint {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Straight-line distance in drawing units.
    #[inline]
    pub fn distance_to(self, other: DrawPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A point in CAD space.
#[derive(Copy, Clone, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct CadPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}
