use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::AnchorError;

/// A circular contour that passed the area and circularity gates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorCandidate {
    pub center: Point2<f32>,
    /// Pixel count of the contour.
    pub area: usize,
    pub circularity: f32,
}

/// Four anchor centres assigned to the sheet corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorQuad {
    pub top_left: Point2<f32>,
    pub top_right: Point2<f32>,
    pub bottom_right: Point2<f32>,
    pub bottom_left: Point2<f32>,
}

impl AnchorQuad {
    /// Assign four unordered points to corners.
    ///
    /// `x + y` is smallest at the top-left and largest at the bottom-right;
    /// `y - x` is smallest at the top-right and largest at the bottom-left.
    /// Fails when two corners would pick the same point.
    pub fn from_unordered(pts: [Point2<f32>; 4]) -> Result<Self, AnchorError> {
        let sum = |p: &Point2<f32>| p.x + p.y;
        let diff = |p: &Point2<f32>| p.y - p.x;

        let tl = argmin(&pts, sum);
        let br = argmax(&pts, sum);
        let tr = argmin(&pts, diff);
        let bl = argmax(&pts, diff);

        let mut picked = [tl, tr, br, bl];
        picked.sort_unstable();
        if picked.windows(2).any(|w| w[0] == w[1]) {
            return Err(AnchorError::AmbiguousOrder);
        }

        Ok(Self {
            top_left: pts[tl],
            top_right: pts[tr],
            bottom_right: pts[br],
            bottom_left: pts[bl],
        })
    }

    /// Corners as `[TL, TR, BR, BL]`.
    pub fn to_array(&self) -> [Point2<f32>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }
}

fn argmin(pts: &[Point2<f32>; 4], key: impl Fn(&Point2<f32>) -> f32) -> usize {
    (0..4)
        .min_by(|&a, &b| key(&pts[a]).total_cmp(&key(&pts[b])))
        .unwrap_or(0)
}

fn argmax(pts: &[Point2<f32>; 4], key: impl Fn(&Point2<f32>) -> f32) -> usize {
    (0..4)
        .max_by(|&a, &b| key(&pts[a]).total_cmp(&key(&pts[b])))
        .unwrap_or(0)
}
