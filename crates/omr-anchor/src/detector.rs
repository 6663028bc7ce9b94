use log::debug;
use nalgebra::Point2;
use omr_core::{
    adaptive_threshold_mean_inv, close_3x3, gaussian_blur_5, luminance, GrayImage, GrayImageView,
    RgbaImageView,
};

use crate::contour::find_contours;
use crate::{AnchorCandidate, AnchorError, AnchorParams, AnchorQuad};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Locates the four circular fiducials printed at the sheet corners.
///
/// Pipeline: luminance → 5-tap blur → inverted adaptive threshold →
/// 3×3 close → contours → circularity gate → group-of-four selection with a
/// dark-centre / light-surround probe → corner ordering.
#[derive(Clone, Debug, Default)]
pub struct AnchorDetector {
    params: AnchorParams,
}

impl AnchorDetector {
    pub fn new(params: AnchorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &AnchorParams {
        &self.params
    }

    /// Find the four anchors in an RGBA frame, ordered TL, TR, BR, BL.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(width = frame.width, height = frame.height))
    )]
    pub fn find_anchors(&self, frame: &RgbaImageView<'_>) -> Result<AnchorQuad, AnchorError> {
        let gray = luminance(frame);
        self.find_anchors_gray(&gray.view())
    }

    /// Same as [`find_anchors`](Self::find_anchors) on an already converted luminance plane.
    pub fn find_anchors_gray(&self, gray: &GrayImageView<'_>) -> Result<AnchorQuad, AnchorError> {
        let mask = self.binarize(gray);
        let mut candidates = self.candidates_from_mask(&mask.view());
        candidates.sort_by_key(|c| c.area);

        let Some(group) = self.select_group(gray, &candidates) else {
            debug!("no anchor group among {} candidates", candidates.len());
            return Err(AnchorError::NotFound {
                candidates: candidates.len(),
            });
        };
        AnchorQuad::from_unordered(group)
    }

    /// Every circular contour in the frame, for diagnostics.
    pub fn detect_candidates(&self, gray: &GrayImageView<'_>) -> Vec<AnchorCandidate> {
        let mask = self.binarize(gray);
        self.candidates_from_mask(&mask.view())
    }

    /// Blurred, thresholded and closed foreground mask (ink = 255).
    pub fn binarize(&self, gray: &GrayImageView<'_>) -> GrayImage {
        let blurred = gaussian_blur_5(gray);
        let mask = adaptive_threshold_mean_inv(
            &blurred.view(),
            self.params.block_size,
            self.params.threshold_c,
        );
        close_3x3(&mask.view())
    }

    fn candidates_from_mask(&self, mask: &GrayImageView<'_>) -> Vec<AnchorCandidate> {
        let p = &self.params;
        find_contours(mask)
            .into_iter()
            .filter(|c| c.points.len() >= p.min_contour_points && c.area >= p.min_area)
            .filter_map(|c| {
                let circularity = c.circularity();
                (p.circularity_min..=p.circularity_max)
                    .contains(&circularity)
                    .then_some(AnchorCandidate {
                        center: c.centroid,
                        area: c.area,
                        circularity,
                    })
            })
            .collect()
    }

    /// First window of four area-sorted candidates with similar sizes that
    /// also looks like dark discs on paper.
    fn select_group(
        &self,
        gray: &GrayImageView<'_>,
        sorted: &[AnchorCandidate],
    ) -> Option<[Point2<f32>; 4]> {
        sorted.windows(4).find_map(|win| {
            let min_area = win[0].area as f32;
            let max_area = win[3].area as f32;
            if max_area >= self.params.max_area_ratio * min_area {
                return None;
            }
            let r = self.params.probe_radius_frac * (min_area / std::f32::consts::PI).sqrt();
            win.iter()
                .all(|c| self.looks_like_marker(gray, c.center, r))
                .then(|| [win[0].center, win[1].center, win[2].center, win[3].center])
        })
    }

    fn looks_like_marker(&self, gray: &GrayImageView<'_>, center: Point2<f32>, r: f32) -> bool {
        let probe = |x: f32, y: f32| gray.get(x.round() as i32, y.round() as i32);
        let (Some(inner), Some(outer)) =
            (probe(center.x, center.y), probe(center.x + r, center.y + r))
        else {
            return false;
        };
        inner < self.params.dark_max && outer > self.params.light_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(w: usize, h: usize, discs: &[(f32, f32, f32)]) -> GrayImage {
        let mut img = GrayImage::filled(w, h, 255);
        for y in 0..h {
            for x in 0..w {
                let dark = discs.iter().any(|&(cx, cy, r)| {
                    let (dx, dy) = (x as f32 - cx, y as f32 - cy);
                    dx * dx + dy * dy <= r * r
                });
                if dark {
                    img.set(x, y, 0);
                }
            }
        }
        img
    }

    #[test]
    fn blank_frame_reports_not_found() {
        let img = GrayImage::filled(80, 60, 255);
        let err = AnchorDetector::default()
            .find_anchors_gray(&img.view())
            .unwrap_err();
        assert_eq!(err, AnchorError::NotFound { candidates: 0 });
    }

    #[test]
    fn three_markers_are_not_enough() {
        let img = sheet(
            160,
            120,
            &[(30.0, 25.0, 8.4), (130.0, 25.0, 8.4), (130.0, 95.0, 8.4)],
        );
        let err = AnchorDetector::default()
            .find_anchors_gray(&img.view())
            .unwrap_err();
        assert_eq!(err, AnchorError::NotFound { candidates: 3 });
    }

    #[test]
    fn mismatched_sizes_are_not_grouped() {
        let img = sheet(
            200,
            160,
            &[
                (30.0, 30.0, 7.0),
                (170.0, 30.0, 7.0),
                (170.0, 130.0, 7.0),
                (30.0, 130.0, 12.0),
            ],
        );
        let det = AnchorDetector::default();
        assert_eq!(det.detect_candidates(&img.view()).len(), 4);
        assert!(det.find_anchors_gray(&img.view()).is_err());
    }
}
