use log::debug;
use nalgebra::Point2;
use omr_anchor::AnchorQuad;
use omr_core::{homography_from_4pt, warp_perspective_gray, GrayImage, GrayImageView, Homography};
use serde::{Deserialize, Serialize};

use crate::Layout;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AlignError {
    #[error("detected anchors do not define a valid perspective transform")]
    Degenerate,
}

/// Frame ↔ content-space mapping for one camera frame.
///
/// Content space is the axis-aligned rectangle spanned by the layout
/// anchors, with the top-left anchor at the origin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetAlignment {
    pub content_from_frame: Homography,
    pub frame_from_content: Homography,
    /// Page position of the content origin.
    pub content_offset: Point2<f32>,
    pub content_width: f32,
    pub content_height: f32,
}

impl SheetAlignment {
    /// Pixel size of the aligned image (at least 1×1).
    pub fn content_pixels(&self) -> (usize, usize) {
        (
            (self.content_width.ceil() as usize).max(1),
            (self.content_height.ceil() as usize).max(1),
        )
    }

    /// Rectify `frame` into content space.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(width = frame.width, height = frame.height))
    )]
    pub fn warp_to_content(&self, frame: &GrayImageView<'_>) -> GrayImage {
        let (w, h) = self.content_pixels();
        warp_perspective_gray(frame, &self.frame_from_content, w, h)
    }

    /// Map a content-space point back into the camera frame.
    pub fn frame_point(&self, content: Point2<f32>) -> Point2<f32> {
        self.frame_from_content.apply(content)
    }

    /// Map a page-space point (layout coordinates) into the camera frame.
    pub fn frame_point_from_page(&self, page: Point2<f32>) -> Point2<f32> {
        self.frame_point(Point2::new(
            page.x - self.content_offset.x,
            page.y - self.content_offset.y,
        ))
    }
}

/// Solves the perspective transform between detected anchors and the
/// layout's canonical anchor rectangle.
#[derive(Clone, Copy, Debug, Default)]
pub struct PerspectiveAligner;

impl PerspectiveAligner {
    pub fn align(detected: &AnchorQuad, layout: &Layout) -> Result<SheetAlignment, AlignError> {
        let (cw, ch) = layout.content_size();
        let content = [
            Point2::new(0.0, 0.0),
            Point2::new(cw, 0.0),
            Point2::new(cw, ch),
            Point2::new(0.0, ch),
        ];
        let frame = detected.to_array();

        let content_from_frame =
            homography_from_4pt(&frame, &content).ok_or(AlignError::Degenerate)?;
        let frame_from_content =
            homography_from_4pt(&content, &frame).ok_or(AlignError::Degenerate)?;
        debug!("aligned content {cw}x{ch} from anchors {frame:?}");

        Ok(SheetAlignment {
            content_from_frame,
            frame_from_content,
            content_offset: layout.content_offset(),
            content_width: cw,
            content_height: ch,
        })
    }
}
