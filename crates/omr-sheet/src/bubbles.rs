use std::collections::BTreeMap;

use nalgebra::Point2;
use omr_core::{adaptive_threshold_mean_inv, GrayImage, GrayImageView};
use serde::{Deserialize, Serialize};

use crate::{Bubble, Layout, QuestionId};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Bubble binarization and fill-counting parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BubbleParams {
    /// Adaptive-threshold window side, in pixels.
    pub block_size: usize,
    /// Offset subtracted from the local mean.
    pub threshold_c: f32,
    /// Mask value above which a pixel counts as filled.
    pub fill_pixel_min: u8,
}

impl Default for BubbleParams {
    fn default() -> Self {
        Self {
            block_size: 21,
            threshold_c: 5.0,
            fill_pixel_min: 128,
        }
    }
}

/// Fill ratio of a single option bubble.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionFill {
    pub value: String,
    /// Fraction of dark pixels in the bubble, in `[0, 1]`.
    pub ratio: f32,
}

/// Per-question option fills, options in layout order.
pub type FillingData = BTreeMap<QuestionId, Vec<OptionFill>>;

/// Stateless fill measurement over an aligned content image.
#[derive(Clone, Debug, Default)]
pub struct BubbleReader {
    params: BubbleParams,
}

impl BubbleReader {
    pub fn new(params: BubbleParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BubbleParams {
        &self.params
    }

    /// Inverted adaptive threshold of the aligned frame (ink = 255).
    pub fn binarize(&self, aligned: &GrayImageView<'_>) -> GrayImage {
        adaptive_threshold_mean_inv(aligned, self.params.block_size, self.params.threshold_c)
    }

    /// Fill ratios of every bubble in `layout`, measured on an already
    /// binarized content-space image.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, binary, layout), fields(questions = layout.questions().count()))
    )]
    pub fn read(
        &self,
        binary: &GrayImageView<'_>,
        layout: &Layout,
        content_offset: Point2<f32>,
    ) -> FillingData {
        layout
            .field_blocks()
            .map(|(id, bubbles)| {
                let fills = bubbles
                    .iter()
                    .map(|b| OptionFill {
                        value: b.value.clone(),
                        ratio: self.fill_ratio(binary, b, content_offset),
                    })
                    .collect();
                (id.clone(), fills)
            })
            .collect()
    }

    /// Binarize then [`read`](Self::read).
    pub fn measure(
        &self,
        aligned: &GrayImageView<'_>,
        layout: &Layout,
        content_offset: Point2<f32>,
    ) -> FillingData {
        let binary = self.binarize(aligned);
        self.read(&binary.view(), layout, content_offset)
    }

    /// Fraction of filled pixels inside the bubble's ROI.
    ///
    /// ROIs that are empty or leave the image read as `0`.
    pub fn fill_ratio(
        &self,
        binary: &GrayImageView<'_>,
        bubble: &Bubble,
        content_offset: Point2<f32>,
    ) -> f32 {
        let x0 = (bubble.x - content_offset.x).floor();
        let y0 = (bubble.y - content_offset.y).floor();
        let w = bubble.width.round();
        let h = bubble.height.round();
        if !(w >= 1.0 && h >= 1.0)
            || x0 < 0.0
            || y0 < 0.0
            || x0 + w > binary.width as f32
            || y0 + h > binary.height as f32
        {
            return 0.0;
        }
        let (x0, y0, w, h) = (x0 as usize, y0 as usize, w as usize, h as usize);

        let filled: usize = (y0..y0 + h)
            .map(|y| {
                let row = &binary.data[y * binary.width + x0..y * binary.width + x0 + w];
                row.iter().filter(|&&v| v > self.params.fill_pixel_min).count()
            })
            .sum();
        filled as f32 / (w * h) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bubble(x: f32, y: f32, w: f32, h: f32) -> Bubble {
        Bubble {
            x,
            y,
            width: w,
            height: h,
            value: "A".into(),
        }
    }

    /// Binary mask with the first `n` pixels of a 10×10 block at (5,5) set.
    fn partially_filled(n: usize) -> GrayImage {
        let mut img = GrayImage::filled(20, 20, 0);
        for i in 0..n {
            img.set(5 + i % 10, 5 + i / 10, 255);
        }
        img
    }

    #[test]
    fn full_and_blank_bubbles() {
        let reader = BubbleReader::default();
        let b = bubble(5.0, 5.0, 10.0, 10.0);
        let origin = Point2::new(0.0, 0.0);
        let full = partially_filled(100);
        let blank = partially_filled(0);
        assert!((reader.fill_ratio(&full.view(), &b, origin) - 1.0).abs() < 1e-6);
        assert!(reader.fill_ratio(&blank.view(), &b, origin).abs() < 1e-6);
    }

    #[test]
    fn ratio_grows_with_filled_fraction() {
        let reader = BubbleReader::default();
        let b = bubble(5.0, 5.0, 10.0, 10.0);
        let origin = Point2::new(0.0, 0.0);
        let ratios: Vec<f32> = (0..=100)
            .step_by(10)
            .map(|n| reader.fill_ratio(&partially_filled(n).view(), &b, origin))
            .collect();
        assert!(ratios.windows(2).all(|w| w[0] < w[1]), "{ratios:?}");
        assert!((ratios[5] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn content_offset_shifts_the_roi() {
        let reader = BubbleReader::default();
        let full = partially_filled(100);
        // page (25,25) minus offset (20,20) lands on the filled block
        let b = bubble(25.0, 25.0, 10.0, 10.0);
        let ratio = reader.fill_ratio(&full.view(), &b, Point2::new(20.0, 20.0));
        assert!((ratio - 1.0).abs() < 1e-6);
    }

    #[test]
    fn out_of_image_rois_read_as_zero() {
        let reader = BubbleReader::default();
        let full = GrayImage::filled(20, 20, 255);
        let origin = Point2::new(0.0, 0.0);
        assert_eq!(reader.fill_ratio(&full.view(), &bubble(-2.0, 3.0, 5.0, 5.0), origin), 0.0);
        assert_eq!(reader.fill_ratio(&full.view(), &bubble(16.0, 3.0, 5.0, 5.0), origin), 0.0);
        assert_eq!(reader.fill_ratio(&full.view(), &bubble(3.0, 3.0, 0.2, 5.0), origin), 0.0);
        assert_eq!(reader.fill_ratio(&full.view(), &bubble(15.0, 15.0, 5.0, 5.0), origin), 1.0);
    }

    #[test]
    fn huge_rois_read_as_zero() {
        let layout = Layout::from_json(
            r#"{
                "anchors": [{"x": 0, "y": 0}, {"x": 20, "y": 0}, {"x": 20, "y": 20}, {"x": 0, "y": 20}],
                "fieldBlocks": {"Q1": {"bubbleCoordinates": [
                    {"x": 10, "y": 10, "width": 1e20, "height": 8, "value": "A"},
                    {"x": 1e20, "y": 1e20, "width": 4, "height": 4, "value": "B"}
                ]}}
            }"#,
        )
        .expect("layout");
        let q1 = layout.bubbles(&QuestionId::from("Q1"));
        assert_eq!(q1.len(), 2);

        let reader = BubbleReader::default();
        let full = GrayImage::filled(20, 20, 255);
        for b in q1 {
            assert_eq!(reader.fill_ratio(&full.view(), b, layout.content_offset()), 0.0);
        }
        let data = reader.read(&full.view(), &layout, layout.content_offset());
        assert!(data[&QuestionId::from("Q1")].iter().all(|f| f.ratio == 0.0));
    }

    #[test]
    fn measure_thresholds_dark_ink() {
        let mut aligned = GrayImage::filled(60, 40, 250);
        for y in 10..18 {
            for x in 10..18 {
                aligned.set(x, y, 10);
            }
        }
        let mut blocks = BTreeMap::new();
        blocks.insert(
            QuestionId::from("Q1"),
            vec![
                Bubble {
                    value: "A".into(),
                    ..bubble(10.0, 10.0, 8.0, 8.0)
                },
                Bubble {
                    value: "B".into(),
                    ..bubble(30.0, 10.0, 8.0, 8.0)
                },
            ],
        );
        let layout = Layout::new(
            [
                Point2::new(0.0, 0.0),
                Point2::new(60.0, 0.0),
                Point2::new(60.0, 40.0),
                Point2::new(0.0, 40.0),
            ],
            blocks,
        )
        .expect("layout");

        let data =
            BubbleReader::default().measure(&aligned.view(), &layout, layout.content_offset());
        let q1 = &data[&QuestionId::from("Q1")];
        assert_eq!(q1[0].value, "A");
        assert!(q1[0].ratio > 0.9, "{}", q1[0].ratio);
        assert_eq!(q1[1].ratio, 0.0);
    }
}
