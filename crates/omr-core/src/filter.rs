//! Pixel filters used by the anchor and bubble stages.
//!
//! Blur and threshold work on plain row-major 8-bit buffers and clamp their
//! support windows to the image. The morphological close goes through
//! `imageproc`.

use imageproc::distance_transform::Norm;
use imageproc::morphology;

use crate::{GrayImage, GrayImageView};

#[cfg(feature = "tracing")]
use tracing::instrument;

const BLUR_KERNEL: [u32; 5] = [1, 4, 6, 4, 1];
const BLUR_NORM: u32 = 16;

/// Separable 5-tap Gaussian blur (`[1,4,6,4,1] / 16`), horizontal then vertical.
///
/// Borders replicate the edge pixel.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src), fields(width = src.width, height = src.height))
)]
pub fn gaussian_blur_5(src: &GrayImageView<'_>) -> GrayImage {
    let (w, h) = (src.width, src.height);
    let mut tmp = vec![0u32; w * h];
    for y in 0..h {
        let row = &src.data[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0u32;
            for (k, &kv) in BLUR_KERNEL.iter().enumerate() {
                let xx = (x as i64 + k as i64 - 2).clamp(0, w as i64 - 1) as usize;
                acc += kv * row[xx] as u32;
            }
            tmp[y * w + x] = acc;
        }
    }

    let mut out = vec![0u8; w * h];
    let norm = BLUR_NORM * BLUR_NORM;
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0u32;
            for (k, &kv) in BLUR_KERNEL.iter().enumerate() {
                let yy = (y as i64 + k as i64 - 2).clamp(0, h as i64 - 1) as usize;
                acc += kv * tmp[yy * w + x];
            }
            out[y * w + x] = ((acc + norm / 2) / norm).min(255) as u8;
        }
    }

    GrayImage {
        width: w,
        height: h,
        data: out,
    }
}

/// Summed-area table with one row/column of zero padding.
struct IntegralImage {
    stride: usize,
    sums: Vec<u64>,
}

impl IntegralImage {
    fn new(src: &GrayImageView<'_>) -> Self {
        let stride = src.width + 1;
        let mut sums = vec![0u64; stride * (src.height + 1)];
        for y in 0..src.height {
            let mut row = 0u64;
            for x in 0..src.width {
                row += src.data[y * src.width + x] as u64;
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self { stride, sums }
    }

    /// Sum over the inclusive rectangle `[x0, x1] × [y0, y1]`.
    #[inline]
    fn rect_sum(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> u64 {
        let s = self.stride;
        self.sums[(y1 + 1) * s + x1 + 1] + self.sums[y0 * s + x0]
            - self.sums[y0 * s + x1 + 1]
            - self.sums[(y1 + 1) * s + x0]
    }
}

/// Inverted mean-adaptive threshold.
///
/// A pixel becomes background (`0`) when `pixel > local_mean - c`, and
/// foreground (`255`) otherwise, so dark ink ends up white in the mask.
/// The `block × block` window is clipped to the image near borders.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src), fields(width = src.width, height = src.height))
)]
pub fn adaptive_threshold_mean_inv(src: &GrayImageView<'_>, block: usize, c: f32) -> GrayImage {
    let (w, h) = (src.width, src.height);
    let r = block.max(1) / 2;
    let integral = IntegralImage::new(src);
    let mut out = vec![0u8; w * h];

    for y in 0..h {
        let y0 = y.saturating_sub(r);
        let y1 = (y + r).min(h - 1);
        for x in 0..w {
            let x0 = x.saturating_sub(r);
            let x1 = (x + r).min(w - 1);
            let n = ((x1 - x0 + 1) * (y1 - y0 + 1)) as f32;
            let mean = integral.rect_sum(x0, y0, x1, y1) as f32 / n;
            let v = src.data[y * w + x] as f32;
            out[y * w + x] = if v > mean - c { 0 } else { 255 };
        }
    }

    GrayImage {
        width: w,
        height: h,
        data: out,
    }
}

/// Morphological close of a 0/255 mask with a 3×3 square: dilate, then
/// erode. Pixels outside the image take no part in either pass.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(src), fields(width = src.width, height = src.height))
)]
pub fn close_3x3(src: &GrayImageView<'_>) -> GrayImage {
    let mask = ::image::GrayImage::from_fn(src.width as u32, src.height as u32, |x, y| {
        ::image::Luma([src.data[y as usize * src.width + x as usize]])
    });
    let closed = morphology::close(&mask, Norm::LInf, 1);
    GrayImage {
        width: src.width,
        height: src.height,
        data: closed.into_raw(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(w: usize, h: usize, x0: usize, y0: usize, side: usize, ink: u8) -> GrayImage {
        let mut img = GrayImage::filled(w, h, 255);
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                img.set(x, y, ink);
            }
        }
        img
    }

    #[test]
    fn blur_preserves_flat_images() {
        let img = GrayImage::filled(9, 7, 173);
        let out = gaussian_blur_5(&img.view());
        assert!(out.data.iter().all(|&v| v == 173));
    }

    #[test]
    fn blur_softens_a_step_edge() {
        let mut img = GrayImage::filled(8, 1, 0);
        for x in 4..8 {
            img.set(x, 0, 255);
        }
        let out = gaussian_blur_5(&img.view());
        assert_eq!(out.data[0], 0);
        assert_eq!(out.data[7], 255);
        // taps +1,+2 hit the bright side: (4 + 1) / 16 * 255
        assert_eq!(out.data[3], 80);
        assert_eq!(out.data[4], 175);
    }

    #[test]
    fn adaptive_threshold_marks_dark_ink_as_foreground() {
        let img = square(40, 40, 15, 15, 8, 0);
        let mask = adaptive_threshold_mean_inv(&img.view(), 21, 5.0);
        assert_eq!(mask.data[19 * 40 + 19], 255);
        assert_eq!(mask.data[2 * 40 + 2], 0);
        let fg = mask.data.iter().filter(|&&v| v == 255).count();
        assert_eq!(fg, 64);
    }

    #[test]
    fn adaptive_threshold_ignores_uniform_regions() {
        let img = GrayImage::filled(30, 30, 40);
        let mask = adaptive_threshold_mean_inv(&img.view(), 21, 5.0);
        assert!(mask.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn close_fills_single_pixel_gaps() {
        let mut mask = GrayImage::filled(12, 12, 0);
        for y in 3..9 {
            for x in 3..9 {
                mask.set(x, y, 255);
            }
        }
        mask.set(5, 5, 0);
        let closed = close_3x3(&mask.view());
        assert_eq!(closed.data[5 * 12 + 5], 255);
        assert_eq!(closed.data[0], 0);
        assert_eq!(closed.data[2 * 12 + 2], 0);
    }

    #[test]
    fn close_keeps_blobs_touching_the_border() {
        let mut mask = GrayImage::filled(10, 8, 0);
        for y in 0..4 {
            for x in 0..4 {
                mask.set(x, y, 255);
            }
        }
        mask.set(9, 7, 255);
        let closed = close_3x3(&mask.view());
        assert_eq!(closed.width, 10);
        assert_eq!(closed.height, 8);
        let fg: Vec<usize> = (0..closed.data.len()).filter(|&i| closed.data[i] == 255).collect();
        let mut want: Vec<usize> = (0..4).flat_map(|y| (0..4).map(move |x| y * 10 + x)).collect();
        want.push(7 * 10 + 9);
        assert_eq!(fg, want);
    }
}
