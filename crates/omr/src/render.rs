//! Audit snapshots taken when every question is confirmed.

use std::path::{Path, PathBuf};

use ::image::{ImageBuffer, Rgba};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_circle_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use nalgebra::Point2;
use omr_anchor::AnchorQuad;
use omr_core::{ImageError, RgbaImage, RgbaImageView};
use omr_sheet::{
    Bubble, Layout, QuestionBook, QuestionState, SheetAlignment, Stats, TrackedQuestion,
};

use crate::io::OmrIoError;

type Canvas = ImageBuffer<Rgba<u8>, Vec<u8>>;

const GREEN: Rgba<u8> = Rgba([0, 200, 0, 255]);
const RED: Rgba<u8> = Rgba([220, 0, 0, 255]);
const ORANGE: Rgba<u8> = Rgba([255, 140, 0, 255]);
const ANCHOR: Rgba<u8> = Rgba([0, 120, 255, 255]);
const PANEL: Rgba<u8> = Rgba([255, 255, 255, 255]);

const PANEL_ORIGIN: (i32, i32) = (4, 4);
const PANEL_WIDTH: u32 = 64;
const BAR_HEIGHT: u32 = 4;
const BAR_STEP: i32 = 6;
const BAR_UNIT: u32 = 8;
const ANCHOR_RADIUS: i32 = 6;

/// Raw frame plus the same frame with the grading overlay.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshots {
    pub raw: RgbaImage,
    pub annotated: RgbaImage,
}

impl Snapshots {
    /// Write `raw.png` and `annotated.png` into `dir`.
    pub fn save_png(&self, dir: impl AsRef<Path>) -> Result<(PathBuf, PathBuf), OmrIoError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let raw = dir.join("raw.png");
        let annotated = dir.join("annotated.png");
        to_canvas(&self.raw)?.save(&raw)?;
        to_canvas(&self.annotated)?.save(&annotated)?;
        Ok((raw, annotated))
    }
}

fn to_canvas(img: &RgbaImage) -> Result<Canvas, OmrIoError> {
    ImageBuffer::from_raw(img.width as u32, img.height as u32, img.data.clone()).ok_or(
        OmrIoError::Buffer(ImageError::InvalidBuffer {
            expected: img.width * img.height * 4,
            got: img.data.len(),
        }),
    )
}

fn from_canvas(canvas: Canvas) -> RgbaImage {
    let (w, h) = canvas.dimensions();
    RgbaImage {
        width: w as usize,
        height: h as usize,
        data: canvas.into_raw(),
    }
}

/// Overlay colour of a bubble, if any.
///
/// The correct option is always green; options forming an incorrect or
/// nullified reading are red or orange.
fn bubble_color(question: &TrackedQuestion, bubble: &Bubble) -> Option<Rgba<u8>> {
    if bubble.value == question.correct_answer {
        return Some(GREEN);
    }
    if !question.status.stable_marks.contains(&bubble.value) {
        return None;
    }
    match question.status.state {
        QuestionState::Incorrect => Some(RED),
        QuestionState::Nullified => Some(ORANGE),
        _ => None,
    }
}

fn draw_bubble(canvas: &mut Canvas, alignment: &SheetAlignment, bubble: &Bubble, color: Rgba<u8>) {
    let corners = [
        (bubble.x, bubble.y),
        (bubble.x + bubble.width, bubble.y),
        (bubble.x + bubble.width, bubble.y + bubble.height),
        (bubble.x, bubble.y + bubble.height),
    ]
    .map(|(x, y)| alignment.frame_point_from_page(Point2::new(x, y)));
    for i in 0..4 {
        let (a, b) = (corners[i], corners[(i + 1) % 4]);
        draw_line_segment_mut(canvas, (a.x, a.y), (b.x, b.y), color);
    }
}

fn draw_stats(canvas: &mut Canvas, stats: &Stats) {
    let (x0, y0) = PANEL_ORIGIN;
    let height = (3 * BAR_STEP) as u32 + BAR_HEIGHT - 2;
    draw_filled_rect_mut(canvas, Rect::at(x0, y0).of_size(PANEL_WIDTH, height), PANEL);
    let max_len = PANEL_WIDTH - 4;
    for (i, (count, color)) in [
        (stats.correct, GREEN),
        (stats.incorrect, RED),
        (stats.nullified, ORANGE),
    ]
    .into_iter()
    .enumerate()
    {
        if count == 0 {
            continue;
        }
        let len = count.saturating_mul(BAR_UNIT).min(max_len);
        let y = y0 + 2 + BAR_STEP * i as i32;
        draw_filled_rect_mut(canvas, Rect::at(x0 + 2, y).of_size(len, BAR_HEIGHT), color);
    }
}

/// Render the raw and annotated snapshots of `frame`.
pub fn render_snapshots(
    frame: &RgbaImageView<'_>,
    layout: &Layout,
    alignment: &SheetAlignment,
    anchors: &AnchorQuad,
    book: &QuestionBook,
    stats: &Stats,
) -> Snapshots {
    let raw = RgbaImage {
        width: frame.width,
        height: frame.height,
        data: frame.data.to_vec(),
    };
    let mut canvas: Canvas = ImageBuffer::from_fn(frame.width as u32, frame.height as u32, |x, y| {
        Rgba(frame.pixel(x as usize, y as usize))
    });

    for question in book.questions() {
        for bubble in layout.bubbles(&question.id) {
            if let Some(color) = bubble_color(question, bubble) {
                draw_bubble(&mut canvas, alignment, bubble, color);
            }
        }
    }
    for p in anchors.to_array() {
        let center = (p.x.round() as i32, p.y.round() as i32);
        draw_hollow_circle_mut(&mut canvas, center, ANCHOR_RADIUS, ANCHOR);
    }
    draw_stats(&mut canvas, stats);

    Snapshots {
        raw,
        annotated: from_canvas(canvas),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omr_sheet::{
        AnswerKey, FillingData, OptionFill, PerspectiveAligner, QuestionId, QuestionStatus,
        TemporalStabilizer,
    };
    use std::collections::BTreeMap;

    fn layout() -> Layout {
        let row = |y: f32| {
            ["A", "B"]
                .iter()
                .enumerate()
                .map(|(i, v)| Bubble {
                    x: 30.0 + 30.0 * i as f32,
                    y,
                    width: 10.0,
                    height: 10.0,
                    value: (*v).into(),
                })
                .collect::<Vec<_>>()
        };
        let blocks = BTreeMap::from([
            (QuestionId::from("Q1"), row(30.0)),
            (QuestionId::from("Q2"), row(60.0)),
        ]);
        Layout::new(
            [
                Point2::new(10.0, 10.0),
                Point2::new(110.0, 10.0),
                Point2::new(110.0, 90.0),
                Point2::new(10.0, 90.0),
            ],
            blocks,
        )
        .expect("layout")
    }

    fn confirmed_book(layout: &Layout) -> (QuestionBook, Stats) {
        let key: AnswerKey = [("Q1", "A"), ("Q2", "B")].into_iter().collect();
        let mut book = QuestionBook::new(layout, &key);
        let marked = |v: &str| OptionFill {
            value: v.into(),
            ratio: if v == "A" { 0.9 } else { 0.0 },
        };
        let fills: FillingData = ["Q1", "Q2"]
            .iter()
            .map(|id| (QuestionId::from(*id), vec![marked("A"), marked("B")]))
            .collect();
        let stabilizer = TemporalStabilizer::default();
        let mut stats = Stats::default();
        for _ in 0..15 {
            for (_, state) in book.observe_frame(&stabilizer, &fills) {
                stats.record(state);
            }
        }
        (book, stats)
    }

    fn pixel(img: &RgbaImage, x: usize, y: usize) -> [u8; 4] {
        img.view().pixel(x, y)
    }

    fn any_near(img: &RgbaImage, x: usize, y: usize, color: Rgba<u8>) -> bool {
        (x - 1..=x + 1).any(|xx| pixel(img, xx, y) == color.0)
    }

    #[test]
    fn overlay_colours_follow_grading() {
        let layout = layout();
        let (book, stats) = confirmed_book(&layout);
        assert_eq!((stats.correct, stats.incorrect), (1, 1));

        let anchors = *layout.anchors();
        let alignment = PerspectiveAligner::align(&anchors, &layout).expect("aligned");
        let frame = RgbaImage::from_raw(120, 100, vec![255; 120 * 100 * 4]).expect("frame");
        let snaps = render_snapshots(&frame.view(), &layout, &alignment, &anchors, &book, &stats);

        assert_eq!(snaps.raw, frame);
        // left edges of the bubbles, halfway down
        assert!(any_near(&snaps.annotated, 30, 35, GREEN), "Q1 A correct");
        assert_eq!(pixel(&snaps.annotated, 60, 35), [255; 4], "Q1 B untouched");
        assert!(any_near(&snaps.annotated, 30, 65, RED), "Q2 A wrong mark");
        assert!(any_near(&snaps.annotated, 60, 65, GREEN), "Q2 B expected");
    }

    #[test]
    fn only_marked_options_are_coloured() {
        let tracked = TrackedQuestion {
            id: QuestionId::from("Q7"),
            correct_answer: "2".into(),
            status: QuestionStatus {
                stable_reading: Some("10".into()),
                stable_marks: vec!["10".into()],
                stable_count: 15,
                state: QuestionState::Incorrect,
            },
        };
        let option = |v: &str| Bubble {
            x: 0.0,
            y: 0.0,
            width: 8.0,
            height: 8.0,
            value: v.into(),
        };
        assert_eq!(bubble_color(&tracked, &option("1")), None);
        assert_eq!(bubble_color(&tracked, &option("0")), None);
        assert_eq!(bubble_color(&tracked, &option("10")), Some(RED));
        assert_eq!(bubble_color(&tracked, &option("2")), Some(GREEN));
    }

    #[test]
    fn stats_panel_draws_one_bar_per_outcome() {
        let layout = layout();
        let (book, stats) = confirmed_book(&layout);
        let anchors = *layout.anchors();
        let alignment = PerspectiveAligner::align(&anchors, &layout).expect("aligned");
        let frame = RgbaImage::from_raw(120, 100, vec![90; 120 * 100 * 4]).expect("frame");
        let snaps = render_snapshots(&frame.view(), &layout, &alignment, &anchors, &book, &stats);

        let img = &snaps.annotated;
        assert_eq!(pixel(img, 7, 7), GREEN.0);
        assert_eq!(pixel(img, 7, 13), RED.0);
        // no nullified questions: panel background only
        assert_eq!(pixel(img, 7, 19), PANEL.0);
        // correct bar is one unit long
        assert_eq!(pixel(img, 7 + BAR_UNIT as usize, 7), PANEL.0);
    }

    #[test]
    fn snapshots_are_written_as_png() {
        let frame = RgbaImage::from_raw(8, 6, vec![128; 8 * 6 * 4]).expect("frame");
        let snaps = Snapshots {
            raw: frame.clone(),
            annotated: frame,
        };
        let dir = tempfile::tempdir().expect("tempdir");
        let (raw, annotated) = snaps.save_png(dir.path().join("out")).expect("save");
        let loaded = ::image::open(&raw).expect("decode").to_rgba8();
        assert_eq!(loaded.dimensions(), (8, 6));
        assert!(annotated.exists());
    }
}
