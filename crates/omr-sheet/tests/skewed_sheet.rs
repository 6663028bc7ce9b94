use std::collections::BTreeMap;

use approx::assert_abs_diff_eq;
use nalgebra::Point2;
use omr_anchor::AnchorDetector;
use omr_core::{homography_from_4pt, GrayImage, Homography};
use omr_sheet::{
    AnswerKey, Bubble, BubbleReader, Layout, PerspectiveAligner, QuestionBook, QuestionId,
    QuestionState, TemporalStabilizer,
};

const W: usize = 320;
const H: usize = 240;
const FRAME_ANCHORS: [(f32, f32); 4] = [(50.0, 40.0), (270.0, 55.0), (262.0, 212.0), (42.0, 196.0)];
const ANCHOR_RADIUS: f32 = 8.4;

fn layout() -> Layout {
    let rows = [("Q1", 60.0), ("Q2", 100.0), ("Q3", 140.0)];
    let blocks = rows
        .iter()
        .map(|&(id, y)| {
            let bubbles = ["A", "B", "C", "D"]
                .iter()
                .enumerate()
                .map(|(i, v)| Bubble {
                    x: 60.0 + 30.0 * i as f32,
                    y,
                    width: 8.0,
                    height: 8.0,
                    value: (*v).into(),
                })
                .collect();
            (QuestionId::from(id), bubbles)
        })
        .collect::<BTreeMap<_, _>>();
    Layout::new(
        [
            Point2::new(20.0, 20.0),
            Point2::new(220.0, 20.0),
            Point2::new(220.0, 180.0),
            Point2::new(20.0, 180.0),
        ],
        blocks,
    )
    .expect("layout")
}

/// Camera view of the sheet: anchors drawn as discs, marked bubbles
/// projected through the ground-truth perspective.
fn render(layout: &Layout, marked: &[(&str, &str)]) -> GrayImage {
    let (cw, ch) = layout.content_size();
    let content = [
        Point2::new(0.0, 0.0),
        Point2::new(cw, 0.0),
        Point2::new(cw, ch),
        Point2::new(0.0, ch),
    ];
    let frame = FRAME_ANCHORS.map(|(x, y)| Point2::new(x, y));
    let content_from_frame: Homography = homography_from_4pt(&frame, &content).expect("solvable");
    let offset = layout.content_offset();

    let rects: Vec<&Bubble> = marked
        .iter()
        .flat_map(|&(id, value)| {
            layout
                .bubbles(&QuestionId::from(id))
                .iter()
                .filter(move |b| b.value == value)
        })
        .collect();

    let mut img = GrayImage::filled(W, H, 255);
    for y in 0..H {
        for x in 0..W {
            let c = content_from_frame.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
            let (px, py) = (c.x + offset.x, c.y + offset.y);
            let in_bubble = rects
                .iter()
                .any(|b| px >= b.x && px < b.x + b.width && py >= b.y && py < b.y + b.height);
            let in_anchor = FRAME_ANCHORS.iter().any(|&(ax, ay)| {
                let (dx, dy) = (x as f32 - ax, y as f32 - ay);
                dx * dx + dy * dy <= ANCHOR_RADIUS * ANCHOR_RADIUS
            });
            if in_bubble || in_anchor {
                img.set(x, y, 0);
            }
        }
    }
    img
}

#[test]
fn skewed_frame_is_rectified_before_reading() {
    let layout = layout();
    let frame = render(&layout, &[("Q1", "A"), ("Q3", "C"), ("Q3", "D")]);

    let quad = AnchorDetector::default()
        .find_anchors_gray(&frame.view())
        .expect("anchors");
    for (got, want) in quad.to_array().iter().zip(FRAME_ANCHORS) {
        assert_abs_diff_eq!(got.x, want.0, epsilon = 0.5);
        assert_abs_diff_eq!(got.y, want.1, epsilon = 0.5);
    }

    let alignment = PerspectiveAligner::align(&quad, &layout).expect("aligned");
    let aligned = alignment.warp_to_content(&frame.view());
    assert_eq!((aligned.width, aligned.height), (200, 160));

    let fills = BubbleReader::default().measure(&aligned.view(), &layout, alignment.content_offset);
    let ratio = |q: &str, v: &str| {
        fills[&QuestionId::from(q)]
            .iter()
            .find(|f| f.value == v)
            .map(|f| f.ratio)
            .expect("option")
    };
    assert!(ratio("Q1", "A") > 0.8);
    assert!(ratio("Q3", "C") > 0.8);
    assert!(ratio("Q3", "D") > 0.8);
    for (q, v) in [("Q1", "B"), ("Q2", "A"), ("Q2", "B"), ("Q3", "A")] {
        assert!(ratio(q, v) < 0.1, "{q}{v} = {}", ratio(q, v));
    }
}

#[test]
fn stable_frames_grade_the_sheet() {
    let layout = layout();
    let frame = render(&layout, &[("Q1", "A"), ("Q3", "C"), ("Q3", "D")]);
    let key = AnswerKey::from_json(r#"{"Q1": "A", "Q2": "B", "Q3": "C"}"#).expect("key");

    let detector = AnchorDetector::default();
    let reader = BubbleReader::default();
    let stabilizer = TemporalStabilizer::default();
    let mut book = QuestionBook::new(&layout, &key);

    let quad = detector.find_anchors_gray(&frame.view()).expect("anchors");
    let alignment = PerspectiveAligner::align(&quad, &layout).expect("aligned");
    let fills = reader.measure(
        &alignment.warp_to_content(&frame.view()).view(),
        &layout,
        alignment.content_offset,
    );

    let mut confirmed_at = None;
    for frame_no in 1..=20 {
        if !book.observe_frame(&stabilizer, &fills).is_empty() {
            confirmed_at.get_or_insert(frame_no);
        }
    }
    assert_eq!(confirmed_at, Some(15));

    let results = book.results(&stabilizer);
    let state = |q: &str| results[&QuestionId::from(q)].status;
    assert_eq!(state("Q1"), QuestionState::Correct);
    assert_eq!(state("Q2"), QuestionState::Incorrect);
    assert_eq!(state("Q3"), QuestionState::Nullified);
    assert_eq!(results[&QuestionId::from("Q3")].detected_answer, "CD");
}
