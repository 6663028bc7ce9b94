//! Printed answer-sheet layout, as supplied by the exam authoring side.
//!
//! The JSON shape is
//! `{ pageDimensions, bubbleDimensions, anchors: [{x,y}; 4], fieldBlocks: { id: { bubbleCoordinates: [{x,y,width,height,value}] } } }`.
//! Structural problems (anchors) fail the whole load; a broken field block
//! only empties that one question.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use log::warn;
use nalgebra::Point2;
use omr_anchor::{AnchorError, AnchorQuad};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Question identifier as used by the layout and the answer key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub String);

impl QuestionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuestionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
}

/// One answer bubble in page coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bubble {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Option label, e.g. `"A"`.
    pub value: String,
}

impl Bubble {
    fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
            && !self.value.is_empty()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LayoutError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("layout needs exactly 4 anchors, got {got}")]
    AnchorCount { got: usize },
    #[error("layout anchors cannot be ordered into sheet corners")]
    AmbiguousAnchors,
    #[error("anchor rectangle is empty (width={width}, height={height})")]
    EmptyContent { width: f32, height: f32 },
    #[error("anchor rectangle {width}x{height} exceeds {max} px per side", max = MAX_CONTENT_SIDE)]
    OversizedContent { width: f32, height: f32 },
}

impl From<AnchorError> for LayoutError {
    fn from(_: AnchorError) -> Self {
        LayoutError::AmbiguousAnchors
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLayout {
    #[serde(default)]
    page_dimensions: Option<Value>,
    #[serde(default)]
    bubble_dimensions: Option<Value>,
    anchors: Vec<RawPoint>,
    #[serde(default)]
    field_blocks: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
struct RawPoint {
    x: f32,
    y: f32,
}

/// Largest accepted anchor span, in page pixels, on either axis.
pub const MAX_CONTENT_SIDE: f32 = 8192.0;

/// Validated, read-only sheet layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    page_dimensions: Option<Dimensions>,
    bubble_dimensions: Option<Dimensions>,
    anchors: AnchorQuad,
    field_blocks: BTreeMap<QuestionId, Vec<Bubble>>,
}

impl Layout {
    /// Build a layout from canonical anchor positions (any order) and bubbles.
    pub fn new(
        anchors: [Point2<f32>; 4],
        field_blocks: BTreeMap<QuestionId, Vec<Bubble>>,
    ) -> Result<Self, LayoutError> {
        let anchors = AnchorQuad::from_unordered(anchors)?;
        let width = anchors.top_right.x - anchors.top_left.x;
        let height = anchors.bottom_left.y - anchors.top_left.y;
        if !(width > 0.0 && height > 0.0) {
            return Err(LayoutError::EmptyContent { width, height });
        }
        if !(width <= MAX_CONTENT_SIDE && height <= MAX_CONTENT_SIDE) {
            return Err(LayoutError::OversizedContent { width, height });
        }
        Ok(Self {
            page_dimensions: None,
            bubble_dimensions: None,
            anchors,
            field_blocks,
        })
    }

    pub fn with_dimensions(mut self, page: Option<Dimensions>, bubble: Option<Dimensions>) -> Self {
        self.page_dimensions = page;
        self.bubble_dimensions = bubble;
        self
    }

    /// Parse the layout JSON.
    pub fn from_json(raw: &str) -> Result<Self, LayoutError> {
        let raw: RawLayout = serde_json::from_str(raw)?;
        if raw.anchors.len() != 4 {
            return Err(LayoutError::AnchorCount {
                got: raw.anchors.len(),
            });
        }
        let anchors = [0, 1, 2, 3].map(|i| Point2::new(raw.anchors[i].x, raw.anchors[i].y));

        let field_blocks = raw
            .field_blocks
            .into_iter()
            .map(|(id, block)| {
                let bubbles = parse_bubbles(&id, &block);
                (QuestionId(id), bubbles)
            })
            .collect();

        let page = raw.page_dimensions.as_ref().and_then(parse_dimensions);
        let bubble = raw.bubble_dimensions.as_ref().and_then(parse_dimensions);
        Ok(Self::new(anchors, field_blocks)?.with_dimensions(page, bubble))
    }

    /// Load the layout JSON from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, LayoutError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Canonical anchor centres in page coordinates.
    pub fn anchors(&self) -> &AnchorQuad {
        &self.anchors
    }

    /// Page position of the top-left anchor; content space starts here.
    pub fn content_offset(&self) -> Point2<f32> {
        self.anchors.top_left
    }

    /// `(TR.x - TL.x, BL.y - TL.y)`.
    pub fn content_size(&self) -> (f32, f32) {
        (
            self.anchors.top_right.x - self.anchors.top_left.x,
            self.anchors.bottom_left.y - self.anchors.top_left.y,
        )
    }

    pub fn page_dimensions(&self) -> Option<Dimensions> {
        self.page_dimensions
    }

    pub fn bubble_dimensions(&self) -> Option<Dimensions> {
        self.bubble_dimensions
    }

    pub fn questions(&self) -> impl Iterator<Item = &QuestionId> {
        self.field_blocks.keys()
    }

    pub fn contains(&self, id: &QuestionId) -> bool {
        self.field_blocks.contains_key(id)
    }

    /// Bubbles of a question in layout order (empty for unknown or malformed blocks).
    pub fn bubbles(&self, id: &QuestionId) -> &[Bubble] {
        self.field_blocks.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn field_blocks(&self) -> impl Iterator<Item = (&QuestionId, &[Bubble])> {
        self.field_blocks.iter().map(|(id, b)| (id, b.as_slice()))
    }
}

fn parse_bubbles(id: &str, block: &Value) -> Vec<Bubble> {
    let Some(coords) = block.get("bubbleCoordinates") else {
        warn!("question {id}: no bubbleCoordinates, reading as blank");
        return Vec::new();
    };
    let Ok(bubbles) = serde_json::from_value::<Vec<Bubble>>(coords.clone()) else {
        warn!("question {id}: malformed bubbleCoordinates, reading as blank");
        return Vec::new();
    };
    if !bubbles.iter().all(Bubble::is_valid) {
        warn!("question {id}: invalid bubble geometry, reading as blank");
        return Vec::new();
    }
    bubbles
}

fn parse_dimensions(v: &Value) -> Option<Dimensions> {
    if let Ok(d) = serde_json::from_value::<Dimensions>(v.clone()) {
        return Some(d);
    }
    let [width, height] = serde_json::from_value::<[f32; 2]>(v.clone()).ok()?;
    Some(Dimensions { width, height })
}

/// Correct answers keyed by question.
///
/// Empty or `null` entries mark non-gradable items.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerKey(BTreeMap<QuestionId, Option<String>>);

impl AnswerKey {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn insert(&mut self, id: impl Into<QuestionId>, answer: impl Into<String>) {
        self.0.insert(id.into(), Some(answer.into()));
    }

    /// The gradable correct answer, if any.
    pub fn get(&self, id: &QuestionId) -> Option<&str> {
        self.0
            .get(id)
            .and_then(|a| a.as_deref())
            .filter(|a| !a.is_empty())
    }
}

impl<K: Into<QuestionId>, V: Into<String>> FromIterator<(K, V)> for AnswerKey {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut key = AnswerKey::default();
        for (k, v) in iter {
            key.insert(k, v);
        }
        key
    }
}
