/// Errors returned by the anchor detector.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AnchorError {
    /// No group of four circular markers passed validation.
    #[error("anchors not found ({candidates} circular candidates)")]
    NotFound { candidates: usize },
    /// Four points could not be assigned to distinct sheet corners.
    #[error("anchor corners are ambiguous")]
    AmbiguousOrder,
}
