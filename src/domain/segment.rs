//! Transcript segments and the editable segment store

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A time-bounded unit of transcribed text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
    pub edited: bool,
}

impl Segment {
    /// Create a segment, clamping `end_ms` up to `start_ms` so the
    /// `start_ms <= end_ms` invariant always holds.
    pub fn new(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms: end_ms.max(start_ms),
            text: text.into(),
            edited: false,
        }
    }
}

/// Error for an edit addressed at a segment that does not exist
#[derive(Debug, Clone, Error)]
#[error("Segment index {index} out of range (store has {len} segments)")]
pub struct IndexError {
    pub index: usize,
    pub len: usize,
}

/// Ordered, user-editable transcript segments.
///
/// Segments are kept sorted by `start_ms`. `replace_all` discards prior
/// edits, so callers holding user edits must confirm before replacing
/// (the orchestrator owns that policy, checked via `has_edits`).
#[derive(Debug, Clone, Default)]
pub struct SegmentStore {
    segments: Vec<Segment>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether any segment carries a user edit
    pub fn has_edits(&self) -> bool {
        self.segments.iter().any(|s| s.edited)
    }

    /// Replace the whole transcript with a fresh job's output.
    ///
    /// Sorts by `start_ms` so the ordering invariant holds regardless of
    /// engine emission order. Any prior edits are discarded.
    pub fn replace_all(&mut self, mut segments: Vec<Segment>) {
        segments.sort_by_key(|s| s.start_ms);
        self.segments = segments;
    }

    /// Edit one segment's text in place, marking it edited
    pub fn apply_edit(&mut self, index: usize, new_text: impl Into<String>) -> Result<(), IndexError> {
        let len = self.segments.len();
        let segment = self.segments.get_mut(index).ok_or(IndexError { index, len })?;
        segment.text = new_text.into();
        segment.edited = true;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Full transcript as plain text, one segment per line
    pub fn as_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_segments() -> Vec<Segment> {
        vec![
            Segment::new(0, 1000, "hello"),
            Segment::new(1000, 2500, "from"),
            Segment::new(2500, 4000, "murmur"),
        ]
    }

    #[test]
    fn new_clamps_end_to_start() {
        let s = Segment::new(500, 100, "x");
        assert_eq!(s.start_ms, 500);
        assert_eq!(s.end_ms, 500);
    }

    #[test]
    fn replace_all_sorts_by_start() {
        let mut store = SegmentStore::new();
        store.replace_all(vec![
            Segment::new(2000, 3000, "b"),
            Segment::new(0, 1000, "a"),
        ]);
        assert_eq!(store.segments()[0].text, "a");
        assert_eq!(store.segments()[1].text, "b");
    }

    #[test]
    fn apply_edit_marks_only_target() {
        let mut store = SegmentStore::new();
        store.replace_all(three_segments());

        store.apply_edit(1, "for").unwrap();

        assert!(!store.segments()[0].edited);
        assert!(store.segments()[1].edited);
        assert_eq!(store.segments()[1].text, "for");
        assert!(!store.segments()[2].edited);
        assert_eq!(store.segments()[0].text, "hello");
        assert_eq!(store.segments()[2].text, "murmur");
    }

    #[test]
    fn apply_edit_out_of_range() {
        let mut store = SegmentStore::new();
        store.replace_all(three_segments());

        let err = store.apply_edit(3, "nope").unwrap_err();
        assert_eq!(err.index, 3);
        assert_eq!(err.len, 3);
    }

    #[test]
    fn apply_edit_on_empty_store() {
        let mut store = SegmentStore::new();
        assert!(store.apply_edit(0, "x").is_err());
    }

    #[test]
    fn has_edits_tracks_replacement() {
        let mut store = SegmentStore::new();
        store.replace_all(three_segments());
        assert!(!store.has_edits());

        store.apply_edit(0, "hi").unwrap();
        assert!(store.has_edits());

        store.replace_all(three_segments());
        assert!(!store.has_edits());
    }

    #[test]
    fn as_text_joins_lines() {
        let mut store = SegmentStore::new();
        store.replace_all(three_segments());
        assert_eq!(store.as_text(), "hello\nfrom\nmurmur");
    }
}
