use serde::Serialize;

/// A bounded slice of the concatenated page text.
///
/// `start` is the character offset of the segment in the concatenated text and
/// `overlap` is the number of leading characters repeated from the previous
/// segment (always 0 for the first one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub index: usize,
    pub text: String,
    pub start: usize,
    pub overlap: usize,
}

impl Segment {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// The part of this segment not already covered by its predecessor.
    #[cfg(test)]
    pub fn fresh_text(&self) -> &str {
        match self.text.char_indices().nth(self.overlap) {
            Some((byte, _)) => &self.text[byte..],
            None => "",
        }
    }
}

/// Rebuilds the source text from an ordered run of segments by dropping each
/// segment's overlap prefix.
#[cfg(test)]
pub fn reconstruct(segments: &[Segment]) -> String {
    segments.iter().map(Segment::fresh_text).collect()
}
