//! Segmenter: splits extracted page text into bounded, overlapping segments.
//!
//! Recursive separator splitting: the text is split on the first separator in
//! priority order that occurs in it, the pieces are greedily merged up to
//! `chunk_size` characters, and any piece that is still too long is split
//! again with the remaining separators. Separators stay attached to the end
//! of the piece they trail and nothing is stripped, so segments minus their
//! overlap prefixes concatenate back to the input.
//!
//! All sizes are counted in characters, not bytes.

use std::collections::VecDeque;
use std::ops::Range;

use tracing::debug;

use crate::errors::ConfigurationError;
use crate::models::document::Page;
use crate::models::segment::Segment;

/// Paragraph, line, sentence, word, character.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

#[derive(Debug, Clone)]
pub struct Segmenter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Segmenter {
    /// Fails fast on `chunk_size == 0` or `chunk_overlap >= chunk_size`.
    pub fn new(
        chunk_size: usize,
        chunk_overlap: usize,
        separators: Vec<String>,
    ) -> Result<Self, ConfigurationError> {
        if chunk_size == 0 {
            return Err(ConfigurationError::ChunkSizeZero);
        }
        if chunk_overlap >= chunk_size {
            return Err(ConfigurationError::OverlapTooLarge {
                chunk_size,
                chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators,
        })
    }

    pub fn with_default_separators(
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Self, ConfigurationError> {
        Self::new(
            chunk_size,
            chunk_overlap,
            DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        )
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Concatenates the pages in order and segments the result.
    pub fn segment(&self, pages: &[Page]) -> Vec<Segment> {
        let text: String = pages.iter().map(|p| p.text.as_str()).collect();
        self.segment_text(&text)
    }

    pub fn segment_text(&self, text: &str) -> Vec<Segment> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut spans = Vec::new();
        self.split_recursive(text, 0..text.len(), &self.separators, &mut spans);

        let segments = to_segments(text, &spans);
        debug!(
            "Segmented {} chars into {} segments (chunk_size={}, chunk_overlap={})",
            text.chars().count(),
            segments.len(),
            self.chunk_size,
            self.chunk_overlap
        );
        segments
    }

    fn split_recursive(
        &self,
        text: &str,
        span: Range<usize>,
        separators: &[String],
        out: &mut Vec<Range<usize>>,
    ) {
        let (separator, remaining) = pick_separator(&text[span.clone()], separators);

        let pieces = match separator {
            Some(sep) => split_keep_end(text, span, sep),
            None => vec![span],
        };

        let mut fitting: Vec<Range<usize>> = Vec::new();
        for piece in pieces {
            if char_len(text, &piece) <= self.chunk_size {
                fitting.push(piece);
                continue;
            }

            if !fitting.is_empty() {
                out.extend(self.merge(text, &fitting));
                fitting.clear();
            }

            if remaining.is_empty() {
                out.extend(hard_cut(text, piece, self.chunk_size, self.chunk_overlap));
            } else {
                self.split_recursive(text, piece, remaining, out);
            }
        }

        if !fitting.is_empty() {
            out.extend(self.merge(text, &fitting));
        }
    }

    /// Greedily joins adjacent pieces into spans of at most `chunk_size`
    /// characters. Each new span starts with the trailing pieces of the
    /// previous one, up to `chunk_overlap` characters.
    fn merge(&self, text: &str, pieces: &[Range<usize>]) -> Vec<Range<usize>> {
        let mut merged = Vec::new();
        let mut window: VecDeque<(Range<usize>, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(text, piece);

            if total + len > self.chunk_size && !window.is_empty() {
                merged.push(window_span(&window));

                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    match window.pop_front() {
                        Some((_, front_len)) => total -= front_len,
                        None => break,
                    }
                }
            }

            window.push_back((piece.clone(), len));
            total += len;
        }

        if !window.is_empty() {
            merged.push(window_span(&window));
        }
        merged
    }
}

/// First separator (in priority order) present in `text`, plus the separators
/// left for recursion. The empty separator always matches.
fn pick_separator<'a>(text: &str, separators: &'a [String]) -> (Option<&'a str>, &'a [String]) {
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            return (Some(sep.as_str()), &[]);
        }
        if text.contains(sep.as_str()) {
            return (Some(sep.as_str()), &separators[i + 1..]);
        }
    }
    (None, &[])
}

/// Splits `span` on `separator`, keeping each separator at the end of the
/// piece before it. An empty separator splits into single characters.
fn split_keep_end(text: &str, span: Range<usize>, separator: &str) -> Vec<Range<usize>> {
    let offset = span.start;
    let slice = &text[span.clone()];

    if separator.is_empty() {
        return slice
            .char_indices()
            .map(|(i, c)| offset + i..offset + i + c.len_utf8())
            .collect();
    }

    let mut pieces = Vec::new();
    let mut last = 0;
    for (i, m) in slice.match_indices(separator) {
        let end = i + m.len();
        pieces.push(offset + last..offset + end);
        last = end;
    }
    if last < slice.len() {
        pieces.push(offset + last..span.end);
    }
    pieces
}

/// Cuts `span` into runs of at most `size` characters. Each run after the
/// first repeats the last `overlap` characters of the one before it.
fn hard_cut(text: &str, span: Range<usize>, size: usize, overlap: usize) -> Vec<Range<usize>> {
    let mut bounds: Vec<usize> = text[span.clone()]
        .char_indices()
        .map(|(i, _)| span.start + i)
        .collect();
    bounds.push(span.end);

    let chars = bounds.len() - 1;
    let step = size - overlap;
    let mut cuts = Vec::new();
    let mut first = 0;

    while first < chars {
        let last = (first + size).min(chars);
        cuts.push(bounds[first]..bounds[last]);
        if last == chars {
            break;
        }
        first += step;
    }
    cuts
}

fn window_span(window: &VecDeque<(Range<usize>, usize)>) -> Range<usize> {
    match (window.front(), window.back()) {
        (Some((first, _)), Some((last, _))) => first.start..last.end,
        _ => 0..0,
    }
}

fn char_len(text: &str, span: &Range<usize>) -> usize {
    text[span.clone()].chars().count()
}

/// Turns ordered byte spans into segments with character offsets and the
/// overlap shared with each predecessor.
fn to_segments(text: &str, spans: &[Range<usize>]) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(spans.len());
    let mut prev_end = 0usize;
    let mut char_offset = 0usize;
    let mut byte_offset = 0usize;

    for (index, span) in spans.iter().enumerate() {
        // Spans are ordered by start, so the char offset advances monotonically.
        char_offset += text[byte_offset..span.start].chars().count();
        byte_offset = span.start;

        let overlap = if index > 0 && span.start < prev_end {
            text[span.start..prev_end.min(span.end)].chars().count()
        } else {
            0
        };

        segments.push(Segment {
            index,
            text: text[span.clone()].to_string(),
            start: char_offset,
            overlap,
        });
        prev_end = span.end;
    }
    segments
}
