// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Bidirectional text support

use super::line::Line;
use crate::request::Direction;
use std::fmt;
use unicode_bidi::{BidiInfo, Level};

/// A paragraph's char range (inclusive) and base level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Paragraph {
    pub start: usize,
    pub end: usize,
    pub level: Level,
}

/// Embedding levels of a whole text, one per char
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmbeddingLevels {
    pub levels: Vec<Level>,
    pub paragraphs: Vec<Paragraph>,
}

impl EmbeddingLevels {
    /// True if char `index` is right-to-left
    #[inline]
    pub fn is_rtl(&self, index: usize) -> bool {
        self.levels.get(index).is_some_and(|l| l.is_rtl())
    }

    /// Base level of the paragraph containing char `index`
    pub fn paragraph_level(&self, index: usize) -> Level {
        self.paragraphs
            .iter()
            .find(|p| p.start <= index && index <= p.end)
            .map(|p| p.level)
            .unwrap_or_else(Level::ltr)
    }
}

/// Bidi algorithm collaborator
///
/// All indices are char indices.
pub trait BidiProvider: fmt::Debug {
    /// Resolve embedding levels for `text`
    fn embedding_levels(&self, text: &str, direction: Direction) -> EmbeddingLevels;

    /// Segments of the line `start..=end` to reverse, in order
    ///
    /// Each segment is an inclusive char range. Reversing each in turn (as
    /// a mirror image around its own extent) yields visual order.
    fn reorder_segments(
        &self,
        text: &str,
        levels: &EmbeddingLevels,
        start: usize,
        end: usize,
    ) -> Vec<(usize, usize)>;

    /// The mirrored form of `c` (e.g. `(` → `)`), if any
    fn mirrored(&self, c: char) -> Option<char>;
}

/// [`BidiProvider`] using `unicode-bidi` and `unicode-bidi-mirroring`
#[derive(Clone, Copy, Debug, Default)]
pub struct UnicodeBidi;

/// UAX #9 rule L1: chars reset to the paragraph level at a line end
fn is_l1_reset(c: char) -> bool {
    matches!(c, '\t' | '\u{0B}' | '\u{1F}' | '\u{2029}')
}

impl BidiProvider for UnicodeBidi {
    fn embedding_levels(&self, text: &str, direction: Direction) -> EmbeddingLevels {
        let default_level = match direction {
            Direction::Auto => None,
            Direction::Ltr => Some(Level::ltr()),
            Direction::Rtl => Some(Level::rtl()),
        };
        let info = BidiInfo::new(text, default_level);

        // unicode-bidi reports levels per byte
        let mut char_of_byte = vec![0; text.len() + 1];
        let mut levels = Vec::with_capacity(text.len());
        for (n, (i, c)) in text.char_indices().enumerate() {
            char_of_byte[i..i + c.len_utf8()].fill(n);
            levels.push(info.levels[i]);
        }
        char_of_byte[text.len()] = levels.len();

        let paragraphs = info
            .paragraphs
            .iter()
            .filter(|p| !p.range.is_empty())
            .map(|p| Paragraph {
                start: char_of_byte[p.range.start],
                end: char_of_byte[p.range.end - 1],
                level: p.level,
            })
            .collect();

        EmbeddingLevels { levels, paragraphs }
    }

    fn reorder_segments(
        &self,
        text: &str,
        levels: &EmbeddingLevels,
        start: usize,
        end: usize,
    ) -> Vec<(usize, usize)> {
        let end = end.min(levels.levels.len().saturating_sub(1));
        if levels.levels.is_empty() || start > end {
            return vec![];
        }
        let para_level = levels.paragraph_level(start).number();
        let mut line: Vec<u8> = levels.levels[start..=end].iter().map(|l| l.number()).collect();

        // L1: trailing whitespace, and whitespace before separators, takes
        // the paragraph level
        let mut trailing = true;
        let chars: Vec<char> = text.chars().skip(start).take(line.len()).collect();
        for (i, c) in chars.iter().enumerate().rev() {
            if is_l1_reset(*c) {
                line[i] = para_level;
                trailing = true;
            } else if trailing && c.is_whitespace() {
                line[i] = para_level;
            } else {
                trailing = false;
            }
        }

        let max_level = line.iter().copied().max().unwrap_or(0);
        let lowest_odd = line.iter().map(|l| l | 1).min().unwrap_or(1);

        // L2: from the highest level down to the lowest odd level, reverse
        // every run at that level or higher
        let mut segments = vec![];
        let mut level = max_level;
        while level >= lowest_odd {
            let mut i = 0;
            while i < line.len() {
                if line[i] >= level {
                    let seg_start = i;
                    while i + 1 < line.len() && line[i + 1] >= level {
                        i += 1;
                    }
                    if i > seg_start {
                        segments.push((start + seg_start, start + i));
                    }
                }
                i += 1;
            }
            level -= 1;
        }
        segments
    }

    fn mirrored(&self, c: char) -> Option<char> {
        unicode_bidi_mirroring::get_mirrored(c)
    }
}

/// Apply reorder segments to a line's glyph positions
///
/// Each segment's glyphs are mirrored around the extent of the segment's
/// glyphs, excluding the line's trailing whitespace.
pub(crate) fn reorder_line(line: &mut Line, segments: &[(usize, usize)]) {
    let trailing = line.trailing_space_start();
    for &(start, end) in segments {
        let Some(first) = line.glyphs.iter().position(|g| g.char_index >= start) else {
            continue;
        };
        let last = line.glyphs[first..]
            .iter()
            .position(|g| g.char_index > end)
            .map(|n| first + n)
            .unwrap_or(line.len());

        let mut left = f32::INFINITY;
        let mut right = f32::NEG_INFINITY;
        for g in &line.glyphs[first..last.min(trailing.max(first))] {
            left = left.min(g.x);
            right = right.max(g.right());
        }
        if left > right {
            continue;
        }
        for g in &mut line.glyphs[first..last] {
            g.x = right - (g.right() - left);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(text: &str, dir: Direction) -> Vec<u8> {
        UnicodeBidi
            .embedding_levels(text, dir)
            .levels
            .iter()
            .map(|l| l.number())
            .collect()
    }

    #[test]
    fn levels_per_char() {
        // Hebrew letters are two bytes each
        assert_eq!(levels("ab אב", Direction::Auto), [0, 0, 0, 1, 1]);
        assert_eq!(levels("אב ab", Direction::Auto), [1, 1, 1, 2, 2]);
        assert_eq!(levels("ab", Direction::Rtl), [2, 2]);
    }

    #[test]
    fn paragraphs() {
        let text = "ab\nאב";
        let levels = UnicodeBidi.embedding_levels(text, Direction::Auto);
        assert_eq!(levels.paragraphs.len(), 2);
        assert_eq!(levels.paragraph_level(1), Level::ltr());
        assert_eq!(levels.paragraph_level(3), Level::rtl());
        assert!(levels.is_rtl(4));
    }

    #[test]
    fn segments() {
        let text = "ab אבג";
        let levels = UnicodeBidi.embedding_levels(text, Direction::Auto);
        let segs = UnicodeBidi.reorder_segments(text, &levels, 0, 5);
        assert_eq!(segs, [(3, 5)]);

        // Trailing whitespace takes the paragraph level
        let text = "אבג ";
        let levels = UnicodeBidi.embedding_levels(text, Direction::Auto);
        let segs = UnicodeBidi.reorder_segments(text, &levels, 0, 3);
        assert_eq!(segs, [(0, 3)]);
        let text = "ab ";
        let levels = UnicodeBidi.embedding_levels(text, Direction::Auto);
        assert!(UnicodeBidi.reorder_segments(text, &levels, 0, 2).is_empty());
    }

    #[test]
    fn mirroring() {
        assert_eq!(UnicodeBidi.mirrored('('), Some(')'));
        assert_eq!(UnicodeBidi.mirrored('a'), None);
    }
}
