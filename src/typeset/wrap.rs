// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Line wrapping

use super::line::{GlyphFlags, GlyphLayout, Line};
use crate::fonts::FontRecord;
use crate::request::{OverflowWrap, TypesetRequest};

/// Lines of a text block, before alignment
#[derive(Clone, Debug)]
pub(crate) struct Lines {
    pub lines: Vec<Line>,
    /// Width of the block: the widest line
    pub max_line_width: f32,
}

/// Distribute the glyphs of `request.text` over lines
///
/// Soft wraps happen when a non-whitespace glyph would extend past
/// `max_width`: the line is split after the last break opportunity (or, with
/// [`OverflowWrap::BreakWord`] and no opportunity, before this glyph). A
/// newline char always ends its line; the next starts at `text_indent`.
/// There is always at least one line.
pub(crate) fn break_lines(request: &TypesetRequest, font: &FontRecord, chars: &[char]) -> Lines {
    let dpu = font.metrics().dpu(request.font_size);
    let max_width = request.max_width;
    let letter_spacing = request.letter_spacing * request.font_size;

    let mut lines = vec![Line::default()];
    let mut line_x_offset = request.text_indent;

    font.for_each_glyph(
        &request.text,
        request.font_size,
        request.letter_spacing,
        |visit| {
            let c = chars.get(visit.char_index).copied().unwrap_or('\u{FFFD}');
            let flags = GlyphFlags::classify(c, visit.glyph);
            let width = dpu.to_px(visit.glyph.advance_width);

            let mut line = lines.len() - 1;
            let exceeds = visit.x + width + line_x_offset > max_width;
            if exceeds && !flags.contains(GlyphFlags::WHITESPACE) && !lines[line].is_empty() {
                let cur = &mut lines[line];
                let prev_breaks = cur
                    .glyphs
                    .last()
                    .is_some_and(|g| g.flags.contains(GlyphFlags::BREAK_AFTER));
                let next = if prev_breaks {
                    line_x_offset = -visit.x;
                    Some(Line::default())
                } else if let Some(i) = cur
                    .glyphs
                    .iter()
                    .rposition(|g| g.flags.contains(GlyphFlags::BREAK_AFTER))
                {
                    let (next, shift) = cur.split_off(i + 1);
                    line_x_offset -= shift;
                    Some(next)
                } else if request.overflow_wrap == OverflowWrap::BreakWord {
                    line_x_offset = -visit.x;
                    Some(Line::default())
                } else {
                    None
                };

                if let Some(next) = next {
                    cur.soft_wrapped = true;
                    lines.push(next);
                    line += 1;
                }
            }

            lines[line].push(GlyphLayout {
                glyph: visit.glyph.clone(),
                flags,
                x: visit.x + line_x_offset,
                y: visit.y,
                width,
                char_index: visit.char_index,
            });

            if c == '\n' {
                lines.push(Line::default());
                line_x_offset = request.text_indent - (visit.x + width + letter_spacing);
            }
        },
    );

    let mut max_line_width: f32 = 0.0;
    for line in &mut lines {
        max_line_width = max_line_width.max(line.measure());
    }

    Lines {
        lines,
        max_line_width,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::fonts::mock::MockFont;
    use crate::request::LayoutRequest;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn break_request(request: LayoutRequest) -> Lines {
        let font = FontRecord::new("mock", Arc::new(MockFont::new()));
        let chars: Vec<char> = request.text.chars().collect();
        let request = request.normalize(&EngineConfig::default());
        break_lines(&request, &font, &chars)
    }

    fn lines(text: &str, max_width: f32, break_word: bool) -> Lines {
        break_request(LayoutRequest {
            text: text.into(),
            font_size: 2.0,
            max_width,
            overflow_wrap: match break_word {
                false => OverflowWrap::Normal,
                true => OverflowWrap::BreakWord,
            },
            ..Default::default()
        })
    }

    fn texts(lines: &Lines, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        lines
            .lines
            .iter()
            .map(|l| l.glyphs.iter().map(|g| chars[g.char_index]).collect())
            .collect()
    }

    #[test]
    fn no_wrap_single_line() {
        let text = "aaaa bbbb";
        let l = lines(text, f32::INFINITY, false);
        assert_eq!(l.lines.len(), 1);
        assert_eq!(l.max_line_width, 9.0);
        assert!(!l.lines[0].soft_wrapped);
    }

    #[test]
    fn wraps_at_spaces() {
        // Each glyph is 1 wide
        let text = "aaaa bbbb cccc";
        let l = lines(text, 5.0, false);
        assert_eq!(texts(&l, text), ["aaaa ", "bbbb ", "cccc"]);
        for line in &l.lines {
            assert!(line.width <= 5.0);
            assert_eq!(line.glyphs[0].x, 0.0);
        }
        assert!(l.lines[0].soft_wrapped && l.lines[1].soft_wrapped);
        assert!(!l.lines[2].soft_wrapped);
        assert_eq!(l.lines[0].width, 4.0);
        assert_eq!(l.max_line_width, 4.0);
    }

    #[test]
    fn wraps_after_hyphen() {
        let text = "ab-cdef";
        let l = lines(text, 5.0, false);
        assert_eq!(texts(&l, text), ["ab-", "cdef"]);
        assert_eq!(l.lines[1].glyphs[3].x, 3.0);
    }

    #[test]
    fn long_word_overflows() {
        let text = "abcdefg";
        let l = lines(text, 3.0, false);
        assert_eq!(l.lines.len(), 1);
        assert_eq!(l.max_line_width, 7.0);

        let l = lines(text, 3.0, true);
        assert_eq!(texts(&l, text), ["abc", "def", "g"]);
        assert_eq!(l.lines[2].glyphs[0].x, 0.0);
    }

    #[test]
    fn hard_breaks() {
        let text = "ab\n\ncd";
        let l = lines(text, f32::INFINITY, false);
        assert_eq!(texts(&l, text), ["ab\n", "\n", "cd"]);
        assert_eq!(l.lines[2].glyphs[0].x, 0.0);
        assert!(l.lines.iter().all(|l| !l.soft_wrapped));
        assert_eq!(l.max_line_width, 2.0);
    }

    #[test]
    fn indent_and_letter_spacing() {
        // Glyphs step by 1 + 0.1 * 2
        let text = "ab\ncd";
        let l = break_request(LayoutRequest {
            text: text.into(),
            font_size: 2.0,
            letter_spacing: 0.1,
            text_indent: 1.0,
            ..Default::default()
        });
        assert_eq!(texts(&l, text), ["ab\n", "cd"]);
        let xs = |line: usize| -> Vec<f32> { l.lines[line].glyphs.iter().map(|g| g.x).collect() };
        let (first, second) = (xs(0), xs(1));
        assert_relative_eq!(first[0], 1.0, epsilon = 1e-5);
        assert_relative_eq!(first[1], 2.2, epsilon = 1e-5);
        // A hard break indents the next line again
        assert_relative_eq!(second[0], 1.0, epsilon = 1e-5);
        assert_relative_eq!(second[1], 2.2, epsilon = 1e-5);
    }

    #[test]
    fn soft_wrapped_lines_are_not_indented() {
        let text = "aaaa bbbb";
        let l = break_request(LayoutRequest {
            text: text.into(),
            font_size: 2.0,
            max_width: 6.0,
            text_indent: 1.0,
            ..Default::default()
        });
        assert_eq!(texts(&l, text), ["aaaa ", "bbbb"]);
        assert_eq!(l.lines[0].glyphs[0].x, 1.0);
        assert_eq!(l.lines[1].glyphs[0].x, 0.0);
        assert!(l.lines[0].soft_wrapped);
    }

    #[test]
    fn empty_text_has_one_line() {
        let l = lines("", f32::INFINITY, false);
        assert_eq!(l.lines.len(), 1);
        assert!(l.lines[0].is_empty());
        assert_eq!(l.max_line_width, 0.0);
    }
}
