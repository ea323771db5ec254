// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Synthetic monospace font for tests

use super::{FontMetrics, GlyphData, GlyphId, GlyphSource, GlyphVisit};
use crate::data::Rect;
use crate::sdf::{GlyphPath, PathCommand};
use std::sync::Arc;

pub(crate) const UNITS_PER_EM: f32 = 1000.0;
pub(crate) const ADVANCE: f32 = 500.0;
pub(crate) const LIGATURE_TH: GlyphId = 0xFB00;
/// Raised by 100 units above the baseline
pub(crate) const MARK_ACUTE: char = '\u{0301}';

/// Every char is one glyph (id = code point) with advance 500/1000 em,
/// except that "th" may optionally form a ligature
#[derive(Debug, Default)]
pub(crate) struct MockFont {
    ligatures: bool,
}

impl MockFont {
    pub(crate) fn new() -> Self {
        MockFont { ligatures: false }
    }

    pub(crate) fn with_ligatures() -> Self {
        MockFont { ligatures: true }
    }

    fn glyph(id: GlyphId, blank: bool) -> Arc<GlyphData> {
        let (bounds, path) = if blank {
            (Rect::new(0.0, 0.0, 0.0, 0.0), GlyphPath::default())
        } else {
            let path = GlyphPath::new(vec![
                PathCommand::MoveTo(50.0, 0.0),
                PathCommand::LineTo(450.0, 0.0),
                PathCommand::LineTo(450.0, 700.0),
                PathCommand::LineTo(50.0, 700.0),
                PathCommand::Close,
            ]);
            (Rect::new(50.0, 0.0, 450.0, 700.0), path)
        };
        Arc::new(GlyphData {
            id,
            advance_width: ADVANCE,
            bounds,
            path: Arc::new(path),
        })
    }
}

impl GlyphSource for MockFont {
    fn metrics(&self) -> FontMetrics {
        FontMetrics {
            units_per_em: UNITS_PER_EM,
            ascender: 800.0,
            descender: -200.0,
            cap_height: 700.0,
            x_height: 500.0,
            line_gap: 0.0,
        }
    }

    fn for_each_glyph(
        &self,
        text: &str,
        font_size: f32,
        letter_spacing: f32,
        f: &mut dyn FnMut(GlyphVisit<'_>),
    ) {
        let scale = font_size / UNITS_PER_EM;
        let chars: Vec<char> = text.chars().collect();
        let mut x = 0.0;
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let (glyph, len) = if self.ligatures && c == 't' && chars.get(i + 1) == Some(&'h') {
                (Self::glyph(LIGATURE_TH, false), 2)
            } else {
                let id = GlyphId::try_from(u32::from(c)).unwrap_or(0);
                (Self::glyph(id, c.is_whitespace()), 1)
            };
            let y = if c == MARK_ACUTE { 100.0 * scale } else { 0.0 };
            f(GlyphVisit {
                glyph: &glyph,
                x,
                y,
                char_index: i,
            });
            x += glyph.advance_width * scale + letter_spacing * font_size;
            i += len;
        }
    }
}
