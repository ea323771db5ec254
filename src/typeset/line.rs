// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Line buffer

use crate::fonts::GlyphData;
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    /// Per-glyph classification, computed once from the glyph's first char
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct GlyphFlags: u8 {
        /// Whitespace (including hard breaks and no-break spaces)
        const WHITESPACE = 1 << 0;
        /// Nothing to render: whitespace, no outline area or default-ignorable
        const EMPTY = 1 << 1;
        /// A soft break may follow this glyph
        const BREAK_AFTER = 1 << 2;
    }
}

impl GlyphFlags {
    /// Classify a glyph starting at char `c`
    pub fn classify(c: char, glyph: &GlyphData) -> Self {
        let mut flags = GlyphFlags::empty();
        if c.is_whitespace() {
            flags |= GlyphFlags::WHITESPACE | GlyphFlags::EMPTY;
        }
        if glyph.is_blank() || is_default_ignorable(c) {
            flags |= GlyphFlags::EMPTY;
        }
        if is_break_after(c) {
            flags |= GlyphFlags::BREAK_AFTER;
        }
        flags
    }
}

/// Whitespace after which a line may wrap
///
/// Excludes hard breaks (handled separately) and no-break spaces.
fn is_breaking_space(c: char) -> bool {
    matches!(c, '\t' | ' ' | '\u{2000}'..='\u{200A}' | '\u{205F}' | '\u{3000}')
}

/// Break opportunity after `c`
///
/// This is a practical subset of UAX #14: breaking spaces plus hyphens and
/// dashes.
pub fn is_break_after(c: char) -> bool {
    is_breaking_space(c)
        || matches!(
            c,
            '-' | '\u{AD}'
                | '\u{2010}'
                | '\u{2012}'..='\u{2014}'
                | '\u{2027}'
                | '\u{2056}'
                | '\u{2E17}'
                | '\u{2E40}'
        )
}

/// Unicode `Default_Ignorable_Code_Point`
pub fn is_default_ignorable(c: char) -> bool {
    matches!(
        c,
        '\u{AD}'
            | '\u{34F}'
            | '\u{61C}'
            | '\u{115F}'..='\u{1160}'
            | '\u{17B4}'..='\u{17B5}'
            | '\u{180B}'..='\u{180F}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{206F}'
            | '\u{3164}'
            | '\u{FE00}'..='\u{FE0F}'
            | '\u{FEFF}'
            | '\u{FFA0}'
            | '\u{FFF0}'..='\u{FFF8}'
            | '\u{1BCA0}'..='\u{1BCA3}'
            | '\u{1D173}'..='\u{1D17A}'
            | '\u{E0000}'..='\u{E0FFF}'
    )
}

/// A glyph placed on a line
#[derive(Clone, Debug)]
pub struct GlyphLayout {
    pub glyph: Arc<GlyphData>,
    pub flags: GlyphFlags,
    /// Left edge, relative to the line start
    pub x: f32,
    /// Offset from the baseline
    pub y: f32,
    /// Advance width (widened by justification)
    pub width: f32,
    /// Index of the first source char covered by this glyph
    pub char_index: usize,
}

impl GlyphLayout {
    #[inline]
    pub fn is_whitespace(&self) -> bool {
        self.flags.contains(GlyphFlags::WHITESPACE)
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// A line of glyphs, in logical order
#[derive(Clone, Debug, Default)]
pub struct Line {
    pub glyphs: Vec<GlyphLayout>,
    /// Visible width: right edge of the last non-whitespace glyph
    ///
    /// Set by [`Line::measure`].
    pub width: f32,
    /// True if this line ended due to wrapping (not a hard break or the end
    /// of text)
    pub soft_wrapped: bool,
}

impl Line {
    #[inline]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    #[inline]
    pub fn push(&mut self, glyph: GlyphLayout) {
        self.glyphs.push(glyph);
    }

    /// Move glyphs `at..` to a new line, shifted so that the first starts at 0
    ///
    /// Returns the new line and the shift applied (the old `x` of its first
    /// glyph). Glyphs before `at` are untouched.
    pub fn split_off(&mut self, at: usize) -> (Line, f32) {
        let mut glyphs = self.glyphs.split_off(at);
        let shift = glyphs.first().map(|g| g.x).unwrap_or(0.0);
        for g in &mut glyphs {
            g.x -= shift;
        }
        let line = Line {
            glyphs,
            width: 0.0,
            soft_wrapped: false,
        };
        (line, shift)
    }

    /// Index of the first trailing whitespace glyph (`len()` if none)
    pub fn trailing_space_start(&self) -> usize {
        self.glyphs
            .iter()
            .rposition(|g| !g.is_whitespace())
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Compute [`Line::width`], excluding trailing whitespace
    pub fn measure(&mut self) -> f32 {
        self.width = self
            .glyphs
            .iter()
            .rev()
            .find(|g| !g.is_whitespace())
            .map(|g| g.right())
            .unwrap_or(0.0);
        self.width
    }
}
