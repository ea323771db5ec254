// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Font records

use crate::conv::DPU;
use crate::data::Rect;
use crate::sdf::GlyphPath;
use std::fmt;
use std::sync::Arc;

/// Glyph identifier within a font
pub type GlyphId = u16;

/// Font metrics, in font units
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontMetrics {
    pub units_per_em: f32,
    pub ascender: f32,
    /// Usually negative
    pub descender: f32,
    pub cap_height: f32,
    pub x_height: f32,
    pub line_gap: f32,
}

impl FontMetrics {
    /// Scale factor for `font_size`
    #[inline]
    pub fn dpu(&self, font_size: f32) -> DPU {
        DPU::new(font_size, self.units_per_em)
    }
}

/// Per-glyph data reported by a [`GlyphSource`]
///
/// Shared (via `Arc`) between all layouts using the glyph.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphData {
    pub id: GlyphId,
    /// Advance width in font units (without kerning or letter spacing)
    pub advance_width: f32,
    /// Outline bounding box in font units
    pub bounds: Rect,
    pub path: Arc<GlyphPath>,
}

impl GlyphData {
    /// True if the outline covers no area
    #[inline]
    pub fn is_blank(&self) -> bool {
        !(self.bounds.width() > 0.0 && self.bounds.height() > 0.0)
    }
}

/// A glyph as visited by [`GlyphSource::for_each_glyph`]
#[derive(Clone, Copy, Debug)]
pub struct GlyphVisit<'a> {
    pub glyph: &'a Arc<GlyphData>,
    /// Pen position at which the glyph starts, in units of the font size
    ///
    /// Includes kerning and letter spacing of preceding glyphs.
    pub x: f32,
    /// Offset from the baseline (`y` up), as used for mark attachment
    pub y: f32,
    /// Index of the first source char covered by this glyph
    ///
    /// A ligature covers all chars from here up to the next glyph's index.
    pub char_index: usize,
}

/// Glyph enumeration capability of a parsed font
///
/// Implementations must report glyphs in logical order (the order of the
/// source text), without any bidi reordering; char indices are therefore
/// non-decreasing. Every source char is covered by exactly one glyph.
pub trait GlyphSource: Send + Sync + fmt::Debug {
    /// Font metrics
    fn metrics(&self) -> FontMetrics;

    /// Shape `text` and visit each resulting glyph
    ///
    /// `letter_spacing` is a multiple of `font_size`, added after every glyph.
    fn for_each_glyph(
        &self,
        text: &str,
        font_size: f32,
        letter_spacing: f32,
        f: &mut dyn FnMut(GlyphVisit<'_>),
    );
}

/// A loaded font
///
/// Immutable and cached for the lifetime of its [`FontRegistry`](super::FontRegistry).
#[derive(Clone, Debug)]
pub struct FontRecord {
    url: String,
    metrics: FontMetrics,
    source: Arc<dyn GlyphSource>,
}

impl FontRecord {
    /// Construct
    pub fn new(url: impl Into<String>, source: Arc<dyn GlyphSource>) -> Self {
        let metrics = source.metrics();
        FontRecord {
            url: url.into(),
            metrics,
            source,
        }
    }

    /// The URL this font was loaded from
    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Font metrics
    #[inline]
    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    /// See [`GlyphSource::for_each_glyph`]
    #[inline]
    pub fn for_each_glyph(
        &self,
        text: &str,
        font_size: f32,
        letter_spacing: f32,
        mut f: impl FnMut(GlyphVisit<'_>),
    ) {
        self.source
            .for_each_glyph(text, font_size, letter_spacing, &mut f)
    }

    /// The glyph for a single char, if the font shapes it into one
    pub fn glyph_for_char(&self, c: char) -> Option<Arc<GlyphData>> {
        let mut buf = [0; 4];
        let mut result = None;
        self.for_each_glyph(c.encode_utf8(&mut buf), 1.0, 0.0, |visit| {
            if result.is_none() {
                result = Some(visit.glyph.clone());
            }
        });
        result
    }
}
