// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Typesetting
//!
//! The [`Typesetter`] turns a [`TypesetRequest`] and a [`FontRecord`] into
//! positioned glyphs:
//!
//! 1.  glyphs are distributed over lines, wrapping at break opportunities
//! 2.  the block is anchored
//! 3.  lines are aligned or justified
//! 4.  bidi runs are reordered
//! 5.  renderable glyphs, carets, colors and bounds are emitted
//!
//! Positions are in units of the font size with `y` up. The block's top edge
//! is at `y = 0` before anchoring; the first baseline is at
//! [`LayoutMetrics::top_baseline`].

mod align;
mod bidi;
mod line;
mod wrap;

pub use bidi::{BidiProvider, EmbeddingLevels, Paragraph, UnicodeBidi};
pub use line::{is_break_after, is_default_ignorable, GlyphFlags, GlyphLayout, Line};

use crate::data::{Rect, Vec2};
use crate::fonts::{FontRecord, GlyphData};
use crate::request::{LineHeight, TypesetRequest};
use std::sync::Arc;

/// Font metrics scaled to the requested font size
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutMetrics {
    pub font_size: f32,
    pub ascender: f32,
    /// Usually negative
    pub descender: f32,
    pub cap_height: f32,
    pub x_height: f32,
    pub line_height: f32,
    /// Half the difference between line height and content height
    pub half_leading: f32,
    /// Baseline of the first line, relative to the block top
    pub top_baseline: f32,
    /// Height of caret rectangles
    pub caret_height: f32,
    /// Bottom of a caret relative to its baseline
    pub caret_bottom_offset: f32,
}

impl LayoutMetrics {
    /// Compute for `request` using `font`
    pub fn new(request: &TypesetRequest, font: &FontRecord) -> Self {
        let m = font.metrics();
        let dpu = m.dpu(request.font_size);
        let ascender = dpu.to_px(m.ascender);
        let descender = dpu.to_px(m.descender);
        let content_height = ascender - descender;
        let line_height = match request.line_height {
            LineHeight::Normal => content_height + dpu.to_px(m.line_gap),
            LineHeight::Multiple(x) => x * request.font_size,
        };
        let half_leading = (line_height - content_height) / 2.0;
        let caret_height = line_height.min(content_height);
        LayoutMetrics {
            font_size: request.font_size,
            ascender,
            descender,
            cap_height: dpu.to_px(m.cap_height),
            x_height: dpu.to_px(m.x_height),
            line_height,
            half_leading,
            top_baseline: -(ascender + half_leading),
            caret_height,
            caret_bottom_offset: (ascender + descender) / 2.0 - caret_height / 2.0,
        }
    }
}

/// Caret geometry for one source char
///
/// For right-to-left chars `start_x > end_x`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaretPosition {
    pub start_x: f32,
    pub end_x: f32,
    pub bottom_y: f32,
}

/// Bounds of renderable glyphs `start..end`
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkBounds {
    pub start: usize,
    pub end: usize,
    pub rect: Rect,
}

/// Result of [`Typesetter::measure`]
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Measurement {
    pub block_bounds: Rect,
    pub line_count: usize,
    pub top_baseline: f32,
}

/// Result of [`Typesetter::typeset`]
#[derive(Clone, Debug)]
pub struct Typeset {
    /// Renderable glyphs (mirrored where applicable), in emission order
    pub glyphs: Vec<Arc<GlyphData>>,
    /// Baseline origin of each renderable glyph
    pub positions: Vec<Vec2>,
    /// Color per renderable glyph, if color ranges were given
    pub colors: Option<Vec<u32>>,
    /// One per source char, if requested
    pub carets: Option<Vec<CaretPosition>>,
    pub chunked_bounds: Vec<ChunkBounds>,
    pub block_bounds: Rect,
    /// Union of the outline bounds of renderable glyphs
    pub visible_bounds: Rect,
    pub metrics: LayoutMetrics,
    pub line_count: usize,
}

/// Spread a ligature's caret evenly over the `count` chars it covers
fn fill_ligature_carets(carets: &mut [CaretPosition], start: usize, count: usize) {
    let CaretPosition {
        start_x,
        end_x,
        bottom_y,
    } = carets[start];
    let advance = (end_x - start_x) / count as f32;
    for (i, caret) in carets[start..start + count].iter_mut().enumerate() {
        caret.start_x = start_x + advance * i as f32;
        caret.end_x = start_x + advance * (i + 1) as f32;
        caret.bottom_y = bottom_y;
    }
}

/// Lays out text
#[derive(Debug)]
pub struct Typesetter {
    bidi: Box<dyn BidiProvider>,
}

impl Default for Typesetter {
    fn default() -> Self {
        Typesetter::new(Box::new(UnicodeBidi))
    }
}

impl Typesetter {
    /// Construct with a bidi implementation
    pub fn new(bidi: Box<dyn BidiProvider>) -> Self {
        Typesetter { bidi }
    }

    /// Block bounds and line count, without emitting glyphs
    pub fn measure(&self, request: &TypesetRequest, font: &FontRecord) -> Measurement {
        let chars: Vec<char> = request.text.chars().collect();
        let metrics = LayoutMetrics::new(request, font);
        let lines = wrap::break_lines(request, font, &chars);
        let line_count = lines.lines.len();
        let anchor_x = align::anchor_x_offset(request.anchor_x, lines.max_line_width);
        let anchor_y = align::anchor_y_offset(request.anchor_y, &metrics, line_count);
        Measurement {
            block_bounds: block_bounds(&metrics, anchor_x, anchor_y, &lines),
            line_count,
            top_baseline: metrics.top_baseline,
        }
    }

    /// Lay out `request.text`
    pub fn typeset(&self, request: &TypesetRequest, font: &FontRecord) -> Typeset {
        let chars: Vec<char> = request.text.chars().collect();
        let metrics = LayoutMetrics::new(request, font);
        let dpu = font.metrics().dpu(request.font_size);

        let mut lines = wrap::break_lines(request, font, &chars);
        let line_count = lines.lines.len();
        let block_width = lines.max_line_width;
        let anchor_x = align::anchor_x_offset(request.anchor_x, block_width);
        let anchor_y = align::anchor_y_offset(request.anchor_y, &metrics, line_count);

        let levels = self.bidi.embedding_levels(&request.text, request.direction);
        for line in &mut lines.lines {
            align::align_line(line, request.text_align, block_width, request.max_width);
            if let (Some(first), Some(last)) = (line.glyphs.first(), line.glyphs.last()) {
                let (start, end) = (first.char_index, last.char_index);
                let segments = self.bidi.reorder_segments(&request.text, &levels, start, end);
                bidi::reorder_line(line, &segments);
            }
        }

        let mut glyphs = vec![];
        let mut positions = vec![];
        let mut colors = request.color_ranges.as_ref().map(|_| vec![]);
        let mut carets = request
            .include_caret_positions
            .then(|| vec![CaretPosition::default(); chars.len()]);
        let mut chunked_bounds: Vec<ChunkBounds> = vec![];
        let mut visible_bounds = Rect::EMPTY;
        let mut prev_char_index: Option<usize> = None;

        let mut line_y = metrics.top_baseline;
        for line in &lines.lines {
            for g in &line.glyphs {
                let rtl = levels.is_rtl(g.char_index);

                if let Some(carets) = carets.as_mut() {
                    let left = g.x + anchor_x;
                    let right = g.right() + anchor_x;
                    if let Some(caret) = carets.get_mut(g.char_index) {
                        *caret = CaretPosition {
                            start_x: if rtl { right } else { left },
                            end_x: if rtl { left } else { right },
                            bottom_y: line_y + metrics.caret_bottom_offset + anchor_y,
                        };
                    }
                    if let Some(prev) = prev_char_index {
                        let count = g.char_index.saturating_sub(prev);
                        if count > 1 {
                            fill_ligature_carets(carets, prev, count);
                        }
                    }
                }
                prev_char_index = Some(g.char_index);

                if g.flags.contains(GlyphFlags::EMPTY) {
                    continue;
                }

                let mut glyph = g.glyph.clone();
                if rtl {
                    let mirrored = chars
                        .get(g.char_index)
                        .and_then(|c| self.bidi.mirrored(*c))
                        .and_then(|c| font.glyph_for_char(c));
                    if let Some(m) = mirrored {
                        glyph = m;
                    }
                }

                let pos = Vec2(g.x + anchor_x, line_y + g.y + anchor_y);
                let b = glyph.bounds;
                let rect = Rect::new(
                    pos.0 + dpu.to_px(b.min_x),
                    pos.1 + dpu.to_px(b.min_y),
                    pos.0 + dpu.to_px(b.max_x),
                    pos.1 + dpu.to_px(b.max_y),
                );
                visible_bounds.include(&rect);

                let index = glyphs.len();
                if index % request.chunk_size == 0 {
                    chunked_bounds.push(ChunkBounds {
                        start: index,
                        end: index,
                        rect: Rect::EMPTY,
                    });
                }
                if let Some(chunk) = chunked_bounds.last_mut() {
                    chunk.end += 1;
                    chunk.rect.include(&rect);
                }

                if let Some(colors) = colors.as_mut() {
                    colors.push(request.color_at(g.char_index));
                }
                glyphs.push(glyph);
                positions.push(pos);
            }
            line_y -= metrics.line_height;
        }

        if visible_bounds.is_empty() {
            visible_bounds = Rect::new(anchor_x, anchor_y, anchor_x, anchor_y);
        }

        if let (Some(carets), Some(prev)) = (carets.as_mut(), prev_char_index) {
            let count = chars.len().saturating_sub(prev);
            if count > 1 {
                fill_ligature_carets(carets, prev, count);
            }
        }

        Typeset {
            glyphs,
            positions,
            colors,
            carets,
            chunked_bounds,
            block_bounds: block_bounds(&metrics, anchor_x, anchor_y, &lines),
            visible_bounds,
            metrics,
            line_count,
        }
    }
}

fn block_bounds(metrics: &LayoutMetrics, anchor_x: f32, anchor_y: f32, lines: &wrap::Lines) -> Rect {
    Rect::new(
        anchor_x,
        anchor_y - lines.lines.len() as f32 * metrics.line_height,
        anchor_x + lines.max_line_width,
        anchor_y,
    )
}
