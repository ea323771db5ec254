// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! TrueType / OpenType faces

use super::{FontMetrics, FontParser, GlyphData, GlyphId, GlyphSource, GlyphVisit, ParseError};
use crate::data::Rect;
use crate::sdf::PathBuilder;
use easy_cast::{Cast, Conv};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use ttf_parser::Face;

/// A parsed TrueType or OpenType face
///
/// Shaping (kerning, ligatures, mark positioning) uses `rustybuzz`; outlines
/// come from `ttf-parser`. Glyphs are shaped in logical order; bidi
/// reordering is the typesetter's business.
pub struct TtfFace {
    data: Arc<[u8]>,
    index: u32,
    metrics: FontMetrics,
    glyphs: Mutex<HashMap<GlyphId, Arc<GlyphData>>>,
}

impl fmt::Debug for TtfFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtfFace")
            .field("len", &self.data.len())
            .field("index", &self.index)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl TtfFace {
    /// Parse face `index` of `data`
    pub fn new(data: impl Into<Arc<[u8]>>, index: u32) -> Result<Self, ParseError> {
        let data = data.into();
        let face = Face::parse(&data, index)?;
        if rustybuzz::Face::from_slice(&data, index).is_none() {
            return Err(ParseError::Shaping);
        }

        let ascender = f32::from(face.ascender());
        let metrics = FontMetrics {
            units_per_em: f32::from(face.units_per_em()),
            ascender,
            descender: f32::from(face.descender()),
            // Fall back to typical proportions when the OS/2 table is old
            cap_height: face
                .capital_height()
                .map(f32::from)
                .unwrap_or(ascender * 0.7),
            x_height: face.x_height().map(f32::from).unwrap_or(ascender * 0.5),
            line_gap: f32::from(face.line_gap()),
        };

        Ok(TtfFace {
            data,
            index,
            metrics,
            glyphs: Default::default(),
        })
    }

    fn glyph_data(&self, face: &Face<'_>, id: GlyphId) -> Arc<GlyphData> {
        let mut glyphs = match self.glyphs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        glyphs
            .entry(id)
            .or_insert_with(|| {
                let gid = ttf_parser::GlyphId(id);
                let mut builder = PathBuilder::default();
                let bounds = match face.outline_glyph(gid, &mut builder) {
                    Some(r) => Rect::new(
                        r.x_min.into(),
                        r.y_min.into(),
                        r.x_max.into(),
                        r.y_max.into(),
                    ),
                    None => Rect::new(0.0, 0.0, 0.0, 0.0),
                };
                Arc::new(GlyphData {
                    id,
                    advance_width: face.glyph_hor_advance(gid).map(f32::from).unwrap_or(0.0),
                    bounds,
                    path: Arc::new(builder.finish()),
                })
            })
            .clone()
    }
}

impl GlyphSource for TtfFace {
    fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    fn for_each_glyph(
        &self,
        text: &str,
        font_size: f32,
        letter_spacing: f32,
        f: &mut dyn FnMut(GlyphVisit<'_>),
    ) {
        // Both were validated in TtfFace::new
        let (Ok(face), Some(rb_face)) = (
            Face::parse(&self.data, self.index),
            rustybuzz::Face::from_slice(&self.data, self.index),
        ) else {
            return;
        };

        let mut buffer = rustybuzz::UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.set_direction(rustybuzz::Direction::LeftToRight);
        buffer.guess_segment_properties();
        let output = rustybuzz::shape(&rb_face, &[], buffer);

        // Map byte offsets (clusters) to char indices
        let mut char_of_byte = vec![0usize; text.len() + 1];
        let mut n = 0;
        for (i, c) in text.char_indices() {
            char_of_byte[i..i + c.len_utf8()].fill(n);
            n += 1;
        }
        char_of_byte[text.len()] = n;

        let scale = self.metrics.dpu(font_size);
        let spacing = letter_spacing * font_size;
        let mut pen = 0.0;
        let mut glyphs = Vec::with_capacity(output.len());
        for (info, pos) in output.glyph_infos().iter().zip(output.glyph_positions()) {
            let id: GlyphId = info.glyph_id.cast();
            let glyph = self.glyph_data(&face, id);
            let x = pen + scale.to_px(pos.x_offset as f32);
            let y = scale.to_px(pos.y_offset as f32);
            let char_index = char_of_byte[usize::conv(info.cluster).min(text.len())];
            glyphs.push((glyph, x, y, char_index));
            pen += scale.to_px(pos.x_advance as f32) + spacing;
        }

        // The glyph cache lock is released; visitors may re-enter
        for (glyph, x, y, char_index) in &glyphs {
            f(GlyphVisit {
                glyph,
                x: *x,
                y: *y,
                char_index: *char_index,
            });
        }
    }
}

/// Parses fonts with [`TtfFace`] (face index 0)
#[derive(Clone, Copy, Debug, Default)]
pub struct TtfParser;

impl FontParser for TtfParser {
    fn parse(&self, data: Vec<u8>) -> Result<Arc<dyn GlyphSource>, ParseError> {
        Ok(Arc::new(TtfFace::new(data, 0)?))
    }
}
