// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Anchoring and alignment

use super::line::Line;
use super::LayoutMetrics;
use crate::request::{AnchorX, AnchorY, TextAlign};

/// Horizontal offset applied to the whole block
pub(crate) fn anchor_x_offset(anchor: AnchorX, block_width: f32) -> f32 {
    match anchor {
        AnchorX::Offset(x) => -x,
        AnchorX::Left => 0.0,
        AnchorX::Center => -block_width / 2.0,
        AnchorX::Right => -block_width,
        AnchorX::Percent(p) => -block_width * p / 100.0,
    }
}

/// Vertical offset applied to the whole block
///
/// `y` points up; the block extends downwards from its top at 0.
pub(crate) fn anchor_y_offset(anchor: AnchorY, metrics: &LayoutMetrics, line_count: usize) -> f32 {
    let total = line_count as f32 * metrics.line_height;
    match anchor {
        AnchorY::Offset(y) => -y,
        AnchorY::Top => 0.0,
        AnchorY::TopBaseline => -metrics.top_baseline,
        AnchorY::TopCap => -metrics.top_baseline - metrics.cap_height,
        AnchorY::TopEx => -metrics.top_baseline - metrics.x_height,
        AnchorY::Middle => total / 2.0,
        AnchorY::Bottom => total,
        AnchorY::BottomBaseline => total - metrics.half_leading + metrics.descender,
        AnchorY::Percent(p) => total * p / 100.0,
    }
}

/// Align a line within `block_width`
///
/// Justification applies to soft-wrapped lines only and stretches them to
/// `wrap_width`: the spare width is shared between whitespace glyphs
/// preceding the last visible glyph, each of which is widened (shifting
/// everything after it).
pub(crate) fn align_line(line: &mut Line, align: TextAlign, block_width: f32, wrap_width: f32) {
    match align {
        TextAlign::Left => (),
        TextAlign::Center | TextAlign::Right => {
            let mut offset = block_width - line.width;
            if align == TextAlign::Center {
                offset /= 2.0;
            }
            for g in &mut line.glyphs {
                g.x += offset;
            }
        }
        TextAlign::Justify => {
            if !line.soft_wrapped {
                return;
            }
            let Some(last_visible) = line.glyphs.iter().rposition(|g| !g.is_whitespace()) else {
                return;
            };
            let spaces = line.glyphs[..last_visible]
                .iter()
                .filter(|g| g.is_whitespace())
                .count();
            if spaces == 0 {
                return;
            }

            let adjust = (wrap_width - line.width) / spaces as f32;
            let last = line.len() - 1;
            let mut offset = 0.0;
            for (i, g) in line.glyphs.iter_mut().enumerate() {
                g.x += offset;
                if g.is_whitespace() && i < last {
                    offset += adjust;
                    g.width += adjust;
                }
            }
            line.measure();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Rect;
    use crate::fonts::GlyphData;
    use crate::sdf::GlyphPath;
    use crate::typeset::line::{GlyphFlags, GlyphLayout};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn line(text: &str, soft_wrapped: bool) -> Line {
        let mut line = Line::default();
        for (i, c) in text.chars().enumerate() {
            let glyph = Arc::new(GlyphData {
                id: 0,
                advance_width: 1.0,
                bounds: Rect::new(0.0, 0.0, 1.0, 1.0),
                path: Arc::new(GlyphPath::default()),
            });
            line.push(GlyphLayout {
                flags: GlyphFlags::classify(c, &glyph),
                glyph,
                x: i as f32,
                y: 0.0,
                width: 1.0,
                char_index: i,
            });
        }
        line.soft_wrapped = soft_wrapped;
        line.measure();
        line
    }

    fn metrics() -> LayoutMetrics {
        LayoutMetrics {
            font_size: 1.0,
            ascender: 0.8,
            descender: -0.2,
            cap_height: 0.7,
            x_height: 0.5,
            line_height: 1.2,
            half_leading: 0.1,
            top_baseline: -0.9,
            caret_height: 1.0,
            caret_bottom_offset: -0.2,
        }
    }

    #[test]
    fn anchors() {
        assert_eq!(anchor_x_offset(AnchorX::Offset(2.0), 10.0), -2.0);
        assert_eq!(anchor_x_offset(AnchorX::Center, 10.0), -5.0);
        assert_eq!(anchor_x_offset(AnchorX::Right, 10.0), -10.0);
        assert_eq!(anchor_x_offset(AnchorX::Percent(25.0), 10.0), -2.5);

        let m = metrics();
        assert_eq!(anchor_y_offset(AnchorY::Top, &m, 2), 0.0);
        assert_relative_eq!(anchor_y_offset(AnchorY::TopBaseline, &m, 2), 0.9, epsilon = 1e-5);
        assert_relative_eq!(anchor_y_offset(AnchorY::TopCap, &m, 2), 0.2, epsilon = 1e-5);
        assert_relative_eq!(anchor_y_offset(AnchorY::TopEx, &m, 2), 0.4, epsilon = 1e-5);
        assert_relative_eq!(anchor_y_offset(AnchorY::Middle, &m, 2), 1.2, epsilon = 1e-5);
        assert_relative_eq!(anchor_y_offset(AnchorY::Bottom, &m, 2), 2.4, epsilon = 1e-5);
        assert_relative_eq!(anchor_y_offset(AnchorY::BottomBaseline, &m, 2), 2.1, epsilon = 1e-5);
        assert_relative_eq!(anchor_y_offset(AnchorY::Percent(50.0), &m, 2), 1.2, epsilon = 1e-5);
        assert_eq!(anchor_y_offset(AnchorY::Offset(3.0), &m, 2), -3.0);
    }

    #[test]
    fn center_and_right() {
        let mut l = line("ab ", false);
        align_line(&mut l, TextAlign::Center, 6.0, f32::INFINITY);
        assert_eq!(l.glyphs[0].x, 2.0);
        let mut l = line("ab ", false);
        align_line(&mut l, TextAlign::Right, 6.0, f32::INFINITY);
        assert_eq!(l.glyphs[0].x, 4.0);
        assert_eq!(l.glyphs[1].right(), 6.0);
    }

    #[test]
    fn justify_fills_width() {
        let mut l = line("a b c ", true);
        assert_eq!(l.width, 5.0);
        align_line(&mut l, TextAlign::Justify, 5.0, 8.0);
        assert_relative_eq!(l.width, 8.0, epsilon = 1e-5);
        assert_relative_eq!(l.glyphs[1].width, 2.5, epsilon = 1e-5);
        assert_relative_eq!(l.glyphs[2].x, 3.5, epsilon = 1e-5);
        assert_relative_eq!(l.glyphs[4].right(), 8.0, epsilon = 1e-5);
    }

    #[test]
    fn justify_skips_hard_lines() {
        let mut l = line("a b", false);
        align_line(&mut l, TextAlign::Justify, 5.0, 8.0);
        assert_eq!(l.width, 3.0);
        assert_eq!(l.glyphs[2].x, 2.0);
    }
}
