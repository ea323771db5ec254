// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Layout requests
//!
//! A [`LayoutRequest`] is what callers fill in; the engine normalizes it into
//! an immutable [`TypesetRequest`] (absolute font URL, concrete cell size and
//! chunk size, frozen color map) before doing any work.

use crate::config::{normalize_cell_size, EngineConfig};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Failure to parse a keyword option
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseOptionError {
    kind: &'static str,
    value: String,
}

impl ParseOptionError {
    fn new(kind: &'static str, value: &str) -> Self {
        ParseOptionError {
            kind,
            value: value.to_string(),
        }
    }
}

/// Parse `"12.5%"` into `12.5`
fn parse_percent(s: &str) -> Option<f32> {
    s.strip_suffix('%')?.trim().parse().ok()
}

/// Base text direction
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Detect from the first strong character
    #[default]
    Auto,
    /// Left-to-right
    Ltr,
    /// Right-to-left
    Rtl,
}

impl FromStr for Direction {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "auto" => Direction::Auto,
            "ltr" => Direction::Ltr,
            "rtl" => Direction::Rtl,
            _ => return Err(ParseOptionError::new("direction", s)),
        })
    }
}

/// Horizontal alignment of lines within the block
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextAlign {
    #[default]
    Left,
    Right,
    Center,
    /// Stretch soft-wrapped lines to the block width
    ///
    /// The last line of a paragraph (and any line ending in a hard break) is
    /// left-aligned.
    Justify,
}

impl FromStr for TextAlign {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "left" => TextAlign::Left,
            "right" => TextAlign::Right,
            "center" => TextAlign::Center,
            "justify" => TextAlign::Justify,
            _ => return Err(ParseOptionError::new("text-align", s)),
        })
    }
}

/// Whether soft wrapping is allowed
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WhiteSpace {
    #[default]
    Normal,
    /// Only hard breaks start new lines
    NoWrap,
}

impl FromStr for WhiteSpace {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "normal" => WhiteSpace::Normal,
            "nowrap" => WhiteSpace::NoWrap,
            _ => return Err(ParseOptionError::new("white-space", s)),
        })
    }
}

/// What to do with a run that has no break opportunity and overflows
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OverflowWrap {
    /// Let the line overflow
    #[default]
    Normal,
    /// Break at the overflowing glyph
    BreakWord,
}

impl FromStr for OverflowWrap {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "normal" => OverflowWrap::Normal,
            "break-word" => OverflowWrap::BreakWord,
            _ => return Err(ParseOptionError::new("overflow-wrap", s)),
        })
    }
}

/// Line height
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineHeight {
    /// Derived from the font's ascender, descender and line gap
    #[default]
    Normal,
    /// A multiple of the font size
    Multiple(f32),
}

impl FromStr for LineHeight {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "normal" {
            return Ok(LineHeight::Normal);
        }
        s.parse()
            .map(LineHeight::Multiple)
            .map_err(|_| ParseOptionError::new("line-height", s))
    }
}

/// Horizontal anchor of the text block
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnchorX {
    /// Shift the block left by this amount
    Offset(f32),
    #[default]
    Left,
    Center,
    Right,
    /// A percentage of the block width
    Percent(f32),
}

impl FromStr for AnchorX {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "left" => AnchorX::Left,
            "center" => AnchorX::Center,
            "right" => AnchorX::Right,
            _ => {
                if let Some(p) = parse_percent(s) {
                    AnchorX::Percent(p)
                } else if let Ok(x) = s.parse() {
                    AnchorX::Offset(x)
                } else {
                    return Err(ParseOptionError::new("anchor-x", s));
                }
            }
        })
    }
}

/// Vertical anchor of the text block
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AnchorY {
    /// Shift the block down by this amount
    Offset(f32),
    /// Top of the first line box
    #[default]
    Top,
    /// Baseline of the first line
    TopBaseline,
    /// Top of capital letters on the first line
    TopCap,
    /// Top of lower-case letters (x-height) on the first line
    TopEx,
    Middle,
    /// Bottom of the last line box
    Bottom,
    /// Baseline of the last line
    BottomBaseline,
    /// A percentage of the block height
    Percent(f32),
}

impl FromStr for AnchorY {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "top" => AnchorY::Top,
            "top-baseline" => AnchorY::TopBaseline,
            "top-cap" => AnchorY::TopCap,
            "top-ex" => AnchorY::TopEx,
            "middle" => AnchorY::Middle,
            "bottom" => AnchorY::Bottom,
            "bottom-baseline" => AnchorY::BottomBaseline,
            _ => {
                if let Some(p) = parse_percent(s) {
                    AnchorY::Percent(p)
                } else if let Ok(y) = s.parse() {
                    AnchorY::Offset(y)
                } else {
                    return Err(ParseOptionError::new("anchor-y", s));
                }
            }
        })
    }
}

/// A layout request, as supplied by callers
///
/// Default-construct and set the fields of interest:
/// ```
/// # use sdf_text::LayoutRequest;
/// let req = LayoutRequest {
///     text: "Hello".into(),
///     font_size: 16.0,
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutRequest {
    pub text: String,
    /// Font URL; `None` selects the configured default font
    pub font: Option<String>,
    /// SDF cell size; `None` selects the configured default
    pub sdf_glyph_size: Option<u32>,
    pub font_size: f32,
    /// Extra spacing after each glyph, as a multiple of the font size
    pub letter_spacing: f32,
    pub line_height: LineHeight,
    /// Soft-wrap width; infinite disables soft wrapping
    pub max_width: f32,
    pub direction: Direction,
    pub text_align: TextAlign,
    /// Extra x offset of the first line and of each line after a hard break
    pub text_indent: f32,
    pub white_space: WhiteSpace,
    pub overflow_wrap: OverflowWrap,
    pub anchor_x: AnchorX,
    pub anchor_y: AnchorY,
    pub include_caret_positions: bool,
    /// Renderable glyphs per chunked bounding box; `None` selects the default
    pub chunk_size: Option<usize>,
    /// Color (`0xRRGGBB`) of glyphs before the first color-range start
    pub color: u32,
    /// Sparse map: source char index → color (`0xRRGGBB`) from there on
    pub color_ranges: BTreeMap<usize, u32>,
}

impl Default for LayoutRequest {
    fn default() -> Self {
        LayoutRequest {
            text: String::new(),
            font: None,
            sdf_glyph_size: None,
            font_size: 0.1,
            letter_spacing: 0.0,
            line_height: LineHeight::Normal,
            max_width: f32::INFINITY,
            direction: Direction::Auto,
            text_align: TextAlign::Left,
            text_indent: 0.0,
            white_space: WhiteSpace::Normal,
            overflow_wrap: OverflowWrap::Normal,
            anchor_x: AnchorX::Left,
            anchor_y: AnchorY::Top,
            include_caret_positions: false,
            chunk_size: None,
            color: 0xFF_FF_FF,
            color_ranges: BTreeMap::new(),
        }
    }
}

impl LayoutRequest {
    /// Normalize against `config`
    pub fn normalize(self, config: &EngineConfig) -> TypesetRequest {
        let font_url = match self.font.as_deref() {
            Some(url) if !url.is_empty() => config.resolve_font_url(url),
            _ => config.default_font_url.clone(),
        };
        let sdf_glyph_size = self
            .sdf_glyph_size
            .map(normalize_cell_size)
            .unwrap_or(config.sdf_glyph_size);
        let chunk_size = self.chunk_size.unwrap_or(config.chunk_size).max(1);
        let max_width = if self.max_width.is_nan() || self.white_space == WhiteSpace::NoWrap {
            f32::INFINITY
        } else {
            self.max_width
        };
        let color_ranges = if self.color_ranges.is_empty() {
            None
        } else {
            Some(Arc::new(self.color_ranges))
        };

        TypesetRequest {
            text: self.text.into(),
            font_url,
            sdf_glyph_size,
            font_size: self.font_size,
            letter_spacing: self.letter_spacing,
            line_height: self.line_height,
            max_width,
            direction: self.direction,
            text_align: self.text_align,
            text_indent: self.text_indent,
            white_space: self.white_space,
            overflow_wrap: self.overflow_wrap,
            anchor_x: self.anchor_x,
            anchor_y: self.anchor_y,
            include_caret_positions: self.include_caret_positions,
            chunk_size,
            color: self.color,
            color_ranges,
        }
    }
}

/// A normalized, immutable layout request
///
/// Construct via [`LayoutRequest::normalize`]. With `white_space` set to
/// [`WhiteSpace::NoWrap`], `max_width` is infinite.
#[derive(Clone, Debug, PartialEq)]
pub struct TypesetRequest {
    pub text: Arc<str>,
    pub font_url: String,
    pub sdf_glyph_size: u32,
    pub font_size: f32,
    pub letter_spacing: f32,
    pub line_height: LineHeight,
    pub max_width: f32,
    pub direction: Direction,
    pub text_align: TextAlign,
    pub text_indent: f32,
    pub white_space: WhiteSpace,
    pub overflow_wrap: OverflowWrap,
    pub anchor_x: AnchorX,
    pub anchor_y: AnchorY,
    pub include_caret_positions: bool,
    pub chunk_size: usize,
    pub color: u32,
    /// Frozen color map; `None` if no ranges were supplied
    pub color_ranges: Option<Arc<BTreeMap<usize, u32>>>,
}

impl TypesetRequest {
    /// Color active at source char `index`
    ///
    /// This is the color of the last range starting at or before `index`.
    pub fn color_at(&self, index: usize) -> u32 {
        self.color_ranges
            .as_ref()
            .and_then(|ranges| ranges.range(..=index).next_back())
            .map(|(_, color)| *color)
            .unwrap_or(self.color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_anchors() {
        assert_eq!("center".parse(), Ok(AnchorX::Center));
        assert_eq!("25%".parse(), Ok(AnchorX::Percent(25.0)));
        assert_eq!("-1.5".parse(), Ok(AnchorX::Offset(-1.5)));
        assert!("middle".parse::<AnchorX>().is_err());

        assert_eq!("top-cap".parse(), Ok(AnchorY::TopCap));
        assert_eq!("bottom-baseline".parse(), Ok(AnchorY::BottomBaseline));
        assert_eq!("100%".parse(), Ok(AnchorY::Percent(100.0)));
        assert_eq!("2".parse(), Ok(AnchorY::Offset(2.0)));
    }

    #[test]
    fn parse_keywords() {
        assert_eq!("justify".parse(), Ok(TextAlign::Justify));
        assert_eq!("break-word".parse(), Ok(OverflowWrap::BreakWord));
        assert_eq!("nowrap".parse(), Ok(WhiteSpace::NoWrap));
        assert_eq!("rtl".parse(), Ok(Direction::Rtl));
        assert_eq!("1.2".parse(), Ok(LineHeight::Multiple(1.2)));
        assert_eq!("normal".parse(), Ok(LineHeight::Normal));
        assert!("tall".parse::<LineHeight>().is_err());
    }

    #[test]
    fn normalize_defaults() {
        let config = EngineConfig::default();
        let req = LayoutRequest {
            text: "x".into(),
            white_space: WhiteSpace::NoWrap,
            max_width: 10.0,
            sdf_glyph_size: Some(50),
            ..Default::default()
        }
        .normalize(&config);
        assert_eq!(req.font_url, config.default_font_url);
        assert_eq!(req.sdf_glyph_size, 64);
        assert_eq!(req.chunk_size, config.chunk_size);
        assert!(req.max_width.is_infinite());
        assert!(req.color_ranges.is_none());
    }

    #[test]
    fn color_cascade() {
        let mut color_ranges = BTreeMap::new();
        color_ranges.insert(2, 0xFF0000);
        color_ranges.insert(5, 0x00FF00);
        let req = LayoutRequest {
            color: 0x123456,
            color_ranges,
            ..Default::default()
        }
        .normalize(&EngineConfig::default());
        assert_eq!(req.color_at(0), 0x123456);
        assert_eq!(req.color_at(2), 0xFF0000);
        assert_eq!(req.color_at(4), 0xFF0000);
        assert_eq!(req.color_at(5), 0x00FF00);
        assert_eq!(req.color_at(100), 0x00FF00);
    }
}
