// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Synthetic fonts served from memory

#![allow(dead_code)]

use sdf_text::fonts::{
    FetchError, FontFetcher, FontMetrics, FontParser, GlyphData, GlyphId, GlyphSource, GlyphVisit,
    ParseError,
};
use sdf_text::sdf::{GlyphPath, PathCommand};
use sdf_text::{EngineConfig, Rect, TextEngine};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const DEFAULT_URL: &str = "mem://mono";
pub const LIGATURE_URL: &str = "mem://liga";
pub const MISSING_URL: &str = "mem://missing";

/// Advance of every glyph, in em
pub const ADVANCE: f32 = 0.5;
pub const LIGATURE_TH: GlyphId = 0xFB00;

/// Monospace font: one box glyph per char (id = code point), blank for
/// whitespace, with an optional "th" ligature
#[derive(Debug)]
pub struct BoxFont {
    ligatures: bool,
}

impl BoxFont {
    fn glyph(id: GlyphId, blank: bool) -> Arc<GlyphData> {
        let (bounds, path) = if blank {
            (Rect::new(0.0, 0.0, 0.0, 0.0), GlyphPath::default())
        } else {
            let path = GlyphPath::new(vec![
                PathCommand::MoveTo(50.0, 0.0),
                PathCommand::LineTo(450.0, 0.0),
                PathCommand::QuadTo(500.0, 350.0, 450.0, 700.0),
                PathCommand::LineTo(50.0, 700.0),
                PathCommand::Close,
            ]);
            (Rect::new(50.0, 0.0, 475.0, 700.0), path)
        };
        Arc::new(GlyphData {
            id,
            advance_width: ADVANCE * 1000.0,
            bounds,
            path: Arc::new(path),
        })
    }
}

impl GlyphSource for BoxFont {
    fn metrics(&self) -> FontMetrics {
        FontMetrics {
            units_per_em: 1000.0,
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
            f(GlyphVisit {
                glyph: &glyph,
                x,
                y: 0.0,
                char_index: i,
            });
            x += (ADVANCE + letter_spacing) * font_size;
            i += len;
        }
    }
}

/// Serves `mem://mono` and `mem://liga`; counts fetches per URL
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    pub fetches: AtomicUsize,
}

impl FontFetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match url {
            DEFAULT_URL => Ok(b"mono".to_vec()),
            LIGATURE_URL => Ok(b"liga".to_vec()),
            _ => Err(FetchError::Other(format!("not found: {url}"))),
        }
    }
}

#[derive(Debug, Default)]
pub struct BoxFontParser;

impl FontParser for BoxFontParser {
    fn parse(&self, data: Vec<u8>) -> Result<Arc<dyn GlyphSource>, ParseError> {
        match data.as_slice() {
            b"mono" => Ok(Arc::new(BoxFont { ligatures: false })),
            b"liga" => Ok(Arc::new(BoxFont { ligatures: true })),
            _ => Err(ParseError::Other("unknown font".into())),
        }
    }
}

pub fn config() -> EngineConfig {
    EngineConfig {
        default_font_url: DEFAULT_URL.into(),
        sdf_glyph_size: 16,
        atlas_width: 64,
        ..Default::default()
    }
}

pub fn engine_with(config: EngineConfig) -> (TextEngine, Arc<MemoryFetcher>) {
    let fetcher = Arc::new(MemoryFetcher::default());
    let engine = TextEngine::new(config, fetcher.clone(), Arc::new(BoxFontParser));
    (engine, fetcher)
}

pub fn engine() -> TextEngine {
    engine_with(config()).0
}

/// A value set by a callback
pub type Slot<T> = Rc<RefCell<Option<T>>>;

pub fn slot<T>() -> Slot<T> {
    Rc::new(RefCell::new(None))
}

/// A callback storing its argument in `slot`
pub fn store<T: 'static>(slot: &Slot<T>) -> impl FnOnce(T) + 'static {
    let slot = slot.clone();
    move |value| {
        assert!(slot.borrow().is_none(), "callback called twice");
        *slot.borrow_mut() = Some(value);
    }
}

pub fn take<T>(slot: &Slot<T>) -> T {
    slot.borrow_mut().take().expect("callback not called")
}
