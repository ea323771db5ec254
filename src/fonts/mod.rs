// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Font loading
//!
//! Fonts are identified by URL and managed by a [`FontRegistry`], which
//! fetches bytes through a [`FontFetcher`], parses them through a
//! [`FontParser`] and caches the resulting [`FontRecord`] forever.
//!
//! ### Units
//!
//! Font files use an internally defined *font unit*; `units_per_em` of these
//! make up one *em*. All sizes handed to or produced by the typesetter are in
//! the units of the requested *font size*, which is the size of one em. The
//! scale between the two is [`crate::conv::DPU`].
//!
//! A [`GlyphSource`] reports glyph outlines and bounds in font units and pen
//! positions in font-size units.

#[cfg(test)]
pub(crate) mod mock;
mod record;
mod registry;
mod ttf;

pub use record::{FontMetrics, FontRecord, GlyphData, GlyphId, GlyphSource, GlyphVisit};
pub use registry::{
    FetchError, FileFetcher, FontCallback, FontError, FontFetcher, FontParser, FontRegistry,
    ParseError,
};
pub use ttf::{TtfFace, TtfParser};
