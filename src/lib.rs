// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! SDF text layout library
//!
//! Typesets text (wrapping, alignment, bidi reordering, carets) and packs
//! the glyphs it uses as signed distance fields into shared atlas textures,
//! ready for a GPU renderer.
//!
//! The entry point is [`TextEngine`]:
//! ```no_run
//! use sdf_text::{EngineConfig, LayoutRequest, TextEngine};
//!
//! let mut engine = TextEngine::with_local_fonts(EngineConfig::default());
//! engine.layout(
//!     LayoutRequest {
//!         text: "Hello".into(),
//!         font_size: 16.0,
//!         ..Default::default()
//!     },
//!     |result| match result {
//!         Ok(result) => println!("{} glyphs", result.glyph_positions.len()),
//!         Err(err) => eprintln!("{err}"),
//!     },
//! );
//! // Call once per frame
//! engine.pump();
//! ```

pub mod conv;

mod data;
pub use data::*;

mod config;
pub use config::{EngineConfig, DEFAULT_FONT_URL};

mod request;
pub use request::*;

pub mod atlas;
pub mod fonts;
pub mod sdf;
pub mod typeset;

mod engine;
pub use engine::*;

pub use typeset::{CaretPosition, ChunkBounds, LayoutMetrics, Measurement};
