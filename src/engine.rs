// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! The layout engine

use crate::atlas::{AtlasInfo, GlyphAtlas};
use crate::config::EngineConfig;
use crate::data::{Rect, Vec2};
use crate::fonts::{
    FileFetcher, FontError, FontFetcher, FontParser, FontRecord, FontRegistry, TtfParser,
};
use crate::request::{LayoutRequest, TypesetRequest};
use crate::sdf::{Rasterizer, SdfBackend, SdfOutput};
use crate::typeset::{
    BidiProvider, CaretPosition, ChunkBounds, LayoutMetrics, Measurement, Typeset, Typesetter,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Layout failure
#[derive(Error, Debug, Clone)]
pub enum LayoutError {
    /// Neither the requested nor the default font could be loaded
    #[error(transparent)]
    Font(#[from] FontError),
}

/// Completion handler of [`TextEngine::layout`]
pub type LayoutCallback = Box<dyn FnOnce(Result<TypesetResult, LayoutError>)>;
/// Completion handler of [`TextEngine::measure`]
pub type MeasureCallback = Box<dyn FnOnce(Result<Measurement, LayoutError>)>;
/// Completion handler of [`TextEngine::preload`]
pub type PreloadCallback = Box<dyn FnOnce(Result<(), LayoutError>)>;

/// Time spent per stage of a layout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timings {
    /// From the call until the font was available
    pub font_load: Duration,
    pub typesetting: Duration,
    /// From submitting rasterization until the last needed glyph was written
    pub sdf: Duration,
}

/// The result of a layout
///
/// Per-glyph vectors have one entry per renderable glyph, in emission order.
#[derive(Clone, Debug)]
pub struct TypesetResult {
    /// Atlas slot of each glyph
    pub glyph_atlas_indices: Vec<u32>,
    /// Baseline origin of each glyph
    pub glyph_positions: Vec<Vec2>,
    /// Quad of each glyph: its SDF view box, scaled and positioned
    pub glyph_bounds: Vec<Rect>,
    /// Color of each glyph (`0xRRGGBB`), if color ranges were given
    pub glyph_colors: Option<Vec<u32>>,
    /// One entry per source char, if requested
    pub caret_positions: Option<Vec<CaretPosition>>,
    pub chunked_bounds: Vec<ChunkBounds>,
    pub block_bounds: Rect,
    pub visible_bounds: Rect,
    pub metrics: LayoutMetrics,
    pub line_count: usize,
    pub timings: Timings,
    /// The atlas holding this layout's glyphs, as of completion
    pub atlas: AtlasInfo,
    /// Number of atlas entries created by this layout
    pub new_glyph_count: usize,
}

/// Destination of a rasterization job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct SlotKey {
    cell_size: u32,
    index: u32,
}

enum Job {
    Layout(TypesetRequest, LayoutCallback),
    Measure(TypesetRequest, MeasureCallback),
    Preload(Vec<TypesetRequest>, PreloadCallback),
}

struct FontReady {
    job: Job,
    font: Result<Arc<FontRecord>, FontError>,
    requested: Instant,
}

struct Partial {
    typeset: Typeset,
    indices: Vec<u32>,
    glyph_bounds: Vec<Rect>,
    font_load: Duration,
    typesetting: Duration,
    new_glyph_count: usize,
}

enum Completion {
    Layout(Partial, LayoutCallback),
    Preload(PreloadCallback),
}

struct Pending {
    cell_size: u32,
    waiting: HashSet<u32>,
    submitted: Instant,
    completion: Completion,
}

/// The text layout engine
///
/// Owns a [`FontRegistry`], a [`Typesetter`], one [`GlyphAtlas`] per SDF
/// cell size and a [`Rasterizer`]. All methods are called from one thread;
/// font loading and fallback rasterization happen in the background and are
/// collected by [`TextEngine::pump`], which the host calls once per frame.
///
/// Each layout's callback is called exactly once: immediately if the font is
/// loaded and every glyph is already in the atlas, otherwise from a later
/// `pump`.
pub struct TextEngine {
    config: EngineConfig,
    fonts: FontRegistry,
    typesetter: Typesetter,
    atlases: HashMap<u32, GlyphAtlas>,
    rasterizer: Rasterizer<SlotKey>,
    font_send: Sender<FontReady>,
    font_recv: Receiver<FontReady>,
    pending: Vec<Pending>,
}

impl TextEngine {
    /// Construct
    pub fn new(
        config: EngineConfig,
        fetcher: Arc<dyn FontFetcher>,
        parser: Arc<dyn FontParser>,
    ) -> Self {
        let config = config.validated();
        let (font_send, font_recv) = unbounded();
        TextEngine {
            fonts: FontRegistry::new(config.default_font_url.clone(), fetcher, parser),
            typesetter: Typesetter::default(),
            atlases: HashMap::new(),
            rasterizer: Rasterizer::new(&config),
            font_send,
            font_recv,
            pending: vec![],
            config,
        }
    }

    /// Construct, loading fonts from the local file system with [`TtfParser`]
    pub fn with_local_fonts(config: EngineConfig) -> Self {
        Self::new(config, Arc::new(FileFetcher), Arc::new(TtfParser))
    }

    /// Replace the bidi implementation
    pub fn set_bidi(&mut self, bidi: Box<dyn BidiProvider>) {
        self.typesetter = Typesetter::new(bidi);
    }

    /// Replace the accelerated SDF backend
    pub fn set_sdf_backend(&mut self, backend: Box<dyn SdfBackend>) {
        self.rasterizer.set_backend(backend);
    }

    /// The (validated) configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn fonts(&self) -> &FontRegistry {
        &self.fonts
    }

    /// Access the font registry, e.g. to register fonts directly
    pub fn fonts_mut(&mut self) -> &mut FontRegistry {
        &mut self.fonts
    }

    /// The atlas for `cell_size`, if any layout has used it
    pub fn atlas(&self, cell_size: u32) -> Option<&GlyphAtlas> {
        self.atlases.get(&cell_size)
    }

    /// Mutable access to an atlas (e.g. for [`GlyphAtlas::take_dirty`])
    pub fn atlas_mut(&mut self, cell_size: u32) -> Option<&mut GlyphAtlas> {
        self.atlases.get_mut(&cell_size)
    }

    /// Lay out text
    ///
    /// `callback` receives the result once the font is loaded and every
    /// glyph the layout uses has been rasterized.
    pub fn layout(
        &mut self,
        request: LayoutRequest,
        callback: impl FnOnce(Result<TypesetResult, LayoutError>) + 'static,
    ) {
        let request = request.normalize(&self.config);
        let url = request.font_url.clone();
        self.with_font(&url, Job::Layout(request, Box::new(callback)));
    }

    /// Compute block bounds only
    ///
    /// Does not touch the atlas.
    pub fn measure(
        &mut self,
        request: LayoutRequest,
        callback: impl FnOnce(Result<Measurement, LayoutError>) + 'static,
    ) {
        let request = request.normalize(&self.config);
        let url = request.font_url.clone();
        self.with_font(&url, Job::Measure(request, Box::new(callback)));
    }

    /// Populate the atlas with the glyphs of `texts` in `font`
    ///
    /// `font` of `None` means the default font. `callback` is called once
    /// every glyph has been rasterized.
    pub fn preload<S: AsRef<str>>(
        &mut self,
        font: Option<&str>,
        texts: &[S],
        callback: impl FnOnce(Result<(), LayoutError>) + 'static,
    ) {
        let requests: Vec<_> = texts
            .iter()
            .map(|text| {
                LayoutRequest {
                    text: text.as_ref().to_string(),
                    font: font.map(|s| s.to_string()),
                    ..Default::default()
                }
                .normalize(&self.config)
            })
            .collect();
        let url = match requests.first() {
            Some(request) => request.font_url.clone(),
            None => match font {
                Some(font) => self.config.resolve_font_url(font),
                None => self.config.default_font_url.clone(),
            },
        };
        self.with_font(&url, Job::Preload(requests, Box::new(callback)));
    }

    /// The backing texture for `cell_size` was lost
    ///
    /// Until [`Self::context_restored`], layouts complete without
    /// rasterizing and finished rasterizations are discarded.
    pub fn context_lost(&mut self, cell_size: u32) {
        if let Some(atlas) = self.atlases.get_mut(&cell_size) {
            atlas.context_lost();
        }
    }

    /// The backing texture for `cell_size` is available again
    ///
    /// Every glyph known to the atlas is rasterized again.
    pub fn context_restored(&mut self, cell_size: u32) {
        let Some(atlas) = self.atlases.get_mut(&cell_size) else {
            return;
        };
        let (distance, exponent) = (self.config.sdf_distance, self.config.sdf_exponent);
        for (_, entry) in atlas.context_restored() {
            if atlas.begin_raster(entry.atlas_index) {
                let params = atlas.sdf_params(&entry, distance, exponent);
                let key = SlotKey {
                    cell_size,
                    index: entry.atlas_index,
                };
                self.rasterizer.submit(key, params);
            }
        }
    }

    /// Make progress
    ///
    /// Delivers loaded fonts, runs one rasterization time slice, writes
    /// finished glyphs into their atlases and calls completed callbacks.
    /// Returns the number of layout (and preload) callbacks called.
    pub fn pump(&mut self) -> usize {
        let mut n = 0;
        self.fonts.poll();
        n += self.dispatch_font_events();
        let outputs = self.rasterizer.tick();
        n += self.apply(outputs);
        n
    }

    /// True if no work is outstanding
    pub fn is_idle(&self) -> bool {
        self.fonts.num_pending() == 0
            && self.rasterizer.num_pending() == 0
            && self.pending.is_empty()
            && self.font_recv.is_empty()
    }

    /// Block until all outstanding work is complete
    pub fn run_until_idle(&mut self) {
        const WAIT: Duration = Duration::from_millis(50);
        loop {
            self.pump();
            if self.is_idle() {
                return;
            }
            if self.fonts.num_pending() > 0 {
                self.fonts.wait(WAIT);
            } else if self.rasterizer.num_pending() > 0 {
                let outputs = self.rasterizer.wait(WAIT);
                self.apply(outputs);
            } else if self.font_recv.is_empty() {
                // Nothing left to drive the remaining layouts
                log::error!("TextEngine: {} layouts stalled", self.pending.len());
                return;
            }
        }
    }

    fn with_font(&mut self, url: &str, job: Job) {
        let send = self.font_send.clone();
        let requested = Instant::now();
        self.fonts.load(
            url,
            Box::new(move |font| {
                // The receiver lives as long as the engine
                let _ = send.send(FontReady {
                    job,
                    font,
                    requested,
                });
            }),
        );
        self.dispatch_font_events();
    }

    fn dispatch_font_events(&mut self) -> usize {
        let mut n = 0;
        while let Ok(ready) = self.font_recv.try_recv() {
            n += self.on_font_ready(ready);
        }
        n
    }

    fn on_font_ready(&mut self, ready: FontReady) -> usize {
        let font_load = ready.requested.elapsed();
        let font = match ready.font {
            Ok(font) => font,
            Err(err) => {
                let err = LayoutError::from(err);
                match ready.job {
                    Job::Layout(_, callback) => callback(Err(err)),
                    Job::Measure(_, callback) => callback(Err(err)),
                    Job::Preload(_, callback) => callback(Err(err)),
                }
                return 1;
            }
        };

        match ready.job {
            Job::Layout(request, callback) => {
                let start = Instant::now();
                let typeset = self.typesetter.typeset(&request, &font);
                let typesetting = start.elapsed();
                let cell_size = request.sdf_glyph_size;
                let (waiting, indices, glyph_bounds, new_glyph_count) =
                    self.populate_atlas(cell_size, &font, &typeset);
                let partial = Partial {
                    typeset,
                    indices,
                    glyph_bounds,
                    font_load,
                    typesetting,
                    new_glyph_count,
                };
                self.enqueue(cell_size, waiting, Completion::Layout(partial, callback))
            }
            Job::Measure(request, callback) => {
                callback(Ok(self.typesetter.measure(&request, &font)));
                1
            }
            Job::Preload(requests, callback) => {
                let mut waiting = HashSet::new();
                let mut cell_size = self.config.sdf_glyph_size;
                for request in &requests {
                    cell_size = request.sdf_glyph_size;
                    let typeset = self.typesetter.typeset(request, &font);
                    let (w, ..) = self.populate_atlas(cell_size, &font, &typeset);
                    waiting.extend(w);
                }
                self.enqueue(cell_size, waiting, Completion::Preload(callback))
            }
        }
    }

    /// Resolve atlas entries for every glyph of `typeset`, submitting new
    /// ones for rasterization
    ///
    /// Returns the slots to wait for, the slot and quad of each glyph, and
    /// the number of entries created.
    fn populate_atlas(
        &mut self,
        cell_size: u32,
        font: &FontRecord,
        typeset: &Typeset,
    ) -> (HashSet<u32>, Vec<u32>, Vec<Rect>, usize) {
        let config = &self.config;
        let width = config.atlas_width.max(cell_size).div_ceil(cell_size) * cell_size;
        let atlas = self
            .atlases
            .entry(cell_size)
            .or_insert_with(|| GlyphAtlas::new(cell_size, width));
        let dpu = font.metrics().dpu(typeset.metrics.font_size);

        let mut waiting = HashSet::new();
        let mut indices = Vec::with_capacity(typeset.glyphs.len());
        let mut bounds = Vec::with_capacity(typeset.glyphs.len());
        let mut created = vec![];
        for (glyph, pos) in typeset.glyphs.iter().zip(&typeset.positions) {
            let (entry, is_new) = atlas.resolve(font.url(), glyph, config.sdf_margin);
            let index = entry.atlas_index;
            let vb = entry.sdf_view_box;
            indices.push(index);
            bounds.push(Rect::new(
                pos.0 + dpu.to_px(vb.min_x),
                pos.1 + dpu.to_px(vb.min_y),
                pos.0 + dpu.to_px(vb.max_x),
                pos.1 + dpu.to_px(vb.max_y),
            ));
            if is_new {
                created.push(entry);
            } else if atlas.is_in_flight(index) {
                waiting.insert(index);
            }
        }
        let new_glyph_count = created.len();

        // Grow before writing anything to the new region
        atlas.ensure_capacity();

        if atlas.is_context_lost() {
            waiting.clear();
        } else {
            for entry in created {
                let index = entry.atlas_index;
                if atlas.begin_raster(index) {
                    let params = atlas.sdf_params(&entry, config.sdf_distance, config.sdf_exponent);
                    self.rasterizer.submit(SlotKey { cell_size, index }, params);
                }
                waiting.insert(index);
            }
        }

        (waiting, indices, bounds, new_glyph_count)
    }

    fn enqueue(&mut self, cell_size: u32, waiting: HashSet<u32>, completion: Completion) -> usize {
        let pending = Pending {
            cell_size,
            waiting,
            submitted: Instant::now(),
            completion,
        };
        if pending.waiting.is_empty() {
            self.finish(pending);
            1
        } else {
            self.pending.push(pending);
            0
        }
    }

    /// Write outputs to atlases and complete layouts no longer waiting
    fn apply(&mut self, outputs: Vec<SdfOutput<SlotKey>>) -> usize {
        if outputs.is_empty() {
            return 0;
        }
        for out in &outputs {
            let SlotKey { cell_size, index } = out.key;
            if let Some(atlas) = self.atlases.get_mut(&cell_size) {
                atlas.write_channel(index, &out.data);
            }
            log::trace!(
                "TextEngine: glyph {index} (cell size {cell_size}) by {:?} in {:?}",
                out.strategy,
                out.elapsed
            );
            for pending in &mut self.pending {
                if pending.cell_size == cell_size {
                    pending.waiting.remove(&index);
                }
            }
        }

        let mut n = 0;
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].waiting.is_empty() {
                let pending = self.pending.remove(i);
                self.finish(pending);
                n += 1;
            } else {
                i += 1;
            }
        }
        n
    }

    fn finish(&mut self, pending: Pending) {
        match pending.completion {
            Completion::Layout(partial, callback) => {
                // Created by populate_atlas before any layout is enqueued
                let Some(atlas) = self.atlases.get(&pending.cell_size) else {
                    log::error!("TextEngine: no atlas for cell size {}", pending.cell_size);
                    return;
                };
                let Typeset {
                    positions,
                    colors,
                    carets,
                    chunked_bounds,
                    block_bounds,
                    visible_bounds,
                    metrics,
                    line_count,
                    ..
                } = partial.typeset;
                let result = TypesetResult {
                    glyph_atlas_indices: partial.indices,
                    glyph_positions: positions,
                    glyph_bounds: partial.glyph_bounds,
                    glyph_colors: colors,
                    caret_positions: carets,
                    chunked_bounds,
                    block_bounds,
                    visible_bounds,
                    metrics,
                    line_count,
                    timings: Timings {
                        font_load: partial.font_load,
                        typesetting: partial.typesetting,
                        sdf: pending.submitted.elapsed(),
                    },
                    atlas: atlas.info(self.config.sdf_exponent),
                    new_glyph_count: partial.new_glyph_count,
                };
                callback(Ok(result));
            }
            Completion::Preload(callback) => callback(Ok(())),
        }
    }
}
