// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Glyph atlas
//!
//! One [`GlyphAtlas`] exists per SDF cell size. Its surface is an RGBA
//! texture of fixed width whose height grows in powers of two. Each RGBA
//! cell of `cell_size × cell_size` texels holds four glyphs, one per
//! channel, so slot `i` lives in cell `i / 4`, channel `i % 4`; cells are
//! laid out row by row.

use crate::conv::to_usize;
use crate::data::Rect;
use crate::fonts::{GlyphData, GlyphId};
use crate::sdf::{GlyphPath, SdfParams};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identifies a backing texture
///
/// A new handle is issued whenever a surface is (re)allocated, telling the
/// renderer to recreate its texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextureHandle(pub u64);

impl TextureHandle {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        TextureHandle(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// An RGBA8 raster surface
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    fn new(width: u32, height: u32) -> Self {
        Surface {
            width,
            height,
            data: vec![0; to_usize(width) * to_usize(height) * 4],
        }
    }

    /// Grow to `height`, preserving existing rows
    fn grow(&mut self, height: u32) {
        debug_assert!(height >= self.height);
        self.height = height;
        self.data.resize(to_usize(self.width) * to_usize(height) * 4, 0);
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Texel data, RGBA, row-major
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Read one channel of one texel
    pub fn get(&self, x: u32, y: u32, channel: u8) -> u8 {
        self.data[(to_usize(y) * to_usize(self.width) + to_usize(x)) * 4 + usize::from(channel)]
    }
}

/// Atlas entry for one glyph of one font
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphShapeEntry {
    pub path: Arc<GlyphPath>,
    /// Slot index, unique and stable within the atlas
    pub atlas_index: u32,
    /// Region covered by the glyph's field, in font units
    pub sdf_view_box: Rect,
}

/// Location of a slot on the surface
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotLocation {
    /// Left texel of the cell
    pub x: u32,
    /// Top texel of the cell
    pub y: u32,
    /// RGBA channel, 0-3
    pub channel: u8,
}

/// Snapshot of atlas state handed to the renderer
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AtlasInfo {
    pub texture: TextureHandle,
    pub width: u32,
    pub height: u32,
    pub cell_size: u32,
    pub exponent: f32,
    pub glyph_count: u32,
}

/// Glyph atlas for one cell size
#[derive(Debug)]
pub struct GlyphAtlas {
    cell_size: u32,
    surface: Surface,
    texture: TextureHandle,
    glyph_count: u32,
    fonts: HashMap<String, HashMap<GlyphId, Arc<GlyphShapeEntry>>>,
    in_flight: HashSet<u32>,
    restoring: HashSet<u32>,
    context_lost: bool,
    dirty: bool,
    version: u64,
}

impl GlyphAtlas {
    /// Construct an empty atlas
    ///
    /// `width` should be a multiple of `cell_size`; the surface starts one
    /// cell row high.
    pub fn new(cell_size: u32, width: u32) -> Self {
        let cell_size = cell_size.max(1);
        let width = width.max(cell_size);
        GlyphAtlas {
            cell_size,
            surface: Surface::new(width, cell_size),
            texture: TextureHandle::next(),
            glyph_count: 0,
            fonts: HashMap::new(),
            in_flight: HashSet::new(),
            restoring: HashSet::new(),
            context_lost: false,
            dirty: false,
            version: 0,
        }
    }

    #[inline]
    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    #[inline]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    #[inline]
    pub fn texture(&self) -> TextureHandle {
        self.texture
    }

    /// Number of slots assigned
    #[inline]
    pub fn glyph_count(&self) -> u32 {
        self.glyph_count
    }

    /// Incremented on every completed surface update
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    /// Glyph slots per cell row (four per cell)
    #[inline]
    pub fn glyphs_per_row(&self) -> u32 {
        (self.surface.width / self.cell_size) * 4
    }

    /// Snapshot for the renderer
    pub fn info(&self, exponent: f32) -> AtlasInfo {
        AtlasInfo {
            texture: self.texture,
            width: self.surface.width,
            height: self.surface.height,
            cell_size: self.cell_size,
            exponent,
            glyph_count: self.glyph_count,
        }
    }

    /// Look up an existing entry
    pub fn get(&self, font_url: &str, id: GlyphId) -> Option<&Arc<GlyphShapeEntry>> {
        self.fonts.get(font_url)?.get(&id)
    }

    /// Get or create the entry for `glyph`
    ///
    /// A new entry takes the next slot index and a view box of the glyph's
    /// bounds expanded by `max(w, h) / cell * (margin * cell + 0.5)` on each
    /// side, where `margin` is a fraction of the cell size. Returns the entry
    /// and whether it was created by this call.
    pub fn resolve(
        &mut self,
        font_url: &str,
        glyph: &GlyphData,
        margin: f32,
    ) -> (Arc<GlyphShapeEntry>, bool) {
        if let Some(entry) = self.get(font_url, glyph.id) {
            return (entry.clone(), false);
        }

        let cell = self.cell_size as f32;
        let b = glyph.bounds;
        let pad = b.width().max(b.height()) / cell * (margin * cell + 0.5);
        let entry = Arc::new(GlyphShapeEntry {
            path: glyph.path.clone(),
            atlas_index: self.glyph_count,
            sdf_view_box: Rect::new(b.min_x - pad, b.min_y - pad, b.max_x + pad, b.max_y + pad),
        });
        self.fonts
            .entry(font_url.to_string())
            .or_default()
            .insert(glyph.id, entry.clone());
        self.glyph_count += 1;
        (entry, true)
    }

    /// SDF inputs for `entry`
    ///
    /// The saturation distance is `max(w, h) / cell * (distance * cell + 0.5)`
    /// for a view box of `w × h`, where `distance` is a fraction of the cell
    /// size.
    pub fn sdf_params(&self, entry: &GlyphShapeEntry, distance: f32, exponent: f32) -> SdfParams {
        let cell = self.cell_size as f32;
        let vb = entry.sdf_view_box;
        SdfParams {
            width: self.cell_size,
            height: self.cell_size,
            path: entry.path.clone(),
            view_box: vb,
            max_distance: vb.width().max(vb.height()) / cell * (distance * cell + 0.5),
            exponent,
        }
    }

    /// Grow the surface, if needed, to hold all assigned slots
    ///
    /// The new height is the smallest power of two that fits. Growing keeps
    /// existing texels and issues a new [`TextureHandle`]. Returns true if
    /// the surface grew.
    pub fn ensure_capacity(&mut self) -> bool {
        let per_row = self.glyphs_per_row();
        let rows = self.glyph_count.div_ceil(per_row).max(1);
        let needed = (rows * self.cell_size).next_power_of_two();
        if needed <= self.surface.height {
            return false;
        }
        log::debug!(
            "GlyphAtlas: cell size {} growing to {}×{}",
            self.cell_size,
            self.surface.width,
            needed
        );
        self.surface.grow(needed);
        self.texture = TextureHandle::next();
        self.dirty = true;
        true
    }

    /// Where slot `index` lives
    pub fn slot_location(&self, index: u32) -> SlotLocation {
        let cols = self.surface.width / self.cell_size;
        let cell = index / 4;
        SlotLocation {
            x: (cell % cols) * self.cell_size,
            y: (cell / cols) * self.cell_size,
            channel: (index % 4) as u8,
        }
    }

    /// Mark a slot as being rasterized
    ///
    /// Returns false if it already was.
    pub fn begin_raster(&mut self, index: u32) -> bool {
        self.in_flight.insert(index)
    }

    /// True if a slot is being rasterized
    pub fn is_in_flight(&self, index: u32) -> bool {
        self.in_flight.contains(&index)
    }

    /// Write a single-channel field into slot `index`
    ///
    /// Skipped (apart from clearing the in-flight mark) while the context is
    /// lost. `data` must hold `cell_size²` bytes; rows beyond the surface are
    /// dropped.
    pub fn write_channel(&mut self, index: u32, data: &[u8]) {
        self.in_flight.remove(&index);
        if self.context_lost {
            return;
        }

        let loc = self.slot_location(index);
        let cell = to_usize(self.cell_size);
        let width = to_usize(self.surface.width);
        let (x0, y0) = (to_usize(loc.x), to_usize(loc.y));
        let channel = usize::from(loc.channel);
        for (row, src) in data.chunks(cell).take(cell).enumerate() {
            let start = ((y0 + row) * width + x0) * 4 + channel;
            for (col, value) in src.iter().enumerate() {
                if let Some(texel) = self.surface.data.get_mut(start + col * 4) {
                    *texel = *value;
                }
            }
        }

        self.dirty = true;
        if self.restoring.remove(&index) {
            if self.restoring.is_empty() {
                self.version += 1;
            }
        } else {
            self.version += 1;
        }
    }

    /// The backing texture became invalid
    ///
    /// Until [`Self::context_restored`], entries are still assigned but
    /// surface writes are skipped.
    pub fn context_lost(&mut self) {
        log::debug!("GlyphAtlas: cell size {}: context lost", self.cell_size);
        self.context_lost = true;
    }

    /// The backing texture is available again
    ///
    /// Clears the surface and returns every known entry (with its font URL),
    /// which must all be rasterized again. The version is bumped once, when
    /// the last of these has been written.
    pub fn context_restored(&mut self) -> Vec<(String, Arc<GlyphShapeEntry>)> {
        log::debug!(
            "GlyphAtlas: cell size {}: context restored; {} glyphs to regenerate",
            self.cell_size,
            self.glyph_count
        );
        self.context_lost = false;
        self.surface = Surface::new(self.surface.width, self.surface.height);
        self.texture = TextureHandle::next();
        let mut entries: Vec<_> = self
            .fonts
            .iter()
            .flat_map(|(url, table)| table.values().map(move |e| (url.clone(), e.clone())))
            .collect();
        entries.sort_by_key(|(_, e)| e.atlas_index);
        self.restoring = entries.iter().map(|(_, e)| e.atlas_index).collect();
        if self.restoring.is_empty() {
            self.version += 1;
            self.dirty = true;
        }
        entries
    }

    /// Return and clear the dirty flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Number of entries for a font
    pub fn num_entries(&self, font_url: &str) -> usize {
        self.fonts.get(font_url).map(|t| t.len()).unwrap_or(0)
    }
}
