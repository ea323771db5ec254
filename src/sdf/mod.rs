// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Signed distance field generation
//!
//! A glyph's field is a single-channel `width × height` buffer covering the
//! glyph's *view box* (its outline bounds plus a margin, in font units). Each
//! texel encodes the distance from the texel centre to the nearest outline
//! edge:
//!
//! ```text
//! v = (1 - min(d / max_distance, 1)) ^ exponent / 2
//! byte = round(255 * (inside ? 1 - v : v))
//! ```
//!
//! so the outline itself sits at 127.5, values above are inside. Row 0 is the
//! bottom of the view box (`y` up, as in font units). Insideness uses the
//! non-zero winding rule.
//!
//! Two generators are provided: [`generate`] considers every edge for every
//! texel; [`generate_culled`] only considers edges within `max_distance` of
//! the current row (plus those crossing it). Their output is identical.
//!
//! Scheduling lives in [`Rasterizer`]: a [`TimeSlicedQueue`] on the calling
//! thread, with a [`WorkerPool`] as fallback.

mod path;
mod pool;
mod queue;
mod rasterizer;

pub(crate) use path::PathBuilder;
pub use path::{GlyphPath, PathCommand, Segment};
pub use pool::{PoolOutput, WorkerPool};
pub use queue::TimeSlicedQueue;
pub use rasterizer::{CpuBackend, Rasterizer, SdfBackend, SdfOutput, Strategy};

use crate::data::Rect;
use easy_cast::Conv;
use std::sync::Arc;
use thiserror::Error;

/// SDF generation failure
///
/// These are never surfaced to layout callers: a failing accelerated backend
/// falls back to the worker pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdfError {
    #[error("SDF backend produced no output")]
    EmptyOutput,
    #[error("SDF backend produced {actual} bytes; expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("SDF backend error: {0}")]
    Backend(String),
}

/// Inputs to SDF generation for one glyph
#[derive(Clone, Debug, PartialEq)]
pub struct SdfParams {
    /// Output width in texels
    pub width: u32,
    /// Output height in texels
    pub height: u32,
    pub path: Arc<GlyphPath>,
    /// Region covered by the output, in font units
    pub view_box: Rect,
    /// Distance (font units) at which the field saturates
    pub max_distance: f32,
    pub exponent: f32,
}

impl SdfParams {
    /// Output length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        usize::conv(self.width) * usize::conv(self.height)
    }

    /// True if the output is zero-sized
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Curve flattening tolerance: a quarter texel
    fn tolerance(&self) -> f32 {
        let w = self.view_box.width() / self.width.max(1) as f32;
        let h = self.view_box.height() / self.height.max(1) as f32;
        0.25 * w.max(h)
    }

    #[inline]
    fn texel_x(&self, x: u32) -> f32 {
        let vb = &self.view_box;
        vb.min_x + (x as f32 + 0.5) / self.width as f32 * (vb.max_x - vb.min_x)
    }

    #[inline]
    fn texel_y(&self, y: u32) -> f32 {
        let vb = &self.view_box;
        vb.min_y + (y as f32 + 0.5) / self.height as f32 * (vb.max_y - vb.min_y)
    }

    /// Encode a texel given the squared distance to the nearest edge
    #[inline]
    fn encode(&self, dist_sq: f32, inside: bool) -> u8 {
        let ratio = if self.max_distance > 0.0 {
            (dist_sq.sqrt() / self.max_distance).min(1.0)
        } else {
            1.0
        };
        let mut v = (1.0 - ratio).powf(self.exponent) / 2.0;
        if inside {
            v = 1.0 - v;
        }
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    }
}

/// Sample one texel against a set of edges
///
/// `edges` must include every edge crossing row `y`.
#[inline]
fn sample<'a>(params: &SdfParams, edges: impl Iterator<Item = &'a Segment>, x: f32, y: f32) -> u8 {
    let mut dist_sq = f32::INFINITY;
    let mut winding = 0;
    for edge in edges {
        dist_sq = dist_sq.min(edge.distance_sq(x, y));
        winding += edge.winding(x, y);
    }
    params.encode(dist_sq, winding != 0)
}

/// Reference generator: every edge for every texel
pub fn generate(params: &SdfParams) -> Vec<u8> {
    let mut out = vec![0u8; params.len()];
    let segments = params.path.flatten(params.tolerance());
    let w = usize::conv(params.width);
    for y in 0..params.height {
        let fy = params.texel_y(y);
        let row = usize::conv(y) * w;
        for x in 0..params.width {
            let fx = params.texel_x(x);
            out[row + usize::conv(x)] = sample(params, segments.iter(), fx, fy);
        }
    }
    out
}

/// Accelerated generator: per row, only edges near enough to matter
///
/// An edge further than `max_distance` from a texel saturates its distance
/// term, and an edge not spanning the row cannot change its winding, so
/// skipping such edges does not change the output.
pub fn generate_culled(params: &SdfParams) -> Vec<u8> {
    let mut out = vec![0u8; params.len()];
    let mut segments = params.path.flatten(params.tolerance());
    segments.sort_by(|a, b| a.min_y().total_cmp(&b.min_y()));
    let reach = params.max_distance.max(0.0);
    let w = usize::conv(params.width);

    let mut near = Vec::with_capacity(segments.len());
    for y in 0..params.height {
        let fy = params.texel_y(y);
        near.clear();
        // Sorted by min_y: stop once no later edge can be within reach
        for seg in segments.iter().take_while(|s| s.min_y() - reach <= fy) {
            if seg.max_y() + reach >= fy {
                near.push(*seg);
            }
        }

        let row = usize::conv(y) * w;
        for x in 0..params.width {
            let fx = params.texel_x(x);
            out[row + usize::conv(x)] = sample(params, near.iter(), fx, fy);
        }
    }
    out
}
