// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Type conversion utilities
//!
//! Atlas indices, glyph counts and surface sizes are represented as `u32`
//! instead of `usize` in order to save space and to match what a renderer
//! uploads to the GPU.

use easy_cast::Cast;

/// Convert `u32` → `usize`
///
/// This is a "safer" wrapper around `as` ensuring that the operation is
/// zero-extension.
#[inline]
pub fn to_usize(x: u32) -> usize {
    x.cast()
}

/// Scale factor: pixels per font unit
///
/// Font metrics and glyph outlines are expressed in font units; multiply by
/// this to get a size in the units of the requested font size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DPU(pub f32);

impl DPU {
    /// Construct from a font size and the font's units-per-em
    #[inline]
    pub fn new(font_size: f32, units_per_em: f32) -> Self {
        if units_per_em > 0.0 {
            DPU(font_size / units_per_em)
        } else {
            DPU(0.0)
        }
    }

    /// Convert a font-unit value
    #[inline]
    pub fn to_px(self, x: f32) -> f32 {
        x * self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpu_scales_font_units() {
        let dpu = DPU::new(16.0, 2048.0);
        assert_eq!(dpu.to_px(1024.0), 8.0);
    }

    #[test]
    fn dpu_zero_units_per_em() {
        assert_eq!(DPU::new(16.0, 0.0).to_px(100.0), 0.0);
    }
}
