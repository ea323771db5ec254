// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Simple data types

/// 2D vector
///
/// Usually used as a position, in the units of the requested font size, with
/// `y` pointing up: the first line's baseline sits below the anchor point at a
/// negative `y`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec2(pub f32, pub f32);

/// Axis-aligned rectangle
///
/// Stored as `[min_x, min_y, max_x, max_y]` order fields. [`Rect::EMPTY`] is
/// inverted (min at +∞, max at −∞) so that the first [`Rect::include`] snaps
/// it onto the included box.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Default for Rect {
    fn default() -> Self {
        Rect::EMPTY
    }
}

impl Rect {
    /// An inverted, empty rectangle
    pub const EMPTY: Rect = Rect {
        min_x: f32::INFINITY,
        min_y: f32::INFINITY,
        max_x: f32::NEG_INFINITY,
        max_y: f32::NEG_INFINITY,
    };

    /// Construct from bounds
    #[inline]
    pub const fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Rect {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// True if nothing has been included
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Grow to include `other`
    pub fn include(&mut self, other: &Rect) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    /// Width (zero when empty)
    #[inline]
    pub fn width(&self) -> f32 {
        (self.max_x - self.min_x).max(0.0)
    }

    /// Height (zero when empty)
    #[inline]
    pub fn height(&self) -> f32 {
        (self.max_y - self.min_y).max(0.0)
    }

    /// As an array: `[min_x, min_y, max_x, max_y]`
    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rect_include() {
        let mut r = Rect::EMPTY;
        assert!(r.is_empty());
        r.include(&Rect::new(1.0, 2.0, 3.0, 4.0));
        r.include(&Rect::new(-1.0, 3.0, 2.0, 5.0));
        assert_eq!(r.to_array(), [-1.0, 2.0, 3.0, 5.0]);
        assert_eq!(r.width(), 4.0);
    }
}
