// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Glyph outline paths

use crate::data::Rect;
use std::fmt;

/// A path command, in font units
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    QuadTo(f32, f32, f32, f32),
    CurveTo(f32, f32, f32, f32, f32, f32),
    Close,
}

/// A straight line segment (after flattening)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Segment {
    /// Squared distance from `(x, y)` to the segment
    pub fn distance_sq(&self, x: f32, y: f32) -> f32 {
        let (dx, dy) = (self.x1 - self.x0, self.y1 - self.y0);
        let len_sq = dx * dx + dy * dy;
        let t = if len_sq > 0.0 {
            (((x - self.x0) * dx + (y - self.y0) * dy) / len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let (px, py) = (self.x0 + t * dx - x, self.y0 + t * dy - y);
        px * px + py * py
    }

    /// Winding contribution of a ray cast from `(x, y)` towards +x
    ///
    /// Uses the half-open rule on `y` so that a ray through a shared vertex
    /// is counted once.
    #[inline]
    pub fn winding(&self, x: f32, y: f32) -> i32 {
        if (self.y0 <= y) == (self.y1 <= y) {
            return 0;
        }
        let t = (y - self.y0) / (self.y1 - self.y0);
        let cx = self.x0 + t * (self.x1 - self.x0);
        if cx <= x {
            0
        } else if self.y1 > self.y0 {
            1
        } else {
            -1
        }
    }

    #[inline]
    pub(crate) fn min_y(&self) -> f32 {
        self.y0.min(self.y1)
    }

    #[inline]
    pub(crate) fn max_y(&self) -> f32 {
        self.y0.max(self.y1)
    }
}

/// A glyph outline
///
/// Formats as SVG path data via [`fmt::Display`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlyphPath {
    commands: Vec<PathCommand>,
}

impl GlyphPath {
    /// Construct from commands
    pub fn new(commands: Vec<PathCommand>) -> Self {
        GlyphPath { commands }
    }

    /// Access commands
    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    /// True if the path draws nothing
    pub fn is_empty(&self) -> bool {
        !self
            .commands
            .iter()
            .any(|cmd| !matches!(cmd, PathCommand::MoveTo(..) | PathCommand::Close))
    }

    /// Bounding box of all points (including control points)
    pub fn bounds(&self) -> Rect {
        let mut r = Rect::EMPTY;
        let mut add = |x: f32, y: f32| r.include(&Rect::new(x, y, x, y));
        for cmd in &self.commands {
            match *cmd {
                PathCommand::MoveTo(x, y) | PathCommand::LineTo(x, y) => add(x, y),
                PathCommand::QuadTo(x1, y1, x, y) => {
                    add(x1, y1);
                    add(x, y);
                }
                PathCommand::CurveTo(x1, y1, x2, y2, x, y) => {
                    add(x1, y1);
                    add(x2, y2);
                    add(x, y);
                }
                PathCommand::Close => (),
            }
        }
        r
    }

    /// Flatten into line segments
    ///
    /// Curves are subdivided such that each chord is roughly no longer than
    /// allowed by `tolerance` (font units). Every contour is closed.
    pub fn flatten(&self, tolerance: f32) -> Vec<Segment> {
        let tolerance = tolerance.max(1e-3);
        let mut segments = Vec::with_capacity(self.commands.len() * 2);
        let (mut sx, mut sy) = (0.0, 0.0);
        let (mut cx, mut cy) = (0.0, 0.0);
        let mut open = false;

        let line = |segments: &mut Vec<Segment>, x0, y0, x1, y1| {
            if x0 != x1 || y0 != y1 {
                segments.push(Segment { x0, y0, x1, y1 });
            }
        };

        for cmd in &self.commands {
            match *cmd {
                PathCommand::MoveTo(x, y) => {
                    if open {
                        line(&mut segments, cx, cy, sx, sy);
                    }
                    (sx, sy, cx, cy) = (x, y, x, y);
                    open = true;
                }
                PathCommand::LineTo(x, y) => {
                    line(&mut segments, cx, cy, x, y);
                    (cx, cy) = (x, y);
                    open = true;
                }
                PathCommand::QuadTo(x1, y1, x, y) => {
                    let n = steps(cx, cy, x1, y1, x, y, tolerance);
                    let (mut px, mut py) = (cx, cy);
                    for i in 1..=n {
                        let t = i as f32 / n as f32;
                        let mt = 1.0 - t;
                        let qx = mt * mt * cx + 2.0 * mt * t * x1 + t * t * x;
                        let qy = mt * mt * cy + 2.0 * mt * t * y1 + t * t * y;
                        line(&mut segments, px, py, qx, qy);
                        (px, py) = (qx, qy);
                    }
                    (cx, cy) = (x, y);
                    open = true;
                }
                PathCommand::CurveTo(x1, y1, x2, y2, x, y) => {
                    let n = steps(cx, cy, x1, y1, x2, y2, tolerance)
                        .max(steps(x1, y1, x2, y2, x, y, tolerance));
                    let (mut px, mut py) = (cx, cy);
                    for i in 1..=n {
                        let t = i as f32 / n as f32;
                        let mt = 1.0 - t;
                        let a = mt * mt * mt;
                        let b = 3.0 * mt * mt * t;
                        let c = 3.0 * mt * t * t;
                        let d = t * t * t;
                        let qx = a * cx + b * x1 + c * x2 + d * x;
                        let qy = a * cy + b * y1 + c * y2 + d * y;
                        line(&mut segments, px, py, qx, qy);
                        (px, py) = (qx, qy);
                    }
                    (cx, cy) = (x, y);
                    open = true;
                }
                PathCommand::Close => {
                    line(&mut segments, cx, cy, sx, sy);
                    (cx, cy) = (sx, sy);
                    open = false;
                }
            }
        }
        if open {
            line(&mut segments, cx, cy, sx, sy);
        }
        segments
    }
}

/// Number of subdivisions for a curve with control polygon `a, b, c`
fn steps(ax: f32, ay: f32, bx: f32, by: f32, cx: f32, cy: f32, tolerance: f32) -> u32 {
    let len = (bx - ax).hypot(by - ay) + (cx - bx).hypot(cy - by);
    ((len / tolerance).sqrt().ceil() as u32).clamp(1, 32)
}

impl fmt::Display for GlyphPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cmd) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match *cmd {
                PathCommand::MoveTo(x, y) => write!(f, "M{x},{y}")?,
                PathCommand::LineTo(x, y) => write!(f, "L{x},{y}")?,
                PathCommand::QuadTo(x1, y1, x, y) => write!(f, "Q{x1},{y1},{x},{y}")?,
                PathCommand::CurveTo(x1, y1, x2, y2, x, y) => {
                    write!(f, "C{x1},{y1},{x2},{y2},{x},{y}")?
                }
                PathCommand::Close => f.write_str("Z")?,
            }
        }
        Ok(())
    }
}

/// Collects a glyph outline from `ttf-parser`
#[derive(Default)]
pub(crate) struct PathBuilder(Vec<PathCommand>);

impl PathBuilder {
    pub(crate) fn finish(self) -> GlyphPath {
        GlyphPath::new(self.0)
    }
}

impl ttf_parser::OutlineBuilder for PathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.push(PathCommand::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.0.push(PathCommand::LineTo(x, y));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.0.push(PathCommand::QuadTo(x1, y1, x, y));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.0.push(PathCommand::CurveTo(x1, y1, x2, y2, x, y));
    }

    fn close(&mut self) {
        self.0.push(PathCommand::Close);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f32, y0: f32, x1: f32, y1: f32) -> GlyphPath {
        GlyphPath::new(vec![
            PathCommand::MoveTo(x0, y0),
            PathCommand::LineTo(x1, y0),
            PathCommand::LineTo(x1, y1),
            PathCommand::LineTo(x0, y1),
            PathCommand::Close,
        ])
    }

    #[test]
    fn flatten_square() {
        let segs = square(0.0, 0.0, 10.0, 10.0).flatten(1.0);
        assert_eq!(segs.len(), 4);
        let winding: i32 = segs.iter().map(|s| s.winding(5.0, 5.0)).sum();
        assert_ne!(winding, 0);
        let winding: i32 = segs.iter().map(|s| s.winding(15.0, 5.0)).sum();
        assert_eq!(winding, 0);
    }

    #[test]
    fn flatten_closes_open_contour() {
        let path = GlyphPath::new(vec![
            PathCommand::MoveTo(0.0, 0.0),
            PathCommand::QuadTo(5.0, 10.0, 10.0, 0.0),
        ]);
        let segs = path.flatten(0.5);
        let last = segs.last().unwrap();
        assert_eq!((last.x1, last.y1), (0.0, 0.0));
        assert!(segs.len() > 2);
    }

    #[test]
    fn segment_distance() {
        let s = Segment {
            x0: 0.0,
            y0: 0.0,
            x1: 10.0,
            y1: 0.0,
        };
        assert_eq!(s.distance_sq(5.0, 3.0), 9.0);
        assert_eq!(s.distance_sq(-3.0, 4.0), 25.0);
    }

    #[test]
    fn svg_display() {
        let path = square(0.0, 0.0, 1.0, 2.0);
        assert_eq!(path.to_string(), "M0,0 L1,0 L1,2 L0,2 Z");
        assert!(!path.is_empty());
        assert!(GlyphPath::default().is_empty());
        assert_eq!(path.bounds().to_array(), [0.0, 0.0, 1.0, 2.0]);
    }
}
