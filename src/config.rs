// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE-APACHE file or at:
//     https://www.apache.org/licenses/LICENSE-2.0

//! Engine configuration

use std::time::Duration;

/// Font used when none is requested, and as the single fallback when a
/// requested font fails to load
pub const DEFAULT_FONT_URL: &str = "file:///usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

/// Engine configuration
///
/// The defaults are usually a good choice. With the `serde` feature this may
/// be read from a configuration file; missing fields take their default.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Default font URL (see [`DEFAULT_FONT_URL`])
    pub default_font_url: String,
    /// Relative font URLs are joined onto this, if set
    pub base_url: Option<String>,
    /// Default SDF cell size in pixels
    ///
    /// Each distinct cell size has its own atlas.
    pub sdf_glyph_size: u32,
    /// Fixed width of every atlas surface, in pixels
    pub atlas_width: u32,
    /// Margin around each glyph outline, as a fraction of the cell size
    pub sdf_margin: f32,
    /// Maximum encoded distance, as a fraction of the cell size
    pub sdf_distance: f32,
    /// Exponent applied to encoded distances
    ///
    /// Higher values spend more precision near the outline.
    pub sdf_exponent: f32,
    /// Try the time-sliced accelerated strategy before the worker pool
    pub use_accelerated: bool,
    /// Time budget per accelerated-queue tick, in milliseconds
    pub time_budget_ms: u64,
    /// Number of fallback worker threads
    pub pool_size: usize,
    /// Idle time after which a fallback worker is torn down, in milliseconds
    pub idle_timeout_ms: u64,
    /// Number of renderable glyphs per chunked bounding box
    pub chunk_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_font_url: DEFAULT_FONT_URL.to_string(),
            base_url: None,
            sdf_glyph_size: 64,
            atlas_width: 2048,
            sdf_margin: 1.0 / 16.0,
            sdf_distance: 1.0 / 8.0,
            sdf_exponent: 9.0,
            use_accelerated: true,
            time_budget_ms: 5,
            pool_size: 4,
            idle_timeout_ms: 2000,
            chunk_size: 8192,
        }
    }
}

impl EngineConfig {
    /// Clamp nonsensical values
    ///
    /// The SDF cell size is rounded up to a power of two (at least 8), the
    /// atlas width is rounded up to a multiple of the cell size, and counts
    /// are made non-zero.
    pub fn validated(mut self) -> Self {
        self.sdf_glyph_size = normalize_cell_size(self.sdf_glyph_size);
        let cell = self.sdf_glyph_size;
        self.atlas_width = self.atlas_width.max(cell).div_ceil(cell) * cell;
        self.pool_size = self.pool_size.max(1);
        self.chunk_size = self.chunk_size.max(1);
        if !(self.sdf_exponent > 0.0) {
            self.sdf_exponent = 1.0;
        }
        self.sdf_margin = self.sdf_margin.max(0.0);
        if !(self.sdf_distance > 0.0) {
            self.sdf_distance = 1.0 / 8.0;
        }
        self
    }

    /// Time budget per accelerated-queue tick
    #[inline]
    pub fn time_budget(&self) -> Duration {
        Duration::from_millis(self.time_budget_ms)
    }

    /// Idle timeout of fallback workers
    #[inline]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Resolve a font URL against [`Self::base_url`]
    ///
    /// URLs with a scheme and absolute paths are returned unchanged.
    pub fn resolve_font_url(&self, url: &str) -> String {
        let is_absolute = url.contains("://") || url.starts_with('/');
        match &self.base_url {
            Some(base) if !is_absolute => {
                let base = base.trim_end_matches('/');
                let rel = url.trim_start_matches("./");
                format!("{base}/{rel}")
            }
            _ => url.to_string(),
        }
    }
}

/// Round a cell size up to a power of two, at least 8
pub(crate) fn normalize_cell_size(size: u32) -> u32 {
    size.clamp(8, 1 << 12).next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validated_clamps() {
        let config = EngineConfig {
            sdf_glyph_size: 40,
            atlas_width: 100,
            pool_size: 0,
            chunk_size: 0,
            ..Default::default()
        }
        .validated();
        assert_eq!(config.sdf_glyph_size, 64);
        assert_eq!(config.atlas_width, 128);
        assert_eq!(config.pool_size, 1);
        assert_eq!(config.chunk_size, 1);
    }

    #[test]
    fn default_is_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.clone().validated(), config);
    }

    #[test]
    fn resolve_relative_url() {
        let config = EngineConfig {
            base_url: Some("https://example.com/fonts/".into()),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_font_url("./a.ttf"),
            "https://example.com/fonts/a.ttf"
        );
        assert_eq!(config.resolve_font_url("file:///b.ttf"), "file:///b.ttf");
        assert_eq!(config.resolve_font_url("/c.ttf"), "/c.ttf");
    }
}
