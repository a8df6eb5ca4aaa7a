/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Editor configuration.
//!
//! Every tunable threshold of the engine lives here with its default. The
//! whole tree deserializes from TOML; missing sections and fields fall back
//! to the defaults below.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub virtualizer: VirtualizerConfig,
    pub connections: ConnectionConfig,
    pub canvas: CanvasConfig,
    pub validation: ValidationConfig,
    pub store: StoreConfig,
}

impl EditorConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.canvas.check_zoom_range()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

/// Horizontal and vertical distance between layout slots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spacing {
    pub x: f32,
    pub y: f32,
}

impl Default for Spacing {
    fn default() -> Self {
        Self { x: 200.0, y: 150.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualizerConfig {
    pub spacing: Spacing,
    pub node_width: f32,
    pub node_height: f32,
    /// Margin around the viewport that still counts as renderable.
    pub buffer: f32,
    /// Node count at which culling starts to pay off.
    pub virtualize_threshold: usize,
    pub cache_ttl_ms: u64,
    pub cache_prune_age_ms: u64,
    pub cache_high_water_mark: usize,
    pub sample_interval_ms: u64,
}

impl VirtualizerConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn cache_prune_age(&self) -> Duration {
        Duration::from_millis(self.cache_prune_age_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

impl Default for VirtualizerConfig {
    fn default() -> Self {
        Self {
            spacing: Spacing::default(),
            node_width: 120.0,
            node_height: 80.0,
            buffer: 200.0,
            virtualize_threshold: 50,
            cache_ttl_ms: 5_000,
            cache_prune_age_ms: 10_000,
            cache_high_water_mark: 1_000,
            sample_interval_ms: 1_000,
        }
    }
}

/// Zoom levels at which connection paths gain fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexityThresholds {
    pub simple: f32,
    pub routed: f32,
    pub full: f32,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self {
            simple: 0.5,
            routed: 1.0,
            full: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub thresholds: ComplexityThresholds,
    pub max_rendered: usize,
    /// Perpendicular offset of the quadratic control point, as a fraction of edge length.
    pub curve_offset_ratio: f32,
    /// Largest lateral separation applied to cubic control points.
    pub lane_separation: f32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            thresholds: ComplexityThresholds::default(),
            max_rendered: 500,
            curve_offset_ratio: 0.15,
            lane_separation: 24.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationMode {
    #[default]
    Linear,
    Spatial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub zoom_step: f32,
    pub zoom_debounce_ms: u64,
    pub pan_debounce_ms: u64,
    pub node_list_debounce_ms: u64,
    pub grid_size: f32,
    pub snap_to_grid: bool,
    pub snap_to_tier: bool,
    pub structural_editing: bool,
    pub require_structural_confirmation: bool,
    /// Largest tier delta applied without confirmation.
    pub max_auto_tier_delta: u32,
    /// Distance from a drop-zone slot within which a drop counts as valid.
    pub drop_snap_threshold: f32,
    pub navigation_mode: NavigationMode,
}

impl CanvasConfig {
    /// Zoom bounds must be finite, positive and ordered.
    pub fn check_zoom_range(&self) -> Result<(), ConfigError> {
        let (min, max) = (self.zoom_min, self.zoom_max);
        if !min.is_finite() || !max.is_finite() || min <= 0.0 || min > max {
            return Err(ConfigError::Parse(format!(
                "invalid canvas zoom range [{min}, {max}]"
            )));
        }
        Ok(())
    }

    pub fn zoom_debounce(&self) -> Duration {
        Duration::from_millis(self.zoom_debounce_ms)
    }

    pub fn pan_debounce(&self) -> Duration {
        Duration::from_millis(self.pan_debounce_ms)
    }

    pub fn node_list_debounce(&self) -> Duration {
        Duration::from_millis(self.node_list_debounce_ms)
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            zoom_min: 0.1,
            zoom_max: 3.0,
            zoom_step: 0.1,
            zoom_debounce_ms: 100,
            pan_debounce_ms: 16,
            node_list_debounce_ms: 50,
            grid_size: 20.0,
            snap_to_grid: true,
            snap_to_tier: true,
            structural_editing: true,
            require_structural_confirmation: false,
            max_auto_tier_delta: 2,
            drop_snap_threshold: 60.0,
            navigation_mode: NavigationMode::Linear,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Prerequisite chains deeper than this produce an advisory warning.
    pub max_chain_depth: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { max_chain_depth: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub validation_delay_ms: u64,
    pub desync_debounce_ms: u64,
    pub desync_check_interval_ms: u64,
    pub auto_recover: bool,
    pub persist_on_mutation: bool,
}

impl StoreConfig {
    pub fn validation_delay(&self) -> Duration {
        Duration::from_millis(self.validation_delay_ms)
    }

    pub fn desync_debounce(&self) -> Duration {
        Duration::from_millis(self.desync_debounce_ms)
    }

    pub fn desync_check_interval(&self) -> Duration {
        Duration::from_millis(self.desync_check_interval_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            validation_delay_ms: 75,
            desync_debounce_ms: 100,
            desync_check_interval_ms: 1_000,
            auto_recover: true,
            persist_on_mutation: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Config IO error: {e}"),
            ConfigError::Parse(e) => write!(f, "Config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_constants() {
        let config = EditorConfig::default();
        assert_eq!(config.virtualizer.buffer, 200.0);
        assert_eq!(config.virtualizer.virtualize_threshold, 50);
        assert_eq!(config.virtualizer.cache_ttl(), Duration::from_secs(5));
        assert_eq!(config.virtualizer.cache_high_water_mark, 1_000);
        assert_eq!(config.connections.max_rendered, 500);
        assert_eq!(config.canvas.max_auto_tier_delta, 2);
        assert_eq!(config.validation.max_chain_depth, 5);
    }

    #[test]
    fn test_partial_toml_keeps_remaining_defaults() {
        let config = EditorConfig::from_toml_str(
            r#"
            [canvas]
            require_structural_confirmation = true
            navigation_mode = "spatial"

            [virtualizer.spacing]
            x = 250.0
            "#,
        )
        .unwrap();

        assert!(config.canvas.require_structural_confirmation);
        assert_eq!(config.canvas.navigation_mode, NavigationMode::Spatial);
        assert_eq!(config.canvas.zoom_step, 0.1);
        assert_eq!(config.virtualizer.spacing.x, 250.0);
        assert_eq!(config.virtualizer.spacing.y, 150.0);
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_malformed_toml_reports_parse_error() {
        let err = EditorConfig::from_toml_str("[canvas\nzoom_min = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_inverted_zoom_range_is_rejected() {
        let err = EditorConfig::from_toml_str("[canvas]\nzoom_min = 3.0\nzoom_max = 0.5")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_non_positive_zoom_bound_is_rejected() {
        assert!(EditorConfig::from_toml_str("[canvas]\nzoom_min = 0.0").is_err());
        assert!(EditorConfig::from_toml_str("[canvas]\nzoom_max = inf").is_err());
    }

    #[test]
    fn test_load_missing_file_reports_io_error() {
        let err = EditorConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().starts_with("Config IO error"));
    }
}
