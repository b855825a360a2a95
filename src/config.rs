//! Widget settings
//!
//! Force constants, camera limits, highlight tiers and spring presets are read
//! from `config/graph_settings.yaml`. The file is embedded at build time so the
//! WASM build needs no filesystem; native builds may point `KG_GRAPH_CONFIG` at
//! an override.
//!
//! Every section is `#[serde(default)]`, so a partial YAML only overrides the
//! keys it names.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::error::Result;

const EMBEDDED_SETTINGS: &str = include_str!("../config/graph_settings.yaml");

/// Environment variable naming an override settings file (native only)
pub const CONFIG_ENV_VAR: &str = "KG_GRAPH_CONFIG";

static GLOBAL_CONFIG: OnceLock<GraphSettings> = OnceLock::new();

/// Process-wide settings, loaded once on first use.
///
/// Falls back to the embedded defaults if the override file is missing or
/// malformed; the failure is logged, not raised.
pub fn global_config() -> &'static GraphSettings {
    GLOBAL_CONFIG.get_or_init(|| {
        #[cfg(not(target_arch = "wasm32"))]
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            match GraphSettings::load(&path) {
                Ok(settings) => {
                    tracing::info!("Loaded graph settings from {}", path);
                    return settings;
                }
                Err(e) => tracing::warn!("Ignoring {} ({}): {}", CONFIG_ENV_VAR, path, e),
            }
        }
        GraphSettings::embedded()
    })
}

// =============================================================================
// SETTINGS
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraphSettings {
    pub forces: ForceSettings,
    pub camera: CameraSettings,
    pub highlight: HighlightSettings,
    pub animation: AnimationSettings,
}

impl GraphSettings {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Settings shipped with the crate
    pub fn embedded() -> Self {
        Self::from_yaml_str(EMBEDDED_SETTINGS).unwrap_or_else(|e| {
            tracing::warn!("Embedded graph settings unreadable, using defaults: {}", e);
            Self::default()
        })
    }
}

/// Force-layout constants. Distances are world units, velocities world units
/// per tick.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForceSettings {
    /// Rest length of a link
    pub link_distance: f32,
    /// Link stiffness before degree normalisation
    pub link_strength: f32,
    /// Many-body repulsion strength
    pub repulsion: f32,
    /// Pairs further apart than this do not repel
    pub repulsion_max_distance: f32,
    /// Distance floor for the inverse-square term
    pub min_distance: f32,
    /// Pull toward the layout center
    pub center_strength: f32,
    /// Extra gap added to rendered radii for collision
    pub collision_padding: f32,
    pub collision_strength: f32,
    /// Fraction of velocity lost per tick
    pub velocity_decay: f32,
    pub max_velocity: f32,
    pub alpha_decay: f32,
    /// Below this alpha (and energy threshold) the layout counts as cooled
    pub alpha_min: f32,
    pub energy_threshold: f32,
    /// Alpha held while a node is dragged
    pub drag_alpha_target: f32,
    /// Alpha restored by drag release and resize
    pub reheat_alpha: f32,
}

impl Default for ForceSettings {
    fn default() -> Self {
        Self {
            link_distance: 120.0,
            link_strength: 0.7,
            repulsion: 400.0,
            repulsion_max_distance: 600.0,
            min_distance: 1.0,
            center_strength: 0.05,
            collision_padding: 6.0,
            collision_strength: 0.7,
            velocity_decay: 0.4,
            max_velocity: 50.0,
            alpha_decay: 0.0228,
            alpha_min: 0.001,
            energy_threshold: 0.5,
            drag_alpha_target: 0.3,
            reheat_alpha: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraSettings {
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Factor applied by zoom in / zoom out
    pub zoom_step: f32,
    pub fit_padding: f32,
    pub scroll_sensitivity: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 5.0,
            zoom_step: 1.2,
            fit_padding: 50.0,
            scroll_sensitivity: 0.001,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HighlightSettings {
    pub dimmed_opacity: f32,
    /// 0.0 keeps the palette color, 1.0 is full grey
    pub dimmed_desaturation: f32,
    pub shortest_width: f32,
    pub highlighted_width: f32,
    pub dimmed_width: f32,
    /// Relation labels are only drawn at or above this zoom
    pub edge_label_min_zoom: f32,
    /// Node labels are hidden when the on-screen radius is smaller
    pub node_label_min_radius: f32,
}

impl Default for HighlightSettings {
    fn default() -> Self {
        Self {
            dimmed_opacity: 0.2,
            dimmed_desaturation: 0.85,
            shortest_width: 3.5,
            highlighted_width: 2.2,
            dimmed_width: 0.5,
            edge_label_min_zoom: 0.8,
            node_label_min_radius: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct SpringConfigYaml {
    pub stiffness: f32,
    pub damping: f32,
}

impl Default for SpringConfigYaml {
    fn default() -> Self {
        Self {
            stiffness: 170.0,
            damping: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationSettings {
    pub springs: HashMap<String, SpringConfigYaml>,
}

impl AnimationSettings {
    /// Named spring preset, or the medium default when the name is unknown
    pub fn spring(&self, name: &str) -> SpringConfigYaml {
        self.springs.get(name).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_settings_parse() {
        let settings = GraphSettings::from_yaml_str(EMBEDDED_SETTINGS).unwrap();
        assert_eq!(settings.forces, ForceSettings::default());
        assert_eq!(settings.camera, CameraSettings::default());
        assert_eq!(settings.highlight, HighlightSettings::default());
        assert_eq!(settings.animation.spring("fast").stiffness, 300.0);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let settings = GraphSettings::from_yaml_str("camera:\n  max_zoom: 8.0\n").unwrap();
        assert_eq!(settings.camera.max_zoom, 8.0);
        assert_eq!(settings.camera.min_zoom, 0.1);
        assert_eq!(settings.forces, ForceSettings::default());
    }

    #[test]
    fn unknown_spring_falls_back_to_medium() {
        let settings = GraphSettings::default();
        assert_eq!(settings.animation.spring("nope"), SpringConfigYaml::default());
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = GraphSettings::from_yaml_str("forces: [1, 2").unwrap_err();
        assert!(matches!(err, crate::error::GraphError::Config(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = GraphSettings::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, crate::error::GraphError::Io(_)));
    }
}
