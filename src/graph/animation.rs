//! Spring-based animation for camera moves
//!
//! Critically-damped spring physics: values converge on their target without
//! overshoot unless a preset is configured below damping 1.0.
//!
//! No callbacks. Call `tick(dt)` once per frame, then read `get()`.
//!
//! Presets come from the `animation.springs` section of
//! `config/graph_settings.yaml` (`fast`, `medium`, `slow`).

use egui::Pos2;

use crate::config::{global_config, SpringConfigYaml};

/// Spring configuration parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringConfig {
    /// Stiffness (higher = faster response). Typical: 80-300
    pub stiffness: f32,
    /// Damping ratio: 1.0 = critically damped
    pub damping: f32,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::from_preset("medium")
    }
}

impl From<SpringConfigYaml> for SpringConfig {
    fn from(yaml: SpringConfigYaml) -> Self {
        Self {
            stiffness: yaml.stiffness,
            damping: yaml.damping,
        }
    }
}

impl SpringConfig {
    /// Load a named preset; unknown names get the medium spring
    pub fn from_preset(name: &str) -> Self {
        global_config().animation.spring(name).into()
    }
}

// =============================================================================
// SPRING F32
// =============================================================================

#[derive(Debug, Clone)]
pub struct SpringF32 {
    current: f32,
    target: f32,
    velocity: f32,
    config: SpringConfig,
}

impl SpringF32 {
    pub fn new(initial: f32) -> Self {
        Self::with_config(initial, SpringConfig::from_preset("medium"))
    }

    pub fn with_config(initial: f32, config: SpringConfig) -> Self {
        Self {
            current: initial,
            target: initial,
            velocity: 0.0,
            config,
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Jump to value, no animation
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.velocity = 0.0;
    }

    /// F = -k*x - c*v, with c = damping * 2 * sqrt(k)
    pub fn tick(&mut self, dt: f32) {
        // Large steps make the integration unstable
        let dt = dt.min(0.1);

        let displacement = self.current - self.target;
        let spring_force = -self.config.stiffness * displacement;
        let damping_force =
            -self.config.damping * 2.0 * self.config.stiffness.sqrt() * self.velocity;

        self.velocity += (spring_force + damping_force) * dt;
        self.current += self.velocity * dt;

        if (self.current - self.target).abs() < 0.0001 && self.velocity.abs() < 0.001 {
            self.current = self.target;
            self.velocity = 0.0;
        }
    }

    pub fn get(&self) -> f32 {
        self.current
    }

    pub fn is_animating(&self) -> bool {
        (self.current - self.target).abs() > 0.0001 || self.velocity.abs() > 0.001
    }
}

// =============================================================================
// SPRING POS2
// =============================================================================

/// A point animated by one spring per axis (camera center)
#[derive(Debug, Clone)]
pub struct SpringPos2 {
    x: SpringF32,
    y: SpringF32,
}

impl SpringPos2 {
    pub fn with_config(initial: Pos2, config: SpringConfig) -> Self {
        Self {
            x: SpringF32::with_config(initial.x, config),
            y: SpringF32::with_config(initial.y, config),
        }
    }

    pub fn set_target(&mut self, target: Pos2) {
        self.x.set_target(target.x);
        self.y.set_target(target.y);
    }

    pub fn target(&self) -> Pos2 {
        Pos2::new(self.x.target(), self.y.target())
    }

    pub fn set_immediate(&mut self, value: Pos2) {
        self.x.set_immediate(value.x);
        self.y.set_immediate(value.y);
    }

    pub fn tick(&mut self, dt: f32) {
        self.x.tick(dt);
        self.y.tick(dt);
    }

    pub fn get(&self) -> Pos2 {
        Pos2::new(self.x.get(), self.y.get())
    }

    pub fn is_animating(&self) -> bool {
        self.x.is_animating() || self.y.is_animating()
    }
}
