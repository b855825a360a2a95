//! Camera2D - pan/zoom with spring-based smooth interpolation
//!
//! Provides world-to-screen and screen-to-world coordinate transforms.
//! Camera state is UI-only: call `update(dt)` at the start of a frame, then
//! use the transforms for hit testing and rendering.
//!
//! Zoom is always clamped to `[min_zoom, max_zoom]` from
//! [`CameraSettings`].

use egui::{Pos2, Rect, Vec2};

use crate::config::{AnimationSettings, CameraSettings};

use super::animation::{SpringConfig, SpringF32, SpringPos2};

/// 2D camera with pan and zoom using spring physics
#[derive(Debug, Clone)]
pub struct Camera2D {
    /// Center of the view in world coordinates (animated)
    position: SpringPos2,
    /// Zoom level (animated) - 1.0 = 100%
    zoom: SpringF32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Factor for one zoom in / zoom out step
    pub zoom_step: f32,
    /// Screen padding kept around fitted content
    pub fit_padding: f32,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self::new(&CameraSettings::default(), &AnimationSettings::default())
    }
}

impl Camera2D {
    /// Pan and zoom both ride the `medium` spring from `animation`
    pub fn new(settings: &CameraSettings, animation: &AnimationSettings) -> Self {
        let spring = SpringConfig::from(animation.spring("medium"));
        Self {
            position: SpringPos2::with_config(Pos2::ZERO, spring),
            zoom: SpringF32::with_config(1.0, spring),
            min_zoom: settings.min_zoom,
            max_zoom: settings.max_zoom.max(settings.min_zoom),
            zoom_step: settings.zoom_step,
            fit_padding: settings.fit_padding,
        }
    }

    // =========================================================================
    // CURRENT VALUES
    // =========================================================================

    pub fn center(&self) -> Pos2 {
        self.position.get()
    }

    pub fn zoom(&self) -> f32 {
        self.zoom.get()
    }

    pub fn target_center(&self) -> Pos2 {
        self.position.target()
    }

    pub fn target_zoom(&self) -> f32 {
        self.zoom.target()
    }

    // =========================================================================
    // ANIMATION UPDATE
    // =========================================================================

    /// Advance the springs (call every frame)
    pub fn update(&mut self, dt: f32) {
        self.position.tick(dt);
        self.zoom.tick(dt);
    }

    /// Jump to the targets without interpolation
    pub fn snap_to_target(&mut self) {
        self.position.set_immediate(self.position.target());
        self.zoom.set_immediate(self.zoom.target());
    }

    pub fn is_animating(&self) -> bool {
        self.position.is_animating() || self.zoom.is_animating()
    }

    // =========================================================================
    // CONTROLS
    // =========================================================================

    /// Pan by a screen-space delta (background drag)
    pub fn pan(&mut self, screen_delta: Vec2) {
        let world_delta = screen_delta / self.zoom.get();
        self.position.set_target(self.position.target() - world_delta);
    }

    /// Animate the view center to a world position
    pub fn fly_to(&mut self, world_pos: Pos2) {
        self.position.set_target(world_pos);
    }

    /// Animate to a zoom level (clamped)
    pub fn zoom_to(&mut self, zoom_level: f32) {
        self.zoom
            .set_target(zoom_level.clamp(self.min_zoom, self.max_zoom));
    }

    pub fn zoom_in(&mut self) {
        self.zoom_to(self.zoom.target() * self.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_to(self.zoom.target() / self.zoom_step);
    }

    /// Zoom by factor, keeping `screen_pos` fixed in view
    pub fn zoom_at(&mut self, factor: f32, screen_pos: Pos2, screen_rect: Rect) {
        let old_zoom = self.zoom.target();
        let new_zoom = (old_zoom * factor).clamp(self.min_zoom, self.max_zoom);

        if (new_zoom - old_zoom).abs() > 0.001 {
            let offset_from_center = screen_pos - screen_rect.center();
            let world_offset_old = offset_from_center / old_zoom;
            let world_offset_new = offset_from_center / new_zoom;

            self.position
                .set_target(self.position.target() + (world_offset_old - world_offset_new));
            self.zoom.set_target(new_zoom);
        }
    }

    /// Center on `bounds` and zoom so it fits inside `screen_rect` minus
    /// padding. Zoom never exceeds 100% so small graphs are not blown up.
    pub fn fit_to_bounds(&mut self, bounds: Rect, screen_rect: Rect) {
        if bounds.is_negative() || !bounds.is_finite() {
            return;
        }

        self.fly_to(bounds.center());

        let padded = screen_rect.shrink(self.fit_padding);
        if padded.width() <= 0.0 || padded.height() <= 0.0 {
            return;
        }
        let zoom_x = padded.width() / bounds.width().max(1.0);
        let zoom_y = padded.height() / bounds.height().max(1.0);
        self.zoom_to(zoom_x.min(zoom_y).min(1.0));
    }

    /// Back to 100% centered on `world_center`
    pub fn reset(&mut self, world_center: Pos2) {
        self.fly_to(world_center);
        self.zoom_to(1.0);
    }

    // =========================================================================
    // COORDINATE TRANSFORMS
    // =========================================================================

    pub fn world_to_screen(&self, world_pos: Pos2, screen_rect: Rect) -> Pos2 {
        screen_rect.center() + (world_pos - self.center()) * self.zoom()
    }

    pub fn screen_to_world(&self, screen_pos: Pos2, screen_rect: Rect) -> Pos2 {
        self.center() + (screen_pos - screen_rect.center()) / self.zoom()
    }

    /// World-space rectangle currently on screen
    pub fn visible_bounds(&self, screen_rect: Rect) -> Rect {
        Rect::from_center_size(self.center(), screen_rect.size() / self.zoom())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpringConfigYaml;

    fn screen() -> Rect {
        Rect::from_min_size(Pos2::ZERO, Vec2::new(800.0, 600.0))
    }

    #[test]
    fn transforms_invert_each_other() {
        let mut cam = Camera2D::default();
        cam.fly_to(Pos2::new(40.0, -25.0));
        cam.zoom_to(2.0);
        cam.snap_to_target();

        let world = Pos2::new(13.0, 7.5);
        let back = cam.screen_to_world(cam.world_to_screen(world, screen()), screen());
        assert!((back - world).length() < 1e-3);
    }

    #[test]
    fn zoom_is_clamped_to_settings() {
        let mut cam = Camera2D::new(
            &CameraSettings {
                min_zoom: 0.5,
                max_zoom: 2.0,
                ..CameraSettings::default()
            },
            &AnimationSettings::default(),
        );
        for _ in 0..20 {
            cam.zoom_in();
        }
        assert_eq!(cam.target_zoom(), 2.0);
        for _ in 0..40 {
            cam.zoom_out();
        }
        assert_eq!(cam.target_zoom(), 0.5);
    }

    #[test]
    fn stiffer_medium_spring_moves_faster() {
        let springs = |stiffness: f32| AnimationSettings {
            springs: [(
                "medium".to_string(),
                SpringConfigYaml {
                    stiffness,
                    damping: 1.0,
                },
            )]
            .into_iter()
            .collect(),
        };
        let mut soft = Camera2D::new(&CameraSettings::default(), &springs(20.0));
        let mut stiff = Camera2D::new(&CameraSettings::default(), &springs(400.0));
        for cam in [&mut soft, &mut stiff] {
            cam.zoom_to(2.0);
            cam.fly_to(Pos2::new(100.0, 0.0));
            cam.update(0.05);
        }
        assert!(stiff.zoom() - 1.0 > soft.zoom() - 1.0);
        assert!(stiff.center().x > soft.center().x);
    }

    #[test]
    fn zoom_at_keeps_cursor_point_fixed() {
        let mut cam = Camera2D::default();
        let cursor = Pos2::new(600.0, 150.0);
        let before = cam.screen_to_world(cursor, screen());

        cam.zoom_at(1.5, cursor, screen());
        cam.snap_to_target();

        let after = cam.screen_to_world(cursor, screen());
        assert!((after - before).length() < 1e-3);
    }

    #[test]
    fn fit_centers_and_shrinks_large_bounds() {
        let mut cam = Camera2D::default();
        let bounds = Rect::from_center_size(Pos2::new(1000.0, 1000.0), Vec2::new(2000.0, 500.0));
        cam.fit_to_bounds(bounds, screen());
        cam.snap_to_target();

        assert_eq!(cam.center(), Pos2::new(1000.0, 1000.0));
        assert!((cam.zoom() - 700.0 / 2000.0).abs() < 1e-4);
    }

    #[test]
    fn fit_does_not_magnify_small_graphs() {
        let mut cam = Camera2D::default();
        cam.fit_to_bounds(Rect::from_center_size(Pos2::ZERO, Vec2::splat(20.0)), screen());
        assert_eq!(cam.target_zoom(), 1.0);
    }
}
