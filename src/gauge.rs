//! The gauge component: configuration, displayed value, animation and cached geometry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::animation::{Frame, OnEnd, ValueAnimator};
use crate::config::GaugeConfig;
use crate::geometry::{self, DialGeometry, GeometryCache, Needle};

#[derive(Debug)]
pub struct Gauge {
    config: GaugeConfig,
    diameter: u32,
    animator: ValueAnimator,
    geometry: GeometryCache,
    redraw_requested: bool,
}

impl Gauge {
    pub fn new(config: GaugeConfig) -> Self {
        let initial = config.min_value;
        Self {
            config,
            diameter: 0,
            animator: ValueAnimator::new(initial),
            geometry: GeometryCache::new(),
            redraw_requested: true,
        }
    }

    pub fn config(&self) -> &GaugeConfig {
        &self.config
    }

    pub fn diameter(&self) -> u32 {
        self.diameter
    }

    /// The value the needle currently shows.
    pub fn value(&self) -> i32 {
        self.animator.current()
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_running()
    }

    /// Animates the needle from its displayed value to `target` over `duration_ms`.
    pub fn set_gauge_value(&mut self, target: i32, duration_ms: u64, on_end: Option<OnEnd>) {
        self.set_gauge_value_over(target, Duration::from_millis(duration_ms), on_end);
    }

    pub fn set_gauge_value_over(&mut self, target: i32, duration: Duration, on_end: Option<OnEnd>) {
        let current = self.animator.current();
        self.animator.animate(current, target, duration, on_end);
    }

    /// Advances the animation to `now`. Returns whether a new value was produced.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.animator.tick(now) {
            Frame::Idle => false,
            Frame::Running(_) | Frame::Finished(_) => {
                self.redraw_requested = true;
                true
            }
        }
    }

    pub fn resize(&mut self, diameter: u32) {
        if self.diameter != diameter {
            self.diameter = diameter;
            self.redraw_requested = true;
        }
    }

    /// Returns and clears the pending redraw request.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    pub fn angle(&self, value: i32) -> f64 {
        geometry::angle_for(&self.config, value)
    }

    /// Ticks, labels and rim arcs for the current size; rebuilt only after a change.
    pub fn dial(&mut self) -> Arc<DialGeometry> {
        self.geometry.dial(&self.config, self.diameter)
    }

    pub fn needle(&self) -> Option<Needle> {
        geometry::needle_for(&self.config, self.diameter, self.value())
    }

    pub fn set_min_value(&mut self, min_value: i32) {
        self.reconfigure(|config| config.min_value = min_value);
    }

    pub fn set_max_value(&mut self, max_value: i32) {
        self.reconfigure(|config| config.max_value = max_value);
    }

    pub fn set_value_step(&mut self, value_step: i32) {
        self.reconfigure(|config| config.value_step = value_step);
    }

    pub fn set_minor_mark_step(&mut self, minor_mark_step: i32) {
        self.reconfigure(|config| config.minor_mark_step = minor_mark_step);
    }

    pub fn set_border_width(&mut self, border_width: f64) {
        self.reconfigure(|config| config.border_width = border_width);
    }

    pub fn set_critical_section_percent(&mut self, percent: f64) {
        self.reconfigure(|config| config.critical_section_percent = percent);
    }

    pub fn set_sweep(&mut self, start_angle: f64, end_angle: f64) {
        self.reconfigure(|config| {
            config.start_angle = start_angle;
            config.end_angle = end_angle;
        });
    }

    pub fn set_config(&mut self, config: GaugeConfig) {
        self.reconfigure(|current| *current = config);
    }

    fn reconfigure(&mut self, update: impl FnOnce(&mut GaugeConfig)) {
        update(&mut self.config);
        // The cache keys on the config, so a changed field is picked up by the next `dial()`.
        debug!(
            min = self.config.min_value,
            max = self.config.max_value,
            step = self.config.value_step,
            "gauge reconfigured"
        );
        self.redraw_requested = true;
    }
}
