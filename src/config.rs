use std::fmt;
use std::time::Duration;

use bon::Builder;
use rusttype::Font;

/// Opaque RGB paint for dial, needle and label commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0x00, 0x00, 0x00);
    pub const WHITE: Color = Color::new(0xff, 0xff, 0xff);
    pub const RED: Color = Color::new(0xff, 0x00, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Value range, sweep and layout lengths of a single circular gauge.
///
/// Angles are degrees, measured counter-clockwise from the positive x axis.
/// The default sweep runs clockwise on screen from 220° down to -40°.
/// Lengths are in surface pixels and are measured inward from the rim.
///
/// Nothing here is validated: `max_value <= min_value` or a non-positive step
/// yields degenerate geometry rather than an error.
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct GaugeConfig {
    #[builder(default = 0)]
    pub min_value: i32,
    #[builder(default = 220)]
    pub max_value: i32,
    /// Distance between labelled major ticks.
    #[builder(default = 20)]
    pub value_step: i32,
    #[builder(default = 5)]
    pub minor_mark_step: i32,
    #[builder(default = 220.0)]
    pub start_angle: f64,
    #[builder(default = -40.0)]
    pub end_angle: f64,
    /// Fraction of the sweep, counted back from `end_angle`, drawn as the warning zone.
    #[builder(default = 0.2)]
    pub critical_section_percent: f64,

    // Dial rim
    #[builder(default = 10.0)]
    pub border_width: f64,
    #[builder(default = 20.0)]
    pub critical_section_width: f64,
    #[builder(default = 20.0)]
    pub critical_section_inset: f64,

    // Ticks and labels
    #[builder(default = 10.0)]
    pub tick_margin: f64,
    #[builder(default = 30.0)]
    pub tick_text_margin: f64,
    #[builder(default = 50.0)]
    pub major_tick_length: f64,
    #[builder(default = 25.0)]
    pub minor_tick_length: f64,

    // Needle
    #[builder(default = 30.0)]
    pub hub_radius: f64,
    /// How far the needle base sits behind the center.
    #[builder(default = 60.0)]
    pub needle_tail: f64,
    #[builder(default = 10.0)]
    pub needle_half_width: f64,
    /// Gap between the needle tip and the rim.
    #[builder(default = 150.0)]
    pub needle_tip_inset: f64,
}

impl Default for GaugeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GaugeConfig {
    /// Tachometer preset matching the generator's engine rate range.
    pub fn engine_rate() -> Self {
        Self::builder()
            .max_value(7000)
            .value_step(1000)
            .minor_mark_step(250)
            .build()
    }
}

/// Paint settings consumed by the rasterizer only; geometry ignores them.
#[derive(Clone, Builder)]
pub struct GaugeStyle {
    #[builder(default = Color::WHITE)]
    pub background_color: Color,
    #[builder(default = Color::BLACK)]
    pub dial_color: Color,
    #[builder(default = Color::RED)]
    pub critical_color: Color,
    #[builder(default = Color::BLACK)]
    pub needle_color: Color,
    #[builder(default = Color::BLACK)]
    pub hub_color: Color,
    #[builder(default = Color::BLACK)]
    pub text_color: Color,
    #[builder(default = 6.0)]
    pub minor_tick_thickness: f32,
    #[builder(default = 40.0)]
    pub label_font_size: f32,
    /// Tick labels are skipped when no font is loaded.
    pub font: Option<Font<'static>>,
}

impl Default for GaugeStyle {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for GaugeStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GaugeStyle")
            .field("background_color", &self.background_color)
            .field("dial_color", &self.dial_color)
            .field("critical_color", &self.critical_color)
            .field("needle_color", &self.needle_color)
            .field("hub_color", &self.hub_color)
            .field("text_color", &self.text_color)
            .field("minor_tick_thickness", &self.minor_tick_thickness)
            .field("label_font_size", &self.label_font_size)
            .field("font", &self.font.as_ref().map(|_| "<loaded>"))
            .finish()
    }
}

/// Emission cadence and output ranges of the telemetry generator.
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct GeneratorConfig {
    #[builder(default = Duration::from_millis(100))]
    pub interval: Duration,
    #[builder(default = 7000.0)]
    pub engine_rate_max: f64,
    #[builder(default = 220.0)]
    pub speed_max: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, PartialEq, Builder)]
pub struct DashboardConfig {
    #[builder(default)]
    pub speed_gauge: GaugeConfig,
    #[builder(default = GaugeConfig::engine_rate())]
    pub engine_rate_gauge: GaugeConfig,
    #[builder(default = Duration::from_millis(100))]
    pub speed_transition: Duration,
    /// Engine rate jumps straight to each new reading.
    #[builder(default = Duration::ZERO)]
    pub engine_rate_transition: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Configuration for application window
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct WindowConfig {
    #[builder(default = "Speedometer".to_string())]
    pub title: String,
    #[builder(default = 900)]
    pub width: usize,
    #[builder(default = 450)]
    pub height: usize,
    #[builder(default = 60.0)]
    pub max_framerate: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
