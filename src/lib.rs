//! Animated circular speedometer gauges fed by simulated engine telemetry.
//!
//! The core is rendering-agnostic:
//! - [`geometry`] maps values onto the dial's sweep and builds ticks, labels,
//!   rim arcs and the needle for a given surface diameter.
//! - [`animation`] eases the displayed value toward new targets, driven by
//!   whoever owns the frame clock.
//! - [`gauge`] ties a configuration, its cached geometry and an animator together.
//! - [`telemetry`] runs the background generator and its listener contract.
//!
//! [`dashboard`], [`render`] and [`app`] put two gauges in a winit window.
//!
//! ```no_run
//! use speedometer::{
//!     ChannelListener, Dashboard, GaugeStyle, GeneratorBinding, SpeedometerApp, WindowConfig,
//! };
//!
//! # fn main() -> speedometer::SpeedometerResult<()> {
//! let binding = GeneratorBinding::bind_default()?;
//! let (listener, receiver) = ChannelListener::channel();
//! binding.generator().register_listener(listener);
//!
//! SpeedometerApp::new(WindowConfig::default(), GaugeStyle::default(), Dashboard::default())
//!     .run(receiver)?;
//! binding.unbind();
//! # Ok(())
//! # }
//! ```

pub mod animation;
pub mod app;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod gauge;
pub mod geometry;
pub mod logging;
pub mod render;
pub mod telemetry;

pub use animation::{AnimationState, Frame, OnEnd, ValueAnimator};
pub use app::SpeedometerApp;
pub use config::{Color, DashboardConfig, GaugeConfig, GaugeStyle, GeneratorConfig, WindowConfig};
pub use dashboard::{Dashboard, Placement};
pub use error::{SpeedometerError, SpeedometerResult};
pub use gauge::Gauge;
pub use geometry::{DialGeometry, Needle, Point, Segment, TickKind, TickMark};
pub use telemetry::{
    ChannelListener, Clock, EngineValueGenerator, EngineValueListener, GeneratorBinding,
    ManualClock, RandomWalkSignal, SineSignal, Signal, SystemClock, TelemetryEvent,
};
