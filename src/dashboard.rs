//! Speed and engine-rate gauges fed from the telemetry channel.

use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::config::DashboardConfig;
use crate::gauge::Gauge;
use crate::geometry::Point;
use crate::telemetry::TelemetryEvent;

/// Where a gauge sits on the surface: its top-left corner and diameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub origin: Point,
    pub diameter: u32,
}

#[derive(Debug)]
pub struct Dashboard {
    speed: Gauge,
    engine_rate: Gauge,
    speed_transition: Duration,
    engine_rate_transition: Duration,
    speed_placement: Placement,
    engine_rate_placement: Placement,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Self {
        let unplaced = Placement {
            origin: Point::new(0.0, 0.0),
            diameter: 0,
        };
        Self {
            speed: Gauge::new(config.speed_gauge),
            engine_rate: Gauge::new(config.engine_rate_gauge),
            speed_transition: config.speed_transition,
            engine_rate_transition: config.engine_rate_transition,
            speed_placement: unplaced,
            engine_rate_placement: unplaced,
        }
    }

    pub fn speed(&self) -> &Gauge {
        &self.speed
    }

    pub fn engine_rate(&self) -> &Gauge {
        &self.engine_rate
    }

    pub fn speed_mut(&mut self) -> &mut Gauge {
        &mut self.speed
    }

    pub fn engine_rate_mut(&mut self) -> &mut Gauge {
        &mut self.engine_rate
    }

    /// Both gauges with where they are drawn, speed first.
    pub fn gauges_mut(&mut self) -> [(&mut Gauge, Placement); 2] {
        [
            (&mut self.speed, self.speed_placement),
            (&mut self.engine_rate, self.engine_rate_placement),
        ]
    }

    pub fn apply(&mut self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::Speed(speed) => {
                self.speed
                    .set_gauge_value_over(speed, self.speed_transition, None);
            }
            TelemetryEvent::EngineRate(engine_rate) => {
                self.engine_rate
                    .set_gauge_value_over(engine_rate, self.engine_rate_transition, None);
            }
        }
    }

    /// Applies every queued event without blocking. Returns how many were applied.
    pub fn drain(&mut self, receiver: &Receiver<TelemetryEvent>) -> usize {
        let mut applied = 0;
        while let Ok(event) = receiver.try_recv() {
            self.apply(event);
            applied += 1;
        }
        if applied > 0 {
            trace!(applied, "applied telemetry events");
        }
        applied
    }

    pub fn tick(&mut self, now: Instant) -> bool {
        let speed = self.speed.tick(now);
        let engine_rate = self.engine_rate.tick(now);
        speed || engine_rate
    }

    /// Lays the gauges side by side, each centered in its half of the surface.
    pub fn resize(&mut self, width: u32, height: u32) {
        let cell = width / 2;
        let diameter = cell.min(height);
        let top = f64::from(height.saturating_sub(diameter)) / 2.0;
        let inset = f64::from(cell.saturating_sub(diameter)) / 2.0;

        self.speed_placement = Placement {
            origin: Point::new(inset, top),
            diameter,
        };
        self.engine_rate_placement = Placement {
            origin: Point::new(f64::from(cell) + inset, top),
            diameter,
        };
        self.speed.resize(diameter);
        self.engine_rate.resize(diameter);
    }

    pub fn take_redraw_request(&mut self) -> bool {
        let speed = self.speed.take_redraw_request();
        let engine_rate = self.engine_rate.take_redraw_request();
        speed || engine_rate
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(DashboardConfig::default())
    }
}
