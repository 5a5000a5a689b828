//! Time-based interpolation of the displayed gauge value.
//!
//! The animator keeps no clock of its own. Whoever drives the frame loop calls
//! [`ValueAnimator::tick`] with the current instant; the first tick after a
//! request pins the animation's start time.

use std::f64::consts::PI;
use std::fmt;
use std::time::{Duration, Instant};

use tracing::trace;

/// Runs once when an animation reaches its target. Dropped unrun if superseded.
pub type OnEnd = Box<dyn FnOnce()>;

/// Slow start, fast middle, slow end. Maps `[0, 1]` onto `[0, 1]` monotonically.
pub fn accelerate_decelerate(progress: f64) -> f64 {
    ((progress + 1.0) * PI).cos() / 2.0 + 0.5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationState {
    pub from: i32,
    pub to: i32,
    pub duration: Duration,
    /// Set by the first tick that observes this animation.
    pub started_at: Option<Instant>,
}

impl AnimationState {
    pub fn new(from: i32, to: i32, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            started_at: None,
        }
    }

    /// Eased value after `elapsed`; exactly `to` once the duration has passed.
    pub fn value_at(&self, elapsed: Duration) -> i32 {
        if elapsed >= self.duration {
            return self.to;
        }
        let progress = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        let delta = f64::from(self.to) - f64::from(self.from);
        (f64::from(self.from) + delta * accelerate_decelerate(progress)) as i32
    }

    /// Values sampled every `interval`, ending with `to`.
    pub fn frames(&self, interval: Duration) -> Frames {
        Frames {
            state: *self,
            interval,
            elapsed: Duration::ZERO,
            done: false,
        }
    }
}

/// Lazy, finite sequence of animation samples.
#[derive(Debug, Clone)]
pub struct Frames {
    state: AnimationState,
    interval: Duration,
    elapsed: Duration,
    done: bool,
}

impl Iterator for Frames {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        if self.done {
            return None;
        }

        let value = self.state.value_at(self.elapsed);
        if self.elapsed >= self.state.duration {
            self.done = true;
        } else if self.interval.is_zero() {
            self.elapsed = self.state.duration;
        } else {
            self.elapsed = self.elapsed.saturating_add(self.interval).min(self.state.duration);
        }
        Some(value)
    }
}

/// What a tick did to the displayed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    Idle,
    Running(i32),
    /// The last frame of an animation, always carrying its target.
    Finished(i32),
}

impl Frame {
    pub fn value(self) -> Option<i32> {
        match self {
            Frame::Idle => None,
            Frame::Running(value) | Frame::Finished(value) => Some(value),
        }
    }
}

struct Running {
    state: AnimationState,
    on_end: Option<OnEnd>,
}

pub struct ValueAnimator {
    current: i32,
    running: Option<Running>,
}

impl ValueAnimator {
    pub fn new(initial: i32) -> Self {
        Self {
            current: initial,
            running: None,
        }
    }

    /// The most recently displayed value.
    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn state(&self) -> Option<&AnimationState> {
        self.running.as_ref().map(|r| &r.state)
    }

    /// Starts moving toward `to`. An animation already in flight is replaced and
    /// the new one starts from the displayed value instead of `from`.
    pub fn animate(&mut self, from: i32, to: i32, duration: Duration, on_end: Option<OnEnd>) {
        let from = match self.running.take() {
            Some(superseded) => {
                trace!(
                    from = superseded.state.from,
                    to = superseded.state.to,
                    current = self.current,
                    "animation superseded"
                );
                self.current
            }
            None => from,
        };

        self.current = from;
        self.running = Some(Running {
            state: AnimationState::new(from, to, duration),
            on_end,
        });
    }

    pub fn tick(&mut self, now: Instant) -> Frame {
        let Some(running) = self.running.as_mut() else {
            return Frame::Idle;
        };

        let started_at = *running.state.started_at.get_or_insert(now);
        let elapsed = now.saturating_duration_since(started_at);
        self.current = running.state.value_at(elapsed);
        if elapsed < running.state.duration {
            return Frame::Running(self.current);
        }

        if let Some(on_end) = self.running.take().and_then(|r| r.on_end) {
            on_end();
        }
        trace!(value = self.current, "animation finished");
        Frame::Finished(self.current)
    }
}

impl fmt::Debug for ValueAnimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueAnimator")
            .field("current", &self.current)
            .field("state", &self.state())
            .finish()
    }
}
