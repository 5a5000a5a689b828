//! Simulated engine telemetry produced on a background thread.
//!
//! [`GeneratorBinding::bind`] starts the worker; dropping or unbinding the
//! binding stops it. The worker samples a [`Signal`] against an injected
//! [`Clock`] every interval and hands engine rate and speed to whichever
//! [`EngineValueListener`] is registered at that moment. The listener runs on
//! the worker thread; [`ChannelListener`] forwards onto an `mpsc` channel so the
//! UI thread can drain it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

use crate::config::GeneratorConfig;
use crate::error::{SpeedometerError, SpeedometerResult};

/// Receives generator output. Called on the generator thread.
pub trait EngineValueListener: Send + Sync {
    fn on_set_engine_rate(&self, engine_rate: i32);
    fn on_set_speed(&self, speed: i32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryEvent {
    EngineRate(i32),
    Speed(i32),
}

/// Forwards every notification as a [`TelemetryEvent`].
#[derive(Debug)]
pub struct ChannelListener {
    sender: Sender<TelemetryEvent>,
}

impl ChannelListener {
    pub fn new(sender: Sender<TelemetryEvent>) -> Self {
        Self { sender }
    }

    /// A listener together with the receiving end for the consumer thread.
    pub fn channel() -> (Self, Receiver<TelemetryEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self::new(sender), receiver)
    }

    fn forward(&self, event: TelemetryEvent) {
        if self.sender.send(event).is_err() {
            trace!(?event, "telemetry receiver gone, dropping event");
        }
    }
}

impl EngineValueListener for ChannelListener {
    fn on_set_engine_rate(&self, engine_rate: i32) {
        self.forward(TelemetryEvent::EngineRate(engine_rate));
    }

    fn on_set_speed(&self, speed: i32) {
        self.forward(TelemetryEvent::Speed(speed));
    }
}

/// Millisecond time source for the generator.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall-clock milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn new(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Waveform driving both metrics; `level` is expected in `[0, 1]`.
pub trait Signal: Send {
    fn level(&mut self, now_millis: u64) -> f64;
}

/// `|sin(t)|` with `t` the clock reading in milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SineSignal;

impl Signal for SineSignal {
    fn level(&mut self, now_millis: u64) -> f64 {
        (now_millis as f64).sin().abs()
    }
}

/// Eases toward a random target that is occasionally re-drawn.
#[derive(Debug, Clone)]
pub struct RandomWalkSignal {
    rng: StdRng,
    level: f64,
    target: f64,
    retarget_chance: f64,
    smoothing: f64,
}

impl RandomWalkSignal {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(mut rng: StdRng) -> Self {
        let target = rng.random_range(0.0..1.0);
        Self {
            rng,
            level: 0.0,
            target,
            retarget_chance: 0.1,
            smoothing: 0.3,
        }
    }
}

impl Default for RandomWalkSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl Signal for RandomWalkSignal {
    fn level(&mut self, _now_millis: u64) -> f64 {
        if self.rng.random_bool(self.retarget_chance) {
            self.target = self.rng.random_range(0.0..1.0);
        }
        self.level = (self.level + (self.target - self.level) * self.smoothing).clamp(0.0, 1.0);
        self.level
    }
}

#[derive(Default)]
struct Slot {
    listener: Option<Arc<dyn EngineValueListener>>,
    /// Bumped on every register/unregister.
    generation: u64,
    /// Thread currently inside [`EngineValueGenerator::emit`], if any.
    delivering: Option<ThreadId>,
}

#[derive(Default)]
struct Shared {
    slot: Mutex<Slot>,
    /// Held for the whole of one emission.
    delivery: Mutex<()>,
}

/// Control handle: registers the single listener the generator reports to.
///
/// Clones share the same slot. Listeners are called without the slot locked,
/// so a listener may register or unregister from inside its own callback.
/// Once [`unregister_listener`](Self::unregister_listener) returns, the old
/// listener is never called again: from another thread it waits for a sample
/// in flight to finish, and from inside a callback it suppresses the rest of
/// that sample.
#[derive(Clone, Default)]
pub struct EngineValueGenerator {
    shared: Arc<Shared>,
}

impl EngineValueGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any previously registered listener.
    pub fn register_listener(&self, listener: impl EngineValueListener + 'static) {
        info!("registerListener");
        self.replace(Some(Arc::new(listener)));
    }

    pub fn unregister_listener(&self) {
        info!("unregisterListener");
        self.replace(None);
    }

    pub fn has_listener(&self) -> bool {
        self.slot().listener.is_some()
    }

    /// Delivers one sample to the current listener, engine rate first.
    pub fn emit(&self, engine_rate: i32, speed: i32) {
        let _delivery = lock(&self.shared.delivery);
        let Some((listener, generation)) = self.begin_delivery() else {
            return;
        };

        listener.on_set_engine_rate(engine_rate);
        if self.slot().generation == generation {
            listener.on_set_speed(speed);
        }
        self.slot().delivering = None;
    }

    fn begin_delivery(&self) -> Option<(Arc<dyn EngineValueListener>, u64)> {
        let mut slot = self.slot();
        let listener = slot.listener.clone()?;
        slot.delivering = Some(thread::current().id());
        Some((listener, slot.generation))
    }

    fn replace(&self, listener: Option<Arc<dyn EngineValueListener>>) {
        let (previous, from_callback) = {
            let mut slot = self.slot();
            let previous = std::mem::replace(&mut slot.listener, listener);
            slot.generation = slot.generation.wrapping_add(1);
            (previous, slot.delivering == Some(thread::current().id()))
        };
        // Dropped unlocked, in case the listener's own drop touches this handle.
        drop(previous);
        if !from_callback {
            // Wait out a sample being delivered on the generator thread.
            drop(lock(&self.shared.delivery));
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        lock(&self.shared.slot)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ties the generator thread to a consumer. The thread stops when this is unbound or dropped.
pub struct GeneratorBinding {
    generator: EngineValueGenerator,
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl GeneratorBinding {
    pub fn bind(
        config: GeneratorConfig,
        clock: Arc<dyn Clock>,
        signal: Box<dyn Signal>,
    ) -> SpeedometerResult<Self> {
        let generator = EngineValueGenerator::new();
        let (stop, stopped) = mpsc::channel();
        let worker_generator = generator.clone();
        let interval = config.interval;

        let worker = thread::Builder::new()
            .name("engine-value-generator".to_string())
            .spawn(move || generate(worker_generator, config, clock, signal, stopped))
            .map_err(SpeedometerError::GeneratorSpawn)?;

        info!(?interval, "engine value generator bound");
        Ok(Self {
            generator,
            stop: Some(stop),
            worker: Some(worker),
        })
    }

    /// Binds with the wall clock and the sine waveform.
    pub fn bind_default() -> SpeedometerResult<Self> {
        Self::bind(
            GeneratorConfig::default(),
            Arc::new(SystemClock),
            Box::new(SineSignal),
        )
    }

    pub fn generator(&self) -> EngineValueGenerator {
        self.generator.clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Stops the generator thread and waits for it to exit.
    pub fn unbind(mut self) {
        self.generator.unregister_listener();
        self.stop.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                debug!("engine value generator panicked");
            }
        }
        info!("engine value generator unbound");
    }
}

impl Drop for GeneratorBinding {
    fn drop(&mut self) {
        // Disconnecting the stop channel wakes the worker out of its sleep.
        self.stop.take();
    }
}

fn generate(
    generator: EngineValueGenerator,
    config: GeneratorConfig,
    clock: Arc<dyn Clock>,
    mut signal: Box<dyn Signal>,
    stopped: Receiver<()>,
) {
    loop {
        match stopped.recv_timeout(config.interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        let level = signal.level(clock.now_millis());
        let engine_rate = scale(level, config.engine_rate_max);
        let speed = scale(level, config.speed_max);
        trace!(engine_rate, speed, "telemetry sample");
        generator.emit(engine_rate, speed);
    }
    debug!("engine value generator stopped");
}

fn scale(level: f64, max: f64) -> i32 {
    (level.clamp(0.0, 1.0) * max) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(2);

    fn fast_config() -> GeneratorConfig {
        GeneratorConfig::builder()
            .interval(Duration::from_millis(5))
            .build()
    }

    fn drain(receiver: &Receiver<TelemetryEvent>) {
        while receiver.try_recv().is_ok() {}
    }

    #[test]
    fn sine_signal_tracks_clock_reading() {
        let mut signal = SineSignal;
        assert_eq!(signal.level(0), 0.0);
        assert!((signal.level(1234) - 1234f64.sin().abs()).abs() < 1e-12);
    }

    #[test]
    fn random_walk_is_bounded_and_reproducible() {
        let mut a = RandomWalkSignal::with_seed(7);
        let mut b = RandomWalkSignal::with_seed(7);
        for tick in 0..200 {
            let level = a.level(tick);
            assert!((0.0..=1.0).contains(&level));
            assert_eq!(level, b.level(tick));
        }
    }

    #[test]
    fn scale_truncates_into_range() {
        assert_eq!(scale(0.5, 220.0), 110);
        assert_eq!(scale(0.9999, 7000.0), 6999);
        assert_eq!(scale(1.5, 220.0), 220);
        assert_eq!(scale(-0.5, 220.0), 0);
    }

    #[test]
    fn emits_scaled_pair_from_injected_clock() {
        let clock = Arc::new(ManualClock::new(1234));
        let binding =
            GeneratorBinding::bind(fast_config(), clock, Box::new(SineSignal)).unwrap();
        let (listener, receiver) = ChannelListener::channel();
        binding.generator().register_listener(listener);

        let level = 1234f64.sin().abs();
        assert_eq!(
            receiver.recv_timeout(WAIT),
            Ok(TelemetryEvent::EngineRate((level * 7000.0) as i32))
        );
        assert_eq!(
            receiver.recv_timeout(WAIT),
            Ok(TelemetryEvent::Speed((level * 220.0) as i32))
        );
        binding.unbind();
    }

    #[test]
    fn unregistered_listener_hears_nothing_more() {
        let binding = GeneratorBinding::bind(
            fast_config(),
            Arc::new(ManualClock::new(42)),
            Box::new(SineSignal),
        )
        .unwrap();
        let generator = binding.generator();
        let (listener, receiver) = ChannelListener::channel();
        generator.register_listener(listener);
        assert!(receiver.recv_timeout(WAIT).is_ok());

        generator.unregister_listener();
        assert!(!generator.has_listener());
        drain(&receiver);
        // The listener (and its sender) was dropped, so nothing can arrive.
        assert_eq!(
            receiver.recv_timeout(Duration::from_millis(50)),
            Err(RecvTimeoutError::Disconnected)
        );
        assert!(binding.is_running());
        binding.unbind();
    }

    #[test]
    fn last_registration_wins() {
        let generator = EngineValueGenerator::new();
        let (first, first_rx) = ChannelListener::channel();
        let (second, second_rx) = ChannelListener::channel();

        generator.register_listener(first);
        generator.register_listener(second);
        generator.emit(3000, 90);

        assert_eq!(first_rx.try_recv(), Err(mpsc::TryRecvError::Disconnected));
        assert_eq!(second_rx.try_recv(), Ok(TelemetryEvent::EngineRate(3000)));
        assert_eq!(second_rx.try_recv(), Ok(TelemetryEvent::Speed(90)));
    }

    #[test]
    fn unregister_is_idempotent() {
        let generator = EngineValueGenerator::new();
        generator.unregister_listener();
        generator.unregister_listener();
        assert!(!generator.has_listener());
        generator.emit(1, 1);
    }

    #[test]
    fn unbind_stops_production() {
        let binding = GeneratorBinding::bind(
            fast_config(),
            Arc::new(ManualClock::new(99)),
            Box::new(SineSignal),
        )
        .unwrap();
        let generator = binding.generator();
        binding.unbind();

        let (listener, receiver) = ChannelListener::channel();
        generator.register_listener(listener);
        assert_eq!(
            receiver.recv_timeout(Duration::from_millis(50)),
            Err(RecvTimeoutError::Timeout)
        );
    }

    #[test]
    fn dropping_binding_stops_worker() {
        let binding = GeneratorBinding::bind(
            fast_config(),
            Arc::new(ManualClock::new(5)),
            Box::new(SineSignal),
        )
        .unwrap();
        let generator = binding.generator();
        drop(binding);

        // Give the worker a few intervals to notice the disconnect.
        thread::sleep(Duration::from_millis(50));
        let (listener, receiver) = ChannelListener::channel();
        generator.register_listener(listener);
        assert_eq!(
            receiver.recv_timeout(Duration::from_millis(50)),
            Err(RecvTimeoutError::Timeout)
        );
    }

    /// Unregisters itself on its first engine rate.
    struct OneShot {
        generator: EngineValueGenerator,
        seen: Sender<TelemetryEvent>,
    }

    impl EngineValueListener for OneShot {
        fn on_set_engine_rate(&self, engine_rate: i32) {
            let _ = self.seen.send(TelemetryEvent::EngineRate(engine_rate));
            self.generator.unregister_listener();
        }

        fn on_set_speed(&self, speed: i32) {
            let _ = self.seen.send(TelemetryEvent::Speed(speed));
        }
    }

    #[test]
    fn listener_can_unregister_itself_mid_sample() {
        let generator = EngineValueGenerator::new();
        let (seen, seen_rx) = mpsc::channel();
        generator.register_listener(OneShot {
            generator: generator.clone(),
            seen,
        });

        let (done, done_rx) = mpsc::channel();
        let worker = generator.clone();
        thread::spawn(move || {
            worker.emit(1200, 40);
            let _ = done.send(());
        });

        assert_eq!(done_rx.recv_timeout(WAIT), Ok(()));
        assert!(!generator.has_listener());
        assert_eq!(seen_rx.try_recv(), Ok(TelemetryEvent::EngineRate(1200)));
        // The speed half of the sample was suppressed and the listener dropped.
        assert_eq!(seen_rx.try_recv(), Err(mpsc::TryRecvError::Disconnected));
    }

    #[test]
    fn unbind_completes_after_self_unregistering_listener() {
        let binding = GeneratorBinding::bind(
            fast_config(),
            Arc::new(ManualClock::new(7)),
            Box::new(SineSignal),
        )
        .unwrap();
        let generator = binding.generator();
        let (seen, seen_rx) = mpsc::channel();
        generator.register_listener(OneShot {
            generator: generator.clone(),
            seen,
        });
        assert!(matches!(
            seen_rx.recv_timeout(WAIT),
            Ok(TelemetryEvent::EngineRate(_))
        ));

        let (done, done_rx) = mpsc::channel();
        thread::spawn(move || {
            binding.unbind();
            let _ = done.send(());
        });
        assert_eq!(done_rx.recv_timeout(WAIT), Ok(()));
    }

    #[test]
    fn listener_can_hand_over_to_a_successor() {
        struct Relay {
            generator: EngineValueGenerator,
            next: Mutex<Option<ChannelListener>>,
        }

        impl EngineValueListener for Relay {
            fn on_set_engine_rate(&self, _engine_rate: i32) {
                if let Some(next) = lock(&self.next).take() {
                    self.generator.register_listener(next);
                }
            }

            fn on_set_speed(&self, _speed: i32) {}
        }

        let generator = EngineValueGenerator::new();
        let (next, receiver) = ChannelListener::channel();
        generator.register_listener(Relay {
            generator: generator.clone(),
            next: Mutex::new(Some(next)),
        });

        generator.emit(500, 10);
        // The successor only hears complete samples that start after the hand-over.
        assert_eq!(receiver.try_recv(), Err(mpsc::TryRecvError::Empty));
        generator.emit(600, 20);
        assert_eq!(receiver.try_recv(), Ok(TelemetryEvent::EngineRate(600)));
        assert_eq!(receiver.try_recv(), Ok(TelemetryEvent::Speed(20)));
    }

    #[test]
    fn manual_clock_moves_on_request() {
        let clock = ManualClock::new(10);
        clock.advance(5);
        assert_eq!(clock.now_millis(), 15);
        clock.set(1);
        assert_eq!(clock.now_millis(), 1);
    }
}
