use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rand::Rng;
use speedometer::{
    logging, Dashboard, DashboardConfig, GaugeConfig, GaugeStyle, SpeedometerApp, TelemetryEvent,
    WindowConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = logging::init_default_tracing();

    // A 0-180 km/h speedometer over a half circle, and a slower-moving tachometer
    let config = DashboardConfig::builder()
        .speed_gauge(
            GaugeConfig::builder()
                .max_value(180)
                .start_angle(180.0)
                .end_angle(0.0)
                .value_step(30)
                .minor_mark_step(10)
                .critical_section_percent(0.15)
                .build(),
        )
        .engine_rate_gauge(GaugeConfig::engine_rate())
        .speed_transition(Duration::from_millis(400))
        .engine_rate_transition(Duration::from_millis(150))
        .build();

    let (sender, receiver) = mpsc::channel();

    // Random readings instead of the generator service
    thread::spawn(move || {
        let mut rng = rand::rng();
        loop {
            let events = [
                TelemetryEvent::Speed(rng.random_range(0..=180)),
                TelemetryEvent::EngineRate(rng.random_range(800..=7000)),
            ];
            if events.iter().any(|event| sender.send(*event).is_err()) {
                break;
            }
            thread::sleep(Duration::from_millis(500));
        }
    });

    println!("Displaying a custom dashboard with random readings every 500ms");
    println!("Press Ctrl+C or close the window to exit");

    let window = WindowConfig::builder().title("Builder demo".to_string()).build();
    SpeedometerApp::new(window, GaugeStyle::default(), Dashboard::new(config)).run(receiver)?;
    Ok(())
}
