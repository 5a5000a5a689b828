//! Desktop front-end: a winit window whose pixel buffer shows the dashboard.

use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pixels::{Pixels, SurfaceTexture};
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::config::{GaugeStyle, WindowConfig};
use crate::dashboard::Dashboard;
use crate::error::SpeedometerResult;
use crate::render::{Canvas, Scene};
use crate::telemetry::TelemetryEvent;

pub struct SpeedometerApp {
    window: WindowConfig,
    style: GaugeStyle,
    dashboard: Dashboard,
}

impl SpeedometerApp {
    pub fn new(window: WindowConfig, style: GaugeStyle, dashboard: Dashboard) -> Self {
        Self {
            window,
            style,
            dashboard,
        }
    }

    /// Runs the window until it is closed, applying telemetry from `receiver` once per frame.
    pub fn run(self, receiver: Receiver<TelemetryEvent>) -> SpeedometerResult<()> {
        let Self {
            window: window_config,
            style,
            mut dashboard,
        } = self;

        let event_loop = EventLoop::new()?;
        let window = WindowBuilder::new()
            .with_title(&window_config.title)
            .with_inner_size(LogicalSize::new(
                window_config.width as f64,
                window_config.height as f64,
            ))
            .build(&event_loop)?;

        let window = Arc::new(window);
        let window_clone = window.clone();
        let size = window.inner_size();
        let mut fb_width = size.width as usize;
        let mut fb_height = size.height as usize;
        let surface_texture = SurfaceTexture::new(size.width, size.height, &window);
        let mut pixels = Pixels::new(size.width, size.height, surface_texture)?;
        dashboard.resize(size.width, size.height);
        info!(width = size.width, height = size.height, "speedometer window opened");

        let frame_duration = Duration::from_secs_f64(1.0 / window_config.max_framerate);
        let mut next_frame = Instant::now();

        event_loop.run(move |event, window_target| match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if new_size.width == 0 || new_size.height == 0 {
                        return;
                    }
                    fb_width = new_size.width as usize;
                    fb_height = new_size.height as usize;
                    if let Err(err) = pixels.resize_buffer(new_size.width, new_size.height) {
                        warn!(%err, "failed to resize pixel buffer");
                    }
                    if let Err(err) = pixels.resize_surface(new_size.width, new_size.height) {
                        warn!(%err, "failed to resize surface");
                    }
                    dashboard.resize(new_size.width, new_size.height);
                    window_clone.request_redraw();
                }
                WindowEvent::RedrawRequested => {
                    let scene = Scene::for_dashboard(&mut dashboard, &style);
                    let mut canvas = Canvas::new(pixels.frame_mut(), fb_width, fb_height);
                    scene.render(&mut canvas, &style);
                    if let Err(err) = pixels.render() {
                        error!(%err, "render failed, closing window");
                        window_target.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                let now = Instant::now();
                if now >= next_frame {
                    dashboard.drain(&receiver);
                    dashboard.tick(now);
                    if dashboard.take_redraw_request() {
                        window_clone.request_redraw();
                    }
                    next_frame = now + frame_duration;
                }
                window_target.set_control_flow(ControlFlow::WaitUntil(next_frame));
            }
            _ => {}
        })?;

        info!("speedometer window closed");
        Ok(())
    }
}
