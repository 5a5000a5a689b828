use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use speedometer::render::load_font;
use speedometer::{
    logging, ChannelListener, Dashboard, GaugeStyle, GeneratorBinding, GeneratorConfig,
    RandomWalkSignal, SineSignal, Signal, SpeedometerApp, SpeedometerError, SpeedometerResult,
    SystemClock, WindowConfig,
};
use tracing::warn;

#[derive(Debug, Default)]
struct Options {
    title: Option<String>,
    font: Option<PathBuf>,
    random: bool,
    seed: Option<u64>,
}

impl Options {
    fn parse(mut args: impl Iterator<Item = String>) -> SpeedometerResult<Self> {
        let mut options = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--title" => options.title = Some(required(&arg, args.next())?),
                "--font" => options.font = Some(PathBuf::from(required(&arg, args.next())?)),
                "--random" => options.random = true,
                "--seed" => {
                    let value = required(&arg, args.next())?;
                    let seed = value.parse().map_err(|_| {
                        SpeedometerError::InvalidArgument(format!("--seed expects an integer, got {value}"))
                    })?;
                    options.seed = Some(seed);
                    options.random = true;
                }
                other => warn!(argument = other, "ignoring unknown argument"),
            }
        }
        Ok(options)
    }
}

fn required(flag: &str, value: Option<String>) -> SpeedometerResult<String> {
    value.ok_or_else(|| SpeedometerError::InvalidArgument(format!("{flag} expects a value")))
}

fn main() -> SpeedometerResult<()> {
    let _ = logging::init_default_tracing();
    let options = Options::parse(env::args().skip(1))?;

    let font = options.font.as_deref().map(load_font).transpose()?;
    if font.is_none() {
        warn!("no --font given, tick labels are not drawn");
    }
    let style = GaugeStyle::builder().maybe_font(font).build();

    let mut window = WindowConfig::default();
    if let Some(title) = options.title {
        window.title = title;
    }

    let signal: Box<dyn Signal> = match (options.random, options.seed) {
        (_, Some(seed)) => Box::new(RandomWalkSignal::with_seed(seed)),
        (true, None) => Box::new(RandomWalkSignal::new()),
        (false, None) => Box::new(SineSignal),
    };
    let binding = GeneratorBinding::bind(GeneratorConfig::default(), Arc::new(SystemClock), signal)?;
    let (listener, receiver) = ChannelListener::channel();
    binding.generator().register_listener(listener);

    let result = SpeedometerApp::new(window, style, Dashboard::default()).run(receiver);
    binding.unbind();
    result
}
