use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type SpeedometerResult<T> = Result<T, SpeedometerError>;

#[derive(Debug, Error)]
pub enum SpeedometerError {
    #[error("failed to start engine value generator thread")]
    GeneratorSpawn(#[source] io::Error),

    #[error("failed to read font {path}")]
    FontRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid font data in {0}")]
    InvalidFont(PathBuf),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("pixel surface error: {0}")]
    Surface(#[from] pixels::Error),

    #[error("pixel buffer error: {0}")]
    Texture(#[from] pixels::TextureError),
}
