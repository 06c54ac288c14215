/// CLI error types
use cadence_session::PlaybackError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        CliError::Config(err.to_string())
    }
}
