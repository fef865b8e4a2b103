pub mod config;
pub mod logging;
pub mod request;

pub use config::ConfigError;
pub use logging::LoggingError;
pub use request::RequestError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Request(#[from] request::RequestError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Logging(#[from] logging::LoggingError),
}
