//! Logging and metrics setup.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat, DEFAULT_FILTER};
pub use self::metrics::install_recorder;
