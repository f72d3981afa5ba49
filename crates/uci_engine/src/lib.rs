//! UCI front end: the search thread controller, engine options, `info`
//! line formatting, configuration and command handling.

pub mod config;
pub mod engine_control;
pub mod listener;
pub mod options;
pub mod protocol;
pub mod session;

pub use config::{ConfigError, EngineConfig};
pub use engine_control::{ControlState, EngineControl};
pub use listener::{SharedOutput, UciSearchListener};
pub use options::{EngineOptions, OptionChange, OptionError};
pub use session::UciSession;
