//! Logging setup.
//!
//! The engine only talks to the `log` facade. Hosts that bring their own
//! logger can skip this module entirely.

mod init;

pub use init::{init_logging, LoggingConfig};
