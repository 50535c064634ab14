//! Logger setup. Everything else in the crate logs through the `log` facade.

mod init;

pub use init::{init_logging, LoggingConfig};
