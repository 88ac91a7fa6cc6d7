//! Tracing setup shared by the binary and tests
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the process entry point via [`init_tracing`].

pub mod config;
#[cfg(feature = "tracing")]
pub mod init;

pub use config::{InstrumentationConfig, LogFormat};
#[cfg(feature = "tracing")]
pub use init::{init_default, init_tracing};
