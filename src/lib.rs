//! Set-associative write-back cache simulator driven by memory access traces.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod stats;
pub mod trace;

pub use config::{CacheConfig, Layout};
pub use engine::{AccessResult, Simulator};
pub use error::{ConfigError, Error, Result, TraceFormatReason};
pub use stats::{CacheReport, SimulationStats};
pub use trace::{MemoryAccess, Operation, Trace};
