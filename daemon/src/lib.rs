//! Process-tree CPU anomaly detection and single-process resource profiling.

pub mod collector;
pub mod config;
pub mod detector;
pub mod error;
pub mod executor;
pub mod handoff;
pub mod monitor;
pub mod notifier;
pub mod probe;
pub mod profiler;
pub mod reducer;
pub mod sampler;

pub use error::{Error, Result};
