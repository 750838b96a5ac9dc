//! Statistics for connections and relayed traffic

pub mod metrics;

pub use metrics::{ServerStats, StatsSnapshot};
