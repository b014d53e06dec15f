//! The constraint monitor (spec §4.J): periodic quota/hierarchy scan,
//! info-severity auto-resolution, and threshold alerting.

pub mod alert;
pub mod monitor;
pub mod resolve;
pub mod scan;

pub use alert::ThresholdConfig;
pub use monitor::{ConstraintMonitor, MonitorConfig};
