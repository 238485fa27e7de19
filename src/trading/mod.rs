pub mod exit_monitor;

pub use exit_monitor::{ExitMonitor, ExitOrder, ExitReason, MonitorStatus};
