//! Role checks for portal sections and the admin views over access logs.

pub mod guard;
pub mod log_filter;

pub use guard::{GateDecision, Route, RouteGate};
pub use log_filter::{export_csv, LogFilter, TimeRange, INITIAL_LIMIT};
