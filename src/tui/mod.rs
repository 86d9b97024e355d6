//! Terminal monitor for the simulated controller.
//!
//! Shows the program, the input panel, outputs and memory cells, and lets
//! the operator press inputs and switch run modes while scans execute.

mod app;
mod ui;

pub use app::{run_monitor, MonitorApp};
