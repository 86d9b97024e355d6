//! Controller core.
//!
//! - Process image: fixed input/output tables plus lazily created memory cells
//! - Accumulator executor for single instructions
//! - Scan-cycle engine with run modes and observers

pub mod execute;
pub mod io;
pub mod memory;
pub mod scan;

pub use execute::{ErrorKind, ExecError, Executor, ProcessImage};
pub use io::{InputPanel, InputSource, InputType, IoError, IoTable};
pub use memory::{CounterMode, MemoryTable, MemoryVariable, TimerMode, TimerState};
pub use scan::{MemorySnapshot, Observer, Plc, Recorder, RunMode, ScanError, ScanReport, Snapshot};
