//! # ilsim
//!
//! A scan-cycle simulator for boolean Instruction List PLC programs.
//!
//! A program is a list of lines such as `LD I0.0` or `TON T1,50`. Every
//! scan cycle re-tokenizes the program and executes it against a process
//! image of inputs, outputs and memory cells (flags, timers, counters).

pub mod config;
pub mod il;
pub mod plc;
pub mod stimulus;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export commonly used types
pub use config::{ConfigError, PlcConfig};
pub use il::{load_program, save_program, Address, Domain, Instruction, Opcode, Program, ProgramError};
pub use plc::{
    ExecError, InputPanel, InputSource, InputType, MemoryVariable, Observer, Plc, RunMode,
    ScanError, ScanReport, Snapshot,
};
pub use stimulus::{ScriptedInputs, Stimulus};

#[cfg(feature = "tui")]
pub use tui::run_monitor;
