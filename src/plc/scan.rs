//! Scan-cycle engine.
//!
//! One call to [`Plc::scan`] is one PLC scan:
//! 1. refresh the input table from the input source
//! 2. empty the accumulator
//! 3. tokenize and execute every program line in order
//! 4. reconcile timers with their enable condition and advance them by the
//!    timer periods elapsed so far, carrying any remainder
//! 5. time the scan, warning when it overruns its period by half
//! 6. publish a snapshot
//!
//! Line errors do not abort the pass. Each one is reported to the observer
//! as it happens and drops the engine to [`RunMode::Idle`] once the pass
//! completes.

use crate::config::PlcConfig;
use crate::il::Program;
use crate::plc::execute::{ExecError, Executor, ProcessImage};
use crate::plc::io::{InputSource, IoTable};
use crate::plc::memory::{MemoryTable, MemoryVariable};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Operator-selected run mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunMode {
    /// Paused, or stopped by an error.
    #[default]
    Idle,
    /// Stopped by the operator.
    Stopped,
    /// Scanning.
    Running,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunMode::Idle => "IDLE",
            RunMode::Stopped => "STOPPED",
            RunMode::Running => "RUNNING",
        };
        f.pad(name)
    }
}

/// Errors reported during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("line {line} ({instruction}): {source}")]
    Line {
        line: usize,
        instruction: String,
        source: ExecError,
    },
    #[error("program has no instructions")]
    ProgramEmpty,
}

impl ScanError {
    /// Source line of the failing instruction, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            ScanError::Line { line, .. } => Some(*line),
            ScanError::ProgramEmpty => None,
        }
    }
}

/// Per-cell tuple published after every scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub id: String,
    pub current_value: bool,
    pub counter: i32,
    pub max_timer: i32,
    pub end_timer: bool,
}

impl From<&MemoryVariable> for MemorySnapshot {
    fn from(cell: &MemoryVariable) -> Self {
        Self {
            id: cell.id.clone(),
            current_value: cell.current_value,
            counter: cell.counter,
            max_timer: cell.max_timer,
            end_timer: cell.end_timer,
        }
    }
}

/// Everything an observer gets to see after a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cycle: u64,
    pub mode: RunMode,
    pub inputs: IndexMap<String, bool>,
    pub outputs: IndexMap<String, bool>,
    pub memory: Vec<MemorySnapshot>,
}

impl Snapshot {
    pub fn memory(&self, id: &str) -> Option<&MemorySnapshot> {
        self.memory.iter().find(|m| m.id == id)
    }
}

/// Receives errors and snapshots from the engine.
pub trait Observer {
    fn on_error(&mut self, _error: &ScanError) {}
    fn on_snapshot(&mut self, _snapshot: &Snapshot) {}
}

/// Ignores everything.
impl Observer for () {}

/// Observer that keeps everything it is told.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub errors: Vec<ScanError>,
    pub snapshots: Vec<Snapshot>,
}

impl Observer for Recorder {
    fn on_error(&mut self, error: &ScanError) {
        self.errors.push(error.clone());
    }

    fn on_snapshot(&mut self, snapshot: &Snapshot) {
        self.snapshots.push(snapshot.clone());
    }
}

/// Result of one completed scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub cycle: u64,
    pub errors: Vec<ScanError>,
    /// Wall-clock time spent in the scan.
    pub elapsed: Duration,
}

impl ScanReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The simulated controller.
#[derive(Debug, Clone)]
pub struct Plc {
    image: ProcessImage,
    executor: Executor,
    mode: RunMode,
    cycle: u64,
    scan_period_ms: u64,
    timer_period_ms: u64,
    /// Scan time not yet converted into timer ticks.
    timer_backlog_ms: u64,
}

impl Default for Plc {
    fn default() -> Self {
        Self::new(&PlcConfig::default())
    }
}

impl Plc {
    /// Create an idle controller with the configured I/O layout.
    pub fn new(config: &PlcConfig) -> Self {
        let image = ProcessImage::new(
            IoTable::new(config.inputs.iter().cloned()),
            IoTable::new(config.outputs.iter().cloned()),
        );
        Self {
            image,
            executor: Executor::new(),
            mode: RunMode::Idle,
            cycle: 0,
            scan_period_ms: config.scan_period_ms,
            timer_period_ms: config.timer_period_ms.max(1),
            timer_backlog_ms: 0,
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Number of completed scans.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn image(&self) -> &ProcessImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut ProcessImage {
        &mut self.image
    }

    pub fn inputs(&self) -> &IoTable {
        &self.image.inputs
    }

    pub fn outputs(&self) -> &IoTable {
        &self.image.outputs
    }

    pub fn memory(&self) -> &MemoryTable {
        &self.image.memory
    }

    /// Accumulator as left by the last scan.
    pub fn accumulator(&self) -> Option<bool> {
        self.executor.accumulator()
    }

    /// Start scanning.
    pub fn run(&mut self) {
        self.set_mode(RunMode::Running);
    }

    /// Pause: stop scanning and halt timers, keeping their counts.
    pub fn pause(&mut self) {
        self.set_mode(RunMode::Idle);
        self.image.memory.halt_timers();
    }

    /// Stop: as [`Plc::pause`], but marks an operator stop.
    pub fn stop(&mut self) {
        self.set_mode(RunMode::Stopped);
        self.image.memory.halt_timers();
    }

    /// Run if not running, otherwise pause.
    pub fn toggle_run(&mut self) {
        if self.mode == RunMode::Running {
            self.pause();
        } else {
            self.run();
        }
    }

    fn set_mode(&mut self, mode: RunMode) {
        if self.mode != mode {
            info!(from = %self.mode, to = %mode, "run mode changed");
            self.mode = mode;
        }
    }

    /// Hard reset: halt timers, zero counters, clear outputs and every
    /// memory value and done bit. Timer and counter configuration is kept.
    ///
    /// Ignored while running; returns whether the reset happened.
    pub fn refresh(&mut self) -> bool {
        if self.mode == RunMode::Running {
            debug!("refresh ignored while running");
            return false;
        }
        self.image.outputs.clear();
        self.image.memory.hard_reset();
        info!(cells = self.image.memory.len(), "hard reset");
        true
    }

    /// Execute one scan cycle. Returns `None` without touching anything
    /// unless the controller is running.
    pub fn scan(
        &mut self,
        program: &Program,
        inputs: &mut dyn InputSource,
        observer: &mut dyn Observer,
    ) -> Option<ScanReport> {
        if self.mode != RunMode::Running {
            return None;
        }

        let started = Instant::now();
        inputs.refresh(&mut self.image.inputs);
        self.executor.reset();

        let cycle = self.cycle + 1;
        let mut errors = Vec::new();
        let mut report = |error: ScanError| {
            warn!(cycle, "{error}");
            observer.on_error(&error);
            errors.push(error);
        };

        if !program.has_instructions() {
            report(ScanError::ProgramEmpty);
        }
        for instr in program.instructions() {
            if let Err(source) = self.executor.execute(&instr, &mut self.image) {
                report(ScanError::Line {
                    line: instr.line,
                    instruction: instr.to_string(),
                    source,
                });
            }
        }

        self.image.memory.reconcile_timers();

        if errors.is_empty() {
            let ticks = self.take_timer_ticks();
            self.image.memory.tick_timers(ticks);
        } else {
            self.set_mode(RunMode::Idle);
            self.image.memory.halt_timers();
        }

        self.cycle = cycle;

        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        if elapsed_ms > self.scan_period_ms as f64 * 1.5 {
            warn!(cycle, elapsed_ms, target_ms = self.scan_period_ms, "scan overran its period");
        }
        debug!(cycle, errors = errors.len(), elapsed_ms, "scan complete");

        let snapshot = self.snapshot();
        observer.on_snapshot(&snapshot);

        Some(ScanReport {
            cycle,
            errors,
            elapsed,
        })
    }

    /// Add one scan period to the timer backlog and return the whole timer
    /// periods it now holds. The remainder carries over to the next scan.
    fn take_timer_ticks(&mut self) -> u64 {
        self.timer_backlog_ms = self.timer_backlog_ms.saturating_add(self.scan_period_ms);
        let ticks = self.timer_backlog_ms / self.timer_period_ms;
        self.timer_backlog_ms %= self.timer_period_ms;
        ticks
    }

    /// Current state of every table.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cycle: self.cycle,
            mode: self.mode,
            inputs: collect(&self.image.inputs),
            outputs: collect(&self.image.outputs),
            memory: self.image.memory.iter().map(MemorySnapshot::from).collect(),
        }
    }
}

fn collect(table: &IoTable) -> IndexMap<String, bool> {
    table.iter().map(|(k, v)| (k.to_string(), v)).collect()
}
