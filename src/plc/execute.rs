//! Instruction executor.
//!
//! A single-accumulator boolean ALU. Every instruction reads or writes the
//! shared process image; the accumulator is the implicit left operand of
//! the combinational and store instructions.

use crate::il::{Address, AddressError, Domain, Instruction, Opcode, UnknownOpcode};
use crate::plc::io::IoTable;
use crate::plc::memory::{CounterMode, MemoryTable, TimerMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::trace;

/// Everything a program can touch: inputs, outputs and memory cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessImage {
    pub inputs: IoTable,
    pub outputs: IoTable,
    pub memory: MemoryTable,
}

impl ProcessImage {
    /// Create an image with the given I/O points and no memory cells.
    pub fn new(inputs: IoTable, outputs: IoTable) -> Self {
        Self {
            inputs,
            outputs,
            memory: MemoryTable::new(),
        }
    }

    /// Value seen by a load or combinational instruction.
    pub fn read(&self, address: &Address) -> Result<bool, ExecError> {
        let key = address.key();
        match address.domain {
            Domain::Input => self.inputs.get(&key).ok_or(ExecError::NoSuchPoint(key)),
            Domain::Output => self.outputs.get(&key).ok_or(ExecError::NoSuchPoint(key)),
            Domain::Memory | Domain::Timer | Domain::Counter => self
                .memory
                .get(&key)
                .map(|cell| cell.read())
                .ok_or(ExecError::UndefinedMemory(key)),
        }
    }
}

/// Broad class of an execution error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Syntax,
    Semantic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Syntax => f.write_str("syntax error"),
            ErrorKind::Semantic => f.write_str("semantic error"),
        }
    }
}

/// Errors raised while executing one instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("syntax error: {0}")]
    UnknownOpcode(#[from] UnknownOpcode),

    #[error("syntax error: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("syntax error: address {0} does not exist")]
    NoSuchPoint(String),

    #[error("syntax error: {opcode} needs an operand")]
    MissingOperand { opcode: Opcode },

    #[error("syntax error: {opcode} applies to {expected} addresses, not {address}")]
    WrongDomain {
        opcode: Opcode,
        expected: Domain,
        address: String,
    },

    #[error("syntax error: {opcode} needs a preset, e.g. {opcode} {address},10")]
    MissingPreset { opcode: Opcode, address: String },

    #[error("syntax error: invalid preset {value} for {opcode}")]
    InvalidPreset { opcode: Opcode, value: String },

    #[error("semantic error: accumulator is empty, load a value with LD or LDN first")]
    EmptyAccumulator,

    #[error("semantic error: input {0} is read-only, ST and STN cannot target inputs")]
    StoreToInput(String),

    #[error("semantic error: memory variable {0} does not exist")]
    UndefinedMemory(String),
}

impl ExecError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecError::UnknownOpcode(_)
            | ExecError::InvalidAddress(_)
            | ExecError::NoSuchPoint(_)
            | ExecError::MissingOperand { .. }
            | ExecError::WrongDomain { .. }
            | ExecError::MissingPreset { .. }
            | ExecError::InvalidPreset { .. } => ErrorKind::Syntax,
            ExecError::EmptyAccumulator
            | ExecError::StoreToInput(_)
            | ExecError::UndefinedMemory(_) => ErrorKind::Semantic,
        }
    }
}

/// The accumulator machine.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    accumulator: Option<bool>,
}

impl Executor {
    /// Create an executor with an empty accumulator.
    pub fn new() -> Self {
        Self { accumulator: None }
    }

    /// Current accumulator, `None` until the first `LD`/`LDN`.
    pub fn accumulator(&self) -> Option<bool> {
        self.accumulator
    }

    /// Empty the accumulator. Called at the start of every scan.
    pub fn reset(&mut self) {
        self.accumulator = None;
    }

    /// Execute one instruction against the process image.
    ///
    /// On error nothing further from this instruction is applied; earlier
    /// instructions keep their effects.
    pub fn execute(&mut self, instr: &Instruction, image: &mut ProcessImage) -> Result<(), ExecError> {
        let opcode: Opcode = instr.opcode.parse()?;
        let target = instr
            .target()
            .ok_or(ExecError::MissingOperand { opcode })?;
        let address = Address::parse(target)?;

        match opcode {
            Opcode::Ld | Opcode::Ldn => {
                let value = image.read(&address)?;
                self.accumulator = Some(value ^ (opcode == Opcode::Ldn));
            }

            Opcode::And | Opcode::Andn => {
                let acc = self.require()?;
                let value = image.read(&address)? ^ (opcode == Opcode::Andn);
                self.accumulator = Some(acc && value);
            }

            Opcode::Or | Opcode::Orn => {
                let acc = self.require()?;
                let value = image.read(&address)? ^ (opcode == Opcode::Orn);
                self.accumulator = Some(acc || value);
            }

            Opcode::St | Opcode::Stn => {
                let acc = self.require()?;
                store(image, &address, acc, opcode == Opcode::Stn)?;
            }

            Opcode::Ton | Opcode::Tof => {
                let mode = if opcode == Opcode::Ton { TimerMode::On } else { TimerMode::Off };
                let preset = parse_preset(instr, opcode, &address, Domain::Timer)?;
                if preset < 0 {
                    return Err(ExecError::InvalidPreset {
                        opcode,
                        value: preset.to_string(),
                    });
                }
                let cell = image.memory.get_or_create(&address.key(), Domain::Timer);
                cell.configure_timer(mode, preset);
                if let Some(acc) = self.accumulator {
                    cell.current_value = acc;
                }
            }

            Opcode::Ctu | Opcode::Ctd => {
                let mode = if opcode == Opcode::Ctu { CounterMode::Up } else { CounterMode::Down };
                let preset = parse_preset(instr, opcode, &address, Domain::Counter)?;
                let cell = image.memory.get_or_create(&address.key(), Domain::Counter);
                cell.configure_counter(mode, preset);
                if let Some(acc) = self.accumulator {
                    cell.store(acc, false);
                }
            }
        }

        trace!(line = instr.line, instr = %instr, acc = ?self.accumulator, "executed");
        Ok(())
    }

    fn require(&self) -> Result<bool, ExecError> {
        self.accumulator.ok_or(ExecError::EmptyAccumulator)
    }
}

fn store(image: &mut ProcessImage, address: &Address, acc: bool, negated: bool) -> Result<(), ExecError> {
    let key = address.key();
    match address.domain {
        Domain::Input => Err(ExecError::StoreToInput(key)),
        Domain::Output => image
            .outputs
            .set(&key, acc ^ negated)
            .map_err(|_| ExecError::NoSuchPoint(key)),
        domain => {
            image.memory.get_or_create(&key, domain).store(acc, negated);
            Ok(())
        }
    }
}

fn parse_preset(
    instr: &Instruction,
    opcode: Opcode,
    address: &Address,
    expected: Domain,
) -> Result<i32, ExecError> {
    if address.domain != expected {
        return Err(ExecError::WrongDomain {
            opcode,
            expected,
            address: address.key(),
        });
    }
    let raw = instr.preset().ok_or_else(|| ExecError::MissingPreset {
        opcode,
        address: address.key(),
    })?;
    raw.parse().map_err(|_| ExecError::InvalidPreset {
        opcode,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::tokenize_line;

    fn image() -> ProcessImage {
        ProcessImage::new(
            IoTable::new(["I0.0", "I0.1"]),
            IoTable::new(["Q0.0", "Q0.1"]),
        )
    }

    fn run(exec: &mut Executor, image: &mut ProcessImage, line: &str) -> Result<(), ExecError> {
        let instr = tokenize_line(line, 1).unwrap();
        exec.execute(&instr, image)
    }

    #[test]
    fn test_load_and_store() {
        let mut img = image();
        img.inputs.set("I0.0", true).unwrap();
        let mut exec = Executor::new();

        run(&mut exec, &mut img, "LD I0.0").unwrap();
        assert_eq!(exec.accumulator(), Some(true));
        run(&mut exec, &mut img, "ST Q0.0").unwrap();
        run(&mut exec, &mut img, "STN Q0.1").unwrap();

        assert_eq!(img.outputs.get("Q0.0"), Some(true));
        assert_eq!(img.outputs.get("Q0.1"), Some(false));
    }

    #[test]
    fn test_double_negation() {
        let mut img = image();
        img.inputs.set("I0.0", true).unwrap();
        let mut exec = Executor::new();

        run(&mut exec, &mut img, "LDN I0.0").unwrap();
        run(&mut exec, &mut img, "STN M1").unwrap();
        assert!(img.memory.get("M1").unwrap().current_value);
    }

    #[test]
    fn test_combinational() {
        let mut img = image();
        img.inputs.set("I0.0", true).unwrap();
        let mut exec = Executor::new();

        run(&mut exec, &mut img, "LD I0.0").unwrap();
        run(&mut exec, &mut img, "AND I0.1").unwrap();
        assert_eq!(exec.accumulator(), Some(false));
        run(&mut exec, &mut img, "ORN I0.1").unwrap();
        assert_eq!(exec.accumulator(), Some(true));
        run(&mut exec, &mut img, "ANDN I0.0").unwrap();
        assert_eq!(exec.accumulator(), Some(false));
        run(&mut exec, &mut img, "OR Q0.0").unwrap();
        assert_eq!(exec.accumulator(), Some(false));
    }

    #[test]
    fn test_empty_accumulator() {
        let mut img = image();
        let mut exec = Executor::new();
        for line in ["AND I0.0", "ORN I0.0", "ST Q0.0", "STN M1"] {
            let err = run(&mut exec, &mut img, line).unwrap_err();
            assert_eq!(err, ExecError::EmptyAccumulator);
            assert_eq!(err.kind(), ErrorKind::Semantic);
        }
        assert!(img.memory.is_empty());
    }

    #[test]
    fn test_read_undefined_memory() {
        let mut img = image();
        let mut exec = Executor::new();
        let err = run(&mut exec, &mut img, "LD M5").unwrap_err();
        assert_eq!(err, ExecError::UndefinedMemory("M5".into()));
        assert_eq!(err.kind(), ErrorKind::Semantic);
        assert!(img.memory.is_empty());
    }

    #[test]
    fn test_store_to_input() {
        let mut img = image();
        let mut exec = Executor::new();
        run(&mut exec, &mut img, "LD I0.1").unwrap();
        let err = run(&mut exec, &mut img, "ST I0.0").unwrap_err();
        assert_eq!(err, ExecError::StoreToInput("I0.0".into()));
        assert_eq!(img.inputs.get("I0.0"), Some(false));
    }

    #[test]
    fn test_syntax_errors() {
        let mut img = image();
        let mut exec = Executor::new();

        let err = run(&mut exec, &mut img, "JMP I0.0").unwrap_err();
        assert!(matches!(err, ExecError::UnknownOpcode(_)));
        assert_eq!(err.kind(), ErrorKind::Syntax);

        let err = run(&mut exec, &mut img, "LD X1").unwrap_err();
        assert!(matches!(err, ExecError::InvalidAddress(_)));

        let err = run(&mut exec, &mut img, "LD I9.9").unwrap_err();
        assert_eq!(err, ExecError::NoSuchPoint("I9.9".into()));

        let err = run(&mut exec, &mut img, "LD").unwrap_err();
        assert_eq!(err, ExecError::MissingOperand { opcode: Opcode::Ld });
    }

    #[test]
    fn test_declaration_domain_checks() {
        let mut img = image();
        let mut exec = Executor::new();

        let err = run(&mut exec, &mut img, "TON C1,10").unwrap_err();
        assert!(matches!(err, ExecError::WrongDomain { expected: Domain::Timer, .. }));
        let err = run(&mut exec, &mut img, "CTU T1,10").unwrap_err();
        assert!(matches!(err, ExecError::WrongDomain { expected: Domain::Counter, .. }));
        let err = run(&mut exec, &mut img, "TOF M1,10").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert!(img.memory.is_empty());
    }

    #[test]
    fn test_declaration_presets() {
        let mut img = image();
        let mut exec = Executor::new();

        let err = run(&mut exec, &mut img, "TON T1").unwrap_err();
        assert!(matches!(err, ExecError::MissingPreset { .. }));
        let err = run(&mut exec, &mut img, "TON T1,abc").unwrap_err();
        assert!(matches!(err, ExecError::InvalidPreset { .. }));
        let err = run(&mut exec, &mut img, "TON T1,-4").unwrap_err();
        assert!(matches!(err, ExecError::InvalidPreset { .. }));
        assert!(img.memory.is_empty());

        run(&mut exec, &mut img, "TOFF T1, 25").unwrap();
        let t1 = img.memory.get("T1").unwrap();
        assert_eq!(t1.timer_mode, Some(TimerMode::Off));
        assert_eq!(t1.max_timer, 25);

        run(&mut exec, &mut img, "CTD C2,-3").unwrap();
        assert_eq!(img.memory.get("C2").unwrap().counter_mode, Some(CounterMode::Down));
    }

    #[test]
    fn test_timer_declaration_latches_accumulator() {
        let mut img = image();
        img.inputs.set("I0.0", true).unwrap();
        let mut exec = Executor::new();

        run(&mut exec, &mut img, "LD I0.0").unwrap();
        run(&mut exec, &mut img, "TON T1,5").unwrap();
        assert!(img.memory.get("T1").unwrap().current_value);
    }

    #[test]
    fn test_counter_store_edges() {
        let mut img = image();
        let mut exec = Executor::new();

        run(&mut exec, &mut img, "LD I0.0").unwrap();
        run(&mut exec, &mut img, "CTU C1,2").unwrap();
        assert_eq!(img.memory.get("C1").unwrap().counter, 0);

        img.inputs.set("I0.0", true).unwrap();
        run(&mut exec, &mut img, "LD I0.0").unwrap();
        run(&mut exec, &mut img, "ST C1").unwrap();
        // Re-declaring with the same accumulator is not a second edge
        run(&mut exec, &mut img, "CTU C1,2").unwrap();
        let c1 = img.memory.get("C1").unwrap();
        assert_eq!(c1.counter, 1);
        assert!(!c1.end_timer);

        run(&mut exec, &mut img, "LD C1").unwrap();
        assert_eq!(exec.accumulator(), Some(false));
    }
}
