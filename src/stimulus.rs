//! Scripted input stimuli for batch runs.
//!
//! A stimulus drives one input high over a range of scan cycles:
//!
//! | Form           | High during                    |
//! |----------------|--------------------------------|
//! | `I0.0`         | every cycle                    |
//! | `I0.0@3`       | cycle 3 only                   |
//! | `I0.0@3..5`    | cycles 3, 4 and 5              |
//! | `I0.0@3..`     | cycle 3 onward                 |
//!
//! Cycles are counted from 1. Inputs with no active stimulus read false.

use crate::il::{Address, Domain};
use crate::plc::{InputSource, IoTable};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stimulus {
    pub address: String,
    pub from: u64,
    /// Inclusive end; `None` means forever.
    pub to: Option<u64>,
}

impl Stimulus {
    pub fn is_active(&self, cycle: u64) -> bool {
        cycle >= self.from && self.to.map_or(true, |to| cycle <= to)
    }
}

impl FromStr for Stimulus {
    type Err = StimulusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, range) = match s.split_once('@') {
            Some((a, r)) => (a, Some(r)),
            None => (s, None),
        };

        let address = Address::parse(addr).map_err(|e| StimulusError::Address(e.to_string()))?;
        if address.domain != Domain::Input {
            return Err(StimulusError::NotAnInput(address.key()));
        }

        let (from, to) = match range {
            None => (1, None),
            Some(r) => match r.split_once("..") {
                None => {
                    let n = parse_cycle(r)?;
                    (n, Some(n))
                }
                Some((a, "")) => (parse_cycle(a)?, None),
                Some((a, b)) => (parse_cycle(a)?, Some(parse_cycle(b)?)),
            },
        };
        if to.is_some_and(|to| to < from) {
            return Err(StimulusError::Range(s.to_string()));
        }

        Ok(Self {
            address: address.key(),
            from,
            to,
        })
    }
}

impl fmt::Display for Stimulus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to {
            Some(to) if to == self.from => write!(f, "{}@{}", self.address, self.from),
            Some(to) => write!(f, "{}@{}..{}", self.address, self.from, to),
            None => write!(f, "{}@{}..", self.address, self.from),
        }
    }
}

fn parse_cycle(text: &str) -> Result<u64, StimulusError> {
    match text.trim().parse::<u64>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(StimulusError::Cycle(text.to_string())),
    }
}

/// Input source that plays back a list of stimuli, one cycle per refresh.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInputs {
    stimuli: Vec<Stimulus>,
    cycle: u64,
}

impl ScriptedInputs {
    pub fn new(stimuli: Vec<Stimulus>) -> Self {
        Self { stimuli, cycle: 0 }
    }

    /// Cycle number of the most recent refresh.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn stimuli(&self) -> &[Stimulus] {
        &self.stimuli
    }
}

impl InputSource for ScriptedInputs {
    fn refresh(&mut self, inputs: &mut IoTable) {
        self.cycle += 1;
        let cycle = self.cycle;
        for (address, value) in inputs.iter_mut() {
            *value = self
                .stimuli
                .iter()
                .any(|s| s.address == address && s.is_active(cycle));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StimulusError {
    #[error("invalid stimulus address: {0}")]
    Address(String),
    #[error("{0} is not an input")]
    NotAnInput(String),
    #[error("invalid cycle number '{0}'")]
    Cycle(String),
    #[error("empty cycle range in '{0}'")]
    Range(String),
}
