//! Program text.
//!
//! A program is kept as plain text lines and re-tokenized on every scan
//! cycle. On disk it is a flat text file with exactly these lines:
//! - One instruction per line
//! - Blank lines are separators and are ignored
//! - Case is normalised upward when the text is read

use crate::il::tokenizer::{tokenize, tokenize_line, Instruction};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// An IL program as an ordered list of source lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    lines: Vec<String>,
}

impl Program {
    /// Create an empty program.
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a program from source text, one instruction per line.
    pub fn parse(text: &str) -> Self {
        text.lines().collect()
    }

    /// Append a source line.
    pub fn push(&mut self, line: &str) {
        self.lines.push(line.trim_end().to_uppercase());
    }

    /// Raw source lines, blank separators included.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of source lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True if there are no source lines at all.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// True if at least one line holds an instruction.
    pub fn has_instructions(&self) -> bool {
        self.lines.iter().any(|l| !l.trim().is_empty())
    }

    /// Tokenize the program in document order.
    pub fn instructions(&self) -> impl Iterator<Item = Instruction> + '_ {
        tokenize(self.lines.iter().map(String::as_str))
    }

    /// Canonical form: every instruction rewritten as `OPCODE a,b`, blank
    /// separators kept, trailing blank lines dropped.
    pub fn normalized(&self) -> Program {
        let mut lines: Vec<String> = self
            .lines
            .iter()
            .enumerate()
            .map(|(idx, raw)| match tokenize_line(raw, idx + 1) {
                Some(instr) => instr.to_string(),
                None => String::new(),
            })
            .collect();
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        Program { lines }
    }

    /// Source text with a trailing newline.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}

impl<S: AsRef<str>> FromIterator<S> for Program {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut program = Program::new();
        for line in iter {
            program.push(line.as_ref());
        }
        program
    }
}

/// Load a program from disk.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<Program, ProgramError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| ProgramError::IoError(format!("{}: {}", path.as_ref().display(), e)))?;
    Ok(Program::parse(&text))
}

/// Save a program to disk.
pub fn save_program<P: AsRef<Path>>(path: P, program: &Program) -> Result<(), ProgramError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| ProgramError::IoError(format!("{}: {}", path.as_ref().display(), e)))?;
    file.write_all(program.to_text().as_bytes())
        .map_err(|e| ProgramError::IoError(e.to_string()))?;
    Ok(())
}

/// Errors that can occur while loading or saving program text.
#[derive(Debug, Clone, Error)]
pub enum ProgramError {
    #[error("I/O error: {0}")]
    IoError(String),
}
