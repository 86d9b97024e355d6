//! Instruction tokenizer.
//!
//! Syntax, one instruction per line:
//! ```text
//! LD   I0.0
//! ANDN M1
//! ST   Q0.0
//! TON  T1,50
//! ```
//!
//! The opcode runs up to the first whitespace. Everything after it is a
//! comma-separated operand list; each operand is trimmed. Blank lines are
//! separators and produce nothing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Opcodes understood by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    Ld,
    Ldn,
    St,
    Stn,
    And,
    Andn,
    Or,
    Orn,
    Ton,
    Tof,
    Ctu,
    Ctd,
}

impl Opcode {
    pub const ALL: [Opcode; 12] = [
        Opcode::Ld,
        Opcode::Ldn,
        Opcode::St,
        Opcode::Stn,
        Opcode::And,
        Opcode::Andn,
        Opcode::Or,
        Opcode::Orn,
        Opcode::Ton,
        Opcode::Tof,
        Opcode::Ctu,
        Opcode::Ctd,
    ];

    /// Mnemonic as written in program text.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Ld => "LD",
            Opcode::Ldn => "LDN",
            Opcode::St => "ST",
            Opcode::Stn => "STN",
            Opcode::And => "AND",
            Opcode::Andn => "ANDN",
            Opcode::Or => "OR",
            Opcode::Orn => "ORN",
            Opcode::Ton => "TON",
            Opcode::Tof => "TOF",
            Opcode::Ctu => "CTU",
            Opcode::Ctd => "CTD",
        }
    }

    /// True if the opcode operates on the accumulator and therefore needs it set.
    pub fn needs_accumulator(self) -> bool {
        matches!(
            self,
            Opcode::St | Opcode::Stn | Opcode::And | Opcode::Andn | Opcode::Or | Opcode::Orn
        )
    }

    /// True for the timer and counter declarations, which take a preset operand.
    pub fn is_declaration(self) -> bool {
        matches!(self, Opcode::Ton | Opcode::Tof | Opcode::Ctu | Opcode::Ctd)
    }
}

impl FromStr for Opcode {
    type Err = UnknownOpcode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.to_ascii_uppercase().as_str() {
            "LD" => Opcode::Ld,
            "LDN" => Opcode::Ldn,
            "ST" => Opcode::St,
            "STN" => Opcode::Stn,
            "AND" => Opcode::And,
            "ANDN" => Opcode::Andn,
            "OR" => Opcode::Or,
            "ORN" => Opcode::Orn,
            "TON" => Opcode::Ton,
            "TOF" | "TOFF" => Opcode::Tof,
            "CTU" => Opcode::Ctu,
            "CTD" => Opcode::Ctd,
            _ => return Err(UnknownOpcode(s.to_string())),
        };
        Ok(op)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// An opcode string that no instruction answers to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown opcode {0}")]
pub struct UnknownOpcode(pub String);

/// One tokenized program line.
///
/// The opcode stays textual here; the executor decides whether it is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// 1-based line number in the program text.
    pub line: usize,
    pub opcode: String,
    pub operands: Vec<String>,
}

impl Instruction {
    /// First operand, the primary address.
    pub fn target(&self) -> Option<&str> {
        self.operands.first().map(String::as_str).filter(|s| !s.is_empty())
    }

    /// Second operand, the preset of a timer or counter declaration.
    pub fn preset(&self) -> Option<&str> {
        self.operands.get(1).map(String::as_str).filter(|s| !s.is_empty())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.opcode)?;
        if !self.operands.is_empty() {
            write!(f, " {}", self.operands.join(","))?;
        }
        Ok(())
    }
}

/// Tokenize a single line. Returns `None` for blank lines.
pub fn tokenize_line(raw: &str, line: usize) -> Option<Instruction> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    let (opcode, rest) = match text.find(char::is_whitespace) {
        Some(idx) => (&text[..idx], text[idx..].trim()),
        None => (text, ""),
    };

    let operands = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split(',')
            .map(|op| op.trim().to_ascii_uppercase())
            .collect()
    };

    Some(Instruction {
        line,
        opcode: opcode.to_ascii_uppercase(),
        operands,
    })
}

/// Tokenize every non-blank line of a program, in order.
pub fn tokenize<'a, I>(lines: I) -> impl Iterator<Item = Instruction> + 'a
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: 'a,
{
    lines
        .into_iter()
        .enumerate()
        .filter_map(|(idx, raw)| tokenize_line(raw, idx + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_simple() {
        let instr = tokenize_line("LD I0.0", 1).unwrap();
        assert_eq!(instr.opcode, "LD");
        assert_eq!(instr.operands, vec!["I0.0"]);
        assert_eq!(instr.target(), Some("I0.0"));
        assert_eq!(instr.preset(), None);
    }

    #[test]
    fn test_tokenize_operand_list() {
        let instr = tokenize_line("  ton\tT1 , 50  ", 7).unwrap();
        assert_eq!(instr.line, 7);
        assert_eq!(instr.opcode, "TON");
        assert_eq!(instr.operands, vec!["T1", "50"]);
        assert_eq!(instr.to_string(), "TON T1,50");
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        assert!(tokenize_line("", 1).is_none());
        assert!(tokenize_line(" \t ", 2).is_none());

        let program = ["LD I0.0", "", "   ", "ST Q0.0"];
        let instrs: Vec<_> = tokenize(program).collect();
        assert_eq!(instrs.len(), 2);
        assert_eq!(instrs[1].line, 4);
    }

    #[test]
    fn test_opcode_without_operands() {
        let instr = tokenize_line("LD", 1).unwrap();
        assert!(instr.operands.is_empty());
        assert_eq!(instr.target(), None);
    }

    #[test]
    fn test_opcode_parse() {
        assert_eq!("andn".parse::<Opcode>(), Ok(Opcode::Andn));
        assert_eq!("TOFF".parse::<Opcode>(), Ok(Opcode::Tof));
        assert_eq!("TOF".parse::<Opcode>(), Ok(Opcode::Tof));
        assert!("JMP".parse::<Opcode>().is_err());

        for op in Opcode::ALL {
            assert_eq!(op.mnemonic().parse::<Opcode>(), Ok(op));
        }
    }
}
