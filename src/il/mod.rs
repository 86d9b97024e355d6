//! Instruction List front end.
//!
//! This module provides:
//! - An address resolver (text → typed address)
//! - A line tokenizer (text → opcode + operands)
//! - Program text loading and saving

pub mod address;
pub mod program;
pub mod tokenizer;

pub use address::{Address, AddressError, Domain, Index};
pub use program::{load_program, save_program, Program, ProgramError};
pub use tokenizer::{tokenize, tokenize_line, Instruction, Opcode, UnknownOpcode};
