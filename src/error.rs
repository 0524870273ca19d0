//! Error types for loading and running programs.
//!
//! Every variant of `VmError` is fatal: the machine stops before executing another instruction.
//! Popping an empty operand stack is not an error and has no variant here.

use std::io;

use thiserror::Error;

use crate::address::Address;
use crate::bytecode::MAX_OPCODE;
use crate::cli::EXIT_RUNTIME;

#[derive(Debug, Error)]
pub enum LoadError {
  #[error("could not read program: {0}")]
  Io(#[from] io::Error),

  #[error("truncated word at byte offset {offset}: {trailing} trailing byte(s)")]
  TruncatedWord { offset: usize, trailing: usize },

  #[error("program of {words} words does not fit in code memory of {capacity} words")]
  ProgramTooLarge { words: usize, capacity: usize },
}

#[derive(Debug, Error)]
pub enum VmError {
  #[error("Stack overflow: stack has reached occupied area of memory (push to {attempted} at or below {stack_limit})")]
  StackCollision { attempted: isize, stack_limit: usize },

  #[error("Stack overflow: stack has completely consumed memory")]
  MemoryExhausted,

  #[error("Return with an empty call stack at {0}")]
  ReturnStackUnderflow(Address),

  #[error("Unrecognized opcode {0} (highest opcode is {})", MAX_OPCODE)]
  InvalidOpcode(u16),

  #[error("Division by zero at {0}")]
  DivisionByZero(Address),

  #[error("Program counter out of range: {0}")]
  ProgramCounterOutOfRange(Address),

  #[error("Address out of range: {0}")]
  AddressOutOfRange(i64),

  #[error("No integer left on input")]
  InputExhausted,

  #[error("Expected an integer on input, found `{0}`")]
  InvalidInput(String),

  #[error("I/O error: {0}")]
  Io(#[from] io::Error),
}

impl VmError {
  /// The process exit status for this error. An unrecognized opcode exits with the opcode itself,
  /// clamped into the range a process status can carry.
  pub fn exit_code(&self) -> i32 {
    match self {
      VmError::InvalidOpcode(opcode) => (*opcode).max(1).min(255) as i32,
      _ => EXIT_RUNTIME
    }
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
  #[error("Error: Program input file required")]
  MissingProgram,

  #[error("Error: Too many arguments")]
  TooManyArguments,
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn invalid_opcode_exit_code_is_opcode_derived() {
    assert_eq!(VmError::InvalidOpcode(36).exit_code(), 36);
    assert_eq!(VmError::InvalidOpcode(4000).exit_code(), 255);
    assert_eq!(VmError::MemoryExhausted.exit_code(), 1);
    assert_eq!(VmError::DivisionByZero(Address::Code(0)).exit_code(), 1);
  }

  #[test]
  fn diagnostics_name_the_fault() {
    let message = VmError::ReturnStackUnderflow(Address::Code(7)).to_string();
    assert!(message.contains("empty call stack"));
    assert!(message.contains("CODE[7]"));
  }

  #[test]
  fn invalid_opcode_names_the_highest_opcode() {
    assert_eq!(
      VmError::InvalidOpcode(36).to_string(),
      format!("Unrecognized opcode 36 (highest opcode is {})", MAX_OPCODE)
    );
  }
}
