/*!
  This module is responsible for the encoding and decoding of binary instructions.
*/
use std::convert::TryFrom;

use super::{Instruction, Opcode};
use crate::error::VmError;

// If you change this you must also change `encode_instruction` and `decode_word`.
pub type Word = i32;
pub type Operand = u16;

/// Splits a word into its raw `(opcode, operand)` fields. No validation is done.
pub fn decode_word(word: Word) -> (u16, Operand) {
  let bits = word as u32;
  // [OpCode:16][Operand:16]
  ((bits >> 16) as u16, (bits & 0xFFFF) as Operand)
}

pub fn try_decode_instruction(word: Word) -> Result<Instruction, VmError> {
  let (opcode, operand) = decode_word(word);
  let opcode = Opcode::try_from(opcode).map_err(|_| VmError::InvalidOpcode(opcode))?;

  Ok(Instruction { opcode, operand })
}

/// Encodes the instruction into a single word.
pub fn encode_instruction(instruction: Instruction) -> Word {
  // [OpCode:16][Operand:16]
  (((instruction.opcode.code() as u32) << 16) | instruction.operand as u32) as Word
}
