/*!

  The VM uses a 32 bit word size, and every instruction is exactly one word. Program files
  store words big-endian. The components of an instruction are:

    Opcode:  16 bits (high half)
    Operand: 16 bits (low half, unsigned)

  The operand is a literal, a data address, or a code address depending on the opcode.
  Opcodes that do not use the operand ignore it.

  An enum is used for the opcode alone, not for the whole instruction.
  Decoding never validates; an opcode outside the instruction set is only discovered when the
  machine tries to dispatch it.

*/

mod binary;
mod instruction;
mod loader;

pub use binary::{decode_word, encode_instruction, try_decode_instruction, Operand, Word};
pub use instruction::{Instruction, Opcode, MAX_OPCODE};
pub use loader::{load_file, parse_program};
