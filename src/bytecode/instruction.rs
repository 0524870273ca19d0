use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};

use crate::bytecode::Operand;

/**
  Opcodes of the virtual machine.

  The numeric values are those of existing program files and must not change. They are
  assigned explicitly so that reordering the variants cannot silently renumber them.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq,        Debug,         Hash
)]
#[strum(serialize_all = "shouty_snake_case")]
#[repr(u16)]
pub enum Opcode {
  Halt    = 0,   // clear the run flag
  Push    = 1,   // push( n )
  Rvalue  = 2,   // rvalue( address )
  Lvalue  = 3,   // lvalue( address )
  Pop     = 4,
  Sto     = 5,   // value on top stored at the address below it, both popped
  Copy    = 6,

  // Arithmetic: left operand is the deeper one //
  Add     = 7,
  Sub     = 8,
  Mpy     = 9,
  Div     = 10,
  Mod     = 11,
  Neg     = 12,
  Not     = 13,  // bitwise complement

  // Logical //
  Or      = 14,
  And     = 15,

  // Comparison //
  Eq      = 16,
  Ne      = 17,
  Gt      = 18,
  Ge      = 19,
  Lt      = 20,
  Le      = 21,

  // Control flow //
  Label   = 22,  // only meaningful to an assembler
  Goto    = 23,  // goto( address )
  Gofalse = 24,  // gofalse( address )
  Gotrue  = 25,  // gotrue( address )

  // Ports //
  Print   = 26,
  Read    = 27,

  // Subroutines //
  Gosub   = 28,  // gosub( address )
  Ret     = 29,

  // Bitwise //
  Orb     = 30,
  Andb    = 31,
  Xorb    = 32,
  Shl     = 33,
  Shr     = 34,  // logical
  Sar     = 35,  // arithmetic
}

pub const MAX_OPCODE: u16 = 35u16;

impl Opcode {
  pub fn code(&self) -> u16 {
    Into::<u16>::into(*self)
  }

  /// Whether the operand field means anything for this opcode.
  pub fn takes_operand(&self) -> bool {
    match self {
      | Opcode::Push
      | Opcode::Rvalue
      | Opcode::Lvalue
      | Opcode::Goto
      | Opcode::Gofalse
      | Opcode::Gotrue
      | Opcode::Gosub => true,
      _ => false
    }
  }
}

/// Holds the unencoded components of an instruction.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
  pub opcode  : Opcode,
  pub operand : Operand,
}

impl Instruction {
  pub fn new(opcode: Opcode, operand: Operand) -> Instruction {
    Instruction { opcode, operand }
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.opcode.takes_operand() {
      true  => write!(f, "{} {}", self.opcode, self.operand),
      false => write!(f, "{}", self.opcode)
    }
  }
}
