//! An `Either` type that holds an address into either code memory or data memory, used to name
//! locations in diagnostics and state tables.

use std::fmt::{Display, Formatter};

// `AddressNumberType` is `usize`, as it is naturally an index into a memory store.
pub type AddressNumberType = usize;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum Address {
  /// An index into code memory, i.e. a program counter value.
  Code(AddressNumberType),
  /// An index into data memory: general storage at the low end, the operand stack at the high end.
  Data(AddressNumberType)
}

impl Display for Address {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Address::Code(i) => {
        write!(f, "CODE[{}]", i)
      },
      Address::Data(i) => {
        write!(f, "DATA[{}]", i)
      }
    }
  }
}
