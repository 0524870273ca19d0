/*!
  A bytecode interpreter for a stack machine. Programs are sequences of 32 bit words, each an
  opcode in the high half and an unsigned operand in the low half. The operand stack lives at the
  top of data memory and grows down toward general storage; a separate stack holds return
  addresses for `GOSUB`/`RET`.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod address;
pub mod bytecode;
pub mod cli;
pub mod config;
pub mod error;
pub mod memory;
pub mod ports;
pub mod svm;

pub use config::MachineConfig;
pub use error::{LoadError, UsageError, VmError};
pub use ports::{Ports, StreamPorts};
pub use svm::SVM;
