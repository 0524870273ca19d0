/*!
  Code memory and data memory.

  Data memory is a single array serving two regions. General storage grows upward from address
  zero and its extent is the high-water mark `stack_limit`, the highest address ever stored to.
  The operand stack grows downward from the top of the array. A push that would land at or
  below the high-water mark is fatal. A pop from the empty stack is not: it yields zero.
*/

use crate::address::{Address, AddressNumberType};
use crate::bytecode::Word;
use crate::error::VmError;

/// Instruction store, zero-filled past the loaded program. Immutable once built.
pub struct CodeMemory {
  words: Vec<Word>,
}

impl CodeMemory {
  /// The caller is responsible for `program.len() <= capacity`; extra words are dropped.
  pub fn new(program: &[Word], capacity: usize) -> CodeMemory {
    let mut words = vec![0; capacity];
    let len = program.len().min(capacity);
    words[..len].copy_from_slice(&program[..len]);
    CodeMemory { words }
  }

  pub fn capacity(&self) -> usize {
    self.words.len()
  }

  pub fn fetch(&self, pc: AddressNumberType) -> Result<Word, VmError> {
    self.words
        .get(pc)
        .copied()
        .ok_or(VmError::ProgramCounterOutOfRange(Address::Code(pc)))
  }
}

pub struct DataMemory {
  cells       : Vec<Word>,
  /// Address of the top of the operand stack; `cells.len()` when the stack is empty.
  sp          : AddressNumberType,
  /// Highest address written by a store.
  stack_limit : AddressNumberType,
  /// Number of pops that found the stack empty.
  underflows  : usize,
}

impl DataMemory {
  pub fn new(capacity: usize) -> DataMemory {
    DataMemory {
      cells       : vec![0; capacity],
      sp          : capacity,
      stack_limit : 0,
      underflows  : 0,
    }
  }

  // region Accessors

  pub fn capacity(&self) -> usize {
    self.cells.len()
  }

  pub fn sp(&self) -> AddressNumberType {
    self.sp
  }

  pub fn stack_limit(&self) -> AddressNumberType {
    self.stack_limit
  }

  pub fn underflows(&self) -> usize {
    self.underflows
  }

  pub fn depth(&self) -> usize {
    self.capacity() - self.sp
  }

  /// The operand stack from top to bottom.
  pub fn stack(&self) -> &[Word] {
    &self.cells[self.sp..]
  }

  pub fn peek(&self) -> Option<Word> {
    self.stack().first().copied()
  }

  // endregion

  // region Stack discipline

  pub fn push(&mut self, value: Word) -> Result<(), VmError> {
    let attempted = self.sp as isize - 1;
    if attempted <= self.stack_limit as isize {
      return Err(VmError::StackCollision { attempted, stack_limit: self.stack_limit });
    }
    // Unreachable while `sp <= capacity` holds, but a push past the end must never write.
    if attempted as usize >= self.capacity() {
      return Err(VmError::MemoryExhausted);
    }

    self.sp = attempted as usize;
    self.cells[self.sp] = value;
    Ok(())
  }

  /// Pops the top of the stack. An empty stack yields zero and leaves `sp` at the sentinel.
  pub fn pop(&mut self) -> Word {
    if self.sp < self.capacity() {
      let value = self.cells[self.sp];
      self.sp += 1;
      value
    } else {
      self.underflows += 1;
      0
    }
  }

  // endregion

  // region Addressable storage

  fn index(&self, address: i64) -> Result<AddressNumberType, VmError> {
    match address >= 0 && (address as u64) < self.capacity() as u64 {
      true  => Ok(address as AddressNumberType),
      false => Err(VmError::AddressOutOfRange(address))
    }
  }

  pub fn load(&self, address: i64) -> Result<Word, VmError> {
    let idx = self.index(address)?;
    Ok(self.cells[idx])
  }

  /// Writes `value` at `address` and raises the high-water mark to cover it.
  pub fn store(&mut self, address: i64, value: Word) -> Result<(), VmError> {
    let idx = self.index(address)?;
    self.cells[idx] = value;
    self.record_store(idx);
    Ok(())
  }

  pub fn record_store(&mut self, address: AddressNumberType) {
    if address > self.stack_limit {
      self.stack_limit = address;
    }
  }

  // endregion
}
