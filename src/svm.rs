//! Structures and functions for the stack virtual machine: the fetch-decode-execute loop and the
//! semantics of each opcode.

use std::fmt::{Display, Formatter};
use std::path::Path;

use prettytable::{format as TableFormat, Table};

use crate::address::{Address, AddressNumberType};
use crate::bytecode::*;
use crate::config::MachineConfig;
use crate::error::{LoadError, VmError};
use crate::memory::{CodeMemory, DataMemory};
use crate::ports::Ports;

/// How many operand stack entries the state table shows.
const STACK_WINDOW: usize = 16;

pub struct SVM {

  // Flags
  running: bool, // Cleared by HALT or a fatal error

  // Memory Stores
  code: CodeMemory,
  data: DataMemory, // Storage at the low end, operand stack at the high end

  // Registers //
  pc           : AddressNumberType,      // Program counter, address of the next instruction
  ir           : Word,                   // Instruction register, the last word fetched
  return_stack : Vec<AddressNumberType>, // Saved program counters for RET
}

impl SVM {

  // region Display methods

  fn make_register_table<T> (
      name      : char,
      registers : &[T],
      highlight : Option<usize>,
      start     : usize
    ) -> Table
    where T: Display
  {

    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for (i, cell) in registers.iter().enumerate() {
      match Some(i) == highlight {

        true  => {
          table.add_row(
            row![r->format!("* --> {}[{}] =", name, i+start), format!("{}", cell)]
          );
        }

        false => {
          table.add_row(
            row![r->format!("{}[{}] =", name, i+start), format!("{}", cell)]
          );
        }

      } // end match on highlight
    } // end for
    table
  }

  fn make_machine_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Contents"]);

    let current = match try_decode_instruction(self.ir) {
      Ok(instruction) => instruction.to_string(),
      Err(_)          => format!("{:#010x}", self.ir)
    };

    table.add_row(row![r->"PC =", Address::Code(self.pc)]);
    table.add_row(row![r->"IR =", current]);
    table.add_row(row![r->"SP =", Address::Data(self.data.sp())]);
    table.add_row(row![r->"Limit =", Address::Data(self.data.stack_limit())]);
    table.add_row(row![r->"Underflows =", self.data.underflows()]);
    table
  }

  // endregion

  // region Low-level utility methods

  /// Builds a machine with `program` loaded at code address 0.
  pub fn new(config: MachineConfig, program: &[Word]) -> Result<SVM, LoadError> {
    if program.len() > config.code_capacity {
      return Err(LoadError::ProgramTooLarge {
        words    : program.len(),
        capacity : config.code_capacity
      });
    }

    Ok(SVM {
      running      : true,
      code         : CodeMemory::new(program, config.code_capacity),
      data         : DataMemory::new(config.data_capacity),
      pc           : 0,
      ir           : 0,
      return_stack : vec![],
    })
  }

  /// Reads a program file and builds a machine around it.
  pub fn load<P: AsRef<Path>>(config: MachineConfig, path: P) -> Result<SVM, LoadError> {
    let program = load_file(path, config.code_capacity)?;
    SVM::new(config, &program)
  }

  pub fn is_running(&self) -> bool {
    self.running
  }

  pub fn pc(&self) -> AddressNumberType {
    self.pc
  }

  pub fn data(&self) -> &DataMemory {
    &self.data
  }

  pub fn return_stack(&self) -> &[AddressNumberType] {
    &self.return_stack
  }

  /// The address of the instruction being executed.
  fn here(&self) -> Address {
    Address::Code(self.pc.saturating_sub(1))
  }

  fn pop(&mut self) -> Word {
    self.data.pop()
  }

  fn push(&mut self, value: Word) -> Result<(), VmError> {
    self.data.push(value)
  }

  /// Pops the right operand, then the left, and pushes `op(left, right)`.
  fn binary<F>(&mut self, op: F) -> Result<(), VmError>
    where F: Fn(Word, Word) -> Word
  {
    let right = self.pop();
    let left  = self.pop();
    self.push(op(left, right))
  }

  fn unary<F>(&mut self, op: F) -> Result<(), VmError>
    where F: Fn(Word) -> Word
  {
    let value = self.pop();
    self.push(op(value))
  }

  // endregion

  // region Fetch-decode-execute

  /// Runs until HALT or a fatal error. After an error the run flag is clear and no further
  /// instruction has executed.
  pub fn run<P: Ports>(&mut self, ports: &mut P) -> Result<(), VmError> {
    #[cfg(feature = "trace_computation")]
    eprintln!("{}", self);

    while self.running {
      if let Err(error) = self.step(ports) {
        self.running = false;
        return Err(error);
      }
    }
    Ok(())
  }

  /// Executes exactly one instruction.
  pub fn step<P: Ports>(&mut self, ports: &mut P) -> Result<(), VmError> {
    self.ir  = self.code.fetch(self.pc)?;
    self.pc += 1;

    let instruction = try_decode_instruction(self.ir)?;

    #[cfg(feature = "trace_computation")]
    eprintln!("{}: {}", self.here(), instruction);

    self.execute(instruction, ports)?;

    #[cfg(feature = "trace_computation")]
    eprintln!("{}", self);

    Ok(())
  }

  fn execute<P: Ports>(&mut self, instruction: Instruction, ports: &mut P) -> Result<(), VmError> {
    let operand = instruction.operand;

    match instruction.opcode {

      Opcode::Halt => {
        self.running = false;
      }

      // region Stack and storage

      Opcode::Push | Opcode::Lvalue => {
        self.push(operand as Word)?;
      }

      Opcode::Rvalue => {
        let value = self.data.load(operand as i64)?;
        self.push(value)?;
      }

      Opcode::Pop => {
        self.pop();
      }

      Opcode::Sto => {
        let value   = self.pop();
        let address = self.pop();
        self.data.store(address as i64, value)?;
      }

      Opcode::Copy => {
        let value = self.pop();
        self.push(value)?;
        self.push(value)?;
      }

      // endregion

      // region Arithmetic

      Opcode::Add => self.binary(Word::wrapping_add)?,
      Opcode::Sub => self.binary(Word::wrapping_sub)?,
      Opcode::Mpy => self.binary(Word::wrapping_mul)?,

      Opcode::Div | Opcode::Mod => {
        let right = self.pop();
        let left  = self.pop();
        if right == 0 {
          return Err(VmError::DivisionByZero(self.here()));
        }
        let result = match instruction.opcode {
          Opcode::Div => left.wrapping_div(right),
          _           => left.wrapping_rem(right)
        };
        self.push(result)?;
      }

      Opcode::Neg => self.unary(Word::wrapping_neg)?,
      Opcode::Not => self.unary(|v| !v)?,

      // endregion

      // region Logical and comparison

      Opcode::Or  => self.binary(|l, r| (l != 0 || r != 0) as Word)?,
      Opcode::And => self.binary(|l, r| (l != 0 && r != 0) as Word)?,

      Opcode::Eq  => self.binary(|l, r| (l == r) as Word)?,
      Opcode::Ne  => self.binary(|l, r| (l != r) as Word)?,
      Opcode::Gt  => self.binary(|l, r| (l >  r) as Word)?,
      Opcode::Ge  => self.binary(|l, r| (l >= r) as Word)?,
      Opcode::Lt  => self.binary(|l, r| (l <  r) as Word)?,
      Opcode::Le  => self.binary(|l, r| (l <= r) as Word)?,

      // endregion

      // region Control flow

      Opcode::Label => {}

      Opcode::Goto => {
        self.pc = operand as AddressNumberType;
      }

      Opcode::Gofalse => {
        if self.pop() == 0 {
          self.pc = operand as AddressNumberType;
        }
      }

      Opcode::Gotrue => {
        if self.pop() != 0 {
          self.pc = operand as AddressNumberType;
        }
      }

      Opcode::Gosub => {
        self.return_stack.push(self.pc);
        self.pc = operand as AddressNumberType;
      }

      Opcode::Ret => {
        self.pc = match self.return_stack.pop() {
          Some(pc) => pc,
          None     => return Err(VmError::ReturnStackUnderflow(self.here()))
        };
      }

      // endregion

      // region Ports

      Opcode::Print => {
        let value = self.pop();
        ports.print_integer(value)?;
      }

      Opcode::Read => {
        let value = ports.read_integer()?;
        self.push(value)?;
      }

      // endregion

      // region Bitwise

      Opcode::Orb  => self.binary(|l, r| l | r)?,
      Opcode::Andb => self.binary(|l, r| l & r)?,
      Opcode::Xorb => self.binary(|l, r| l ^ r)?,
      Opcode::Shl  => self.unary(|v| v.wrapping_shl(1))?,
      Opcode::Shr  => self.unary(|v| ((v as u32) >> 1) as Word)?,
      Opcode::Sar  => self.unary(|v| v >> 1)?,

      // endregion

    } // end match on opcode

    Ok(())
  }

  // endregion

}


lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for SVM {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let stack  = self.data.stack();
    let window = &stack[..stack.len().min(STACK_WINDOW)];

    let machine_table = self.make_machine_table();
    let stack_table   = SVM::make_register_table('S', window, Some(0), self.data.sp());
    let call_table    = SVM::make_register_table('R', &self.return_stack, None, 0);

    let mut combined_table = table!([machine_table, stack_table, call_table]);

    combined_table.set_titles(row![ub->"Machine", ub->"Operand Stack", ub->"Call Stack"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    let status = match self.running {
      true  => "Running.",
      false => "Halted."
    };

    write!(f, "{}\n{}", status, combined_table)
  }
}


#[cfg(test)]
mod tests {
  use std::io::Cursor;

  use super::*;
  use crate::ports::StreamPorts;

  use crate::bytecode::Opcode::*;

  fn assemble(instructions: &[(Opcode, Operand)]) -> Vec<Word> {
    instructions
      .iter()
      .map(|&(opcode, operand)| encode_instruction(Instruction::new(opcode, operand)))
      .collect()
  }

  /// Runs the program with the given input and returns the machine, the result, and the output.
  fn run_with(config: MachineConfig, instructions: &[(Opcode, Operand)], input: &str)
    -> (SVM, Result<(), VmError>, String)
  {
    let mut vm    = SVM::new(config, &assemble(instructions)).unwrap();
    let mut ports = StreamPorts::new(Cursor::new(input.to_string()), Vec::new());
    let result    = vm.run(&mut ports);
    let output    = String::from_utf8(ports.into_output()).unwrap();
    (vm, result, output)
  }

  fn run(instructions: &[(Opcode, Operand)]) -> (SVM, Result<(), VmError>, String) {
    run_with(MachineConfig::default(), instructions, "")
  }

  /// Runs the program and returns the top of the operand stack.
  fn top_after(instructions: &[(Opcode, Operand)]) -> Word {
    let (vm, result, _) = run(instructions);
    result.unwrap();
    vm.data().peek().unwrap()
  }

  #[test]
  fn push_print_halt() {
    let (vm, result, output) = run(&[(Push, 42), (Print, 0), (Halt, 0)]);
    assert!(result.is_ok());
    assert!(!vm.is_running());
    assert_eq!(output, "42\n");
  }

  #[test]
  fn lvalue_pushes_address_rvalue_pushes_contents() {
    let (vm, result, output) = run(&[
      (Lvalue, 10), (Push, 7), (Sto, 0),
      (Lvalue, 10), (Print, 0),
      (Rvalue, 10), (Print, 0),
      (Halt, 0)
    ]);
    result.unwrap();
    assert_eq!(output, "10\n7\n");
    assert_eq!(vm.data().stack_limit(), 10);
    assert_eq!(vm.data().load(10).unwrap(), 7);
  }

  #[test]
  fn copy_duplicates_top() {
    let (vm, result, _) = run(&[(Push, 9), (Copy, 0), (Halt, 0)]);
    result.unwrap();
    assert_eq!(vm.data().stack(), &[9, 9]);
  }

  #[test]
  fn subtraction_is_left_minus_right() {
    assert_eq!(top_after(&[(Push, 10), (Push, 3), (Sub, 0), (Halt, 0)]), 7);
    assert_eq!(top_after(&[(Push, 3), (Push, 10), (Sub, 0), (Halt, 0)]), -7);
  }

  #[test]
  fn division_and_remainder_keep_operand_order() {
    assert_eq!(top_after(&[(Push, 17), (Push, 5), (Div, 0), (Halt, 0)]), 3);
    assert_eq!(top_after(&[(Push, 17), (Push, 5), (Mod, 0), (Halt, 0)]), 2);
    assert_eq!(top_after(&[(Push, 6), (Push, 7), (Mpy, 0), (Halt, 0)]), 42);
  }

  #[test]
  fn division_by_zero_is_fatal() {
    let (vm, result, output) = run(&[(Push, 1), (Push, 0), (Div, 0), (Push, 5), (Print, 0)]);
    assert!(matches!(result, Err(VmError::DivisionByZero(Address::Code(2)))));
    assert!(!vm.is_running());
    assert_eq!(output, "");

    let (_, result, _) = run(&[(Push, 1), (Push, 0), (Mod, 0), (Halt, 0)]);
    assert!(matches!(result, Err(VmError::DivisionByZero(_))));
  }

  #[test]
  fn arithmetic_wraps() {
    // 0xFFFF * 0xFFFF overflows a 32 bit word.
    let expected = 65535i32.wrapping_mul(65535);
    assert_eq!(top_after(&[(Push, 0xFFFF), (Push, 0xFFFF), (Mpy, 0), (Halt, 0)]), expected);
  }

  #[test]
  fn neg_and_not() {
    assert_eq!(top_after(&[(Push, 5), (Neg, 0), (Halt, 0)]), -5);
    assert_eq!(top_after(&[(Push, 5), (Not, 0), (Halt, 0)]), !5);
    assert_eq!(top_after(&[(Push, 0), (Not, 0), (Halt, 0)]), -1);
  }

  #[test]
  fn logical_or_and() {
    assert_eq!(top_after(&[(Push, 0), (Push, 0), (Or, 0), (Halt, 0)]), 0);
    assert_eq!(top_after(&[(Push, 0), (Push, 8), (Or, 0), (Halt, 0)]), 1);
    assert_eq!(top_after(&[(Push, 3), (Push, 8), (And, 0), (Halt, 0)]), 1);
    assert_eq!(top_after(&[(Push, 3), (Push, 0), (And, 0), (Halt, 0)]), 0);
  }

  #[test]
  fn comparison_truth_table() {
    let pairs = [(3, 3), (3, 5), (5, 3)];
    let table: [(Opcode, [Word; 3]); 6] = [
      (Eq, [1, 0, 0]),
      (Ne, [0, 1, 1]),
      (Gt, [0, 0, 1]),
      (Ge, [1, 0, 1]),
      (Lt, [0, 1, 0]),
      (Le, [1, 1, 0]),
    ];
    for &(opcode, expected) in table.iter() {
      for (&(left, right), &want) in pairs.iter().zip(expected.iter()) {
        let got = top_after(&[(Push, left), (Push, right), (opcode, 0), (Halt, 0)]);
        assert_eq!(got, want, "{} {} {}", left, opcode, right);
      }
    }
  }

  #[test]
  fn bitwise_operations() {
    assert_eq!(top_after(&[(Push, 0b1100), (Push, 0b1010), (Orb, 0), (Halt, 0)]), 0b1110);
    assert_eq!(top_after(&[(Push, 0b1100), (Push, 0b1010), (Andb, 0), (Halt, 0)]), 0b1000);
    assert_eq!(top_after(&[(Push, 0b1100), (Push, 0b1010), (Xorb, 0), (Halt, 0)]), 0b0110);
    assert_eq!(top_after(&[(Push, 3), (Shl, 0), (Halt, 0)]), 6);
  }

  #[test]
  fn right_shifts_differ_on_negative_values() {
    // -2 is built as NOT 1.
    assert_eq!(top_after(&[(Push, 1), (Not, 0), (Shr, 0), (Halt, 0)]), 0x7FFF_FFFF);
    assert_eq!(top_after(&[(Push, 1), (Not, 0), (Sar, 0), (Halt, 0)]), -1);
    assert_eq!(top_after(&[(Push, 9), (Sar, 0), (Halt, 0)]), 4);
  }

  #[test]
  fn label_is_a_no_op() {
    let (vm, result, _) = run(&[(Label, 3), (Push, 1), (Halt, 0)]);
    result.unwrap();
    assert_eq!(vm.data().stack(), &[1]);
  }

  #[test]
  fn conditional_jumps() {
    // Skips the first PRINT when the condition is false, then loops once through GOTRUE.
    let (_, result, output) = run(&[
      (Push, 0), (Gofalse, 4),   // 0, 1
      (Push, 111), (Print, 0),   // 2, 3 skipped
      (Push, 1), (Gotrue, 8),    // 4, 5
      (Push, 222), (Print, 0),   // 6, 7 skipped
      (Push, 333), (Print, 0),   // 8, 9
      (Goto, 12),                // 10
      (Push, 444),               // 11 skipped
      (Halt, 0),                 // 12
    ]);
    result.unwrap();
    assert_eq!(output, "333\n");
  }

  #[test]
  fn gosub_then_ret_resumes_after_call() {
    let (vm, result, output) = run(&[
      (Gosub, 4),              // 0
      (Push, 2), (Print, 0),   // 1, 2
      (Halt, 0),               // 3
      (Push, 1), (Print, 0),   // 4, 5
      (Ret, 0),                // 6
    ]);
    result.unwrap();
    assert_eq!(output, "1\n2\n");
    assert!(vm.return_stack().is_empty());
    assert_eq!(vm.pc(), 4);
  }

  #[test]
  fn ret_without_call_is_fatal() {
    let (vm, result, output) = run(&[(Ret, 0), (Push, 1), (Print, 0), (Halt, 0)]);
    assert!(matches!(result, Err(VmError::ReturnStackUnderflow(Address::Code(0)))));
    assert!(!vm.is_running());
    assert_eq!(output, "");
  }

  #[test]
  fn read_pushes_input() {
    let (_, result, output) = run_with(
      MachineConfig::default(),
      &[(Read, 0), (Read, 0), (Add, 0), (Print, 0), (Halt, 0)],
      "40\n2\n"
    );
    result.unwrap();
    assert_eq!(output, "42\n");
  }

  #[test]
  fn read_at_end_of_input_is_fatal() {
    let (_, result, _) = run(&[(Read, 0), (Halt, 0)]);
    assert!(matches!(result, Err(VmError::InputExhausted)));
  }

  #[test]
  fn pop_on_empty_stack_continues_with_zero() {
    let (vm, result, output) = run(&[(Pop, 0), (Add, 0), (Print, 0), (Print, 0), (Halt, 0)]);
    result.unwrap();
    assert_eq!(output, "0\n0\n");
    assert_eq!(vm.data().sp(), vm.data().capacity());
    assert_eq!(vm.data().underflows(), 4);
  }

  #[test]
  fn push_into_stored_storage_is_fatal() {
    // Store at address 4 of an 8 word data memory; slots 5..8 remain for the stack.
    let config = MachineConfig::default().with_data_capacity(8);
    let (vm, result, output) = run_with(config, &[
      (Lvalue, 4), (Push, 1), (Sto, 0),
      (Push, 1), (Push, 2), (Push, 3),
      (Push, 4),
      (Print, 0), (Halt, 0)
    ], "");
    match result {
      Err(VmError::StackCollision { attempted: 4, stack_limit: 4 }) => {}
      other => panic!("expected StackCollision, got {:?}", other)
    }
    assert!(!vm.is_running());
    assert_eq!(vm.pc(), 7);
    assert_eq!(output, "");
  }

  #[test]
  fn store_out_of_range_is_fatal() {
    let config = MachineConfig::default().with_data_capacity(8);
    let (_, result, _) = run_with(config, &[(Lvalue, 8), (Push, 1), (Sto, 0), (Halt, 0)], "");
    assert!(matches!(result, Err(VmError::AddressOutOfRange(8))));
  }

  #[test]
  fn unrecognized_opcode_is_fatal() {
    let mut vm    = SVM::new(MachineConfig::default(), &[36 << 16, 0]).unwrap();
    let mut ports = StreamPorts::new(Cursor::new(""), Vec::new());
    assert!(matches!(vm.run(&mut ports), Err(VmError::InvalidOpcode(36))));
    assert_eq!(vm.pc(), 1);
  }

  #[test]
  fn running_off_code_memory_is_fatal() {
    let config = MachineConfig::default().with_code_capacity(2);
    let (_, result, _) = run_with(config, &[(Push, 1), (Pop, 0)], "");
    assert!(matches!(result, Err(VmError::ProgramCounterOutOfRange(Address::Code(2)))));
  }

  #[test]
  fn unloaded_code_is_halt() {
    let (vm, result, _) = run(&[(Push, 1)]);
    result.unwrap();
    assert_eq!(vm.pc(), 2);
  }

  #[test]
  fn program_larger_than_code_memory_is_rejected() {
    let config = MachineConfig::default().with_code_capacity(1);
    assert!(matches!(
      SVM::new(config, &[0, 0]),
      Err(LoadError::ProgramTooLarge { words: 2, capacity: 1 })
    ));
  }

  #[test]
  fn step_executes_one_instruction() {
    let mut vm    = SVM::new(MachineConfig::default(), &assemble(&[(Push, 5), (Halt, 0)])).unwrap();
    let mut ports = StreamPorts::new(Cursor::new(""), Vec::new());
    vm.step(&mut ports).unwrap();
    assert_eq!(vm.pc(), 1);
    assert_eq!(vm.data().peek(), Some(5));
    assert!(vm.is_running());
  }

  #[test]
  fn display_renders_state_tables() {
    let (vm, _, _) = run(&[(Push, 5), (Gosub, 3), (Halt, 0), (Halt, 0)]);
    let rendered = vm.to_string();
    assert!(rendered.starts_with("Halted."));
    assert!(rendered.contains("Operand Stack"));
    assert!(rendered.contains("* --> S[65535] ="));
    assert!(rendered.contains("R[0] ="));
  }
}
