//! Machine configuration. The command line takes no options, so the binary always runs with the
//! defaults; tests use small memories to reach the overflow conditions quickly.

/// Code and data memory hold 64K words each, matching the 16 bit operand field.
pub const DEFAULT_CODE_CAPACITY: usize = 65536;
pub const DEFAULT_DATA_CAPACITY: usize = 65536;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MachineConfig {
  pub code_capacity : usize,
  pub data_capacity : usize,
}

impl MachineConfig {
  pub fn with_data_capacity(self, data_capacity: usize) -> MachineConfig {
    MachineConfig { data_capacity, ..self }
  }

  pub fn with_code_capacity(self, code_capacity: usize) -> MachineConfig {
    MachineConfig { code_capacity, ..self }
  }
}

impl Default for MachineConfig {
  fn default() -> Self {
    MachineConfig {
      code_capacity : DEFAULT_CODE_CAPACITY,
      data_capacity : DEFAULT_DATA_CAPACITY,
    }
  }
}
