//! The console ports used by `READ` and `PRINT`.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use crate::bytecode::Word;
use crate::error::VmError;

pub trait Ports {
  /// Blocks until an integer is available on the input port.
  fn read_integer(&mut self) -> Result<Word, VmError>;

  /// Writes `value` in decimal followed by a line terminator.
  fn print_integer(&mut self, value: Word) -> Result<(), VmError>;
}

/// Ports over any reader/writer pair. Input is split into whitespace-delimited tokens, any number
/// of them per line.
pub struct StreamPorts<R, W> {
  input   : R,
  output  : W,
  pending : VecDeque<String>,
}

impl<R: BufRead, W: Write> StreamPorts<R, W> {
  pub fn new(input: R, output: W) -> StreamPorts<R, W> {
    StreamPorts { input, output, pending: VecDeque::new() }
  }

  pub fn into_output(self) -> W {
    self.output
  }

  fn next_token(&mut self) -> Result<Option<String>, VmError> {
    while self.pending.is_empty() {
      let mut line = String::new();
      if self.input.read_line(&mut line)? == 0 {
        return Ok(None);
      }
      self.pending.extend(line.split_whitespace().map(String::from));
    }
    Ok(self.pending.pop_front())
  }
}

impl StreamPorts<io::StdinLock<'static>, io::Stdout> {
  pub fn console() -> Self {
    StreamPorts::new(io::stdin().lock(), io::stdout())
  }
}

impl<R: BufRead, W: Write> Ports for StreamPorts<R, W> {
  fn read_integer(&mut self) -> Result<Word, VmError> {
    match self.next_token()? {
      Some(token) => token.parse::<Word>().map_err(|_| VmError::InvalidInput(token)),
      None        => Err(VmError::InputExhausted)
    }
  }

  fn print_integer(&mut self, value: Word) -> Result<(), VmError> {
    writeln!(self.output, "{}", value)?;
    self.output.flush()?;
    Ok(())
  }
}
