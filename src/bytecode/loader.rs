/*!
  Reads a program file into a vector of words. A program file is nothing but big-endian words
  back to back, no header, so parsing is a `many0` over `be_i32` followed by a check that nothing
  is left over.
*/

use std::fs;
use std::path::Path;

use nom::{
  error::Error as NomError,
  multi::many0,
  number::complete::be_i32,
  IResult
};

use super::Word;
use crate::error::LoadError;

fn words(input: &[u8]) -> IResult<&[u8], Vec<Word>> {
  many0(be_i32::<&[u8], NomError<&[u8]>>)(input)
}

/**
  Decodes a byte stream into words. A trailing partial word is an error, as is a program with
  more than `capacity` words.
*/
pub fn parse_program(bytes: &[u8], capacity: usize) -> Result<Vec<Word>, LoadError> {
  // `be_i32` from `nom::number::complete` fails without consuming on short input, so `many0`
  // stops cleanly at the first partial word.
  let (rest, program) = match words(bytes) {
    Ok(parsed) => parsed,
    Err(_) => (bytes, vec![])
  };

  if !rest.is_empty() {
    return Err(LoadError::TruncatedWord {
      offset   : bytes.len() - rest.len(),
      trailing : rest.len()
    });
  }
  if program.len() > capacity {
    return Err(LoadError::ProgramTooLarge { words: program.len(), capacity });
  }

  Ok(program)
}

pub fn load_file<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Vec<Word>, LoadError> {
  let bytes = fs::read(path)?;
  parse_program(&bytes, capacity)
}
