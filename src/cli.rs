//! Command line handling for the `svm` binary.

use std::path::PathBuf;

use crate::error::UsageError;

/// Process exit status for each way a run can end.
pub const EXIT_SUCCESS : i32 = 0;
pub const EXIT_RUNTIME : i32 = 1;
pub const EXIT_USAGE   : i32 = 2;
pub const EXIT_LOAD    : i32 = 3;

/// Extracts the program path. `args` excludes the executable name; exactly one is accepted.
pub fn program_path<I>(args: I) -> Result<PathBuf, UsageError>
  where I: IntoIterator<Item = String>
{
  let mut args = args.into_iter();
  match (args.next(), args.next()) {
    (None, _)          => Err(UsageError::MissingProgram),
    (Some(_), Some(_)) => Err(UsageError::TooManyArguments),
    (Some(path), None) => Ok(PathBuf::from(path))
  }
}
