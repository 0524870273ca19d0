use std::env;
use std::process;

use svm::cli::{self, EXIT_LOAD, EXIT_SUCCESS, EXIT_USAGE};
use svm::{MachineConfig, StreamPorts, SVM};

fn main() {

  #[cfg(feature = "trace_computation")]
  eprintln!("Computation Tracing ENABLED");

  let path = match cli::program_path(env::args().skip(1)) {
    Ok(path) => path,
    Err(e)   => {
      eprintln!("{}", e);
      eprintln!("Usage: svm <program.bin>");
      eprintln!("Status lines are written to stderr; stdout carries only what the program PRINTs.");
      process::exit(EXIT_USAGE);
    }
  };

  let mut machine = match SVM::load(MachineConfig::default(), &path) {
    Ok(machine) => machine,
    Err(e)      => {
      eprintln!("{}: {}", path.display(), e);
      process::exit(EXIT_LOAD);
    }
  };

  // Status lines go to stderr so stdout carries only what the program prints.
  eprintln!("Beginning execution...");
  let mut ports = StreamPorts::console();
  match machine.run(&mut ports) {
    Ok(()) => {
      eprintln!("Done.");
      process::exit(EXIT_SUCCESS);
    }
    Err(e) => {
      eprintln!("{}", e);
      process::exit(e.exit_code());
    }
  }
}
