//! Top Level Environment

mod args;

use std::{fs, thread, time};

use anyhow::{Context, Result};
use log::LevelFilter;

use capra::{ala::Program, config::AllocatorConfig, emit, lowered};

/// Reads the program in `filename`.
fn read_program(filename: &str) -> Result<Program> {
  let json = fs::read_to_string(filename).with_context(|| format!("Failed to read {}", filename))?;
  serde_json::from_str(&json).with_context(|| format!("Failed to decode {}", filename))
}

fn run(cfg: args::Config) -> i32 {
  // Helper macro to time evaluating an expression (like a function call.)
  macro_rules! time {
    ( $x:expr ) => {{
      let t1 = time::SystemTime::now();
      let result = $x;
      (result, t1.elapsed().unwrap_or_default())
    }};
  }

  let mut config = match AllocatorConfig::from_file(&cfg.config_file) {
    Err(e) => {
      eprintln!("{}", e);
      return 1; // Bad configuration
    }
    Ok(config) => config,
  };
  if cfg.no_coalesce {
    config.coalescing = false;
  }

  let (program, read_time) = time!(read_program(&cfg.file));
  let program = match program {
    Err(e) => {
      eprintln!("{:#}", e);
      return 1; // Read failed!
    }
    Ok(program) => program,
  };

  let mut output = lowered::Program::default();
  let mut alloc_time = time::Duration::default();
  let mut emit_time = time::Duration::default();
  for procedure in program.procedures {
    let (allocation, elapsed) = time!(capra::allocate(procedure, &config));
    alloc_time += elapsed;
    let allocation = match allocation {
      Err(e) => {
        eprintln!("{:#}", e);
        return 1; // Allocation failed (sad!)
      }
      Ok(allocation) => allocation,
    };

    if cfg.dump_analysis {
      match serde_json::to_string_pretty(&allocation.procedure) {
        Ok(json) => eprintln!("{}", json),
        Err(e) => eprintln!("{}", e),
      }
    }

    if cfg.dump_assignments {
      eprintln!("Procedure: {}", allocation.procedure.name);
      for (location, home) in allocation.assignments.iter() {
        eprintln!("  {} -> {}", location, home);
      }
      eprintln!(
        "  frame: {} bytes",
        allocation.assignments.frame().byte_size()
      );
    }

    let (lowered, elapsed) = time!(allocation.emit());
    emit_time += elapsed;
    match lowered {
      Err(e) => {
        eprintln!("{:#}", e);
        return 1; // Emission failed
      }
      Ok(lowered) => output.procedures.push(lowered),
    }
  }

  if cfg.verbose {
    eprintln!("Read time: {} us", read_time.as_micros());
    eprintln!("Allocation: {} us", alloc_time.as_micros());
    eprintln!("Emission: {} us", emit_time.as_micros());
  }

  match emit::emit_json(cfg.output.as_deref(), &output) {
    Err(e) => {
      eprintln!("{}", e);
      1
    }
    Ok(()) => 0,
  }
}

fn main() {
  let cfg = match args::parse_args() {
    Err(e) => {
      eprintln!("{}", e);
      std::process::exit(1);
    }
    Ok(cfg) => cfg,
  };

  // We call with a large stack, the tree folds recurse once per nesting level.
  let child = thread::Builder::new()
    .stack_size(128 * 1024 * 1024)
    .spawn(move || {
      // logs go to stderr, stdout may carry the lowered program
      env_logger::builder()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .filter_level(if cfg.verbose {
          LevelFilter::Debug
        } else {
          LevelFilter::Warn
        })
        .parse_default_env()
        .init();

      run(cfg)
    });

  // Return the value from the child thread as the return value of the allocator.
  let code = match child.map(|child| child.join()) {
    Ok(Ok(code)) => code,
    Ok(Err(_)) => 101, // the allocator panicked
    Err(e) => {
      eprintln!("Couldn't spawn allocator thread: {}", e);
      1
    }
  };
  std::process::exit(code);
}
