//! Parse command line arguments
//! A hand-rolled parser is good enough for the handful of flags we take.

use std::env;

use anyhow::{bail, Result};

const DEFAULT_CONFIG_FILE: &str = "capra.toml";

/// Configuration options for this allocator run.
#[derive(Debug)]
pub struct Config {
  pub verbose: bool,
  pub no_coalesce: bool,
  pub dump_analysis: bool,
  pub dump_assignments: bool,

  pub config_file: String,
  pub output: Option<String>,
  pub file: String,
}

/// Parses command line input into a configuration.
pub fn parse_args() -> Result<Config> {
  parse(env::args().skip(1))
}

fn parse(args: impl IntoIterator<Item = String>) -> Result<Config> {
  let mut verbose = false; // Log every pass
  let mut no_coalesce = false; // Keep every copy
  let mut dump_analysis = false; // Print the analysed tree of each procedure
  let mut dump_assignments = false; // Print the home of every abstract location
  let mut config_file = DEFAULT_CONFIG_FILE.to_string();
  let mut output = None;
  let mut file = None;

  let mut args = args.into_iter();
  while let Some(arg) = args.next() {
    match arg.as_str() {
      "-v" | "--verbose" => verbose = true,
      "--no-coalesce" => no_coalesce = true,
      "--dump-analysis" => dump_analysis = true,
      "--dump-assignments" => dump_assignments = true,
      "-o" | "--output" => match args.next() {
        Some(path) => output = Some(path),
        None => bail!("Expected output file after {}", arg),
      },
      "-c" | "--config" => match args.next() {
        Some(path) => config_file = path,
        None => bail!("Expected configuration file after {}", arg),
      },
      flag if flag.starts_with('-') => bail!("Unknown flag: {}", flag),
      input => {
        if file.replace(input.to_string()).is_some() {
          bail!("Expected a single input file");
        }
      }
    }
  }

  match file {
    Some(file) => Ok(Config {
      verbose,
      no_coalesce,
      dump_analysis,
      dump_assignments,
      config_file,
      output,
      file,
    }),
    None => bail!("Expected file input"),
  }
}
