//! Loop metadata driver binary.
//!
//! Reads a TIR file (or stdin), lowers every function through the loop
//! stack and prints the instructions with their loop attachments.

use clap::Parser;
use loopmd::test_ir::{lower, DriverArgs, LoopModule};
use std::fs;
use std::io::{self, Read};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = DriverArgs::parse();

    let text = match &args.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let result =
        LoopModule::parse(&text).and_then(|module| lower::run(&module, &args.driver_options()));
    match result {
        Ok(output) => {
            print!("{output}");
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
