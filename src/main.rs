use clap::Parser;
use roster_import::cli::{Args, commands};
use std::process;

fn main() {
    let args = Args::parse();

    match commands::run(args) {
        Ok(()) => process::exit(0),
        Err(error) => {
            // Summary and report were already written by the command
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}
