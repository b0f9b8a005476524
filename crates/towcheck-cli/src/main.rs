//! Towcheck - caravan and tow vehicle weight compliance
//!
//! A CLI tool that turns scale or weighbridge readings into a compliance
//! verdict against the manufacturer's ratings.

mod cli;
mod commands;
mod output;
mod telemetry;

use clap::Parser;
use cli::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = commands::execute(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
