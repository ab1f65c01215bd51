mod cli;
mod config;
mod constitution;
mod finalize;
mod github;
mod lifecycle;
mod logging;
mod model;
mod schedule;
mod storage;
mod tally;
mod webhook;

use std::process;

use clap::Parser;

fn main() {
    logging::init();

    if let Err(e) = cli::run(cli::Cli::parse()) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
