use clap::Parser;
use cloudview::{run, Args};
use log::{debug, error};
use std::process::ExitCode;

fn main() -> ExitCode {
    // arg parsing
    let args = Args::parse();

    // logger
    if let Err(e) = simple_logger::init_with_level(args.log_level) {
        eprintln!("Failed to initialize logging: {e}");
    }

    // run
    if let Err(e) = run(&args) {
        error!("{e:#}");
        debug!("{e:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
