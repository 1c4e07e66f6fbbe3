mod args;
mod report;

use clap::Parser;
use env_logger::Env;
use log::{debug, info};
use snafu::ErrorCompat;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    debug!("main: args: {:?}", args);

    let res = report::run_report(&args);

    match res {
        Ok(()) => info!("main: done"),
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(bt) = ErrorCompat::backtrace(&e) {
                eprintln!("{}", bt);
            }
            std::process::exit(1)
        }
    }
}
