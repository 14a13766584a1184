//! # stemdeck
//!
//! Terminal player for auditioning audio stems on one shared transport.

use log::error;

mod cli;
mod controls;
mod logging;
mod runner;
mod ui;

fn main() {
    let args = cli::args::build_cli().get_matches();
    let log_buffer = logging::init();

    let code = match runner::run(&args, log_buffer) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err);
            eprintln!("error: {}", err);
            1
        }
    };

    std::process::exit(code)
}
