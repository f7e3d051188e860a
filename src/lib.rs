pub mod common;
pub mod driver;

use common::error::{DriverError, Result};
use driver::Driver;

/// Shared entry point for the driver binary: parse the command line, run
/// the pipeline, render any error once, and exit nonzero on failure.
pub fn driver_main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("cc9995: error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut driver = Driver::new();
    driver.parse_args(&args)?;
    if !driver.has_inputs() {
        return Err(DriverError::usage("no input files"));
    }
    driver.run()
}
