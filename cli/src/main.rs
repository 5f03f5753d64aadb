#[macro_use]
extern crate log;

use std::process;

use clap::Parser;
use srmc::{Cli, exit_code, handle};
use srmc_core::compiler::SystemToolRunner;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let level = match cli.verbose {
        0 => "srmc=warn,srmc_core=warn,srmc_tflite=warn",
        1 => "srmc=info,srmc_core=info,srmc_tflite=info",
        2 => "srmc=debug,srmc_core=debug,srmc_tflite=debug",
        _ => "srmc=trace,srmc_core=trace,srmc_tflite=trace",
    };
    let env = env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, level);
    env_logger::Builder::from_env(env).format_timestamp_nanos().init();

    let outcome = handle(&cli, SystemToolRunner, &mut std::io::stdout());
    if let Err(e) = &outcome {
        error!("{e:?}");
    }
    process::exit(exit_code(&outcome))
}
