//! Command line front-end of the SR100 model compiler.
//!
//! `main` only parses arguments and sets up logging; `handle` runs a command with a
//! given compiler runner so the commands can be driven without a real Vela.

#[macro_use]
extern crate log;

mod compile;
mod modes;
pub mod params;
mod resolver;

use std::io::Write;

use srmc_core::internal::*;

pub use params::{Cli, Command};

/// Run `cli`. `Ok(false)` when the model could not be mapped or does not fit.
pub fn handle<R: ToolRunner>(cli: &Cli, runner: R, out: &mut dyn Write) -> SrmcResult<bool> {
    let compiler = || -> SrmcResult<Compiler<R>> {
        Ok(Compiler::new(runner, cli.profiles.catalog()?).with_program(&cli.vela))
    };
    match &cli.command {
        Command::Compile(args) => compile::handle(&compiler()?, args, out),
        Command::Optimize(args) => compile::optimize(&compiler()?, args, out),
        Command::Resolver(args) => resolver::handle(args, out),
        Command::Modes => modes::handle(&cli.profiles.catalog()?, out),
        Command::ToolVersion => {
            writeln!(out, "{}", compiler()?.tool_version()?)?;
            Ok(true)
        }
    }
}

/// 0 success, 1 not mapped or not fitting, 2 malformed model, 3 unsupported operators,
/// 4 anything else.
pub fn exit_code(outcome: &SrmcResult<bool>) -> i32 {
    match outcome {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(e) => match ErrorClass::of(e) {
            ErrorClass::Parse => 2,
            ErrorClass::UnsupportedOperator => 3,
            ErrorClass::Other => 4,
        },
    }
}
