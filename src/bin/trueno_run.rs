//! `trueno-run`: run one experiment description.

use clap::Parser;
use trueno_runner::cli::{run_main, RunArgs};

fn main() -> anyhow::Result<()> {
    run_main(&RunArgs::parse())
}
