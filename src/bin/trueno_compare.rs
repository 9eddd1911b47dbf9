//! `trueno-compare`: compare recorded runs against their history.

use clap::Parser;
use trueno_runner::cli::{compare_main, CompareArgs};

fn main() -> anyhow::Result<()> {
    compare_main(&CompareArgs::parse())
}
