//! coref-markup - reconcile coreference markup from several annotators
//!
//! Usage:
//!   coref-markup merge <A> <B> [<C>...] -o <OUT>
//!   coref-markup merge-majority <A> <B> <C> -o <OUT>
//!   coref-markup diff <A> <B> [--context <N>]
//!   coref-markup agreement <DIR> [<DIR>]
//!   coref-markup clean <IN> -o <OUT>

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use coref_markup::cli::{self, output::format_error, Cli};

fn init_logging(debug: bool) {
    // --debug wins over RUST_LOG
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_level(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", format_error(&e));
            ExitCode::FAILURE
        }
    }
}
