use clap::Parser;
use patent_invoicer::args::{Args, Command};
use patent_invoicer::{commands, Config, Error, ErrorType, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.template(), init_args.ledger_template())?.print()
        }

        Command::Generate(generate_args) => {
            let config = Config::load(home).map_err(|e| Error::new(ErrorType::Config, e))?;
            commands::generate(&config, generate_args.input(), generate_args.overrides())?
                .print()
        }

        Command::Numeral(numeral_args) => commands::numeral(numeral_args.amount()).print(),
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use the given level for the library and this binary only.
            EnvFilter::new(format!(
                "patent_invoicer={},{}={}",
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
