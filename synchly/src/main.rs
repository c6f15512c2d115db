use anyhow::Result;
use clap::Parser;
use std::error::Error;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

use synchly::cli::{self, Cli};
use synchly::constants::strings;
use synchly::BackupError;

fn init_logging(debug: bool) -> Result<()> {
    let level = if debug { "synchly=debug" } else { "synchly=info" };
    let env_filter = EnvFilter::from_default_env()
        .add_directive(level.parse()?)
        .add_directive("tokio_cron_scheduler=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("sqlx=warn".parse()?)
        .add_directive("russh=warn".parse()?);

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn report(error: &BackupError, debug: bool) {
    eprintln!("{}: {}", error.kind(), error);

    if debug {
        let mut source = error.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
        eprintln!("{:#?}", error);
    } else {
        eprintln!("{}", strings::DEBUG_HINT);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let debug = cli.debug;

    if let Err(e) = init_logging(debug) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e, debug);
            ExitCode::from(e.exit_code())
        }
    }
}
