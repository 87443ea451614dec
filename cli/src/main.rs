use std::process::ExitCode;

use clap::Parser;
use kyotest_cli::{cmd::GlobalArgs, logger};

/// Exit status on Ctrl-C, as shells report SIGINT.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let app = GlobalArgs::parse();
    logger::init(app.verbose);

    // Dropping the unfinished subcommand kills every child it spawned.
    tokio::select! {
        res = app.exec_subcmd() => match res {
            Ok(code) => ExitCode::from(code),
            Err(e) => {
                eprintln!("Error: {:?}", e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            log::warn!("Interrupted");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}
