//! Domestic Ledger daemon
//!
//! Tails the control file, keeps the ledger in memory and rewrites the
//! status file after every change. Runs until SIGTERM or Ctrl-C.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- ledger.conf
//! echo 'tr coffee "corner shop" 2020-01-01 -3.5' >> ctl
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use domestic_ledger::config::{self, Config};
use domestic_ledger::{
    ControlFile, LedgerEngine, LedgerError, Result, StatusFile, TokioAlarm, TransactionLog,
};
use log::{info, warn};
use std::env;
use std::process;
use tokio::sync::mpsc;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    match run(&args) {
        Ok(()) => {}
        // an unusable config path is a usage mistake, not a failure
        Err(LedgerError::ConfigFilePath(path)) => {
            warn!("Cannot open config file {}", path);
            let program = args.first().map(String::as_str).unwrap_or("domestic-ledger");
            println!("{}", config::usage(program));
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run(args: &[String]) -> Result<()> {
    let config = Config::from_args(args)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> Result<()> {
    let (firings_tx, firings) = mpsc::unbounded_channel();
    let journal = TransactionLog::open(&config.transactions_log)?;
    let status = StatusFile::new(&config.status);

    let mut engine = LedgerEngine::new(TokioAlarm::new(firings_tx), status)
        .with_journal(journal)
        .with_refresh_interval(config.refresh_interval);
    engine.publish()?;

    let (control, watcher) = ControlFile::new(&config.ctl_file, config.poll_interval).spawn();
    info!(
        "Reading commands from {}, publishing to {}",
        config.ctl_file.display(),
        config.status.display()
    );

    let result = engine.run(control, firings, shutdown_signal()).await;

    info!("Closing");
    watcher.abort();
    result
}

/// Resolves on SIGTERM or Ctrl-C.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = term.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
                return;
            }
            Err(e) => warn!("Cannot listen for SIGTERM: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
