//! Runtime configuration.
//!
//! The binary takes an optional path to a configuration file of
//! `key = value` lines; blank lines and `#` comments are skipped.
//!
//! ```text
//! # where commands are appended
//! ctlfile = ./ctl
//! statusfile = ./status.json
//! transactionslog = ./transactions_log.csv
//! pollinterval = 250
//! refreshinterval = 60
//! ```
//!
//! Relative paths are resolved against the current working directory.
//! `pollinterval` is in milliseconds, `refreshinterval` in seconds.

use crate::engine::DEFAULT_REFRESH_INTERVAL;
use crate::error::{LedgerError, Result};
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

const TRANSACTIONS_LOG: &str = "transactionslog";
const STATUS_FILE: &str = "statusfile";
const CTL_FILE: &str = "ctlfile";
const POLL_INTERVAL: &str = "pollinterval";
const REFRESH_INTERVAL: &str = "refreshinterval";

const DEFAULT_TRANSACTIONS_LOG: &str = "transactions_log.csv";
const DEFAULT_STATUS_FILE: &str = "status.json";
const DEFAULT_CTL_FILE: &str = "ctl";
const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// CSV log every realized transaction is appended to
    pub transactions_log: PathBuf,

    /// JSON snapshot target
    pub status: PathBuf,

    /// Control file commands are read from
    pub ctl_file: PathBuf,

    /// How often the control file is checked for new data
    pub poll_interval: Duration,

    /// How often the snapshot is checked for a month rollover
    pub refresh_interval: Duration,
}

impl Config {
    /// Default file names in the current directory.
    pub fn defaults() -> Result<Config> {
        Ok(Config {
            transactions_log: absolute(Path::new(DEFAULT_TRANSACTIONS_LOG))?,
            status: absolute(Path::new(DEFAULT_STATUS_FILE))?,
            ctl_file: absolute(Path::new(DEFAULT_CTL_FILE))?,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        })
    }

    /// Builds the configuration from the process arguments
    /// (`args[1]`, when present, is the configuration file).
    pub fn from_args(args: &[String]) -> Result<Config> {
        let path = match args.get(1) {
            Some(path) => path,
            None => return Config::defaults(),
        };

        let file = File::open(path).map_err(|_| LedgerError::ConfigFilePath(path.clone()))?;
        Config::parse(BufReader::new(file))
    }

    /// Parses a configuration file on top of the defaults.
    pub fn parse<R: BufRead>(reader: R) -> Result<Config> {
        let mut config = Config::defaults()?;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            config
                .apply_line(&line)
                .map_err(|message| LedgerError::ConfigFormat {
                    line: idx + 1,
                    message,
                })?;
        }

        Ok(config)
    }

    fn apply_line(&mut self, line: &str) -> std::result::Result<(), String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| "expected 'key = value'".to_string())?;
        let (key, value) = (key.trim(), value.trim());
        if value.is_empty() {
            return Err(format!("missing value for '{}'", key));
        }

        match key {
            TRANSACTIONS_LOG => self.transactions_log = resolve(value)?,
            STATUS_FILE => self.status = resolve(value)?,
            CTL_FILE => self.ctl_file = resolve(value)?,
            POLL_INTERVAL => {
                let millis: u64 = value
                    .parse()
                    .map_err(|_| format!("'{}' is not a number of milliseconds", value))?;
                if millis == 0 {
                    return Err("pollinterval must be positive".to_string());
                }
                self.poll_interval = Duration::from_millis(millis);
            }
            REFRESH_INTERVAL => {
                let secs: u64 = value
                    .parse()
                    .map_err(|_| format!("'{}' is not a number of seconds", value))?;
                if secs == 0 {
                    return Err("refreshinterval must be positive".to_string());
                }
                self.refresh_interval = Duration::from_secs(secs);
            }
            other => return Err(format!("{} is not a valid option", other)),
        }

        Ok(())
    }
}

/// Usage line for the binary.
pub fn usage(program: &str) -> String {
    format!("usage: {} [config_file]", program)
}

fn resolve(value: &str) -> std::result::Result<PathBuf, String> {
    absolute(Path::new(value)).map_err(|e| e.to_string())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(env::current_dir()?.join(path))
}
