use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use env_logger::fmt::Formatter;
use env_logger::{Builder, Env, Target};
use log::Record;

pub const LOG_FILE_NAME: &str = "default.log";

fn format_record(buf: &mut Formatter, record: &Record) -> io::Result<()> {
    writeln!(
        buf,
        "{} [{:<5}] {}:{} - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
        record.level(),
        record.module_path().unwrap_or_else(|| record.target()),
        record.line().unwrap_or(0),
        record.args()
    )
}

/// Append the `log` records of this run to `<log_dir>/default.log`.
/// `RUST_LOG` overrides the `info` default. Returns the log file path.
pub fn init_logger(log_dir: impl AsRef<Path>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let log_dir = log_dir.as_ref();
    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(LOG_FILE_NAME);
    let log_file = OpenOptions::new().create(true).append(true).open(&log_path)?;

    Builder::from_env(Env::default().default_filter_or("info"))
        .format(format_record)
        .target(Target::Pipe(Box::new(log_file)))
        .try_init()?;
    Ok(log_path)
}
