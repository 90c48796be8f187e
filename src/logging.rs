//! Tracing setup.
//!
//! The terminal belongs to the UI, so logs only go to a file. The filter comes
//! from `RUST_LOG` and defaults to `info`.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Installs the global subscriber, appending to `path`. Without a path
/// nothing is installed and every event is dropped.
///
/// # Errors
///
/// Fails if the log file cannot be opened or a subscriber is already set.
pub fn init(path: Option<&Path>) -> color_eyre::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };

    let writer = Mutex::new(open(path)?);
    tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()?;

    tracing::info!(path = %path.display(), "logging started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_path_is_noop() {
        assert!(init(None).is_ok());
    }

    #[test]
    fn test_open_appends() {
        let path = std::env::temp_dir().join(format!("cat-breeds-{}.log", std::process::id()));
        std::fs::write(&path, "first\n").expect("seed log");

        {
            use std::io::Write;
            let mut file = open(&path).expect("open log");
            writeln!(file, "second").expect("append");
        }

        let contents = std::fs::read_to_string(&path).expect("read log");
        assert_eq!(contents, "first\nsecond\n");
        std::fs::remove_file(&path).expect("clean up");
    }
}
