use env_logger::{Builder, Target};
use log::{Level, LevelFilter};
use std::io::Write;

// HTTP stack crates that flood debug output with connection chatter
const NOISY_CRATES: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls"];

/// Level for a count of `-v` flags. Without any, debug builds log debug and
/// release builds log info.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 if cfg!(debug_assertions) => LevelFilter::Debug,
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Logs go to stderr so command output on stdout stays scriptable.
/// RUST_LOG, when set, overrides the computed levels.
pub fn init(verbosity: u8) {
    let level = level_for(verbosity);
    let mut builder = Builder::new();

    builder.target(Target::Stderr).filter_level(level);
    if level < LevelFilter::Trace {
        for name in NOISY_CRATES {
            builder.filter_module(name, LevelFilter::Warn);
        }
    }

    builder
        .format(|buf, record| {
            let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
            if record.level() >= Level::Debug {
                writeln!(buf, "[{}] [{}] [{}] {}", timestamp, record.level(), record.target(), record.args())
            } else {
                writeln!(buf, "[{}] [{}] {}", timestamp, record.level(), record.args())
            }
        })
        .parse_env("RUST_LOG");

    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_raises_level() {
        assert_eq!(level_for(1), LevelFilter::Debug);
        assert_eq!(level_for(2), LevelFilter::Trace);
        assert_eq!(level_for(7), LevelFilter::Trace);
        assert!(level_for(0) >= LevelFilter::Info);
    }
}
