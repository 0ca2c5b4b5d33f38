use chrono::Local;
use eyre::Result;
use fern::Dispatch;
use log::LevelFilter;

/// Log level from a `RUST_LOG`-style value, falling back to `Info`.
fn level_from(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Sets up the application logger with console output.
///
/// # Arguments
/// * `verbose` - Force `Debug` regardless of `RUST_LOG`
///
/// # Returns
/// * `Result<()>` - Success or failure of logger setup
///
/// # Errors
/// * If a global logger was already installed
pub fn setup_logger(verbose: bool) -> Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        level_from(std::env::var("RUST_LOG").ok().as_deref())
    };

    Dispatch::new()
        .level(level)
        // stdout carries command output
        .chain(std::io::stderr())
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                message
            ));
        })
        .apply()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from() {
        assert_eq!(level_from(Some("debug")), LevelFilter::Debug);
        assert_eq!(level_from(Some("WARN")), LevelFilter::Warn);
        assert_eq!(level_from(Some("chatty")), LevelFilter::Info);
        assert_eq!(level_from(None), LevelFilter::Info);
    }
}
