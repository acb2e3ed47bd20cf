//! Log output for the `geobench` binary.
//!
//! Everything goes to stderr; stdout carries leaderboards, reports and JSON
//! score output. `RUST_LOG` directives take precedence over the level passed
//! to [`init_tracing`].

use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the process-wide subscriber. `json` switches to one JSON object
/// per line. A second call keeps the first subscriber.
pub fn init_tracing(json: bool, level: Level) {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(level, directives.as_deref());

    let (structured, plain) = if json {
        let lines = fmt::layer().with_target(false).with_writer(std::io::stderr);
        (Some(lines.json()), None)
    } else {
        let lines = fmt::layer().with_target(false).with_writer(std::io::stderr);
        (None, Some(lines))
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(structured)
        .with(plain)
        .try_init();
}

fn log_filter(level: Level, directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(directives.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::{Layer, Registry};

    fn hint(filter: &EnvFilter) -> Option<LevelFilter> {
        <EnvFilter as Layer<Registry>>::max_level_hint(filter)
    }

    #[test]
    fn test_level_applies_without_directives() {
        assert_eq!(hint(&log_filter(Level::DEBUG, None)), Some(LevelFilter::DEBUG));
        assert_eq!(hint(&log_filter(Level::WARN, Some(""))), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_directives_can_raise_verbosity() {
        let filter = log_filter(Level::INFO, Some("geobench_core=trace"));
        assert_eq!(hint(&filter), Some(LevelFilter::TRACE));
    }

    #[test]
    fn test_repeated_init_is_harmless() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
    }
}
