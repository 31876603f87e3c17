use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize the global tracing subscriber.
///
/// Env precedence: `STRESTBENCH_LOG`, then `RUST_LOG`, then a level derived
/// from `-verbose` (0=error, 1=info, 2=debug, 3=trace).
pub fn init_logging(verbose: u8) {
    let filter = std::env::var("STRESTBENCH_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map_or_else(
            |_| EnvFilter::new(level_for_verbosity(verbose)),
            |value| {
                EnvFilter::try_new(value)
                    .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbose)))
            },
        );

    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global default subscriber: {}", err);
    }
}

const fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        init_logging(1);
        init_logging(1);
    }

    #[test]
    fn level_mapping_covers_all_verbosity_tiers() {
        assert_eq!(level_for_verbosity(0), "error");
        assert_eq!(level_for_verbosity(1), "info");
        assert_eq!(level_for_verbosity(2), "debug");
        assert_eq!(level_for_verbosity(3), "trace");
        assert_eq!(level_for_verbosity(99), "trace");
    }
}
