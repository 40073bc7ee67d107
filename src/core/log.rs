use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Installs the global subscriber writing to stderr, leaving stdout to
/// command output.
///
/// When `RUST_LOG` is set its directives are used as given. Otherwise this
/// crate logs at `info` (`debug` with `verbose`) and everything else at `warn`.
pub fn init_logging(verbose: bool) {
    let filter = log_filter(verbose, std::env::var("RUST_LOG").ok().as_deref());

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}

fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    match rust_log.map(str::trim).filter(|directives| !directives.is_empty()) {
        Some(directives) => EnvFilter::builder().parse_lossy(directives),
        None => {
            let level = if verbose {
                LevelFilter::DEBUG
            } else {
                LevelFilter::INFO
            };
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .parse_lossy(format!("{}={level}", env!("CARGO_CRATE_NAME")))
        }
    }
}
