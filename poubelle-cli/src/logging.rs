use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const CRATES: [&str; 4] = [
    "poubelle",
    "poubelle_core",
    "poubelle_provider_paris",
    "poubelle_map",
];

/// Install the console subscriber; `RUST_LOG` takes precedence over the defaults.
pub(crate) fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives = CRATES
            .iter()
            .map(|krate| format!("{krate}={level}"))
            .collect::<Vec<_>>()
            .join(",");
        EnvFilter::new(directives)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}
