use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const CRATES: [&str; 4] = ["portal", "portal_core", "portal_http", "portal_session"];

/// Initialize stderr logging for the CLI.
///
/// `RUST_LOG` takes precedence over `level`. Stdout is left for command
/// output.
pub fn init_logging(level: Level, json: bool) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives(level).into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(())
}

fn default_directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cover_workspace() {
        assert_eq!(
            default_directives(Level::DEBUG),
            "portal=debug,portal_core=debug,portal_http=debug,portal_session=debug"
        );
    }
}
