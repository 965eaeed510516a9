use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Environment;

fn default_directives(environment: Environment) -> &'static str {
    if environment.is_development() {
        "scrum_board=debug,tower_http=debug,info"
    } else {
        "info"
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the per-environment
/// defaults; packaged runs emit JSON lines.
pub fn init_tracing(environment: Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(environment)));

    if environment.is_development() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_parse() {
        for environment in [Environment::Development, Environment::Production] {
            let directives = default_directives(environment);
            assert!(EnvFilter::try_new(directives).is_ok(), "{}", directives);
        }
    }
}
