//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Crates whose events follow the verbosity toggle; everything else is
/// held at `warn`.
const WORKSPACE_TARGETS: &[&str] = &["oncall", "oncall_admin"];

/// Filter used when `RUST_LOG` is unset.
pub fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    std::iter::once("warn".to_string())
        .chain(WORKSPACE_TARGETS.iter().map(|target| format!("{target}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global `fmt` subscriber on stderr. `RUST_LOG` wins when set.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_directives() {
        assert_eq!(
            default_directives(true),
            "warn,oncall=debug,oncall_admin=debug"
        );
    }

    #[test]
    fn test_quiet_directives() {
        assert_eq!(
            default_directives(false),
            "warn,oncall=info,oncall_admin=info"
        );
    }
}
