//! Log output setup
//!
//! Logs go to stderr so stdout stays free for command output. `RUST_LOG`
//! takes precedence over the verbosity flag.

use tracing_subscriber::EnvFilter;

/// Logging switches from the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    pub verbose: bool,
    pub json: bool,
}

/// Filter directive used when `RUST_LOG` is unset
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "windward=debug"
    } else {
        "windward=info"
    }
}

/// Install the global subscriber. Does nothing if one is already set.
pub fn init(options: LogOptions) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(options.verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // already installed
    let _ = if options.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "windward=info");
        assert_eq!(default_directive(true), "windward=debug");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(LogOptions::default());
        init(LogOptions {
            verbose: true,
            json: true,
        });
    }
}
