//! Process-wide tracing setup for binaries and tests embedding a state tree.
//!
//! The library itself only emits `tracing` events; nothing is printed unless
//! the host installs a subscriber, for instance through [`init`].

use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the filter directives.
pub const FILTER_ENV: &str = "TREE_STATE_LOG";

const DEFAULT_FILTER: &str = "tree_state=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output
    Development,
    /// JSON lines
    Production,
    /// Human-readable output routed through the test harness capture
    Test,
}

static INIT_ONCE: Once = Once::new();

/// Installs the global subscriber for `profile`.
///
/// Only the first call in a process has any effect. Filter directives come
/// from `TREE_STATE_LOG` and fall back to `tree_state=info`. If another
/// global subscriber is already installed it is left in place.
///
/// ```
/// use tree_state::logging::{init, Profile};
///
/// init(Profile::Test);
/// init(Profile::Development);
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let result = match profile {
            Profile::Development => tracing_subscriber::fmt()
                .with_env_filter(filter())
                .finish()
                .try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter())
                .finish()
                .try_init(),
            Profile::Test => tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(filter())
                .finish()
                .try_init(),
        };
        if result.is_err() {
            tracing::debug!("global tracing subscriber already installed");
        }
    });
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
