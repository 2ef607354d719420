//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

/// Default directory holding `gather_view.*.yml` files.
pub const DEFAULT_VIEWS_DIR: &str = "./config/gather";

/// Default tracing filter when neither `RUST_LOG` nor `DEPENDENT_FILTERS_LOG` is set.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Tool configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to gather view configs (default: ./config/gather).
    pub views_dir: PathBuf,

    /// Tracing filter directive (default: "info").
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            views_dir: PathBuf::from(DEFAULT_VIEWS_DIR),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let views_dir = env::var("GATHER_VIEWS_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_VIEWS_DIR));

        let log_filter = env::var("DEPENDENT_FILTERS_LOG")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Self {
            views_dir,
            log_filter,
        }
    }

    /// Override the views directory, e.g. from a CLI flag.
    pub fn with_views_dir(mut self, views_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = views_dir {
            self.views_dir = dir;
        }
        self
    }
}
