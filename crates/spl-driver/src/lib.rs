//! Runs the SPL middle-end over a module built by the parser.
//!
//! ```text
//! Module ─► registry ─► bind ─► infer ─► monomorphize ─► lift ─► [materialize] ─► verify ─► Backend
//! ```

pub mod config;
pub mod error;
pub mod pipeline;

use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::PipelineOptions;
pub use error::CompileError;
pub use pipeline::{compile_to, compile_unit, Compiled, PipelineStats};

/// Environment variable holding the log filter, e.g. `SPL_LOG=spl_lower=trace`.
pub const LOG_ENV: &str = "SPL_LOG";

static LOGGING_INIT: Once = Once::new();

/// Install a stderr subscriber filtered by `SPL_LOG` (default `warn`).
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_logging() {
    LOGGING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        // Another subscriber may already be installed by the embedding tool.
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
