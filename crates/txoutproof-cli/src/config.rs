//! Run configuration assembled from command-line flags.

use txoutproof_spv::TraversalPolicy;

/// Hex characters shown in non-root node labels.
pub const DEFAULT_LABEL_LEN: usize = 8;

/// Output options for the DOT graph and the comment header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    pub label_len: usize,
    /// Emit `//` diagnostic lines before the graph.
    pub comments: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            label_len: DEFAULT_LABEL_LEN,
            comments: true,
        }
    }
}

/// Everything a single run needs besides the proof itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub policy: TraversalPolicy,
    pub render: RenderConfig,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: &'static str,
}

impl Config {
    /// Map `-v` occurrences to a log level; stderr stays quiet except for
    /// warnings by default.
    pub fn log_filter_for(verbosity: u8) -> &'static str {
        match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
