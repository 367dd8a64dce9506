//! Command-line definition.

use clap::Parser;
use txoutproof_spv::TraversalPolicy;

use crate::config::{Config, RenderConfig, DEFAULT_LABEL_LEN};

#[derive(Parser, Debug)]
#[command(name = "txoutproof-dot")]
#[command(version)]
#[command(
    about = "Render a gettxoutproof / merkleblock hex blob as a Graphviz partial Merkle tree",
    long_about = None
)]
pub struct Cli {
    /// Proof bytes as a hexadecimal string (block header + partial merkle tree)
    pub hex: String,

    /// Branch expansion rule: full-height or level-width (BIP 37 odd-level duplication)
    #[arg(long, default_value_t = TraversalPolicy::FullHeight)]
    pub policy: TraversalPolicy,

    /// Hex characters shown in node labels (the root always shows the full hash)
    #[arg(long, default_value_t = DEFAULT_LABEL_LEN)]
    pub label_len: usize,

    /// Only print the DOT graph, without the `//` diagnostic lines
    #[arg(long)]
    pub no_comments: bool,

    /// Increase log verbosity on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn config(&self) -> Config {
        Config {
            policy: self.policy,
            render: RenderConfig {
                label_len: self.label_len,
                comments: !self.no_comments,
            },
            log_filter: Config::log_filter_for(self.verbose),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["txoutproof-dot", "00"]).unwrap();
        let config = cli.config();
        assert_eq!(cli.hex, "00");
        assert_eq!(config.policy, TraversalPolicy::FullHeight);
        assert_eq!(config.render, RenderConfig::default());
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "txoutproof-dot",
            "--policy",
            "level-width",
            "--label-len",
            "12",
            "--no-comments",
            "-vv",
            "abcd",
        ])
        .unwrap();
        let config = cli.config();
        assert_eq!(config.policy, TraversalPolicy::LevelWidth);
        assert_eq!(config.render.label_len, 12);
        assert!(!config.render.comments);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_argument_count() {
        assert!(Cli::try_parse_from(["txoutproof-dot"]).is_err());
        assert!(Cli::try_parse_from(["txoutproof-dot", "00", "11"]).is_err());
        assert!(Cli::try_parse_from(["txoutproof-dot", "--policy", "sideways", "00"]).is_err());
    }
}
