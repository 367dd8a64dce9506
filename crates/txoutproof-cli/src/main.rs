mod cli;
mod config;
mod dot;
mod report;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use txoutproof_spv::MerkleBlock;

use crate::cli::Cli;
use crate::config::Config;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Nothing left to report to if the terminal write fails; the
            // exit code still carries the outcome.
            let _ = e.print();
            return ExitCode::from(parse_exit_code(e.kind()));
        }
    };
    let config = cli.config();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli.hex, &config) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Exit status for a command line clap refused: 0 for `--help` and
/// `--version`, 1 for everything else, including a wrong argument count.
fn parse_exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

/// Decode, reconstruct and render one proof. Nothing is printed here, so a
/// failure never leaves a partial graph on stdout.
fn run(hex_input: &str, config: &Config) -> Result<String> {
    let block = MerkleBlock::from_hex(hex_input)
        .context("failed to decode transaction output proof data")?;

    let mut out = String::new();
    if config.render.comments {
        report::describe_header(&mut out, &block.header)?;
        report::describe_body(&mut out, &block.body)?;
    }

    let tree = block
        .reconstruct(config.policy)
        .context("failed to build merkle tree")?;

    if block.verify(&tree) {
        info!(root = %tree.root(), "computed merkle root matches block header");
    } else {
        warn!(
            computed = %tree.root(),
            header = %block.header.merkle_root,
            "computed merkle root does not match block header"
        );
    }
    if config.render.comments {
        report::describe_tree(&mut out, &block, &tree)?;
    }

    out.push_str(&dot::render_dot(&tree, &config.render));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use txoutproof_spv::{SpvError, TraversalPolicy};

    const GENESIS_PROOF_HEX: &str = "0100000000000000000000000000000000000000000000000000000000000000000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a29ab5f49ffff001d1dac2b7c01000000013ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a0101";

    fn config(comments: bool) -> Config {
        Config {
            policy: TraversalPolicy::FullHeight,
            render: RenderConfig { comments, ..RenderConfig::default() },
            log_filter: "warn",
        }
    }

    fn parse_status(args: &[&str]) -> u8 {
        let err = Cli::try_parse_from(args).unwrap_err();
        parse_exit_code(err.kind())
    }

    #[test]
    fn test_parse_exit_code() {
        assert_eq!(parse_status(&["txoutproof-dot"]), 1);
        assert_eq!(parse_status(&["txoutproof-dot", "00", "11"]), 1);
        assert_eq!(parse_status(&["txoutproof-dot", "--policy", "sideways", "00"]), 1);
        assert_eq!(parse_status(&["txoutproof-dot", "--help"]), 0);
        assert_eq!(parse_status(&["txoutproof-dot", "--version"]), 0);
    }

    #[test]
    fn test_run_genesis() {
        let out = run(GENESIS_PROOF_HEX, &config(true)).unwrap();
        assert!(out.starts_with("//Decoded Block Header"));
        assert!(out.contains("//Merkle Root Check: OK"));
        assert!(out.contains("digraph G {"));
        assert!(out.contains(
            "label=\"4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b\""
        ));
    }

    #[test]
    fn test_run_without_comments() {
        let out = run(GENESIS_PROOF_HEX, &config(false)).unwrap();
        assert!(out.starts_with("digraph G {"));
        assert!(!out.contains("//"));
    }

    #[test]
    fn test_run_mismatch_still_renders() {
        // Replace the header's merkle root with zeros.
        let tampered = format!(
            "{}{}{}",
            &GENESIS_PROOF_HEX[..72],
            "0".repeat(64),
            &GENESIS_PROOF_HEX[136..]
        );
        let out = run(&tampered, &config(true)).unwrap();
        assert!(out.contains("//Merkle Root Check: MISMATCH"));
        assert!(out.contains("digraph G {"));
    }

    #[test]
    fn test_run_bad_hex() {
        let err = run("0g", &config(true)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SpvError>(),
            Some(SpvError::MalformedArgument(_))
        ));
        assert!(run("abc", &config(true)).is_err());
    }

    #[test]
    fn test_run_reports_malformed_proof() {
        // Drop the final flag byte and fix up its count.
        let truncated = format!("{}00", &GENESIS_PROOF_HEX[..GENESIS_PROOF_HEX.len() - 4]);
        let err = run(&truncated, &config(true)).unwrap_err();
        assert!(format!("{:#}", err).starts_with("failed to build merkle tree"));
        assert!(matches!(
            err.downcast_ref::<SpvError>(),
            Some(SpvError::FlagStreamExhausted { consumed: 0 })
        ));
    }

    #[test]
    fn test_run_short_input() {
        let err = run("00", &config(true)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SpvError>(),
            Some(SpvError::TruncatedInput { .. })
        ));
    }
}
