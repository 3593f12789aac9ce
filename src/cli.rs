//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use rest_guard::DigestAlgorithm;

/// Resilient HTTP requests against a pool of interchangeable nodes.
///
/// Each request is sent to one node; on transport failure or an unexpected
/// status it is retried against the next node until the retry budget is spent.
#[derive(Parser, Debug)]
#[command(name = "rest-guard")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// JSON guard definition (client settings and services)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a path and print the response body to stdout
    Get(GetArgs),

    /// Download a path to a file and print the artifact descriptor as JSON
    Download(DownloadArgs),
}

/// Where and how to send the request.
#[derive(ClapArgs, Debug, Clone)]
pub struct TargetArgs {
    /// Node address as host[:port][/prefix]; repeat for several nodes
    #[arg(short, long = "node", value_name = "ADDRESS")]
    pub nodes: Vec<String>,

    /// Use a service from the --config definition instead of --node
    #[arg(short, long, conflicts_with = "nodes")]
    pub service: Option<String>,

    /// Use https for --node addresses
    #[arg(long)]
    pub tls: bool,

    /// Retries after the first attempt (0-20)
    #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=20))]
    pub retries: u32,

    /// Pause before re-hitting an already failed node, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub retry_interval_ms: u64,

    /// Overall deadline across all attempts in seconds (0 disables)
    #[arg(short, long, default_value_t = 0)]
    pub timeout: u64,

    /// Request path
    pub path: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct GetArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Destination file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Content digest: md5 or sha256
    #[arg(long, default_value_t = DigestAlgorithm::Md5)]
    pub digest: DigestAlgorithm,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_get_parses_nodes_and_defaults() {
        let args = Args::try_parse_from([
            "rest-guard",
            "get",
            "--node",
            "127.0.0.1:8080",
            "-n",
            "mirror.example.org",
            "/index.json",
        ])
        .unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        let Command::Get(get) = args.command else {
            panic!("expected get command");
        };
        assert_eq!(get.target.nodes, ["127.0.0.1:8080", "mirror.example.org"]);
        assert_eq!(get.target.retries, 0);
        assert_eq!(get.target.timeout, 0);
        assert!(!get.target.tls);
        assert_eq!(get.target.path, "/index.json");
    }

    #[test]
    fn test_download_requires_output() {
        assert!(Args::try_parse_from(["rest-guard", "download", "-n", "h", "/f"]).is_err());
    }

    #[test]
    fn test_download_digest_option() {
        let args = Args::try_parse_from([
            "rest-guard",
            "download",
            "-n",
            "h",
            "/f",
            "--output",
            "out.bin",
            "--digest",
            "sha256",
        ])
        .unwrap();
        let Command::Download(download) = args.command else {
            panic!("expected download command");
        };
        assert_eq!(download.digest, DigestAlgorithm::Sha256);
        assert_eq!(download.output, PathBuf::from("out.bin"));
    }

    #[test]
    fn test_service_conflicts_with_nodes() {
        assert!(
            Args::try_parse_from(["rest-guard", "get", "-n", "h", "--service", "s", "/f"]).is_err()
        );
    }

    #[test]
    fn test_global_verbose_after_subcommand() {
        let args = Args::try_parse_from(["rest-guard", "get", "-n", "h", "/f", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_retries_range_enforced() {
        assert!(Args::try_parse_from(["rest-guard", "get", "-n", "h", "-r", "21", "/f"]).is_err());
    }
}
