// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(name = "helmstat")]
#[command(
    author,
    version,
    about = "Show the live status and recent events of a Helm release's resources"
)]
pub struct Args {
    /// Helm release name
    pub release: String,

    /// Namespace the release is stored in (defaults to the context's namespace)
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Look the release up across all namespaces
    #[arg(short = 'A', long, conflicts_with = "namespace")]
    pub all_namespaces: bool,

    /// Kubernetes context to use
    #[arg(short, long, value_name = "CONTEXT")]
    pub context: Option<String>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Overall deadline for the status check, in seconds
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Maximum number of resources inspected at once
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrency: Option<u32>,

    /// Skip event correlation
    #[arg(long)]
    pub no_events: bool,

    /// List stored revisions of the release instead of its status
    #[arg(long)]
    pub history: bool,

    /// Omit column headers in output
    #[arg(long)]
    pub no_headers: bool,

    /// Store the given namespace, context, timeout, concurrency and output
    /// as defaults in ~/.helmstat/config.json
    #[arg(long)]
    pub save_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Text,
    Json,
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let args = Args::try_parse_from(["helmstat", "web"]).unwrap();
        assert_eq!(args.release, "web");
        assert!(args.namespace.is_none());
        assert!(args.output.is_none());
        assert!(!args.history);
    }

    #[test]
    fn test_parse_full() {
        let args = Args::try_parse_from([
            "helmstat",
            "web",
            "-n",
            "prod",
            "-c",
            "staging",
            "-o",
            "json",
            "--timeout",
            "5",
            "--concurrency",
            "2",
            "--no-events",
        ])
        .unwrap();
        assert_eq!(args.namespace.as_deref(), Some("prod"));
        assert_eq!(args.context.as_deref(), Some("staging"));
        assert_eq!(args.output, Some(OutputFormat::Json));
        assert_eq!(args.timeout, Some(5));
        assert_eq!(args.concurrency, Some(2));
        assert!(args.no_events);
    }

    #[test]
    fn test_all_namespaces_conflicts_with_namespace() {
        assert!(Args::try_parse_from(["helmstat", "web", "-A", "-n", "prod"]).is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(Args::try_parse_from(["helmstat", "web", "--concurrency", "0"]).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(Args::try_parse_from(["helmstat", "web", "--timeout", "0"]).is_err());
        let args = Args::try_parse_from(["helmstat", "web", "--timeout", "1"]).unwrap();
        assert_eq!(args.timeout, Some(1));
    }

    #[test]
    fn test_release_required() {
        assert!(Args::try_parse_from(["helmstat"]).is_err());
    }

    #[test]
    fn test_output_format_serde() {
        let format: OutputFormat = serde_json::from_str(r#""yaml""#).unwrap();
        assert_eq!(format, OutputFormat::Yaml);
        assert_eq!(serde_json::to_string(&OutputFormat::Text).unwrap(), r#""text""#);
    }
}
