use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use dw_ledger::SortKey;
use dw_types::RecordKind;

#[derive(Parser)]
#[command(
    name = "dataweave",
    about = "DataWeave: verifiable provenance for AI computation",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Ledger state directory (`ledger.json` plus `objects/`).
    #[arg(long, global = true, default_value = ".dataweave")]
    pub data_dir: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server over the ledger
    Serve(ServeArgs),
    /// Create a provenance record
    Create(CreateArgs),
    /// Show a record
    Show(ShowArgs),
    /// Query records
    Query(QueryArgs),
    /// Verify chain integrity
    Verify(VerifyArgs),
    /// Check index and chain-link consistency
    Audit,
    /// Show ledger statistics
    Stats,
    /// Export the ledger as JSON
    Export(ExportArgs),
    /// Replace the ledger with an export
    Import(ImportArgs),
    /// Run simulated miners that write compute, proof and reasoning records
    Simulate(SimulateArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Overrides `bind_addr` from the config file.
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// TOML server configuration. Defaults to `<data-dir>/dataweave.toml`.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct CreateArgs {
    #[arg(short, long)]
    pub kind: RecordKind,
    #[arg(short, long)]
    pub origin: String,
    #[arg(short = 't', long = "type")]
    pub computation_type: String,
    #[arg(long, value_delimiter = ',')]
    pub inputs: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub outputs: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
    #[arg(long)]
    pub model_version: Option<String>,
    #[arg(long)]
    pub reasoning: Option<String>,
    /// Kind-specific payload as JSON; the `kind` tag may be omitted.
    #[arg(short, long, default_value = "{}")]
    pub payload: String,
    /// Opaque producer data as JSON.
    #[arg(long)]
    pub custom_data: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    pub id: String,
    /// Also verify the chain ending at this record.
    #[arg(long)]
    pub chain: bool,
}

#[derive(Args)]
pub struct QueryArgs {
    #[arg(short, long)]
    pub origin: Option<String>,
    #[arg(short, long)]
    pub kind: Option<RecordKind>,
    /// Inclusive lower bound, epoch milliseconds.
    #[arg(long)]
    pub since: Option<u64>,
    /// Inclusive upper bound, epoch milliseconds.
    #[arg(long)]
    pub until: Option<u64>,
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,
    #[arg(long, default_value = "0")]
    pub offset: usize,
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long, default_value = "created-at")]
    pub sort_by: SortField,
    /// Oldest first.
    #[arg(long)]
    pub asc: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SortField {
    CreatedAt,
    Kind,
    Origin,
}

impl From<SortField> for SortKey {
    fn from(field: SortField) -> Self {
        match field {
            SortField::CreatedAt => SortKey::CreatedAt,
            SortField::Kind => SortKey::Kind,
            SortField::Origin => SortKey::OriginId,
        }
    }
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Record to verify from. Without it, every origin's head is verified.
    pub id: Option<String>,
    /// Also compare the record with its durable copy.
    #[arg(long)]
    pub durable: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Write to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ImportArgs {
    pub input: PathBuf,
}

#[derive(Args)]
pub struct SimulateArgs {
    #[arg(short = 'n', long, default_value = "3")]
    pub runs: usize,
    /// Seed for reproducible runs.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Restrict to one of the built-in miners.
    #[arg(long)]
    pub miner: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        let cli = Cli::try_parse_from(["dataweave", "stats"]).unwrap();
        assert!(matches!(cli.command, Command::Stats));
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(cli.data_dir, PathBuf::from(".dataweave"));
        assert!(!cli.verbose);
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "dataweave", "audit", "--format", "json", "--data-dir", "/tmp/dw", "-v",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/dw"));
        assert!(cli.verbose);
    }

    #[test]
    fn parse_create() {
        let cli = Cli::try_parse_from([
            "dataweave", "create", "--kind", "compute", "--origin", "miner-1", "--type",
            "inference", "--inputs", "a,b", "--tags", "x",
        ])
        .unwrap();
        if let Command::Create(args) = cli.command {
            assert_eq!(args.kind, RecordKind::Compute);
            assert_eq!(args.origin, "miner-1");
            assert_eq!(args.inputs, vec!["a", "b"]);
            assert_eq!(args.payload, "{}");
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_create_rejects_unknown_kind() {
        let result = Cli::try_parse_from([
            "dataweave", "create", "--kind", "training", "--origin", "m", "--type", "x",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_query() {
        let cli = Cli::try_parse_from([
            "dataweave", "query", "--kind", "proof", "--sort-by", "origin", "--asc", "-n", "5",
        ])
        .unwrap();
        if let Command::Query(args) = cli.command {
            assert_eq!(args.kind, Some(RecordKind::Proof));
            assert_eq!(SortKey::from(args.sort_by), SortKey::OriginId);
            assert!(args.asc);
            assert_eq!(args.limit, 5);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_verify_without_id() {
        let cli = Cli::try_parse_from(["dataweave", "verify", "--durable"]).unwrap();
        if let Command::Verify(args) = cli.command {
            assert!(args.id.is_none());
            assert!(args.durable);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["dataweave", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
        } else {
            panic!("wrong command");
        }
    }
}
