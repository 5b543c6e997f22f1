use clap::{Args, Parser, Subcommand};
use scrapi_client::{EngineConfig, LogLevel};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "scrapi",
    version,
    about = "Register signed statements with a SCITT transparency service and fetch receipts"
)]
pub struct Cli {
    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Register a signed statement and wait for its receipt
    Register(RegisterArgs),
    /// Submit a signed statement without waiting
    Submit(SubmitArgs),
    /// Show the state of a registration operation
    Status(StatusArgs),
    /// Download the receipt for a registered entry
    Receipt(ReceiptArgs),
    /// Recover the issuer's signed statement for a registered entry
    Statement(StatementArgs),
    /// Show the transparency service configuration
    Config,
}

/// Connection settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// Transport engine type
    #[arg(long, global = true, env = "SCRAPI_ENGINE", default_value = "DataTrails")]
    pub engine: String,

    /// Base URL of the transparency service
    #[arg(long, global = true, env = "SCRAPI_URL")]
    pub url: Option<String>,

    /// Client id for the credentials exchange
    #[arg(long, global = true, env = "SCRAPI_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Client secret for the credentials exchange
    #[arg(long, global = true, env = "SCRAPI_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Pre-issued bearer token (overrides client credentials)
    #[arg(long, global = true, env = "SCRAPI_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Log verbosity when RUST_LOG is unset
    #[arg(long, global = true, env = "SCRAPI_LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "SCRAPI_TIMEOUT", default_value_t = 30)]
    pub request_timeout: u64,

    /// Max resends for rate-limited or dropped requests
    #[arg(long, global = true, env = "SCRAPI_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,
}

impl ServiceArgs {
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig {
            client_id: self.client_id.clone().filter(|s| !s.is_empty()),
            client_secret: self.client_secret.clone().filter(|s| !s.is_empty()),
            token: self.token.clone().filter(|s| !s.is_empty()),
            log_level: self.log_level,
            timeout_secs: self.request_timeout,
            max_retries: self.max_retries,
            ..EngineConfig::default()
        };
        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        config
    }
}

#[derive(Args, Debug, Clone)]
pub struct RegisterArgs {
    /// Signed statement (COSE_Sign1) to register
    pub file: PathBuf,

    /// Where to write the receipt
    #[arg(long, default_value = "final_receipt")]
    pub receipt_out: PathBuf,

    /// Give up waiting after this many seconds (default: wait indefinitely)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Seconds between status polls
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,
}

#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    /// Signed statement (COSE_Sign1) to submit
    pub file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Operation id returned by submit
    pub operation_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct ReceiptArgs {
    /// Entry id of the registered statement
    pub entry_id: String,

    /// Where to write the receipt
    #[arg(long, short = 'o')]
    pub out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct StatementArgs {
    /// Entry id of the registered statement
    pub entry_id: String,

    /// Also write the statement envelope to this path
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_register_defaults() {
        let cli = Cli::try_parse_from(["scrapi", "register", "stmt.cbor"]).unwrap();
        match cli.cmd {
            Command::Register(args) => {
                assert_eq!(args.file, PathBuf::from("stmt.cbor"));
                assert_eq!(args.receipt_out, PathBuf::from("final_receipt"));
                assert_eq!(args.interval, 2);
                assert!(args.timeout.is_none());
            }
            _ => panic!("expected register"),
        }
    }

    #[test]
    fn test_global_flags_build_config() {
        let cli = Cli::try_parse_from([
            "scrapi",
            "status",
            "op-1",
            "--url",
            "http://localhost:8080",
            "--token",
            "abc",
            "--log-level",
            "DEBUG",
            "--max-retries",
            "0",
        ])
        .unwrap();

        let config = cli.service.engine_config();
        assert_eq!(config.url, "http://localhost:8080");
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        assert!(Cli::try_parse_from(["scrapi", "register", "stmt.cbor", "--interval", "0"]).is_err());
        assert!(Cli::try_parse_from(["scrapi", "register", "stmt.cbor", "--interval", "1"]).is_ok());
    }

    #[test]
    fn test_receipt_requires_out() {
        assert!(Cli::try_parse_from(["scrapi", "receipt", "entry-1"]).is_err());
    }
}
