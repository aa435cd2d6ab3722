use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8080";
const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;
const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Resolved runtime configuration, CLI over config file over defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_bind_address: SocketAddr,
    /// Upper bound on request body size for documents and resources.
    pub max_body_bytes: usize,
    /// Page size applied when a search request does not name one.
    pub default_search_limit: usize,
}

impl ServerConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            http_bind: cli_http_bind,
            max_body_bytes: cli_max_body_bytes,
            default_search_limit: cli_default_search_limit,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let http_bind_address = cli_http_bind
            .or(file_config.http_bind)
            .unwrap_or_else(|| {
                DEFAULT_HTTP_BIND
                    .parse()
                    .expect("default bind address valid")
            });

        let max_body_bytes = cli_max_body_bytes
            .or(file_config.max_body_bytes)
            .unwrap_or(DEFAULT_MAX_BODY_BYTES);
        anyhow::ensure!(max_body_bytes > 0, "max body size must be positive");

        let default_search_limit = cli_default_search_limit
            .or(file_config.default_search_limit)
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .max(1);

        Ok(Self {
            http_bind_address,
            max_body_bytes,
            default_search_limit,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_args(CliArgs::default()).expect("default configuration valid")
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "dpp-validator",
    about = "Digital product passport validation service",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "DPP_VALIDATOR_HTTP_BIND",
        value_name = "ADDR",
        help = "HTTP bind address"
    )]
    pub http_bind: Option<SocketAddr>,

    #[arg(
        long,
        env = "DPP_VALIDATOR_MAX_BODY_BYTES",
        value_name = "N",
        help = "Maximum accepted request body size in bytes",
        value_parser = clap::value_parser!(usize)
    )]
    pub max_body_bytes: Option<usize>,

    #[arg(
        long,
        env = "DPP_VALIDATOR_SEARCH_LIMIT",
        value_name = "N",
        help = "Default page size for resource searches",
        value_parser = clap::value_parser!(usize)
    )]
    pub default_search_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    http_bind: Option<SocketAddr>,
    max_body_bytes: Option<usize>,
    default_search_limit: Option<usize>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
