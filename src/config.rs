use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8085";
const DEFAULT_RENDER_WORKERS: usize = 4;
const DEFAULT_MAX_OUTPUT_LEN: usize = 100_000;

/// Resolved server configuration. The per-field input limits and the
/// allowed-value tables are fixed service constants, not configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_bind_address: SocketAddr,
    pub render_workers: usize,
    pub max_output_len: usize,
}

impl ServerConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            http_bind: cli_http_bind,
            render_workers: cli_render_workers,
            max_output_len: cli_max_output_len,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            http_bind: file_http_bind,
            render_workers: file_render_workers,
            max_output_len: file_max_output_len,
        } = file_config;

        let http_bind_address = cli_http_bind.or(file_http_bind).unwrap_or_else(|| {
            DEFAULT_HTTP_BIND
                .parse()
                .expect("default bind address valid")
        });

        let render_workers = cli_render_workers
            .or(file_render_workers)
            .unwrap_or(DEFAULT_RENDER_WORKERS)
            .max(1);

        let max_output_len = cli_max_output_len
            .or(file_max_output_len)
            .unwrap_or(DEFAULT_MAX_OUTPUT_LEN);
        anyhow::ensure!(
            max_output_len > 0,
            "max output length must be greater than zero"
        );

        Ok(Self {
            http_bind_address,
            render_workers,
            max_output_len,
        })
    }
}

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "tera-playground", about = "Tera template playground server", version)]
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
        env = "TERA_PLAYGROUND_HTTP_BIND",
        value_name = "ADDR",
        help = "HTTP bind address"
    )]
    pub http_bind: Option<SocketAddr>,

    #[arg(
        long,
        env = "TERA_PLAYGROUND_RENDER_WORKERS",
        value_name = "N",
        help = "Maximum number of concurrent renders before requests are refused",
        value_parser = clap::value_parser!(usize)
    )]
    pub render_workers: Option<usize>,

    #[arg(
        long,
        env = "TERA_PLAYGROUND_MAX_OUTPUT_LEN",
        value_name = "CHARS",
        help = "Rendered output is truncated beyond this many characters",
        value_parser = clap::value_parser!(usize)
    )]
    pub max_output_len: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    http_bind: Option<SocketAddr>,
    render_workers: Option<usize>,
    max_output_len: Option<usize>,
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
