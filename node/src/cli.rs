//! # CLI Interface
//!
//! Defines the command-line argument structure for `keyseal-node` using
//! `clap` derive. Three subcommands: `run`, `generate`, and `version`.
//!
//! The master keypair is only ever read from the environment (or the
//! matching flags, for local experiments). `generate` prints a fresh one in
//! `KEY=value` form so it can be pasted straight into an env file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use keyseal_protocol::config::{
    DEFAULT_HTTP_PORT, DEFAULT_METRICS_PORT, DEFAULT_STORE_TIMEOUT,
};

/// KEYSEAL identity node.
///
/// Serves keypair-based registration and login over HTTP, stores sealed
/// credential records locally, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "keyseal-node",
    about = "KEYSEAL identity node",
    version,
    propagate_version = true
)]
pub struct KeysealNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Generate a fresh master keypair and print it as environment lines.
    Generate,
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the authentication API.
    #[arg(long, env = "KEYSEAL_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "KEYSEAL_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Directory holding the credential database. Created on first run.
    #[arg(long, short = 'd', env = "KEYSEAL_DATA_DIR", default_value = "./keyseal-data")]
    pub data_dir: PathBuf,

    /// Keep everything in memory. Nothing survives a restart.
    #[arg(long, conflicts_with = "data_dir")]
    pub in_memory: bool,

    /// Upper bound on every store call, in milliseconds.
    #[arg(
        long,
        env = "KEYSEAL_STORE_TIMEOUT_MS",
        default_value_t = DEFAULT_STORE_TIMEOUT.as_millis() as u64
    )]
    pub store_timeout_ms: u64,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "KEYSEAL_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    #[command(flatten)]
    pub master: MasterKeyArgs,
}

/// The four hex-encoded master keypair values.
///
/// Left empty when unset so start-up can name the missing one.
#[derive(Parser, Debug)]
pub struct MasterKeyArgs {
    /// Master signing public key (hex).
    #[arg(long = "master-pub", env = "KEYSEAL_PUB", default_value = "", hide_env_values = true)]
    pub public: String,

    /// Master signing private key (hex). Prefer the environment variable.
    #[arg(long = "master-priv", env = "KEYSEAL_PRIV", default_value = "", hide_env_values = true)]
    pub private: String,

    /// Master encryption public key (hex).
    #[arg(long = "master-epub", env = "KEYSEAL_EPUB", default_value = "", hide_env_values = true)]
    pub enc_public: String,

    /// Master encryption private key (hex). Prefer the environment variable.
    #[arg(long = "master-epriv", env = "KEYSEAL_EPRIV", default_value = "", hide_env_values = true)]
    pub enc_private: String,
}
