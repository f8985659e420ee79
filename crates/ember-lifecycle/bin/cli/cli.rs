use clap::{Parser, Subcommand, ValueEnum};
use ember_telemetry::LogFormat;
use std::fmt::{Display, Formatter};

pub const OWNER_ID_ENV: &str = "EMBER_OWNER_ID";
pub const STORAGE_BACKEND_ENV: &str = "EMBER_STORAGE_BACKEND";
pub const DATABASE_URL_ENV: &str = "EMBER_DATABASE_URL";
pub const GENERATOR_ENV: &str = "EMBER_GENERATOR";
pub const GENERATOR_ENDPOINT_ENV: &str = "EMBER_GENERATOR_ENDPOINT";
pub const GENERATOR_TIMEOUT_SECS_ENV: &str = "EMBER_GENERATOR_TIMEOUT_SECS";
pub const GENERATOR_PREFIX_ENV: &str = "EMBER_GENERATOR_PREFIX";
pub const MAX_GENERATION_ATTEMPTS_ENV: &str = "EMBER_MAX_GENERATION_ATTEMPTS";
pub const LOG_FORMAT_ENV: &str = "EMBER_LOG_FORMAT";

pub const DEFAULT_DATABASE_URL: &str = "sqlite://ember.db";
pub const DEFAULT_GENERATOR_ENDPOINT: &str = "https://clck.ru/--";
pub const DEFAULT_GENERATOR_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_GENERATOR_PREFIX: &str = "em";
pub const DEFAULT_MAX_GENERATION_ATTEMPTS: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "sqlite")]
    Sqlite,
    #[value(name = "mysql")]
    Mysql,
    #[value(name = "in-memory")]
    InMemory,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::Sqlite => write!(f, "sqlite"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
            StorageBackendArg::InMemory => write!(f, "in-memory"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GeneratorArg {
    /// The external shortening service.
    #[value(name = "http")]
    Http,
    /// Local sequential tokens, no network.
    #[value(name = "seq")]
    Seq,
}

impl Display for GeneratorArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneratorArg::Http => write!(f, "http"),
            GeneratorArg::Seq => write!(f, "seq"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "ember", about = "Short links with a time-to-live and a click quota")]
pub struct CLI {
    /// Identity the command acts as.
    #[arg(long, env = OWNER_ID_ENV, global = true)]
    pub owner: Option<String>,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::Sqlite,
        global = true
    )]
    pub storage: StorageBackendArg,

    #[arg(
        long,
        env = DATABASE_URL_ENV,
        default_value = DEFAULT_DATABASE_URL,
        global = true
    )]
    pub database_url: String,

    #[arg(
        long,
        env = GENERATOR_ENV,
        value_enum,
        default_value_t = GeneratorArg::Http,
        global = true
    )]
    pub generator: GeneratorArg,

    #[arg(
        long,
        env = GENERATOR_ENDPOINT_ENV,
        default_value = DEFAULT_GENERATOR_ENDPOINT,
        global = true
    )]
    pub generator_endpoint: String,

    #[arg(
        long,
        env = GENERATOR_TIMEOUT_SECS_ENV,
        default_value_t = DEFAULT_GENERATOR_TIMEOUT_SECS,
        global = true
    )]
    pub generator_timeout_secs: u64,

    #[arg(
        long,
        env = GENERATOR_PREFIX_ENV,
        default_value = DEFAULT_GENERATOR_PREFIX,
        global = true
    )]
    pub generator_prefix: String,

    #[arg(
        long,
        env = MAX_GENERATION_ATTEMPTS_ENV,
        default_value_t = DEFAULT_MAX_GENERATION_ATTEMPTS,
        global = true
    )]
    pub max_generation_attempts: u32,

    #[arg(
        long,
        env = LOG_FORMAT_ENV,
        default_value_t = LogFormat::Pretty,
        global = true
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shorten a destination address.
    #[command(allow_negative_numbers = true)]
    Create {
        destination: String,
        /// Number of allowed visits; missing or non-positive means 1.
        #[arg(long)]
        limit: Option<i64>,
        /// Hours until the link expires; missing or non-positive means 24.
        #[arg(long)]
        ttl_hours: Option<i64>,
    },
    /// List your live links.
    List {
        #[arg(long)]
        json: bool,
    },
    /// Spend one click of a link and print its destination.
    Resolve { token: String },
    /// Spend one click of the link at a position of `list` and print its destination.
    Open { position: usize },
    /// Replace the click limit of a link.
    #[command(allow_negative_numbers = true)]
    SetLimit { token: String, limit: i64 },
    /// Set a link to expire the given number of hours from now.
    #[command(allow_negative_numbers = true)]
    SetTtl { token: String, hours: i64 },
    /// Delete every expired or exhausted link.
    Sweep,
}
