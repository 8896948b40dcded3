use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::{Display, Formatter};

pub const STORAGE_BACKEND_ENV: &str = "LINKHOP_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "LINKHOP_MYSQL_DSN";
pub const CACHE_BACKEND_ENV: &str = "LINKHOP_CACHE_BACKEND";
pub const REDIS_URL_ENV: &str = "LINKHOP_REDIS_URL";
pub const CODE_LENGTH_ENV: &str = "LINKHOP_CODE_LENGTH";
pub const QUEUE_CAPACITY_ENV: &str = "LINKHOP_CLICK_QUEUE_CAPACITY";
pub const FLUSH_INTERVAL_ENV: &str = "LINKHOP_CLICK_FLUSH_INTERVAL_MS";
pub const LOG_FORMAT_ENV: &str = "LINKHOP_LOG_FORMAT";

/// Longest lifetime `shorten` accepts: 100 hours.
pub const MAX_TTL_MINUTES: i64 = 100 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackendArg {
    #[value(name = "moka")]
    Moka,
    #[value(name = "redis")]
    Redis,
}

impl Display for CacheBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendArg::Moka => write!(f, "moka"),
            CacheBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "linkhop", about = "Create and resolve short links")]
pub struct CLI {
    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(
        long,
        env = CACHE_BACKEND_ENV,
        value_enum,
        default_value_t = CacheBackendArg::Moka
    )]
    pub cache: CacheBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("cache", "redis"))]
    pub redis_url: Option<String>,

    #[arg(long, env = CODE_LENGTH_ENV, default_value_t = 6)]
    pub code_length: usize,

    #[arg(long, env = QUEUE_CAPACITY_ENV, default_value_t = 10_000)]
    pub click_queue_capacity: usize,

    #[arg(long, env = FLUSH_INTERVAL_ENV, default_value_t = 5_000)]
    pub click_flush_interval_ms: u64,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a short link and print its code.
    Shorten {
        url: String,
        /// Use this code instead of generating one.
        #[arg(long)]
        code: Option<String>,
        /// Lifetime in minutes, 1 to 6000. Defaults to one hour.
        #[arg(long, value_parser = clap::value_parser!(i64).range(1..=MAX_TTL_MINUTES))]
        ttl_minutes: Option<i64>,
    },
    /// Resolve a code, recording one click per resolution.
    Resolve {
        code: String,
        #[arg(long, default_value_t = 1)]
        times: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        CLI::command().debug_assert();
    }

    #[test]
    fn mysql_requires_dsn() {
        let parsed = CLI::try_parse_from(["linkhop", "--storage", "mysql", "resolve", "abc123"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn shorten_defaults() {
        let cli = CLI::try_parse_from(["linkhop", "shorten", "https://example.com"]).unwrap();

        assert_eq!(cli.storage, StorageBackendArg::InMemory);
        assert_eq!(cli.cache, CacheBackendArg::Moka);
        assert_eq!(cli.code_length, 6);
        assert!(matches!(
            cli.command,
            Command::Shorten { code: None, ttl_minutes: None, .. }
        ));
    }

    #[test]
    fn ttl_minutes_accepts_bounds() {
        for value in ["1", "6000"] {
            let cli = CLI::try_parse_from([
                "linkhop",
                "shorten",
                "https://example.com",
                "--ttl-minutes",
                value,
            ])
            .unwrap();

            let Command::Shorten { ttl_minutes, .. } = cli.command else {
                panic!("expected shorten");
            };
            assert_eq!(ttl_minutes, Some(value.parse().unwrap()));
        }
    }

    #[test]
    fn ttl_minutes_rejects_out_of_range() {
        for value in ["0", "-5", "6001", "9223372036854775807"] {
            let parsed = CLI::try_parse_from([
                "linkhop",
                "shorten",
                "https://example.com",
                "--ttl-minutes",
                value,
            ]);
            assert!(parsed.is_err(), "{value} should be rejected");
        }
    }
}
