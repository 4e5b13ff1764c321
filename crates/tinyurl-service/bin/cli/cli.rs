use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::{Display, Formatter};
use tinyurl_snowflake::DEFAULT_EPOCH_MILLIS;

pub const STORAGE_BACKEND_ENV: &str = "TINYURL_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "TINYURL_MYSQL_DSN";
pub const ID_STRATEGY_ENV: &str = "TINYURL_ID_STRATEGY";
pub const WORKER_ID_ENV: &str = "TINYURL_WORKER_ID";
pub const DATACENTER_ID_ENV: &str = "TINYURL_DATACENTER_ID";
pub const EPOCH_MILLIS_ENV: &str = "TINYURL_EPOCH_MILLIS";
pub const DOMAINS_ENV: &str = "TINYURL_DOMAINS";
pub const LOG_FORMAT_ENV: &str = "TINYURL_LOG_FORMAT";

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
pub enum IdStrategyArg {
    /// Ids come from the snowflake generator.
    #[value(name = "snowflake")]
    Snowflake,
    /// Ids are the store's auto-increment keys.
    #[value(name = "store")]
    Store,
}

impl Display for IdStrategyArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IdStrategyArg::Snowflake => write!(f, "snowflake"),
            IdStrategyArg::Store => write!(f, "store"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    #[value(name = "text")]
    Text,
    #[value(name = "json")]
    Json,
}

impl Display for LogFormatArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormatArg::Text => write!(f, "text"),
            LogFormatArg::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "tinyurl", about = "Mint and resolve short URLs")]
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
        env = ID_STRATEGY_ENV,
        value_enum,
        default_value_t = IdStrategyArg::Snowflake
    )]
    pub id_strategy: IdStrategyArg,

    /// Must be unique per datacenter, 0..=31.
    #[arg(long, env = WORKER_ID_ENV, default_value_t = 0)]
    pub worker_id: u64,

    /// 0..=31.
    #[arg(long, env = DATACENTER_ID_ENV, default_value_t = 0)]
    pub datacenter_id: u64,

    /// Unix milliseconds; must match across every instance of a deployment.
    #[arg(long, env = EPOCH_MILLIS_ENV, default_value_t = DEFAULT_EPOCH_MILLIS)]
    pub epoch_millis: i64,

    /// Domains to register before running the command.
    #[arg(long = "domains", env = DOMAINS_ENV, value_delimiter = ',')]
    pub domains: Vec<String>,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the MySQL tables.
    InitSchema,
    /// Register a domain short URLs may be minted under.
    RegisterDomain { domain: String },
    /// Mint a short URL.
    Generate {
        url: String,
        #[arg(long)]
        domain: String,
        #[arg(long)]
        expire_date: Option<String>,
    },
    /// Print the original URL of a short code.
    Resolve { code: String },
    /// Print the redirect target of a short code, with extra query parameters.
    Redirect {
        code: String,
        /// A `key=value` query parameter; may repeat.
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
    /// Print fresh snowflake ids.
    NextId {
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
}

fn parse_key_val(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{input}'"))?;
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let cli = CLI::try_parse_from(["tinyurl", "resolve", "abc"]).unwrap();
        assert_eq!(cli.storage, StorageBackendArg::InMemory);
        assert_eq!(cli.id_strategy, IdStrategyArg::Snowflake);
        assert_eq!(cli.epoch_millis, DEFAULT_EPOCH_MILLIS);
        assert!(matches!(cli.command, Command::Resolve { ref code } if code == "abc"));
    }

    #[test]
    fn mysql_requires_dsn() {
        let result = CLI::try_parse_from(["tinyurl", "--storage", "mysql", "init-schema"]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_redirect_params() {
        let cli = CLI::try_parse_from([
            "tinyurl", "redirect", "b", "--param", "utm=mail", "--param", "x=",
        ])
        .unwrap();
        let Command::Redirect { params, .. } = cli.command else {
            panic!("expected redirect");
        };
        assert_eq!(
            params,
            vec![
                ("utm".to_string(), "mail".to_string()),
                ("x".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn parses_domain_list() {
        let cli = CLI::try_parse_from([
            "tinyurl",
            "--domains",
            "t.ly/,s.io/",
            "generate",
            "https://example.com",
            "--domain",
            "t.ly/",
        ])
        .unwrap();
        assert_eq!(cli.domains, vec!["t.ly/", "s.io/"]);
    }
}
