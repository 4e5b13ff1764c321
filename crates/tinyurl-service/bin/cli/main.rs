mod cli;

use crate::cli::{Command, IdStrategyArg, LogFormatArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use jiff::Timestamp;
use std::sync::Arc;
use tinyurl_service::{GenerateRequest, IdStrategy, Shortener, UrlService};
use tinyurl_snowflake::{Clock, Snowflake, SnowflakeId, SnowflakeSettings};
use tinyurl_storage::{DomainRegistry, InMemoryRepository, MySqlRepository, UrlRepository};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format);

    info!(
        storage_backend = %config.storage,
        id_strategy = %config.id_strategy,
        worker_id = config.worker_id,
        datacenter_id = config.datacenter_id,
        "starting tinyurl"
    );

    // next-id needs no storage and owns the only generator in the process
    if let Command::NextId { count } = config.command {
        for id in next_ids(&snowflake(&config)?, count)? {
            println!("{id}");
        }
        return Ok(());
    }

    match config.storage {
        StorageBackendArg::InMemory => {
            if let Command::InitSchema = config.command {
                info!("in-memory storage has no schema");
                return Ok(());
            }
            run(&config, Arc::new(InMemoryRepository::new())).await
        }
        StorageBackendArg::Mysql => {
            let mysql_dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let repository = MySqlRepository::connect(mysql_dsn).await?;
            if let Command::InitSchema = config.command {
                repository.init_schema().await?;
                info!("mysql schema initialized");
                return Ok(());
            }
            run(&config, Arc::new(repository)).await
        }
    }
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormatArg::Text => subscriber.init(),
        LogFormatArg::Json => subscriber.json().init(),
    }
}

fn snowflake(config: &CLI) -> anyhow::Result<Snowflake> {
    let epoch = Timestamp::from_millisecond(config.epoch_millis)
        .with_context(|| format!("invalid epoch {}", config.epoch_millis))?;
    let settings = SnowflakeSettings::builder()
        .worker_id(config.worker_id)
        .datacenter_id(config.datacenter_id)
        .epoch(epoch)
        .build();
    Ok(Snowflake::new(settings)?)
}

fn next_ids<C: Clock>(generator: &Snowflake<C>, count: usize) -> anyhow::Result<Vec<SnowflakeId>> {
    let ids = (0..count)
        .map(|_| generator.next_id())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

async fn run<R>(config: &CLI, repository: Arc<R>) -> anyhow::Result<()>
where
    R: UrlRepository + DomainRegistry,
{
    for domain in &config.domains {
        let id = repository.register(domain).await?;
        info!(domain = %domain, id, "domain registered");
    }

    let strategy = match config.id_strategy {
        IdStrategyArg::Snowflake => IdStrategy::Snowflake(snowflake(config)?),
        IdStrategyArg::Store => IdStrategy::StoreAssigned,
    };
    let service = UrlService::new(repository.clone(), repository.clone(), strategy);

    match &config.command {
        Command::InitSchema | Command::NextId { .. } => {}
        Command::RegisterDomain { domain } => {
            let id = repository.register(domain).await?;
            println!("{id}");
        }
        Command::Generate {
            url,
            domain,
            expire_date,
        } => {
            let request = GenerateRequest {
                origin_url: url.clone(),
                domain: domain.clone(),
                expire_date: expire_date.clone(),
            };
            println!("{}", service.generate(request).await?);
        }
        Command::Resolve { code } => {
            println!("{}", service.resolve(code).await?);
        }
        Command::Redirect { code, params } => {
            println!("{}", service.redirect_url(code, params).await?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tinyurl_snowflake::ManualClock;

    fn config(args: &[&str]) -> CLI {
        CLI::try_parse_from(args).unwrap()
    }

    #[test]
    fn snowflake_follows_configured_ids() {
        let generator = snowflake(&config(&[
            "tinyurl",
            "--worker-id",
            "7",
            "--datacenter-id",
            "3",
            "next-id",
        ]))
        .unwrap();
        assert_eq!(generator.worker_id(), 7);
        assert_eq!(generator.datacenter_id(), 3);
    }

    #[test]
    fn snowflake_rejects_out_of_range_worker() {
        let result = snowflake(&config(&["tinyurl", "--worker-id", "32", "next-id"]));
        assert!(result.is_err());
    }

    #[test]
    fn next_ids_come_from_one_generator() {
        let settings = SnowflakeSettings::builder()
            .worker_id(1)
            .datacenter_id(1)
            .build();
        let clock = ManualClock::new(Timestamp::now());
        let generator = Snowflake::with_clock(settings, clock).unwrap();

        let ids = next_ids(&generator, 5).unwrap();
        // a frozen clock makes the shared sequence visible
        let sequences: Vec<u16> = ids.iter().map(|id| id.sequence()).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);

        let after = generator.next_id().unwrap();
        assert_eq!(after.sequence(), 5);
    }
}
