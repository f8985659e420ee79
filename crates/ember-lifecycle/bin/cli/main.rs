mod cli;

use crate::cli::{Command, GeneratorArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use ember_generator::{CodeGenerator, HttpCodeGenerator, HttpGeneratorConfig, SeqGenerator};
use ember_lifecycle::{LifecycleConfig, LinkFacade, LinkLifecycle, LinkManager, ListedLink};
use ember_storage::{InMemoryRepository, LinkRepository, MySqlRepository, SqliteRepository};
use jiff::tz::TimeZone;
use jiff::Timestamp;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    ember_telemetry::init(config.log_format)?;

    info!(
        storage_backend = %config.storage,
        generator = %config.generator,
        "starting ember"
    );

    let generator = build_generator(&config)?;
    let lifecycle_config = LifecycleConfig::builder()
        .max_generation_attempts(config.max_generation_attempts)
        .build();

    let lifecycle: Arc<dyn LinkLifecycle> = match config.storage {
        StorageBackendArg::InMemory => {
            build_lifecycle(InMemoryRepository::new(), generator, lifecycle_config)
        }
        StorageBackendArg::Sqlite => {
            let repository = SqliteRepository::connect(&config.database_url)
                .await
                .with_context(|| format!("failed to open {}", config.database_url))?;
            build_lifecycle(repository, generator, lifecycle_config)
        }
        StorageBackendArg::Mysql => {
            let repository = MySqlRepository::connect(&config.database_url)
                .await
                .context("failed to connect to mysql")?;
            build_lifecycle(repository, generator, lifecycle_config)
        }
    };
    let facade = LinkFacade::from_arc(lifecycle);

    session(&facade, &config, &mut std::io::stdout().lock()).await
}

/// Runs one command between two global sweeps. The `sweep` command is its
/// own opening sweep, so it reports what the session actually reclaimed.
async fn session(facade: &LinkFacade, config: &CLI, out: &mut impl Write) -> anyhow::Result<()> {
    if !matches!(config.command, Command::Sweep) {
        facade.sweep_all().await;
    }
    let outcome = run(facade, config, out).await;
    facade.sweep_all().await;

    outcome
}

fn build_generator(config: &CLI) -> anyhow::Result<Arc<dyn CodeGenerator>> {
    let generator: Arc<dyn CodeGenerator> = match config.generator {
        GeneratorArg::Http => {
            let http_config = HttpGeneratorConfig::builder()
                .endpoint(config.generator_endpoint.clone())
                .timeout(Duration::from_secs(config.generator_timeout_secs))
                .build();
            Arc::new(HttpCodeGenerator::new(http_config)?)
        }
        GeneratorArg::Seq => {
            // start each session past the tokens handed out by earlier ones
            let offset = Timestamp::now().as_second().unsigned_abs();
            Arc::new(SeqGenerator::with_offset(
                config.generator_prefix.clone(),
                offset,
            ))
        }
    };
    Ok(generator)
}

fn build_lifecycle<R: LinkRepository>(
    repository: R,
    generator: Arc<dyn CodeGenerator>,
    config: LifecycleConfig,
) -> Arc<dyn LinkLifecycle> {
    Arc::new(LinkManager::new(repository, generator, config))
}

async fn run(facade: &LinkFacade, config: &CLI, out: &mut impl Write) -> anyhow::Result<()> {
    let owner = || {
        config
            .owner
            .as_deref()
            .context("an owner id is required (--owner or EMBER_OWNER_ID)")
    };

    match &config.command {
        Command::Create {
            destination,
            limit,
            ttl_hours,
        } => {
            let token = facade
                .create(owner()?, destination, *limit, *ttl_hours)
                .await?;
            writeln!(out, "{token}")?;
        }
        Command::List { json } => {
            let links = facade.list(owner()?).await?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&links)?)?;
            } else {
                print_links(out, &links)?;
            }
        }
        Command::Resolve { token } => {
            writeln!(out, "{}", facade.resolve(owner()?, token).await?)?;
        }
        Command::Open { position } => {
            writeln!(out, "{}", facade.resolve_position(owner()?, *position).await?)?;
        }
        Command::SetLimit { token, limit } => {
            facade.update_limit(owner()?, token, *limit).await?;
            writeln!(out, "click limit of {token} set to {limit}")?;
        }
        Command::SetTtl { token, hours } => {
            facade.update_ttl(owner()?, token, *hours).await?;
            writeln!(out, "{token} now expires in {hours} hours")?;
        }
        Command::Sweep => {
            let deleted = facade.sweep_all().await;
            writeln!(out, "deleted {deleted} dead links")?;
        }
    }

    Ok(())
}

fn print_links(out: &mut impl Write, links: &[ListedLink]) -> std::io::Result<()> {
    if links.is_empty() {
        return writeln!(out, "no live links");
    }

    let tz = TimeZone::system();
    for link in links {
        let record = &link.record;
        writeln!(
            out,
            "{}. {} -> {} (expires {}, clicks {}/{})",
            link.position,
            record.short_token,
            record.destination,
            record.expires_at.to_zoned(tz.clone()).strftime("%Y-%m-%d %H:%M:%S"),
            record.click_count,
            record.click_limit,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::ManualClock;
    use jiff::SignedDuration;

    fn facade() -> (LinkFacade, ManualClock) {
        let clock = ManualClock::new(Timestamp::from_second(1_700_000_000).unwrap());
        let manager = LinkManager::with_clock(
            InMemoryRepository::new(),
            SeqGenerator::with_prefix("em"),
            clock.clone(),
            LifecycleConfig::default(),
        );
        (LinkFacade::new(manager), clock)
    }

    async fn output(facade: &LinkFacade, args: &[&str]) -> String {
        let config = CLI::try_parse_from(args).unwrap();
        let mut out = Vec::new();
        session(facade, &config, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn sweep_reports_what_it_deleted() {
        let (facade, clock) = facade();
        for destination in ["https://example.com/1", "https://example.com/2"] {
            facade
                .create("alice", destination, None, Some(1))
                .await
                .unwrap();
        }
        clock.advance(SignedDuration::from_hours(2));

        let printed = output(&facade, &["ember", "sweep"]).await;
        assert_eq!(printed.trim(), "deleted 2 dead links");

        let printed = output(&facade, &["ember", "sweep"]).await;
        assert_eq!(printed.trim(), "deleted 0 dead links");
    }

    #[tokio::test]
    async fn other_commands_sweep_first() {
        let (facade, clock) = facade();
        let token = facade
            .create("alice", "https://example.com", None, Some(1))
            .await
            .unwrap();
        clock.advance(SignedDuration::from_hours(2));

        let printed = output(&facade, &["ember", "--owner", "bob", "list"]).await;
        assert_eq!(printed.trim(), "no live links");
        // bob's list never touches alice's links, only the opening sweep does
        assert!(matches!(
            facade.resolve("alice", &token).await,
            Err(ember_core::LinkError::NotFound)
        ));
    }
}
