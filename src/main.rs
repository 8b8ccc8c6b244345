use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, error};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use remote_versions::config::{
    Config, ExtractionConfig, ProviderConfig, RegexExtraction, RemoteVersion, TOKEN_ENV,
};
use remote_versions::version::budget::{AtomicGauge, Gauge};
use remote_versions::version::cache::Cache;
use remote_versions::version::resolver::GitHubProvider;

#[derive(Parser)]
#[command(name = "remote-versions")]
#[command(version, about = "Resolve published versions from GitHub releases and tags")]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the versions of a single repository
    Resolve(ResolveArgs),
    /// Resolve every source listed in a config file
    Check(CheckArgs),
}

#[derive(Args)]
struct ProviderArgs {
    /// GitHub API token
    #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
    token: Option<String>,

    /// GitHub API base URL
    #[arg(long)]
    base_url: Option<String>,
}

#[derive(Args)]
struct ResolveArgs {
    /// Repository in the form owner/name
    #[arg(long)]
    repo: String,

    /// Where to read versions from: releases or tags
    #[arg(long, default_value = "releases")]
    strategy: String,

    /// Regular expression applied to each release or tag name
    #[arg(long)]
    pattern: String,

    /// Result template built from the pattern's capture groups
    #[arg(long, default_value = "$1")]
    result: String,

    /// Version constraint, e.g. ">=1.0.0 <2.0.0"
    #[arg(long, default_value = "")]
    constraint: String,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[derive(Args)]
struct CheckArgs {
    /// Path to the JSON config file
    #[arg(long, short)]
    config: PathBuf,

    /// Print the results as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    provider: ProviderArgs,
}

#[derive(Serialize)]
struct SourceReport {
    name: String,
    repo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    versions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let _guard = init_logging(&cli.log_level, cli.log_json);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            match cli.command {
                Command::Resolve(args) => resolve(args).await,
                Command::Check(args) => check(args).await,
            }
        })
}

fn init_logging(level: &str, json: bool) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    guard
}

fn provider_config(base: ProviderConfig, args: ProviderArgs) -> ProviderConfig {
    ProviderConfig {
        token: args.token.or(base.token),
        base_url: args.base_url.unwrap_or(base.base_url),
        ..base
    }
}

async fn build_provider(
    config: &ProviderConfig,
) -> anyhow::Result<(GitHubProvider, Arc<AtomicGauge>)> {
    let cache = Arc::new(Cache::new(config.cache_ttl()));
    let gauge = Arc::new(AtomicGauge::rate_limit_remaining());
    let provider = GitHubProvider::from_config(config, cache, gauge.clone())
        .await
        .context("failed to initialize GitHub provider")?;
    Ok((provider, gauge))
}

async fn resolve(args: ResolveArgs) -> anyhow::Result<ExitCode> {
    let config = provider_config(ProviderConfig::default(), args.provider);
    let (provider, gauge) = build_provider(&config).await?;

    let remote = RemoteVersion {
        repo: args.repo,
        strategy: args.strategy,
        extraction: ExtractionConfig {
            regex: RegexExtraction {
                pattern: args.pattern,
                result: args.result,
            },
        },
        constraint: args.constraint,
    };

    let versions = provider
        .get_versions(&remote)
        .await
        .with_context(|| format!("failed to resolve versions for {}", remote.repo))?;
    debug!("{} = {}", gauge.name(), gauge.get());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&versions)?);
    } else {
        for version in &versions {
            println!("{}", version);
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn check(args: CheckArgs) -> anyhow::Result<ExitCode> {
    let file = Config::load(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let config = provider_config(file.provider, args.provider);
    let (provider, gauge) = build_provider(&config).await?;

    let results = join_all(
        file.sources
            .iter()
            .map(|source| provider.get_versions(&source.remote)),
    )
    .await;
    debug!("{} = {}", gauge.name(), gauge.get());

    let reports: Vec<SourceReport> = file
        .sources
        .into_iter()
        .zip(results)
        .map(|(source, result)| {
            let (versions, error) = match result {
                Ok(versions) => (Some(versions), None),
                Err(e) => {
                    error!("Failed to resolve {}: {}", source.name, e);
                    (None, Some(e.to_string()))
                }
            };
            SourceReport {
                name: source.name,
                repo: source.remote.repo,
                versions,
                error,
            }
        })
        .collect();

    let failed = reports.iter().any(|r| r.error.is_some());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            match (&report.versions, &report.error) {
                (Some(versions), _) => {
                    println!("{} ({}): {}", report.name, report.repo, versions.join(", "))
                }
                (None, Some(error)) => {
                    println!("{} ({}): error: {}", report.name, report.repo, error)
                }
                (None, None) => {}
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
