// depbot-prs entry point.
// Wires configuration, the aggregator, the cache, the scheduler, and the HTTP server.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use depbot_prs::cache::{CacheStore, cache_key};
use depbot_prs::config::{Cli, Command, Config};
use depbot_prs::github::{GitHubAppTokenProvider, GitHubPullFetcher};
use depbot_prs::prs::{Aggregator, LogOnly, run_with_retry};
use depbot_prs::scheduler::{ScheduledJob, ScheduledRunHandler, start_scheduler, stop_scheduler};
use depbot_prs::server::{self, AppState};
use depbot_prs::{Result, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.config.log_json);

    let outcome = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cli.config).await,
        Command::Fetch => fetch_once(cli.config).await,
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "fatal");
            ExitCode::FAILURE
        }
    }
}

fn build_aggregator(config: &Config) -> Result<Arc<Aggregator>> {
    let tokens = GitHubAppTokenProvider::new(config.credentials()?, config.api_url.clone());
    let fetcher = GitHubPullFetcher::new(config.api_url.clone());
    Ok(Arc::new(Aggregator::new(Arc::new(tokens), Arc::new(fetcher))))
}

async fn serve(config: Config) -> Result<ExitCode> {
    let aggregator = build_aggregator(&config)?;
    let cache = CacheStore::new(config.cache_file(), config.cache_ttl());
    let repos = config.repo_list();

    let scheduler = if config.schedule_enabled {
        let sched = config.scheduler_config();
        let handler = ScheduledRunHandler {
            warm_cache: sched
                .warm_cache
                .then(|| (cache.clone(), cache_key(&sched.owner, &sched.repos))),
            output_file: sched.output_file.clone(),
            error_log_file: sched.error_log_file.clone(),
            total_repos: sched.repos.len(),
        };
        let job = ScheduledJob::new(
            Arc::clone(&aggregator),
            sched.owner.clone(),
            sched.repos.clone(),
            sched.retry,
            Arc::new(handler),
        );
        Some(start_scheduler(&sched, job)?)
    } else {
        None
    };

    info!(
        owner = %config.owner,
        repos = repos.len(),
        cache = %cache.path().display(),
        "starting depbot-prs"
    );

    let state = AppState {
        aggregator,
        cache,
        owner: config.owner.clone(),
        repos: Arc::new(repos),
    };
    let served = server::serve(config.bind, state, shutdown_signal()).await;

    if let Some(handle) = scheduler {
        stop_scheduler(handle).await;
    }
    served.map(|()| ExitCode::SUCCESS)
}

async fn fetch_once(config: Config) -> Result<ExitCode> {
    let aggregator = build_aggregator(&config)?;
    let repos = config.repo_list();

    let result = run_with_retry(
        config.retry_policy(),
        || aggregator.fetch_all(&config.owner, &repos),
        &LogOnly,
    )
    .await;

    match result {
        Some(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::SUCCESS)
        }
        None => Ok(ExitCode::FAILURE),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
