//! Service wiring for the `run` and `check` commands.
//!
//! All long-lived handles (SQLite pool, HTTP clients, bot) are built here at
//! startup and passed down explicitly. `run` owns three tasks: the scheduler,
//! the registration listener, and the optional health server. They stop on
//! Ctrl-C; a cycle already in flight is allowed to finish before the pool
//! is closed.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{error, info};

use listing_watch_core::extract::ListingExtractor;
use listing_watch_core::notify::{Message, Notifier};
use listing_watch_core::store::Store;

use crate::config::Config;
use crate::fetch::HttpSource;
use crate::pipeline::Pipeline;
use crate::register;
use crate::scheduler::Scheduler;
use crate::server;
use crate::sqlite_store::SqliteStore;
use crate::telegram::TelegramBot;

fn build_pipeline(config: &Config, store: Arc<dyn Store>, bot: Arc<TelegramBot>) -> Result<Pipeline> {
    let source = HttpSource::new(&config.source, &config.http)?;
    let extractor = ListingExtractor::new(config.filter.to_filter(), config.source.resolved_base_url());
    Ok(Pipeline::new(Arc::new(source), extractor, store, bot))
}

/// Run the watcher until interrupted.
pub async fn run_watch(config: &Config) -> Result<()> {
    let sqlite = Arc::new(SqliteStore::open(config).await?);
    let store: Arc<dyn Store> = sqlite.clone();
    let bot = Arc::new(TelegramBot::from_config(&config.telegram)?);

    let pipeline = Arc::new(build_pipeline(config, store.clone(), bot.clone())?);
    let scheduler = Scheduler::new(pipeline, config.schedule.interval());
    let state = scheduler.state();

    info!(
        source = %config.source.url,
        min_year = config.filter.min_year,
        models = ?config.filter.models,
        "starting listing watch"
    );

    let scheduler_task = tokio::spawn(scheduler.run());
    let listener_task = tokio::spawn(register::run_listener(bot, store.clone()));
    let server_task = config.server.as_ref().map(|server_cfg| {
        let bind = server_cfg.bind.clone();
        let state = state.clone();
        let store = store.clone();
        tokio::spawn(async move {
            if let Err(e) = server::run_server(&bind, state, store).await {
                error!(error = %e, "health server stopped");
            }
        })
    });

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    scheduler_task.abort();
    let _ = scheduler_task.await;
    listener_task.abort();
    if let Some(task) = server_task {
        task.abort();
    }

    if state.is_running() {
        info!("waiting for the running cycle to finish");
    }
    state.wait_idle().await;
    sqlite.close().await;
    Ok(())
}

/// Run a single cycle in the foreground and print the outcome.
///
/// With `dry_run`, nothing is written and nothing is sent, so no bot token
/// is required.
pub async fn run_check(config: &Config, dry_run: bool) -> Result<()> {
    let sqlite = Arc::new(SqliteStore::open(config).await?);
    let store: Arc<dyn Store> = sqlite.clone();

    if dry_run {
        let source = HttpSource::new(&config.source, &config.http)?;
        let extractor =
            ListingExtractor::new(config.filter.to_filter(), config.source.resolved_base_url());
        let pipeline = Pipeline::new(Arc::new(source), extractor, store, Arc::new(NoopNotifier));
        let (report, fresh) = pipeline.dry_run().await?;

        println!("check (dry-run)");
        println!("  candidates: {}", report.candidates);
        println!("  new: {}", report.new_records);
        for r in &fresh {
            println!("    {} {} ({})  {}", r.car_id, r.title, r.year, r.link);
        }
    } else {
        let bot = Arc::new(TelegramBot::from_config(&config.telegram)?);
        let pipeline = build_pipeline(config, store, bot)?;
        let report = pipeline.run_cycle().await?;

        println!("check");
        println!("  candidates: {}", report.candidates);
        println!("  new: {}", report.new_records);
        println!("  subscribers: {}", report.subscribers);
        println!(
            "  notifications: {} sent, {} failed",
            report.notifications.delivered, report.notifications.failed
        );
    }

    println!("ok");
    sqlite.close().await;
    Ok(())
}

/// Stands in for the bot on dry runs, which never send.
struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _chat_id: i64, _message: &Message) -> Result<()> {
        Ok(())
    }
}
