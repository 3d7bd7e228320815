//! superfeed - inspect a channel catalog and exercise the push coordinator.
//!
//! ```text
//! superfeed <config.toml> check
//! superfeed <config.toml> resolve <username>
//! superfeed <config.toml> access <viewer> <username> [status]
//! superfeed <config.toml> simulate <user>
//! ```

use anyhow::{Context, bail};
use serde_json::json;
use std::sync::Arc;
use superfeed::access::{AccessRequestStatus, decide};
use superfeed::config::validate;
use superfeed::push::memory::{MemoryBackend, MemoryPushPlatform};
use superfeed::push::{PushCoordinator, PushHandle};
use superfeed::{Catalog, ChannelAccessResolver, Config, metrics};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: superfeed <config.toml> <check | resolve <username> | access <viewer> <username> [status] | simulate <user>>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; stdout is reserved for command output.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if std::env::var("SUPERFEED_LOG_FORMAT").is_ok_and(|f| f == "json") {
        builder.json().init();
    } else {
        builder.init();
    }

    metrics::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_path, command) = match args.as_slice() {
        [path, command, ..] => (path.as_str(), command.as_str()),
        _ => bail!(USAGE),
    };
    let rest = &args[2..];

    let config = Config::load(config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    match (command, rest) {
        ("check", []) => check(&config),
        ("resolve", [username]) => resolve(&config, username),
        ("access", [viewer, username]) => access(&config, viewer, username, ""),
        ("access", [viewer, username, status]) => access(&config, viewer, username, status),
        ("simulate", [user]) => simulate(&config, user).await,
        _ => bail!(USAGE),
    }
}

fn resolver(config: &Config) -> ChannelAccessResolver {
    let resolver = ChannelAccessResolver::new(Arc::new(Catalog::from_config(config)));
    let catalog = resolver.catalog();
    info!(
        channels = catalog.configured().count(),
        directory = catalog.directory_len(),
        "Catalog loaded"
    );
    resolver
}

fn check(config: &Config) -> anyhow::Result<()> {
    match validate(config) {
        Ok(()) => {
            let catalog = Catalog::from_config(config);
            let realtime = catalog.directory().filter(|b| b.is_realtime).count();
            println!(
                "ok: {} configured channels, {} directory entries ({} realtime)",
                catalog.configured().count(),
                catalog.directory_len(),
                realtime
            );
            Ok(())
        }
        Err(errors) => {
            for e in &errors {
                println!("error: {e}");
            }
            std::process::exit(1);
        }
    }
}

fn resolve(config: &Config, username: &str) -> anyhow::Result<()> {
    match resolver(config).resolve(username) {
        Some(channel) => {
            println!("{}", serde_json::to_string_pretty(&channel)?);
            Ok(())
        }
        None => {
            println!("not found");
            std::process::exit(1);
        }
    }
}

fn access(config: &Config, viewer: &str, username: &str, status: &str) -> anyhow::Result<()> {
    let status: AccessRequestStatus = status.parse().map_err(anyhow::Error::msg)?;
    match resolver(config).resolve(username) {
        Some(channel) => {
            let decision = decide(&channel, viewer, status);
            println!("{}", serde_json::to_string_pretty(&decision)?);
            Ok(())
        }
        None => {
            println!("not found");
            std::process::exit(1);
        }
    }
}

/// Run enable then disable against in-memory collaborators and print the
/// status after each step.
async fn simulate(config: &Config, user: &str) -> anyhow::Result<()> {
    let platform = Arc::new(MemoryPushPlatform::new());
    let backend = Arc::new(MemoryBackend::new());
    let (handle, mut notices) = PushCoordinator::spawn(
        platform,
        backend.clone(),
        config.push.clone(),
        Some(user.to_string()),
    );

    let status = handle.reconcile().await.context("coordinator stopped")?;
    println!("{}", json!({ "step": "mount", "status": status }));

    for (step, enable) in [("enable", true), ("disable", false)] {
        print_step(&handle, step, enable).await;
    }

    println!("{}", json!({ "step": "record", "record": backend.record(user) }));

    handle.shutdown();
    while let Ok(notice) = notices.try_recv() {
        println!("{}", json!({ "notice": notice }));
    }
    Ok(())
}

async fn print_step(handle: &PushHandle, step: &str, enable: bool) {
    match handle.toggle(enable).await {
        Ok(status) => println!("{}", json!({ "step": step, "status": status })),
        Err(e) => println!(
            "{}",
            json!({ "step": step, "error": e.to_string(), "code": e.error_code() })
        ),
    }
}
