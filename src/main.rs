//! mdforge - A static site generator for markdown sites.

mod assets;
mod build;
mod cli;
mod config;
mod logger;
mod page;
mod reload;
mod serve;
mod utils;
mod watch;

use anyhow::{Context, Result};
use build::build_site;
use clap::Parser;
use cli::Cli;
use config::SiteConfig;
use reload::{ReloadMessage, ReloadServer};
use serve::serve_site;
use std::thread;
use tokio::runtime::Handle;
use watch::watch_for_changes_blocking;

#[tokio::main]
async fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static SiteConfig = Box::leak(Box::new(SiteConfig::load(cli)?));

    if cli.is_development() {
        develop(config).await
    } else {
        // Pending tasks are dropped with the runtime, so wait for all of them
        build_site(config).join().await;
        log!("build"; "done, output in {}", config.rel_path(&config.build.output));
        Ok(())
    }
}

/// Build, then watch and serve with live reload until Ctrl+C.
async fn develop(config: &'static SiteConfig) -> Result<()> {
    let reload = if config.serve.watch {
        let interface = config.serve.ip_addr()?;
        Some(
            ReloadServer::start(interface, config.serve.reload_port)
                .context("Failed to start live reload server")?,
        )
    } else {
        None
    };

    build_site(config).join().await;

    if let Some(reload) = &reload {
        spawn_watcher(config, reload.clone());
    }

    let reload_port = reload.as_ref().map(ReloadServer::port);
    tokio::task::spawn_blocking(move || serve_site(config, reload_port))
        .await
        .context("Dev server thread panicked")?
}

/// Rebuild on every batch of changes, notifying browsers once the build lands.
fn spawn_watcher(config: &'static SiteConfig, reload: ReloadServer) {
    let runtime = Handle::current();

    thread::spawn(move || {
        let result = watch_for_changes_blocking(config, |_| {
            let _guard = runtime.enter();
            let build = build_site(config);
            let reload = reload.clone();
            runtime.spawn(async move {
                build.join().await;
                reload.broadcast(&ReloadMessage::Reload);
            });
        });

        if let Err(e) = result {
            log!("error"; "watcher stopped: {:#}", e);
        }
    });
}
