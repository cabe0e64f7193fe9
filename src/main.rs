mod actions;
mod browse;
mod config;
mod dispatch;
mod errors;
mod logging;
mod render;
mod resolver;
mod security;
mod server;

use crate::config::Config;
use anyhow::Context;
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = PathBuf::from("filemaster.toml");
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                if i >= args.len() { eprintln!("--config requires a path"); std::process::exit(2); }
                config_path = PathBuf::from(&args[i]);
            }
            other => { eprintln!("unknown argument: {other}"); std::process::exit(2); }
        }
        i += 1;
    }

    let cfg = Config::load(&config_path).with_context(|| format!("loading config {}", config_path.display()))?;
    cfg.validate().context("validating config")?;
    logging::init(&cfg.log);

    let addr = format!("{}:{}", cfg.server.bind_addr, cfg.server.port);
    let state = server::AppState::new(cfg)?;

    info!(
        addr = %addr,
        base_path = %state.cfg.server.base_path,
        root = %state.resolver.base().display(),
        actions = ?state.registry.list_names(),
        "filemaster ready"
    );
    println!(
        "filemaster ready addr={} base_path={} root={}",
        addr,
        state.cfg.server.base_path,
        state.resolver.base().display()
    );

    server::serve(state).await
}
