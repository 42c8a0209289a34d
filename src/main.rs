use clap::Parser;
use std::sync::Arc;

use devgate::config::Config;
use devgate::handler::Router;
use devgate::{logger, server};

/// Serve a static asset tree and relay `/api/*` to a backend
#[derive(Debug, Parser)]
#[command(name = "devgate", version, about)]
struct Cli {
    /// Configuration file path (extension optional)
    #[arg(short, long, default_value = "config")]
    config: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = Config::load_from(&cli.config)?;
    cfg.validate()?;

    // Worker thread count follows server.workers, CPU cores when unset
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    logger::init(&cfg)?;

    let addr = cfg.socket_addr()?;
    let listener = server::create_listener(addr)
        .map_err(|e| format!("Failed to bind {addr}: {e}"))?;

    let router = Arc::new(Router::from_config(&cfg)?);
    if !router.assets().root().is_dir() {
        logger::log_warning(&format!(
            "Static directory '{}' does not exist, every non-API GET will be 404",
            router.assets().root().display()
        ));
    }

    let settings = server::ConnectionSettings::from_config(&cfg.performance, cfg.logging.access_log);
    logger::log_server_start(&listener.local_addr()?, &cfg);

    server::run_server(listener, router, settings, server::shutdown_signal()).await;
    Ok(())
}
