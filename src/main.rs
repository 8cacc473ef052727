use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use fileserv::config::{AppState, Config};
use fileserv::server::signal::{start_signal_handler, SignalHandler};
use fileserv::{logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;
    logger::init(&cfg)?;

    // Resolve the root exactly once; the request path only ever sees the
    // canonical form.
    let root = cfg.canonical_root().map_err(|e| {
        format!("Cannot serve root '{}': {e}", cfg.server.root)
    })?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg, root))
}

async fn async_main(
    cfg: Config,
    root: std::path::PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.socket_addr()?;
    let listener = server::create_reusable_listener(addr)?;

    logger::log_server_start(&addr, &cfg, &root);

    let state = Arc::new(AppState::new(cfg, root));
    let active_connections = Arc::new(AtomicUsize::new(0));

    let signals = Arc::new(SignalHandler::new());
    start_signal_handler(Arc::clone(&signals));

    server::start_server_loop(
        listener,
        state,
        active_connections,
        Arc::clone(&signals.shutdown),
    )
    .await
}
