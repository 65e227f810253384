mod compositor;
mod display;
mod http;
mod ingest;
mod store;
mod viewer;

use cam_grid_common::config::Config;
use display::{DisplaySurface, HeadlessSurface, SharedComposite, WindowSurface};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use store::FrameStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use viewer::ViewerApp;

fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        host = config.server.host,
        port = config.server.port,
        fps = config.compositor.fps,
        headless = config.viewer.headless,
        "starting cam-grid server"
    );

    let store = Arc::new(FrameStore::new());
    let cancel = CancellationToken::new();

    if config.viewer.headless {
        let runtime = build_runtime();
        let surface: Arc<dyn DisplaySurface> = Arc::new(HeadlessSurface::new());
        if let Err(e) = runtime.block_on(run_backend(config, store, surface, cancel)) {
            error!(error = %e, "server failed");
            std::process::exit(1);
        }
        return;
    }

    let composite: SharedComposite = Arc::new(Mutex::new(None));
    let title = config.viewer.title.clone();
    let initial_size = [
        (config.compositor.tile_width * 2) as f32,
        (config.compositor.tile_height * 2) as f32,
    ];

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(&title)
            .with_inner_size(initial_size),
        ..Default::default()
    };

    // Filled in by the creator closure so the backend can be joined once
    // the window is gone; never detached.
    let backend: Arc<Mutex<Option<std::thread::JoinHandle<()>>>> = Arc::new(Mutex::new(None));
    let backend_slot = Arc::clone(&backend);
    let shutdown = cancel.clone();

    let app_composite = Arc::clone(&composite);
    let app_cancel = cancel.clone();
    let result = eframe::run_native(
        &title,
        options,
        Box::new(move |cc| {
            // The compositor presents into the window through this surface;
            // everything async runs on a dedicated runtime thread so the
            // egui/glow main thread stays free.
            let surface: Arc<dyn DisplaySurface> =
                Arc::new(WindowSurface::new(composite, cc.egui_ctx.clone()));
            let wake_ctx = cc.egui_ctx.clone();
            let handle = std::thread::Builder::new()
                .name("cam-grid-backend".into())
                .spawn(move || {
                    let runtime = build_runtime();
                    if let Err(e) = runtime.block_on(run_backend(config, store, surface, cancel)) {
                        error!(error = %e, "server failed");
                    }
                    // A Ctrl-C shutdown starts on this side; repaint so the
                    // viewer sees the cancelled token and closes.
                    wake_ctx.request_repaint();
                })
                .expect("failed to spawn backend thread");
            if let Ok(mut slot) = backend_slot.lock() {
                *slot = Some(handle);
            }

            Ok(Box::new(ViewerApp::new(app_composite, app_cancel)))
        }),
    );

    // The window is gone; make sure the backend stops and finishes its
    // shutdown (graceful server stop, compositor join) before we return.
    shutdown.cancel();
    if let Some(handle) = backend.lock().ok().and_then(|mut slot| slot.take()) {
        if handle.join().is_err() {
            error!("backend thread panicked");
        }
    }

    if let Err(e) = result {
        eprintln!("viewer error: {e}");
        std::process::exit(1);
    }
}

fn build_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
}

/// Compositor task + HTTP/WebSocket server, tied to one cancellation token.
/// Returns once both have wound down.
async fn run_backend(
    config: Config,
    store: Arc<FrameStore>,
    surface: Arc<dyn DisplaySurface>,
    cancel: CancellationToken,
) -> Result<(), http::ServerError> {
    let compositor = tokio::spawn(compositor::run(
        Arc::clone(&store),
        surface,
        config.compositor.clone(),
        cancel.clone(),
    ));

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received interrupt, shutting down");
                cancel.cancel();
            }
        });
    }

    let result = http::serve(&config.server, store, cancel.clone()).await;

    // However the server ended, take the compositor down with it and join.
    cancel.cancel();
    if let Err(e) = compositor.await {
        warn!(error = %e, "compositor task panicked");
    }
    result
}
