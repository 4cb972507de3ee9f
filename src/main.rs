use anyhow::Context;
use clap::Parser;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::sync::Arc;

use secure_watch::camera::{FrameSlot, FrameSource};
use secure_watch::cli::{CheckArgs, Cli, Command, RunArgs};
use secure_watch::config::{Config, Deployment};
use secure_watch::control::{self, ControlPlane};
use secure_watch::detection::websocket::DEFAULT_REPLY_TIMEOUT;
use secure_watch::detection::{ModelClients, WebSocketClient};
use secure_watch::error::AppResult;
use secure_watch::inspect;
use secure_watch::logging;
use secure_watch::notify::{HttpNotifier, NotificationController};
use secure_watch::scheduler::{CameraFeed, Scheduler};
use secure_watch::shutdown::Shutdown;

fn main() -> AppResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args),
        Command::Check(args) => check(args),
    }
}

fn load_deployment(path: &std::path::Path) -> AppResult<Deployment> {
    let config = Config::load(path).with_context(|| format!("Failed to load {}", path.display()))?;
    let deployment = config.build().context("Invalid configuration")?;

    tracing::info!(
        "Configuration loaded: {} cameras, {} models",
        deployment.cameras.len(),
        deployment.models.len()
    );
    Ok(deployment)
}

/// Open one websocket per model the rules refer to
fn connect_models(urls: &BTreeMap<String, String>, needed: &BTreeSet<String>) -> AppResult<ModelClients> {
    let mut clients = ModelClients::new();

    for (model, url) in urls {
        if !needed.contains(model) {
            tracing::info!("Model {} is not used by any rule, not connecting", model);
            continue;
        }
        let client = WebSocketClient::connect(model, url, DEFAULT_REPLY_TIMEOUT)
            .with_context(|| format!("Model service {} unavailable", model))?;
        clients.insert(Box::new(client));
    }

    Ok(clients)
}

fn run(args: RunArgs) -> AppResult<()> {
    logging::init(args.debug, &args.log_dir());
    logging::log_runtime_environment();

    let deployment = load_deployment(&args.config)?;
    let clients = connect_models(
        &deployment.models,
        &Deployment::models_in_use(&deployment.cameras),
    )?;

    let shutdown = Shutdown::new();

    let mut feeds = Vec::with_capacity(deployment.cameras.len());
    for camera in &deployment.cameras {
        let slot = FrameSlot::new();
        feeds.push(CameraFeed::new(Arc::clone(camera), slot.reader()));
        FrameSource::new(Arc::clone(camera), slot, shutdown.listener())
            .spawn()
            .with_context(|| format!("Failed to start reader for camera {}", camera.name))?;
    }

    let control_plane = Arc::new(ControlPlane::new(deployment.cameras.clone()));
    let control_thread = control::spawn(control_plane, args.control_addr(), shutdown.clone())
        .with_context(|| format!("Failed to start control API on {}", args.control_addr()))?;

    let controller = NotificationController::new(Box::new(HttpNotifier::default()));
    let mut scheduler = Scheduler::new(feeds, clients, controller).with_stats_every(args.stats_every);

    let result = scheduler.run(&shutdown.listener());
    if let Err(e) = &result {
        tracing::error!("Stopping: {}", e);
    }

    // Camera readers notice at their next chunk; they are not joined
    shutdown.trigger();
    if control_thread.join().is_err() {
        tracing::error!("Control API thread panicked");
    }

    result.context("Inference service failed")
}

fn check(args: CheckArgs) -> AppResult<()> {
    logging::init(args.debug, &args.log_dir());

    let deployment = load_deployment(&args.config)?;
    let camera = deployment
        .camera(&args.camera)
        .with_context(|| format!("Camera {} not found in configuration", args.camera))?;
    let image = fs::read(&args.image).with_context(|| format!("Failed to read {}", args.image.display()))?;

    let mut clients = connect_models(
        &deployment.models,
        &Deployment::models_in_use(std::iter::once(camera)),
    )?;

    let report = inspect::inspect(camera, &image, &mut clients)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
