// HTTP front for the control plane (Axum)
//
// Runs on its own thread with a single-threaded tokio runtime. Ctrl-C is
// caught here and turned into a process-wide shutdown.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::post,
    Router,
};
use std::collections::BTreeMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::plane::{CameraStatus, CameraSummary, ControlPlane};
use crate::error::ControlError;
use crate::shutdown::Shutdown;

const OK: &str = "Ok";
const NOK: &str = "Nok";

/// Routes of the control API
pub fn router(control: Arc<ControlPlane>) -> Router {
    Router::new()
        .route("/enabled", post(enabled))
        .route("/status", post(status).get(status))
        .route("/cam/:op/:cam", post(toggle_camera))
        .route("/notify/:op/:cam/:notification", post(toggle_notification))
        .with_state(control)
}

async fn enabled(State(control): State<Arc<ControlPlane>>) -> Json<BTreeMap<String, CameraSummary>> {
    Json(control.summary())
}

async fn status(State(control): State<Arc<ControlPlane>>) -> Json<BTreeMap<String, CameraStatus>> {
    Json(control.status())
}

async fn toggle_camera(
    State(control): State<Arc<ControlPlane>>,
    Path((op, cam)): Path<(String, String)>,
) -> &'static str {
    reply(control.set_camera_enabled(&cam, &op))
}

async fn toggle_notification(
    State(control): State<Arc<ControlPlane>>,
    Path((op, cam, notification)): Path<(String, String, String)>,
) -> &'static str {
    reply(control.set_rule_enabled(&cam, &notification, &op))
}

fn reply(result: Result<(), ControlError>) -> &'static str {
    match result {
        Ok(()) => OK,
        Err(e) => {
            tracing::warn!("Control request rejected: {}", e);
            NOK
        }
    }
}

/// Bind `addr` and serve the control API until shutdown.
///
/// Binding happens before the thread starts so an address in use is
/// reported to the caller.
pub fn spawn(control: Arc<ControlPlane>, addr: SocketAddr, shutdown: Shutdown) -> io::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let listener = std::net::TcpListener::bind(addr)?;
    listener.set_nonblocking(true)?;

    tracing::info!("Control API listening on http://{}", addr);

    thread::Builder::new()
        .name("control".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(listener) {
                    Ok(listener) => listener,
                    Err(e) => {
                        tracing::error!("Control API listener failed: {}", e);
                        shutdown.trigger();
                        return;
                    }
                };

                let stop = shutdown.clone();
                let signal = async move {
                    let listener = stop.listener();
                    let external = tokio::task::spawn_blocking(move || listener.wait_forever());
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            tracing::info!("Ctrl-C received");
                            stop.trigger();
                        }
                        _ = external => {}
                    }
                };

                if let Err(e) = axum::serve(listener, router(control))
                    .with_graceful_shutdown(signal)
                    .await
                {
                    tracing::error!("Control API stopped: {}", e);
                    shutdown.trigger();
                }
            });
            tracing::info!("Control API stopped");
        })
}
