//! Offline evaluation of one image
//!
//! Runs a camera's rules once against a JPEG from disk, using the real model
//! services but never sending notifications. Used to tune zones and bounds.

use anyhow::Context;
use serde::Serialize;

use crate::camera::Camera;
use crate::detection::{ModelClients, ResultCache};
use crate::error::AppResult;
use crate::notify::{DryRunNotifier, NotificationController, Phase};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleReport {
    pub name: String,
    pub enabled: bool,
    pub triggered: bool,
    pub phase: Phase,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectReport {
    pub camera: String,
    pub width: u32,
    pub height: u32,
    /// Inference calls made for this image
    pub model_calls: usize,
    pub triggered: bool,
    pub advance_skip: bool,
    pub rules: Vec<RuleReport>,
}

/// Evaluate `camera`'s rules against one encoded image
pub fn inspect(camera: &Camera, data: &[u8], clients: &mut ModelClients) -> AppResult<InspectReport> {
    let decoded = image::load_from_memory(data).context("Image could not be decoded")?;
    tracing::info!(
        "Checking camera {} against a {}x{} image",
        camera.name,
        decoded.width(),
        decoded.height()
    );

    let mut controller = NotificationController::new(Box::new(DryRunNotifier));
    let mut cache = ResultCache::new(clients, data);
    let outcome = controller
        .run_cycle(camera, &mut cache)
        .context("Model evaluation failed")?;

    let rules = camera
        .rules
        .iter()
        .map(|rule| {
            let flags = rule.flags();
            RuleReport {
                name: rule.name.clone(),
                enabled: flags.enabled,
                triggered: flags.triggered,
                phase: controller.phase(&camera.name, &rule.name),
            }
        })
        .collect();

    Ok(InspectReport {
        camera: camera.name.clone(),
        width: decoded.width(),
        height: decoded.height(),
        model_calls: cache.fetches(),
        triggered: outcome.triggered,
        advance_skip: outcome.advance_skip,
        rules,
    })
}
