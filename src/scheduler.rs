/// Round-robin evaluation loop
///
/// A single thread walks the cameras in order. Each step looks at one
/// camera: a new frame is evaluated to completion before the cursor moves,
/// so two cameras are never evaluated at the same time. A cycle asking for
/// advance-skip keeps the cursor on the same camera for exactly one more
/// step. A full round without work sleeps briefly.
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::camera::{Camera, FrameReader};
use crate::detection::{ModelClients, ResultCache};
use crate::error::InferenceError;
use crate::notify::{CycleOutcome, NotificationController};
use crate::shutdown::ShutdownListener;
use crate::utils::{CycleTiming, LatencyStats};

/// Sleep after a full round with no new frames
pub const IDLE_SLEEP: Duration = Duration::from_millis(5);

/// A camera paired with its view of the frame slot
pub struct CameraFeed {
    pub camera: Arc<Camera>,
    pub frames: FrameReader,
}

impl CameraFeed {
    pub fn new(camera: Arc<Camera>, frames: FrameReader) -> Self {
        Self { camera, frames }
    }
}

/// What one scheduler step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepReport {
    /// A frame of this camera was evaluated
    Evaluated {
        camera: usize,
        outcome: CycleOutcome,
    },
    /// Camera disabled or no new frame
    Skipped { camera: usize },
    /// A full round came up empty; the scheduler slept
    Idle,
}

pub struct Scheduler {
    feeds: Vec<CameraFeed>,
    clients: ModelClients,
    controller: NotificationController,
    cursor: usize,
    /// The camera under the cursor is being looked at again
    skipping: bool,
    /// Consecutive steps without work
    starved: usize,
    idle_sleep: Duration,
    stats: LatencyStats,
    stats_every: Option<usize>,
}

impl Scheduler {
    pub fn new(feeds: Vec<CameraFeed>, clients: ModelClients, controller: NotificationController) -> Self {
        Self {
            feeds,
            clients,
            controller,
            cursor: 0,
            skipping: false,
            starved: 0,
            idle_sleep: IDLE_SLEEP,
            stats: LatencyStats::with_capacity(1024),
            stats_every: None,
        }
    }

    pub fn with_idle_sleep(mut self, idle_sleep: Duration) -> Self {
        self.idle_sleep = idle_sleep;
        self
    }

    /// Log a latency report every `cycles` evaluated frames
    pub fn with_stats_every(mut self, cycles: Option<usize>) -> Self {
        self.stats_every = cycles.filter(|n| *n > 0);
        self
    }

    /// Index of the camera the next step will look at
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Look at one camera (or sleep after an empty round)
    pub fn step(&mut self) -> Result<StepReport, InferenceError> {
        if self.feeds.is_empty() {
            thread::sleep(self.idle_sleep);
            return Ok(StepReport::Idle);
        }

        if self.starved >= self.feeds.len() {
            self.starved = 0;
            thread::sleep(self.idle_sleep);
            return Ok(StepReport::Idle);
        }

        let index = self.cursor;
        let feed = &mut self.feeds[index];

        let frame = if feed.camera.is_enabled() {
            feed.frames.latest()
        } else {
            None
        };

        let Some(frame) = frame else {
            self.skipping = false;
            self.starved += 1;
            self.advance();
            return Ok(StepReport::Skipped { camera: index });
        };

        self.starved = 0;
        let camera = Arc::clone(&feed.camera);
        tracing::debug!("Evaluating camera {} frame {}", camera.name, frame.sequence);

        let start = Instant::now();
        let mut cache = ResultCache::new(&mut self.clients, &frame.data);
        let outcome = self.controller.run_cycle(&camera, &mut cache)?;
        let inference = cache.fetch_time();
        drop(cache);
        self.record(CycleTiming {
            inference_us: inference.as_secs_f64() * 1e6,
            notify_us: outcome.notify_time.as_secs_f64() * 1e6,
            total_us: start.elapsed().as_secs_f64() * 1e6,
        });

        if outcome.advance_skip && !self.skipping {
            tracing::debug!("Camera {} asked for another look", camera.name);
            self.skipping = true;
        } else {
            self.skipping = false;
            self.advance();
        }

        Ok(StepReport::Evaluated {
            camera: index,
            outcome,
        })
    }

    /// Step until shutdown or an inference failure
    pub fn run(&mut self, shutdown: &ShutdownListener) -> Result<(), InferenceError> {
        tracing::info!("Scheduler started with {} cameras", self.feeds.len());

        while !shutdown.is_triggered() {
            self.step()?;
        }

        tracing::info!("Scheduler stopped");
        self.stats.log_report();
        Ok(())
    }

    fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.feeds.len();
    }

    fn record(&mut self, timing: CycleTiming) {
        self.stats.add(timing);
        if let Some(every) = self.stats_every {
            if self.stats.len() >= every {
                self.stats.log_report();
                self.stats.clear();
            }
        }
    }
}
