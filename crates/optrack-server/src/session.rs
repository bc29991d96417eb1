//! The session pipeline: frame acquisition, windowed consensus, placement
//! classification, report publication and clip rotation.
//!
//! Two intervals drive the loop, both checked after each processed frame:
//! - the report interval closes the detection window, classifies placement
//!   on the window's representative frame and publishes a merged report
//! - the clip interval rotates the accumulated frames into a background
//!   encode-and-upload task and harvests the previous task's result
//!
//! A finished clip upload does not interrupt anything: its reference is
//! consumed at the next clip boundary and folded into a reconciled report.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use optrack_models::{StreamMessage, ToolReport};
use optrack_vision::{
    select_representative, DetectionBuffer, Detector, Frame, FrameResult, PlacementStrategy,
    StatusMap, ToolTracker,
};

use crate::artifact::ArtifactSink;
use crate::error::{ServerError, ServerResult};
use crate::source::FrameSource;

/// Timing and threshold knobs for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub report_interval: Duration,
    pub clip_interval: Duration,
    pub confidence_threshold: f32,
    pub max_consecutive_failures: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            report_interval: Duration::from_secs(4),
            clip_interval: Duration::from_secs(5),
            confidence_threshold: 0.4,
            max_consecutive_failures: 3,
        }
    }
}

/// One tracking session over one frame source.
pub struct Session {
    config: SessionConfig,
    detector: Arc<dyn Detector>,
    placement: Arc<dyn PlacementStrategy>,
    sink: Arc<dyn ArtifactSink>,
    tracker: Arc<Mutex<ToolTracker>>,
    events: broadcast::Sender<StreamMessage>,
    latest_report: Arc<RwLock<Option<ToolReport>>>,
    /// Reference of the most recently completed clip. Empty until the
    /// first upload finishes.
    current_artifact: String,
    /// Statuses from the last closed window, re-merged when a clip
    /// reference arrives.
    last_statuses: StatusMap,
    pending_clips: Vec<JoinHandle<Option<String>>>,
    clip_sequence: u64,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SessionConfig,
        detector: Arc<dyn Detector>,
        placement: Arc<dyn PlacementStrategy>,
        sink: Arc<dyn ArtifactSink>,
        tracker: Arc<Mutex<ToolTracker>>,
        events: broadcast::Sender<StreamMessage>,
        latest_report: Arc<RwLock<Option<ToolReport>>>,
    ) -> Self {
        Self {
            config,
            detector,
            placement,
            sink,
            tracker,
            events,
            latest_report,
            current_artifact: String::new(),
            last_statuses: StatusMap::new(),
            pending_clips: Vec::new(),
            clip_sequence: 0,
        }
    }

    /// Drive the pipeline until the source is exhausted, shutdown is
    /// signalled, or the source fails too many times in a row.
    pub async fn run(
        mut self,
        mut source: Box<dyn FrameSource>,
        mut shutdown: watch::Receiver<bool>,
    ) -> ServerResult<()> {
        info!(
            report_interval = ?self.config.report_interval,
            clip_interval = ?self.config.clip_interval,
            "Session started"
        );

        let mut buffer = DetectionBuffer::new();
        let mut clip_frames: Vec<Vec<u8>> = Vec::new();
        let mut consecutive_failures = 0u32;
        let mut last_report = Instant::now();
        let mut last_clip = Instant::now();

        loop {
            let fetched = tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    info!("Session shutdown requested");
                    break;
                }
                fetched = source.next_frame() => fetched,
            };

            match fetched {
                Ok(Some(frame)) => {
                    self.process_frame(
                        frame,
                        &mut buffer,
                        &mut clip_frames,
                        &mut consecutive_failures,
                    )
                    .await;
                }
                Ok(None) => {
                    info!("Frame source exhausted, ending session");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Frame read failed, skipping frame");
                    consecutive_failures += 1;
                }
            }

            if consecutive_failures >= self.config.max_consecutive_failures {
                let err = ServerError::SourceUnavailable(consecutive_failures);
                error!(%err, "Session aborting");
                self.publish(StreamMessage::error(err.to_string()));
                return Err(err);
            }

            if last_report.elapsed() >= self.config.report_interval {
                self.close_window(buffer.drain()).await;
                last_report = Instant::now();
            }
            if last_clip.elapsed() >= self.config.clip_interval {
                let frames = std::mem::take(&mut clip_frames);
                self.rotate_clip(frames).await;
                last_clip = Instant::now();
            }
        }

        // Flush the partial window so a short session still reports.
        if !buffer.is_empty() {
            self.close_window(buffer.drain()).await;
        }
        info!("Session ended");
        Ok(())
    }

    /// Relay the frame to subscribers, run detection and buffer the result.
    async fn process_frame(
        &mut self,
        frame: Frame,
        buffer: &mut DetectionBuffer,
        clip_frames: &mut Vec<Vec<u8>>,
        consecutive_failures: &mut u32,
    ) {
        clip_frames.push(frame.jpeg().to_vec());
        self.publish(StreamMessage::frame(BASE64.encode(frame.jpeg())));

        let result = match self
            .detector
            .detect(&frame, self.config.confidence_threshold)
            .await
        {
            Ok(detections) => {
                *consecutive_failures = 0;
                FrameResult::new(frame, detections)
            }
            Err(e) => {
                // The frame still counts toward the window so a dead
                // detector drags the vote toward missing.
                warn!(error = %e, "Detection failed, recording empty frame");
                *consecutive_failures += 1;
                FrameResult::empty(frame)
            }
        };
        buffer.push(result);
    }

    /// Close the current window: pick a representative, classify placement
    /// and publish the merged report.
    async fn close_window(&mut self, window: Vec<FrameResult>) {
        let statuses: StatusMap = match select_representative(&window) {
            Some(selection) => {
                let representative = &window[selection.frame_index];
                debug!(
                    frame = representative.frame.index,
                    required = ?selection.required,
                    "Window representative selected"
                );
                match self
                    .placement
                    .classify(&representative.frame, &representative.detections)
                    .await
                {
                    Ok(statuses) => statuses,
                    Err(e) => {
                        warn!(error = %e, "Placement classification failed");
                        self.publish(StreamMessage::error(format!(
                            "Placement classification failed: {e}"
                        )));
                        StatusMap::new()
                    }
                }
            }
            None => {
                debug!(frames = window.len(), "No representative for window");
                StatusMap::new()
            }
        };

        let report = {
            let mut tracker = self.tracker.lock().await;
            tracker.merge(&statuses, &self.current_artifact)
        };
        self.last_statuses = statuses;
        self.emit_report(report).await;
    }

    /// Harvest finished clip uploads, then dispatch the next encode.
    async fn rotate_clip(&mut self, frames: Vec<Vec<u8>>) {
        self.harvest_finished_clips().await;

        if frames.is_empty() {
            return;
        }
        let sink = Arc::clone(&self.sink);
        let duration = self.config.clip_interval.as_secs_f64();
        let sequence = self.clip_sequence;
        self.clip_sequence += 1;
        self.pending_clips.push(tokio::spawn(async move {
            match sink.persist_clip(frames, duration, sequence).await {
                Ok(url) => Some(url),
                Err(e) => {
                    error!(sequence, error = %e, "Clip persistence failed");
                    None
                }
            }
        }));
    }

    /// Consume completed uploads. The newest completed reference becomes
    /// the current artifact and the last statuses are re-merged so present
    /// tools pick it up without waiting for the next window.
    async fn harvest_finished_clips(&mut self) {
        let mut harvested = None;
        let mut still_running = Vec::new();
        for handle in self.pending_clips.drain(..) {
            if handle.is_finished() {
                match handle.await {
                    Ok(Some(url)) if !url.is_empty() => harvested = Some(url),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Clip task failed to join"),
                }
            } else {
                still_running.push(handle);
            }
        }
        self.pending_clips = still_running;

        if let Some(url) = harvested {
            debug!(%url, "Clip artifact ready");
            self.current_artifact = url;
            let report = {
                let mut tracker = self.tracker.lock().await;
                tracker.merge(&self.last_statuses, &self.current_artifact)
            };
            self.emit_report(report).await;
        }
    }

    async fn emit_report(&self, report: ToolReport) {
        *self.latest_report.write().await = Some(report.clone());
        self.publish(StreamMessage::report(report));
    }

    fn publish(&self, message: StreamMessage) {
        let _ = self.events.send(message);
    }
}
