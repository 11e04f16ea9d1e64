//! Recording orchestration: countdown, streaming, drain, summary.
//!
//! Two threads cooperate around the frame queue: the driver's delivery
//! thread enqueues (and does nothing else), and the encode worker owns
//! the sink and drains the queue. The control thread only waits for the
//! external stop signal. There is no abrupt cancellation: stopping
//! always means sentinel, drain to completion, then finalize.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use super::queue::{frame_queue, FrameConsumer, QueueItem};
use super::sink::{Codec, VideoSink};
use crate::camera::Camera;
use crate::errors::CameraError;
use crate::types::{CaptureRequest, NegotiatedConfig, RecordingStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Negotiating,
    CountingDown,
    Recording,
    Draining,
    Finalized,
}

#[derive(Debug, Clone)]
pub struct RecordingOptions {
    pub output: PathBuf,
    /// Pre-roll countdown steps before streaming starts. Pure operator
    /// UX; tests set it to zero.
    pub countdown_secs: u64,
}

impl RecordingOptions {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            countdown_secs: 3,
        }
    }

    pub fn with_countdown(mut self, secs: u64) -> Self {
        self.countdown_secs = secs;
        self
    }
}

/// One recording session, used exactly once: negotiate, then record.
/// `Finalized` is terminal.
pub struct RecordingSession {
    state: SessionState,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn set_state(&mut self, next: SessionState) {
        log::debug!("session state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run parameter negotiation against the live device.
    pub fn negotiate(
        &mut self,
        camera: &mut Camera,
        request: &CaptureRequest,
    ) -> Result<NegotiatedConfig, CameraError> {
        if self.state != SessionState::Idle {
            return Err(CameraError::StreamError(format!(
                "cannot negotiate in state {:?}",
                self.state
            )));
        }
        self.set_state(SessionState::Negotiating);
        crate::negotiate::negotiate(camera, request)
    }

    /// Record until `wait_for_stop` returns, then drain and finalize.
    ///
    /// The stop wait is the only intentional blocking point on the
    /// control thread. Neither the drain nor the worker join is
    /// time-bounded: a stuck sink stalls shutdown rather than losing
    /// frames.
    pub fn record(
        &mut self,
        camera: &mut Camera,
        config: &NegotiatedConfig,
        sink: Box<dyn VideoSink>,
        options: &RecordingOptions,
        wait_for_stop: impl FnOnce(),
    ) -> Result<RecordingStats, CameraError> {
        if self.state != SessionState::Negotiating {
            return Err(CameraError::StreamError(format!(
                "cannot record in state {:?}",
                self.state
            )));
        }

        // Measured at recording start; also drives the encoder's
        // timebase and the duration computation.
        let frame_rate = camera.frame_rate()?.current;

        self.set_state(SessionState::CountingDown);
        for remaining in (1..=options.countdown_secs).rev() {
            log::info!(" ● {}s ...", remaining);
            thread::sleep(Duration::from_secs(1));
        }

        let (producer, consumer) = frame_queue();
        let worker = thread::Builder::new()
            .name("alvicam-encode".to_string())
            .spawn(move || encode_loop(consumer, sink))
            .map_err(|e| CameraError::StreamError(format!("spawn failed: {}", e)))?;

        self.set_state(SessionState::Recording);
        let delivery = producer.clone();
        if let Err(e) = camera.start_streaming(Box::new(move |frame| delivery.enqueue(frame))) {
            // Streaming never began: wake the worker with the sentinel
            // and let the sink finalize an empty file before surfacing.
            producer.finish();
            if let Ok((sink, _, _)) = worker.join() {
                let _ = sink.finish();
            }
            return Err(e);
        }
        log::info!(" ● RECORDING");

        wait_for_stop();

        self.set_state(SessionState::Draining);
        let stop_result = camera.stop_streaming();
        producer.finish();

        let (sink, frames_written, write_failures) = worker
            .join()
            .map_err(|_| CameraError::StreamError("encode worker panicked".to_string()))?;
        let finish_result = sink.finish();

        // Drain and finalization always complete before an error from
        // the stop path propagates.
        stop_result?;
        finish_result?;

        self.set_state(SessionState::Finalized);

        let duration_secs = if frame_rate > 0.0 {
            frames_written as f64 / frame_rate
        } else {
            0.0
        };

        Ok(RecordingStats {
            output_path: options.output.to_string_lossy().to_string(),
            codec: Codec::for_path(&options.output).fourcc().to_string(),
            width: config.width,
            height: config.height,
            frame_rate,
            frames_written,
            write_failures,
            duration_secs,
        })
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer loop. Terminates on the sentinel and on nothing else; a
/// per-frame conversion/write failure is logged and skipped so the
/// sentinel stays reachable and the session still finalizes.
fn encode_loop(
    consumer: FrameConsumer,
    mut sink: Box<dyn VideoSink>,
) -> (Box<dyn VideoSink>, u64, u64) {
    let mut frames_written = 0u64;
    let mut write_failures = 0u64;

    loop {
        match consumer.dequeue() {
            QueueItem::End => break,
            QueueItem::Frame(frame) => {
                let sequence = frame.sequence;
                let rgb = super::mono8_to_rgb(frame.data());
                let result = sink.write_frame(&rgb, frame.width, frame.height);
                // The buffer goes back to the device after the write
                // attempt, success or not.
                frame.release();
                match result {
                    Ok(()) => frames_written += 1,
                    Err(e) => {
                        write_failures += 1;
                        log::error!("Error writing frame {}: {}", sequence, e);
                    }
                }
            }
        }
    }

    (sink, frames_written, write_failures)
}
