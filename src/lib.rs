//! alvicam: machine-vision camera configuration and recording.
//!
//! This crate drives a machine-vision camera in two coupled pieces:
//! parameter negotiation that reconciles operator-requested settings
//! with discrete, interdependent hardware constraints (ranges, step
//! increments, binning modes), and a producer/consumer frame pipeline
//! that decouples driver frame delivery from encoding and disk I/O
//! without ever dropping or blocking on a frame.
//!
//! The vendor driver is consumed only through the capability traits in
//! [`device`]; a deterministic simulated backend ships in [`testing`].
//! Video output goes through the [`recording::VideoSink`] seam; enable
//! the `recording` cargo feature for the bundled H.264/MP4 sink.
//!
//! # Usage
//! ```rust,no_run
//! use alvicam::testing::{SimSpec, SimSystem};
//! use alvicam::{Camera, CaptureRequest, negotiate};
//!
//! let mut camera = Camera::acquire(Box::new(SimSystem::new(SimSpec::default())))?;
//! let config = negotiate(&mut camera, &CaptureRequest::default())?;
//! println!("{}x{} @ ({}, {})", config.width, config.height, config.offset_x, config.offset_y);
//! # Ok::<(), alvicam::CameraError>(())
//! ```

pub mod camera;
pub mod device;
pub mod errors;
pub mod negotiate;
pub mod recording;
pub mod types;

// Simulated backend - also used by external tests and the CLI.
pub mod testing;

pub use camera::Camera;
pub use errors::CameraError;
pub use negotiate::negotiate;
pub use recording::{Codec, RecordingOptions, RecordingSession, SessionState, VideoSink};
pub use types::{CaptureRequest, FloatParam, IntParam, NegotiatedConfig, RecordingStats};
