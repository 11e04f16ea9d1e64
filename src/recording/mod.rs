//! Real-time recording pipeline: an unbounded frame queue between the
//! delivery callback and the encode worker, a pluggable video sink, and
//! the session orchestrator.
//!
//! With the `recording` cargo feature enabled an MP4 sink is available:
//! - openh264 for H.264 encoding
//! - muxide for MP4 muxing

mod queue;
mod session;
mod sink;

#[cfg(feature = "recording")]
mod encoder;
#[cfg(feature = "recording")]
mod recorder;

pub use queue::{frame_queue, FrameConsumer, FrameProducer, QueueItem};
pub use session::{RecordingOptions, RecordingSession, SessionState};
pub use sink::{Codec, VideoSink};

#[cfg(feature = "recording")]
pub use encoder::{EncodedFrame, H264Encoder};
#[cfg(feature = "recording")]
pub use recorder::Recorder;

/// Expand Mono8 pixels to RGB24 by channel replication, the form the
/// sink expects.
pub fn mono8_to_rgb(gray: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(gray.len() * 3);
    for &value in gray {
        rgb.extend_from_slice(&[value, value, value]);
    }
    rgb
}
