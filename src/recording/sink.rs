//! The video sink seam and codec selection.
//!
//! The pipeline treats encoding as an opaque sink accepting RGB24
//! frames at a fixed resolution and frame rate. The codec family is
//! chosen from the output extension, a mapping kept for compatibility
//! with files produced by earlier deployments.

use std::path::Path;

use crate::errors::CameraError;

/// Codec family, selected from the output file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// `.avi` outputs.
    Xvid,
    /// Everything else.
    Mp4v,
}

impl Codec {
    pub fn for_path(path: &Path) -> Self {
        let is_avi = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("avi"))
            .unwrap_or(false);
        if is_avi {
            Codec::Xvid
        } else {
            Codec::Mp4v
        }
    }

    pub fn fourcc(&self) -> &'static str {
        match self {
            Codec::Xvid => "XVID",
            Codec::Mp4v => "mp4v",
        }
    }
}

/// Where encoded frames end up.
///
/// The encode worker owns the sink exclusively; nothing else writes to
/// it. `finish` consumes the sink so a finalized file cannot be written
/// to again. Finishing with zero frames written must still produce a
/// valid (empty) output file.
pub trait VideoSink: Send {
    /// Write one RGB24 frame. A failure here is a per-frame problem:
    /// the caller logs it and keeps the pipeline running.
    fn write_frame(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<(), CameraError>;

    /// Flush and close the output.
    fn finish(self: Box<Self>) -> Result<(), CameraError>;
}
