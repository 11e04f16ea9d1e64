//! Production sink: H.264 in MP4, via openh264 + muxide.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use muxide::api::{Metadata, MuxerBuilder, VideoCodec};

use super::encoder::H264Encoder;
use super::sink::{Codec, VideoSink};
use crate::errors::CameraError;

pub struct Recorder {
    encoder: H264Encoder,
    muxer: muxide::api::Muxer<BufWriter<File>>,
    width: u32,
    height: u32,
    frame_duration_secs: f64,
    frames_written: u64,
}

impl Recorder {
    /// Open an MP4 recording at `path`.
    ///
    /// Only the mp4v codec family is supported here; an `.avi` request
    /// maps to the XVID family and is rejected rather than silently
    /// written into the wrong container.
    pub fn create<P: AsRef<Path>>(
        path: P,
        codec: Codec,
        frame_rate: f64,
        width: u32,
        height: u32,
    ) -> Result<Self, CameraError> {
        if codec == Codec::Xvid {
            return Err(CameraError::EncodingError(
                "AVI/XVID output is not supported by the MP4 recorder; pick a non-.avi path"
                    .to_string(),
            ));
        }

        let file = File::create(&path)
            .map_err(|e| CameraError::IoError(format!("Failed to create output file: {}", e)))?;
        let writer = BufWriter::new(file);

        let encoder = H264Encoder::new(width, height)?;

        let muxer = MuxerBuilder::new(writer)
            .video(VideoCodec::H264, width, height, frame_rate)
            .with_metadata(Metadata::new().with_current_time())
            .build()
            .map_err(|e| CameraError::EncodingError(format!("Failed to create muxer: {}", e)))?;

        Ok(Self {
            encoder,
            muxer,
            width,
            height,
            frame_duration_secs: 1.0 / frame_rate.max(f64::MIN_POSITIVE),
            frames_written: 0,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl VideoSink for Recorder {
    fn write_frame(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<(), CameraError> {
        if width != self.width || height != self.height {
            return Err(CameraError::EncodingError(format!(
                "Frame dimensions {}x{} don't match recording setup {}x{}",
                width, height, self.width, self.height
            )));
        }

        let encoded = self.encoder.encode_rgb(rgb)?;
        if encoded.data.is_empty() {
            // The encoder buffered this frame; nothing to mux yet.
            return Ok(());
        }

        let pts = self.frames_written as f64 * self.frame_duration_secs;
        self.muxer
            .write_video(pts, &encoded.data, encoded.is_keyframe)
            .map_err(|e| CameraError::EncodingError(format!("Failed to write frame: {}", e)))?;

        self.frames_written += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<(), CameraError> {
        let stats = self
            .muxer
            .finish_with_stats()
            .map_err(|e| CameraError::EncodingError(format!("Failed to finalize recording: {}", e)))?;
        log::debug!(
            "recording finalized: {} frames, {} bytes",
            stats.video_frames,
            stats.bytes_written
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    #[test]
    fn avi_codec_hint_is_rejected() {
        let output = temp_dir().join("alvicam_reject.avi");
        let result = Recorder::create(&output, Codec::Xvid, 30.0, 640, 480);
        assert!(matches!(result, Err(CameraError::EncodingError(_))));
    }

    #[test]
    fn finalizing_without_frames_yields_a_valid_file() {
        let output = temp_dir().join("alvicam_empty.mp4");
        let recorder = Recorder::create(&output, Codec::Mp4v, 30.0, 640, 480).expect("create");
        Box::new(recorder).finish().expect("finish");

        let metadata = std::fs::metadata(&output).expect("file should exist");
        assert!(metadata.len() > 0, "empty recording should still be a valid container");
        let _ = std::fs::remove_file(&output);
    }

    #[test]
    fn writes_frames_and_finalizes() {
        let output = temp_dir().join("alvicam_frames.mp4");
        let mut recorder: Box<dyn VideoSink> =
            Box::new(Recorder::create(&output, Codec::Mp4v, 30.0, 640, 480).expect("create"));

        for i in 0..10u8 {
            let rgb = vec![i * 20; 640 * 480 * 3];
            recorder.write_frame(&rgb, 640, 480).expect("write");
        }
        recorder.finish().expect("finish");

        let metadata = std::fs::metadata(&output).expect("file should exist");
        assert!(metadata.len() > 0);
        let _ = std::fs::remove_file(&output);
    }
}
