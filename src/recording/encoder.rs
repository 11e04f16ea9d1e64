//! H.264 encoding via openh264.

use openh264::encoder::{Encoder, FrameType};
use openh264::formats::YUVBuffer;

use crate::errors::CameraError;

/// Encodes RGB24 frames of a fixed resolution to H.264 Annex B.
pub struct H264Encoder {
    encoder: Encoder,
    width: u32,
    height: u32,
    frame_count: u64,
}

/// One encoded access unit.
pub struct EncodedFrame {
    /// Annex B bitstream (with start codes). May be empty for frames
    /// the encoder buffered.
    pub data: Vec<u8>,
    pub is_keyframe: bool,
}

impl H264Encoder {
    /// openh264 infers dimensions from the YUV source at encode time;
    /// width and height here pin what this encoder will accept.
    pub fn new(width: u32, height: u32) -> Result<Self, CameraError> {
        let encoder = Encoder::new()
            .map_err(|e| CameraError::EncodingError(format!("Failed to create encoder: {}", e)))?;
        Ok(Self {
            encoder,
            width,
            height,
            frame_count: 0,
        })
    }

    pub fn encode_rgb(&mut self, rgb: &[u8]) -> Result<EncodedFrame, CameraError> {
        let expected = (self.width * self.height * 3) as usize;
        if rgb.len() != expected {
            return Err(CameraError::EncodingError(format!(
                "Invalid frame size: expected {} bytes for {}x{}, got {}",
                expected,
                self.width,
                self.height,
                rgb.len()
            )));
        }

        let yuv = rgb_to_yuv420(rgb, self.width, self.height);
        let buffer = YUVBuffer::from_vec(yuv, self.width as usize, self.height as usize);

        let bitstream = self
            .encoder
            .encode(&buffer)
            .map_err(|e| CameraError::EncodingError(format!("Encoding failed: {}", e)))?;

        self.frame_count += 1;
        let is_keyframe = matches!(bitstream.frame_type(), FrameType::IDR | FrameType::I);

        Ok(EncodedFrame {
            data: bitstream.to_vec(),
            is_keyframe,
        })
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// RGB24 to planar YUV420, BT.601.
fn rgb_to_yuv420(rgb: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let y_size = w * h;
    let uv_size = (w / 2) * (h / 2);
    let mut yuv = vec![0u8; y_size + 2 * uv_size];

    let (y_plane, uv_planes) = yuv.split_at_mut(y_size);
    let (u_plane, v_plane) = uv_planes.split_at_mut(uv_size);

    for row in 0..h {
        for col in 0..w {
            let i = (row * w + col) * 3;
            let r = rgb[i] as i32;
            let g = rgb[i + 1] as i32;
            let b = rgb[i + 2] as i32;

            let y = ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16;
            y_plane[row * w + col] = y.clamp(0, 255) as u8;

            // Chroma subsampled from the top-left pixel of each 2x2 block.
            if row % 2 == 0 && col % 2 == 0 {
                let uv = (row / 2) * (w / 2) + (col / 2);
                let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
                let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
                u_plane[uv] = u.clamp(0, 255) as u8;
                v_plane[uv] = v.clamp(0, 255) as u8;
            }
        }
    }

    yuv
}
