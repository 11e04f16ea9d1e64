//! Core data types shared across the negotiation and recording paths.

use serde::{Deserialize, Serialize};

/// An integer device parameter: its live value, valid range, and the
/// step increment the hardware requires.
///
/// Invariant once negotiated: `min <= current <= max` and
/// `current % increment == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntParam {
    pub current: u32,
    pub min: u32,
    pub max: u32,
    pub increment: u32,
}

impl IntParam {
    pub fn new(current: u32, min: u32, max: u32, increment: u32) -> Self {
        Self {
            current,
            min,
            max,
            increment: increment.max(1),
        }
    }

    pub fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Round `value` down to the nearest multiple of the increment.
    pub fn snap_down(&self, value: u32) -> u32 {
        value - value % self.increment
    }
}

/// A floating-point device parameter (shutter speed, frame rate).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatParam {
    pub current: f64,
    pub min: f64,
    pub max: f64,
}

impl FloatParam {
    pub fn new(current: f64, min: f64, max: f64) -> Self {
        Self { current, min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// What the operator asked for, before the hardware has had its say.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptureRequest {
    /// Shutter speed (exposure time) in microseconds.
    pub shutter_speed_us: f64,
    /// Request 2x2 sensor binning (halves the maximum resolution).
    pub binning: bool,
    /// Image height in pixels.
    pub height: u32,
    /// Image width in pixels.
    pub width: u32,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            shutter_speed_us: 5000.0,
            binning: false,
            height: 1248,
            width: 1632,
        }
    }
}

/// The hardware-accepted configuration produced by negotiation.
///
/// Immutable once produced; the values may differ from the request and
/// are exactly what the device ended up with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NegotiatedConfig {
    pub shutter_speed_us: f64,
    pub binning: bool,
    pub height: u32,
    pub width: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

/// Summary of a finished recording session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingStats {
    pub output_path: String,
    /// FourCC of the codec family selected from the output extension.
    pub codec: String,
    pub width: u32,
    pub height: u32,
    /// Frame rate the camera reported at recording start.
    pub frame_rate: f64,
    /// Frames actually written to the sink.
    pub frames_written: u64,
    /// Frames that failed to convert/encode and were skipped.
    pub write_failures: u64,
    /// Computed as `frames_written / frame_rate`.
    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_down_rounds_to_increment() {
        let p = IntParam::new(0, 64, 1632, 8);
        assert_eq!(p.snap_down(100), 96);
        assert_eq!(p.snap_down(96), 96);
        assert_eq!(p.snap_down(7), 0);
    }

    #[test]
    fn zero_increment_is_normalized() {
        let p = IntParam::new(0, 0, 100, 0);
        assert_eq!(p.increment, 1);
        assert_eq!(p.snap_down(33), 33);
    }

    #[test]
    fn range_checks() {
        let p = IntParam::new(0, 64, 1248, 2);
        assert!(p.contains(64));
        assert!(p.contains(1248));
        assert!(!p.contains(63));
        assert!(!p.contains(1249));
    }
}
