//! Property-based tests for parameter negotiation.
//!
//! These verify the clamping/snapping contracts against the simulated
//! device, using proptest for input generation and shrinking.

use proptest::prelude::*;

use alvicam::testing::{SimSpec, SimSystem};
use alvicam::{negotiate, Camera, CaptureRequest};

fn acquire(spec: SimSpec) -> Camera {
    Camera::acquire(Box::new(SimSystem::new(spec))).expect("sim camera should acquire")
}

proptest! {
    /// Any width outside [min, max] lands on the axis maximum, which is
    /// always increment-aligned.
    #[test]
    fn out_of_range_width_clamps_to_max(
        width in prop_oneof![0u32..64, 1633u32..8192],
    ) {
        let mut camera = acquire(SimSpec::default());
        let request = CaptureRequest { width, ..CaptureRequest::default() };
        let config = negotiate(&mut camera, &request).unwrap();
        prop_assert_eq!(config.width, 1632);
        prop_assert_eq!(config.width % 2, 0);
    }

    /// In-range but misaligned axis values round down to the increment.
    #[test]
    fn in_range_axes_snap_down(
        width in 64u32..=1632,
        height in 64u32..=1248,
    ) {
        let mut camera = acquire(SimSpec::default());
        let request = CaptureRequest {
            width,
            height,
            binning: false,
            ..CaptureRequest::default()
        };
        let config = negotiate(&mut camera, &request).unwrap();
        prop_assert_eq!(config.width, width - width % 2);
        prop_assert_eq!(config.height, height - height % 2);
    }

    /// Offsets are aligned to their own increment and the ROI always
    /// fits on the (possibly binned) sensor.
    #[test]
    fn offsets_are_aligned_and_roi_fits(
        width in 64u32..=1632,
        height in 64u32..=1248,
        binning in any::<bool>(),
    ) {
        let mut camera = acquire(SimSpec::default());
        let request = CaptureRequest {
            width,
            height,
            binning,
            ..CaptureRequest::default()
        };
        let config = negotiate(&mut camera, &request).unwrap();

        let factor = if config.binning { 2 } else { 1 };
        prop_assert_eq!(config.offset_x % 4, 0);
        prop_assert_eq!(config.offset_y % 4, 0);
        prop_assert!(config.offset_x + config.width <= 1632 / factor);
        prop_assert!(config.offset_y + config.height <= 1248 / factor);
    }

    /// Shutter requests outside the supported range land on the range
    /// minimum; in-range requests pass through.
    #[test]
    fn shutter_clamps_to_minimum(
        shutter in prop_oneof![-1000.0f64..21.0, 10_000_001.0f64..20_000_000.0],
    ) {
        let mut camera = acquire(SimSpec::default());
        let request = CaptureRequest {
            shutter_speed_us: shutter,
            ..CaptureRequest::default()
        };
        let config = negotiate(&mut camera, &request).unwrap();
        prop_assert_eq!(config.shutter_speed_us, 21.0);
    }

    /// A binning request against a non-binning device is always forced
    /// off, whatever was asked.
    #[test]
    fn binning_forced_off_without_capability(
        binning in any::<bool>(),
        width in 64u32..=1632,
    ) {
        let spec = SimSpec { binning_supported: false, ..SimSpec::default() };
        let mut camera = acquire(spec);
        let request = CaptureRequest { binning, width, ..CaptureRequest::default() };
        let config = negotiate(&mut camera, &request).unwrap();
        prop_assert!(!config.binning);
    }

    /// Running the same request twice against the device left in the
    /// first run's output state yields an identical configuration.
    #[test]
    fn negotiation_is_idempotent(
        shutter in 1.0f64..50_000.0,
        width in 0u32..4000,
        height in 0u32..4000,
        binning in any::<bool>(),
    ) {
        let mut camera = acquire(SimSpec::default());
        let request = CaptureRequest {
            shutter_speed_us: shutter,
            binning,
            width,
            height,
        };
        let first = negotiate(&mut camera, &request).unwrap();
        let second = negotiate(&mut camera, &request).unwrap();
        prop_assert_eq!(first, second);
    }
}
