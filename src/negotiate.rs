//! Parameter negotiation: reconcile what the operator asked for with
//! what the hardware actually supports.
//!
//! Out-of-range or misaligned requests are never errors here. They are
//! expected operator input and are corrected deterministically, each
//! correction logged, so a recording session never dies on a typo.
//!
//! Order matters and every range is re-read live: binning is applied
//! first because it changes the valid ranges of everything after it.

use crate::camera::Camera;
use crate::device::GeometryParam;
use crate::errors::CameraError;
use crate::types::{CaptureRequest, NegotiatedConfig};

/// Derive a hardware-valid configuration from `request`, writing each
/// final value to the live device, and return what the device accepted.
///
/// Steps, in order:
/// 1. binning (forced off, with a report, on non-binning devices)
/// 2. shutter speed, clamped to the range minimum when out of range
/// 3. height then width: clamped to the axis maximum when out of
///    range, then rounded down to the axis increment
/// 4. centering offsets, computed from the final sizes and snapped down
///    to their own increments, applied last
pub fn negotiate(
    camera: &mut Camera,
    request: &CaptureRequest,
) -> Result<NegotiatedConfig, CameraError> {
    let binning = if camera.supports_binning() {
        camera.set_binning(request.binning)?;
        request.binning
    } else {
        if request.binning {
            log::warn!("Binning is not available on this camera. Setting binning to false.");
        }
        false
    };

    let shutter_range = camera.shutter_speed()?;
    if shutter_range.contains(request.shutter_speed_us) {
        camera.set_shutter_speed(request.shutter_speed_us)?;
    } else {
        camera.set_shutter_speed(shutter_range.min)?;
        log::warn!(
            "Shutter speed {} µs is out of range [{}, {}] µs. Setting to minimum {} µs.",
            request.shutter_speed_us,
            shutter_range.min,
            shutter_range.max,
            shutter_range.min
        );
    }
    // Read back: the device may quantize the exposure it accepted.
    let shutter_speed_us = camera.shutter_speed()?.current;

    let height = apply_axis(camera, GeometryParam::Height, request.height, "Height")?;
    let width = apply_axis(camera, GeometryParam::Width, request.width, "Width")?;

    // Offsets depend on the final sizes, which must not change anymore.
    let offset_x = centered_offset(camera, GeometryParam::Width, GeometryParam::OffsetX, width)?;
    let offset_y = centered_offset(camera, GeometryParam::Height, GeometryParam::OffsetY, height)?;
    camera.set_geometry(GeometryParam::OffsetX, offset_x)?;
    camera.set_geometry(GeometryParam::OffsetY, offset_y)?;

    Ok(NegotiatedConfig {
        shutter_speed_us,
        binning,
        height,
        width,
        offset_x,
        offset_y,
    })
}

/// Clamp one resolution axis into its live range, snap it down to the
/// live increment, and write the final value once.
///
/// The range is read after any binning write, so it reflects the
/// current sensor mode. Writing once (instead of clamp-write then
/// snap-write) keeps a strict device setter from ever seeing a
/// misaligned intermediate value.
fn apply_axis(
    camera: &mut Camera,
    param: GeometryParam,
    requested: u32,
    label: &str,
) -> Result<u32, CameraError> {
    let axis = camera.geometry(param)?;

    let clamped = if axis.contains(requested) {
        requested
    } else {
        log::warn!(
            "{} {} px is out of range [{}, {}]. Setting to maximum {} px.",
            label,
            requested,
            axis.min,
            axis.max,
            axis.max
        );
        axis.max
    };

    let snapped = axis.snap_down(clamped);
    if snapped != clamped {
        log::warn!(
            "{} {} px is not a multiple of {}. Setting to {} px.",
            label,
            clamped,
            axis.increment,
            snapped
        );
    }

    camera.set_geometry(param, snapped)?;
    Ok(snapped)
}

/// Offset that centers `final_size` on the sensor, snapped down to the
/// offset parameter's own increment.
fn centered_offset(
    camera: &mut Camera,
    size_param: GeometryParam,
    offset_param: GeometryParam,
    final_size: u32,
) -> Result<u32, CameraError> {
    let size_axis = camera.geometry(size_param)?;
    let offset_axis = camera.geometry(offset_param)?;
    let centered = (size_axis.max - final_size) / 2;
    Ok(offset_axis.snap_down(centered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SimSpec, SimSystem};

    fn acquire(spec: SimSpec) -> Camera {
        Camera::acquire(Box::new(SimSystem::new(spec))).expect("sim camera should acquire")
    }

    #[test]
    fn passthrough_request_is_accepted_verbatim() {
        let mut camera = acquire(SimSpec::default());
        let request = CaptureRequest {
            shutter_speed_us: 5000.0,
            binning: false,
            height: 1248,
            width: 1632,
        };
        let config = negotiate(&mut camera, &request).unwrap();
        assert_eq!(config.height, 1248);
        assert_eq!(config.width, 1632);
        assert_eq!(config.offset_x, 0);
        assert_eq!(config.offset_y, 0);
        assert_eq!(config.shutter_speed_us, 5000.0);
        assert!(!config.binning);
    }

    #[test]
    fn oversized_width_clamps_to_maximum() {
        let mut camera = acquire(SimSpec::default());
        let request = CaptureRequest {
            width: 2000,
            ..CaptureRequest::default()
        };
        let config = negotiate(&mut camera, &request).unwrap();
        assert_eq!(config.width, 1632);
    }

    #[test]
    fn undersized_axis_also_clamps_to_maximum() {
        let mut camera = acquire(SimSpec::default());
        let request = CaptureRequest {
            height: 10,
            ..CaptureRequest::default()
        };
        let config = negotiate(&mut camera, &request).unwrap();
        assert_eq!(config.height, 1248);
    }

    #[test]
    fn misaligned_axis_snaps_down() {
        let mut camera = acquire(SimSpec::default());
        let request = CaptureRequest {
            height: 1001,
            width: 801,
            ..CaptureRequest::default()
        };
        let config = negotiate(&mut camera, &request).unwrap();
        assert_eq!(config.height, 1000);
        assert_eq!(config.width, 800);
    }

    #[test]
    fn out_of_range_shutter_clamps_to_minimum() {
        let mut camera = acquire(SimSpec::default());
        let request = CaptureRequest {
            shutter_speed_us: 0.5,
            ..CaptureRequest::default()
        };
        let config = negotiate(&mut camera, &request).unwrap();
        assert_eq!(config.shutter_speed_us, SimSpec::default().exposure_min_us);
    }

    #[test]
    fn binning_forced_off_on_incapable_device() {
        let spec = SimSpec {
            binning_supported: false,
            ..SimSpec::default()
        };
        let mut camera = acquire(spec);
        let request = CaptureRequest {
            binning: true,
            ..CaptureRequest::default()
        };
        let config = negotiate(&mut camera, &request).unwrap();
        assert!(!config.binning);
    }

    #[test]
    fn binning_halves_the_accepted_resolution() {
        let mut camera = acquire(SimSpec::default());
        let request = CaptureRequest {
            binning: true,
            height: 1248,
            width: 1632,
            ..CaptureRequest::default()
        };
        let config = negotiate(&mut camera, &request).unwrap();
        assert!(config.binning);
        assert_eq!(config.width, 816);
        assert_eq!(config.height, 624);
    }

    #[test]
    fn offsets_center_a_small_roi() {
        let mut camera = acquire(SimSpec::default());
        let request = CaptureRequest {
            height: 624,
            width: 816,
            ..CaptureRequest::default()
        };
        let config = negotiate(&mut camera, &request).unwrap();
        assert_eq!(config.offset_x, 408);
        assert_eq!(config.offset_y, 312);
        assert!(config.offset_x + config.width <= 1632);
        assert!(config.offset_y + config.height <= 1248);
    }
}
