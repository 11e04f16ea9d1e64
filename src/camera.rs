//! Camera lifecycle: scoped acquisition with rollback, and a
//! release-on-failure guard around every device-touching call.
//!
//! Acquisition is nested: the driver system handle owns the device
//! handle. A failure at any step rolls the already-acquired resources
//! back in reverse order before the error surfaces. After acquisition,
//! any failing property access also releases everything first, so a
//! dead camera never leaves partial driver state dangling.

use crate::device::{CameraDevice, DriverSystem, FrameHandler, GeometryParam};
use crate::errors::CameraError;
use crate::types::{FloatParam, IntParam};

pub struct Camera {
    system: Option<Box<dyn DriverSystem>>,
    device: Option<Box<dyn CameraDevice>>,
    streaming: bool,
}

impl Camera {
    /// Start the driver system, open the first camera found, and apply
    /// acquisition defaults. Rolls back everything acquired so far on
    /// any failure.
    pub fn acquire(mut system: Box<dyn DriverSystem>) -> Result<Self, CameraError> {
        system.startup()?;

        let mut device = match system.open_first_camera() {
            Ok(device) => device,
            Err(e) => {
                system.shutdown();
                return Err(e);
            }
        };

        if let Err(e) = device.configure_defaults() {
            drop(device);
            system.shutdown();
            return Err(e);
        }

        Ok(Self {
            system: Some(system),
            device: Some(device),
            streaming: false,
        })
    }

    /// Release the device and the driver system, in reverse acquisition
    /// order. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(device) = self.device.as_mut() {
            if self.streaming {
                if let Err(e) = device.stop_streaming() {
                    log::warn!("stop_streaming during release failed: {}", e);
                }
                self.streaming = false;
            }
        }
        self.device = None;
        if let Some(mut system) = self.system.take() {
            system.shutdown();
        }
    }

    pub fn is_released(&self) -> bool {
        self.device.is_none()
    }

    /// Run one device operation under the cleanup guard: on any error
    /// the camera and driver system are released before the error
    /// propagates.
    fn guarded<T>(
        &mut self,
        op: impl FnOnce(&mut dyn CameraDevice) -> Result<T, CameraError>,
    ) -> Result<T, CameraError> {
        let device = self.device.as_mut().ok_or_else(|| {
            CameraError::SessionReleased("acquire the camera before using it".to_string())
        })?;
        match op(device.as_mut()) {
            Ok(value) => Ok(value),
            Err(e) => {
                log::warn!("device access failed ({}); releasing camera", e);
                self.release();
                Err(e)
            }
        }
    }

    pub fn supports_binning(&self) -> bool {
        self.device.as_ref().map(|d| d.supports_binning()).unwrap_or(false)
    }

    pub fn supports_color(&self) -> bool {
        self.device.as_ref().map(|d| d.supports_color()).unwrap_or(false)
    }

    pub fn binning(&mut self) -> Result<bool, CameraError> {
        self.guarded(|d| d.binning())
    }

    pub fn set_binning(&mut self, enabled: bool) -> Result<(), CameraError> {
        self.guarded(|d| d.set_binning(enabled))
    }

    pub fn shutter_speed(&mut self) -> Result<FloatParam, CameraError> {
        self.guarded(|d| d.shutter_speed())
    }

    pub fn set_shutter_speed(&mut self, us: f64) -> Result<(), CameraError> {
        self.guarded(|d| d.set_shutter_speed(us))
    }

    pub fn frame_rate(&mut self) -> Result<FloatParam, CameraError> {
        self.guarded(|d| d.frame_rate())
    }

    pub fn geometry(&mut self, param: GeometryParam) -> Result<IntParam, CameraError> {
        self.guarded(move |d| d.geometry(param))
    }

    pub fn set_geometry(&mut self, param: GeometryParam, value: u32) -> Result<(), CameraError> {
        self.guarded(move |d| d.set_geometry(param, value))
    }

    /// Begin frame delivery. `handler` runs on the driver's delivery
    /// thread; it must only enqueue and return (see [`FrameHandler`]).
    pub fn start_streaming(&mut self, handler: FrameHandler) -> Result<(), CameraError> {
        if self.streaming {
            return Err(CameraError::StreamError(
                "streaming already started".to_string(),
            ));
        }
        self.guarded(|d| d.start_streaming(handler))?;
        self.streaming = true;
        Ok(())
    }

    /// Halt frame delivery. A stop without a prior start is reported
    /// and ignored.
    pub fn stop_streaming(&mut self) -> Result<(), CameraError> {
        if !self.streaming {
            log::warn!("stop_streaming called while not recording");
            return Ok(());
        }
        self.streaming = false;
        self.guarded(|d| d.stop_streaming())
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.release();
    }
}
