//! Capability interface to the camera driver.
//!
//! The negotiation and recording core never talks to a vendor SDK
//! directly; it consumes the [`DriverSystem`] / [`CameraDevice`] traits
//! and hands out [`Frame`] borrows whose buffers flow back to the
//! device through a recycle channel. A driver binding implements these
//! traits; the crate ships a deterministic one in [`crate::testing`].

use crossbeam_channel::Sender;

use crate::errors::CameraError;
use crate::types::{FloatParam, IntParam};

/// Per-frame delivery callback registered with [`CameraDevice::start_streaming`].
///
/// Invoked once per arriving frame, in arrival order, never concurrently
/// with itself. The handler must only hand the frame off (enqueue) and
/// return; slow work belongs on the consumer side.
pub type FrameHandler = Box<dyn FnMut(Frame) + Send + 'static>;

/// The resolution axes and ROI offsets the negotiator manipulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryParam {
    Height,
    Width,
    OffsetX,
    OffsetY,
}

/// Handle to the vendor driver runtime. Owns device enumeration and the
/// outermost acquisition scope.
pub trait DriverSystem: Send {
    fn startup(&mut self) -> Result<(), CameraError>;

    /// Open the first connected camera. Errors with
    /// [`CameraError::AcquisitionError`] when none is found.
    fn open_first_camera(&mut self) -> Result<Box<dyn CameraDevice>, CameraError>;

    /// Tear the driver runtime down. Must be called after the device
    /// handle has been dropped (reverse acquisition order).
    fn shutdown(&mut self);
}

/// A single opened camera.
///
/// Every read reflects preceding writes, including cross-parameter
/// effects: enabling binning changes the valid ranges of the resolution
/// axes, so callers must re-read ranges after each write instead of
/// caching them.
pub trait CameraDevice: Send {
    /// Apply acquisition defaults: free-running frame rate (no cap),
    /// auto-exposure off, sensor binning selector in averaging mode.
    fn configure_defaults(&mut self) -> Result<(), CameraError>;

    fn supports_binning(&self) -> bool;
    fn supports_color(&self) -> bool;

    fn binning(&self) -> Result<bool, CameraError>;
    fn set_binning(&mut self, enabled: bool) -> Result<(), CameraError>;

    /// Exposure time in microseconds.
    fn shutter_speed(&self) -> Result<FloatParam, CameraError>;
    fn set_shutter_speed(&mut self, us: f64) -> Result<(), CameraError>;

    /// Currently achievable frame rate and its range.
    fn frame_rate(&self) -> Result<FloatParam, CameraError>;

    fn geometry(&self, param: GeometryParam) -> Result<IntParam, CameraError>;
    fn set_geometry(&mut self, param: GeometryParam, value: u32) -> Result<(), CameraError>;

    /// Begin frame delivery. Returns as soon as driver setup is done;
    /// from then on `handler` is driven by the delivery thread.
    fn start_streaming(&mut self, handler: FrameHandler) -> Result<(), CameraError>;

    /// Halt frame delivery. No further handler invocations after this
    /// returns.
    fn stop_streaming(&mut self) -> Result<(), CameraError>;
}

/// One captured image buffer, borrowed from the device's buffer pool.
///
/// The buffer must go back to the device exactly once; a frame that is
/// never returned is permanently lost to the pool and eventually stalls
/// capture. `Frame` enforces this as an RAII handle: [`Frame::release`]
/// returns the buffer explicitly, and dropping the handle returns it as
/// a backstop, so neither a double return nor a leak is expressible.
pub struct Frame {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    data: Option<Vec<u8>>,
    recycler: Option<Sender<Vec<u8>>>,
}

impl Frame {
    pub fn new(
        sequence: u64,
        width: u32,
        height: u32,
        data: Vec<u8>,
        recycler: Sender<Vec<u8>>,
    ) -> Self {
        Self {
            sequence,
            width,
            height,
            data: Some(data),
            recycler: Some(recycler),
        }
    }

    /// Pixel data, Mono8, row-major, stride == width.
    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    /// Return the buffer to the device's pool.
    pub fn release(mut self) {
        self.recycle();
    }

    fn recycle(&mut self) {
        if let (Some(data), Some(recycler)) = (self.data.take(), self.recycler.take()) {
            // Device side may already be gone during teardown; the
            // buffer is then simply freed.
            let _ = recycler.send(data);
        }
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        self.recycle();
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("sequence", &self.sequence)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
