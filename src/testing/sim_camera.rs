//! Simulated driver system and camera.
//!
//! The constraint model mirrors a global-shutter machine-vision sensor:
//! resolution axes with a minimum, a maximum, and a step increment;
//! ROI offsets whose ranges track the current image size; and 2x2
//! binning that halves both axis maxima. Every read reflects preceding
//! writes, so negotiation code can be exercised against live-range
//! semantics.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::device::{CameraDevice, DriverSystem, Frame, FrameHandler, GeometryParam};
use crate::errors::CameraError;
use crate::types::{FloatParam, IntParam};

#[derive(Debug, Clone)]
pub struct SimSpec {
    pub sensor_width: u32,
    pub sensor_height: u32,
    pub size_min: u32,
    pub size_increment: u32,
    pub offset_increment: u32,
    pub exposure_min_us: f64,
    pub exposure_max_us: f64,
    /// Mechanical frame-rate ceiling; short exposures cannot exceed it.
    pub max_frame_rate: f64,
    /// Delivery cadence while streaming.
    pub frame_interval: Duration,
    /// Number of buffers in the device's frame pool.
    pub pool_size: usize,
    pub binning_supported: bool,
    pub color_supported: bool,
    /// Simulate an unplugged camera.
    pub no_cameras: bool,
}

impl Default for SimSpec {
    fn default() -> Self {
        Self {
            sensor_width: 1632,
            sensor_height: 1248,
            size_min: 64,
            size_increment: 2,
            offset_increment: 4,
            exposure_min_us: 21.0,
            exposure_max_us: 10_000_000.0,
            max_frame_rate: 60.0,
            frame_interval: Duration::from_millis(33),
            pool_size: 5,
            binning_supported: true,
            color_supported: false,
            no_cameras: false,
        }
    }
}

/// Observation handle for assertions: buffer-pool accounting, frames
/// emitted, driver shutdowns.
#[derive(Clone)]
pub struct SimProbe {
    pool_size: usize,
    pool: Receiver<Vec<u8>>,
    emitted: Arc<AtomicU64>,
    shutdowns: Arc<AtomicUsize>,
}

impl SimProbe {
    /// Buffers currently out of the pool (delivered but not yet
    /// returned). Zero after a clean session.
    pub fn buffers_outstanding(&self) -> usize {
        self.pool_size.saturating_sub(self.pool.len())
    }

    pub fn frames_emitted(&self) -> u64 {
        self.emitted.load(Ordering::SeqCst)
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

pub struct SimSystem {
    spec: SimSpec,
    started: bool,
    opened: bool,
    pool_tx: Sender<Vec<u8>>,
    probe: SimProbe,
}

impl SimSystem {
    pub fn new(spec: SimSpec) -> Self {
        let (pool_tx, pool_rx) = unbounded();
        for _ in 0..spec.pool_size {
            // Buffers are resized to the live resolution at delivery.
            let _ = pool_tx.send(Vec::new());
        }
        let probe = SimProbe {
            pool_size: spec.pool_size,
            pool: pool_rx,
            emitted: Arc::new(AtomicU64::new(0)),
            shutdowns: Arc::new(AtomicUsize::new(0)),
        };
        Self {
            spec,
            started: false,
            opened: false,
            pool_tx,
            probe,
        }
    }

    /// Grab the probe before handing the system to `Camera::acquire`.
    pub fn probe(&self) -> SimProbe {
        self.probe.clone()
    }
}

impl DriverSystem for SimSystem {
    fn startup(&mut self) -> Result<(), CameraError> {
        self.started = true;
        Ok(())
    }

    fn open_first_camera(&mut self) -> Result<Box<dyn CameraDevice>, CameraError> {
        if !self.started {
            return Err(CameraError::AcquisitionError(
                "driver system not started".to_string(),
            ));
        }
        if self.spec.no_cameras {
            return Err(CameraError::AcquisitionError(
                "No camera found. Please check that the camera is correctly connected."
                    .to_string(),
            ));
        }
        if self.opened {
            return Err(CameraError::AcquisitionError(
                "camera already opened".to_string(),
            ));
        }
        self.opened = true;
        Ok(Box::new(SimCamera::new(
            self.spec.clone(),
            self.pool_tx.clone(),
            self.probe.clone(),
        )))
    }

    fn shutdown(&mut self) {
        self.started = false;
        self.probe.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

struct SimState {
    spec: SimSpec,
    binning: bool,
    exposure_us: f64,
    width: u32,
    height: u32,
    offset_x: u32,
    offset_y: u32,
}

impl SimState {
    fn bin_factor(&self) -> u32 {
        if self.binning {
            2
        } else {
            1
        }
    }

    fn size_max(&self, param: GeometryParam) -> u32 {
        match param {
            GeometryParam::Width | GeometryParam::OffsetX => {
                self.spec.sensor_width / self.bin_factor()
            }
            GeometryParam::Height | GeometryParam::OffsetY => {
                self.spec.sensor_height / self.bin_factor()
            }
        }
    }

    fn geometry(&self, param: GeometryParam) -> IntParam {
        match param {
            GeometryParam::Width => IntParam::new(
                self.width,
                self.spec.size_min,
                self.size_max(param),
                self.spec.size_increment,
            ),
            GeometryParam::Height => IntParam::new(
                self.height,
                self.spec.size_min,
                self.size_max(param),
                self.spec.size_increment,
            ),
            GeometryParam::OffsetX => IntParam::new(
                self.offset_x,
                0,
                self.size_max(param) - self.width,
                self.spec.offset_increment,
            ),
            GeometryParam::OffsetY => IntParam::new(
                self.offset_y,
                0,
                self.size_max(param) - self.height,
                self.spec.offset_increment,
            ),
        }
    }

    fn set_geometry(&mut self, param: GeometryParam, value: u32) -> Result<(), CameraError> {
        let axis = self.geometry(param);
        if value % axis.increment != 0 {
            return Err(CameraError::ControlError(format!(
                "{:?} must be a multiple of {}",
                param, axis.increment
            )));
        }
        if !axis.contains(value) {
            return Err(CameraError::ControlError(format!(
                "{:?} must be within [{}, {}]",
                param, axis.min, axis.max
            )));
        }
        let snap = |v: u32, inc: u32| v - v % inc;
        match param {
            GeometryParam::Width => {
                self.width = value;
                let bound = self.size_max(param) - value;
                self.offset_x = snap(self.offset_x.min(bound), self.spec.offset_increment);
            }
            GeometryParam::Height => {
                self.height = value;
                let bound = self.size_max(param) - value;
                self.offset_y = snap(self.offset_y.min(bound), self.spec.offset_increment);
            }
            GeometryParam::OffsetX => self.offset_x = value,
            GeometryParam::OffsetY => self.offset_y = value,
        }
        Ok(())
    }

    fn set_binning(&mut self, enabled: bool) {
        self.binning = enabled;
        // A mode switch pulls anything out of range back in, the way
        // the live camera does.
        let snap = |v: u32, inc: u32| v - v % inc;
        let max_w = self.size_max(GeometryParam::Width);
        let max_h = self.size_max(GeometryParam::Height);
        self.width = snap(self.width.min(max_w), self.spec.size_increment);
        self.height = snap(self.height.min(max_h), self.spec.size_increment);
        self.offset_x = snap(self.offset_x.min(max_w - self.width), self.spec.offset_increment);
        self.offset_y = snap(self.offset_y.min(max_h - self.height), self.spec.offset_increment);
    }

    fn frame_rate(&self) -> FloatParam {
        let exposure_limit = 1_000_000.0 / self.exposure_us.max(1.0);
        let current = exposure_limit.min(self.spec.max_frame_rate);
        FloatParam::new(current, 1.0, self.spec.max_frame_rate)
    }
}

pub struct SimCamera {
    state: Arc<Mutex<SimState>>,
    pool_tx: Sender<Vec<u8>>,
    probe: SimProbe,
    stop_flag: Arc<AtomicBool>,
    delivery_thread: Option<thread::JoinHandle<()>>,
}

impl SimCamera {
    fn new(spec: SimSpec, pool_tx: Sender<Vec<u8>>, probe: SimProbe) -> Self {
        let state = SimState {
            binning: false,
            exposure_us: 5000.0,
            width: spec.sensor_width,
            height: spec.sensor_height,
            offset_x: 0,
            offset_y: 0,
            spec,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            pool_tx,
            probe,
            stop_flag: Arc::new(AtomicBool::new(false)),
            delivery_thread: None,
        }
    }
}

impl CameraDevice for SimCamera {
    fn configure_defaults(&mut self) -> Result<(), CameraError> {
        // Free-running rate and manual exposure are implicit in the
        // model; a vendor binding would flip driver switches here.
        Ok(())
    }

    fn supports_binning(&self) -> bool {
        self.state.lock().expect("lock poisoned").spec.binning_supported
    }

    fn supports_color(&self) -> bool {
        self.state.lock().expect("lock poisoned").spec.color_supported
    }

    fn binning(&self) -> Result<bool, CameraError> {
        Ok(self.state.lock().expect("lock poisoned").binning)
    }

    fn set_binning(&mut self, enabled: bool) -> Result<(), CameraError> {
        let mut state = self.state.lock().expect("lock poisoned");
        if enabled && !state.spec.binning_supported {
            return Err(CameraError::ControlError(
                "binning not supported".to_string(),
            ));
        }
        state.set_binning(enabled);
        Ok(())
    }

    fn shutter_speed(&self) -> Result<FloatParam, CameraError> {
        let state = self.state.lock().expect("lock poisoned");
        Ok(FloatParam::new(
            state.exposure_us,
            state.spec.exposure_min_us,
            state.spec.exposure_max_us,
        ))
    }

    fn set_shutter_speed(&mut self, us: f64) -> Result<(), CameraError> {
        let mut state = self.state.lock().expect("lock poisoned");
        if us < state.spec.exposure_min_us || us > state.spec.exposure_max_us {
            return Err(CameraError::ControlError(format!(
                "exposure {} µs outside [{}, {}] µs",
                us, state.spec.exposure_min_us, state.spec.exposure_max_us
            )));
        }
        state.exposure_us = us;
        Ok(())
    }

    fn frame_rate(&self) -> Result<FloatParam, CameraError> {
        Ok(self.state.lock().expect("lock poisoned").frame_rate())
    }

    fn geometry(&self, param: GeometryParam) -> Result<IntParam, CameraError> {
        Ok(self.state.lock().expect("lock poisoned").geometry(param))
    }

    fn set_geometry(&mut self, param: GeometryParam, value: u32) -> Result<(), CameraError> {
        self.state.lock().expect("lock poisoned").set_geometry(param, value)
    }

    fn start_streaming(&mut self, mut handler: FrameHandler) -> Result<(), CameraError> {
        if self.delivery_thread.is_some() {
            return Err(CameraError::StreamError(
                "streaming already active".to_string(),
            ));
        }

        let (width, height, interval) = {
            let state = self.state.lock().expect("lock poisoned");
            (state.width, state.height, state.spec.frame_interval)
        };

        self.stop_flag.store(false, Ordering::SeqCst);
        let stop = self.stop_flag.clone();
        let pool_tx = self.pool_tx.clone();
        let pool_rx = self.probe.pool.clone();
        let emitted = self.probe.emitted.clone();

        let handle = thread::Builder::new()
            .name("alvicam-sim-delivery".to_string())
            .spawn(move || {
                let mut sequence: u64 = 0;
                loop {
                    // Sleep the frame interval in small steps so a stop
                    // lands without a full-interval delay.
                    let mut slept = Duration::ZERO;
                    while slept < interval {
                        if stop.load(Ordering::SeqCst) {
                            return;
                        }
                        let step = Duration::from_millis(1).min(interval - slept);
                        thread::sleep(step);
                        slept += step;
                    }
                    if stop.load(Ordering::SeqCst) {
                        return;
                    }

                    // A starved pool stalls delivery until a buffer
                    // comes back, like real hardware DMA rings.
                    let mut data = match pool_rx.recv_timeout(Duration::from_millis(50)) {
                        Ok(buffer) => buffer,
                        Err(_) => continue,
                    };

                    fill_gradient(&mut data, width, height, sequence);
                    emitted.fetch_add(1, Ordering::SeqCst);
                    handler(Frame::new(sequence, width, height, data, pool_tx.clone()));
                    sequence += 1;
                }
            })
            .map_err(|e| CameraError::StreamError(format!("spawn failed: {}", e)))?;

        self.delivery_thread = Some(handle);
        Ok(())
    }

    fn stop_streaming(&mut self) -> Result<(), CameraError> {
        let handle = self.delivery_thread.take().ok_or_else(|| {
            CameraError::StreamError("streaming not active".to_string())
        })?;
        self.stop_flag.store(true, Ordering::SeqCst);
        handle
            .join()
            .map_err(|_| CameraError::StreamError("delivery thread panicked".to_string()))
    }
}

impl Drop for SimCamera {
    fn drop(&mut self) {
        if self.delivery_thread.is_some() {
            let _ = self.stop_streaming();
        }
    }
}

/// Mono8 gradient that shifts per frame, after the synthetic test
/// pattern used for offline encoder exercise.
fn fill_gradient(buffer: &mut Vec<u8>, width: u32, height: u32, frame_number: u64) {
    buffer.clear();
    buffer.resize((width * height) as usize, 0);
    let base = (frame_number % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            buffer[(y * width + x) as usize] = base.wrapping_add(((x + y) % 256) as u8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_device(spec: SimSpec) -> Box<dyn CameraDevice> {
        let mut system = SimSystem::new(spec);
        system.startup().unwrap();
        system.open_first_camera().unwrap()
    }

    #[test]
    fn binning_halves_axis_maxima() {
        let mut device = open_device(SimSpec::default());
        assert_eq!(device.geometry(GeometryParam::Width).unwrap().max, 1632);
        device.set_binning(true).unwrap();
        assert_eq!(device.geometry(GeometryParam::Width).unwrap().max, 816);
        assert_eq!(device.geometry(GeometryParam::Height).unwrap().max, 624);
    }

    #[test]
    fn binning_pulls_current_values_back_into_range() {
        let mut device = open_device(SimSpec::default());
        device.set_geometry(GeometryParam::Width, 1632).unwrap();
        device.set_binning(true).unwrap();
        let width = device.geometry(GeometryParam::Width).unwrap();
        assert!(width.current <= width.max);
    }

    #[test]
    fn offset_range_tracks_image_size() {
        let mut device = open_device(SimSpec::default());
        device.set_geometry(GeometryParam::Width, 800).unwrap();
        let offset = device.geometry(GeometryParam::OffsetX).unwrap();
        assert_eq!(offset.max, 1632 - 800);
    }

    #[test]
    fn strict_setter_rejects_misaligned_values() {
        let mut device = open_device(SimSpec::default());
        assert!(device.set_geometry(GeometryParam::Width, 801).is_err());
        assert!(device.set_geometry(GeometryParam::Width, 2000).is_err());
    }

    #[test]
    fn no_cameras_is_an_acquisition_error() {
        let mut system = SimSystem::new(SimSpec {
            no_cameras: true,
            ..SimSpec::default()
        });
        system.startup().unwrap();
        assert!(matches!(
            system.open_first_camera(),
            Err(CameraError::AcquisitionError(_))
        ));
    }

    #[test]
    fn long_exposure_caps_frame_rate() {
        let mut device = open_device(SimSpec::default());
        device.set_shutter_speed(100_000.0).unwrap();
        let rate = device.frame_rate().unwrap();
        assert!((rate.current - 10.0).abs() < 1e-9);
    }
}
