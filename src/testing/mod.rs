//! Testing utilities: a deterministic simulated camera driver.
//!
//! Implements the full capability surface (ranges, increments,
//! cross-parameter binning effects, buffer pool, streaming delivery)
//! without hardware, enabling reliable offline testing. The CLI also
//! runs against this backend; a vendor driver binding plugs in through
//! the same traits.

mod sim_camera;

pub use sim_camera::{SimProbe, SimSpec, SimSystem};
