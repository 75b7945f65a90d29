//! Capture module - cursor sampling and the inputs that drive it
//!
//! This module provides:
//! - Display enumeration and monitor-local coordinates
//! - Lock-free point channel feeding the live preview
//! - Fixed-rate cursor sampler
//! - Global start/stop hotkey

mod buffer;
mod hotkey;
mod monitor;
mod sampler;

pub use buffer::{point_channel, Point, PointConsumer};
pub use hotkey::HotkeyWatcher;
pub use monitor::{CaptureError, MonitorInfo};
pub use sampler::{interval_for, DevicePointer, PointerSource, Sampler, MAX_HZ, MIN_HZ};
