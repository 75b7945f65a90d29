//! Render module - drawing the traced path
//!
//! This module provides:
//! - Path style and derived frame rate
//! - Background selection and resolution
//! - Animated live preview widget
//! - Anti-aliased rasterisation for exported frames

mod background;
mod preview;
pub mod raster;
mod style;

pub use background::{Background, BackgroundMode, ResolvedBackground};
pub use preview::LivePreview;
pub use style::{
    frame_rate, playback_duration, PathStyle, SAMPLE_RATE_RANGE, SPEED_RANGE, THICKNESS_RANGE,
};
